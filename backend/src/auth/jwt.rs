//! JWT token generation and validation
//!
//! Access tokens carry the account id, email and role. Refresh tokens carry
//! only the subject; the role is re-read from the store when they are
//! redeemed. Neither is persisted, so a token stays valid until it expires.

use anyhow::Result;
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use storefront_shared::Role;
use thiserror::Error;
use uuid::Uuid;

/// Signing algorithm for every issued token
const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// Algorithms accepted on validation; anything outside the HMAC family fails
const ACCEPTED_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// Token validation failure
///
/// Expiry is reported separately so clients know a refresh is worth trying.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,
    #[error("invalid token")]
    Invalid,
}

/// Discriminates access and refresh tokens signed with the same secret
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Access token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (account ID)
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    pub token_type: TokenType,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Not before (Unix timestamp)
    pub nbf: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issuer
    pub iss: String,
}

impl Claims {
    #[inline]
    pub fn user_id(&self) -> Uuid {
        self.sub
    }
}

/// Refresh token claims: subject and registered claims only
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: Uuid,
    pub token_type: TokenType,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
    pub iss: String,
}

/// Pre-computed JWT keys
/// These are expensive to create, so we cache them in AppState
#[derive(Clone)]
pub struct JwtKeys {
    encoding: Arc<EncodingKey>,
    decoding: Arc<DecodingKey>,
}

impl JwtKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: Arc::new(EncodingKey::from_secret(secret.as_bytes())),
            decoding: Arc::new(DecodingKey::from_secret(secret.as_bytes())),
        }
    }

    pub fn encoding(&self) -> &EncodingKey {
        &self.encoding
    }

    pub fn decoding(&self) -> &DecodingKey {
        &self.decoding
    }
}

/// Lifetimes and issuer, fixed for the life of the process
#[derive(Clone)]
pub struct TokenConfig {
    pub access_token_expiry_secs: i64,
    pub refresh_token_expiry_secs: i64,
    pub issuer: String,
}

/// Issues and validates access and refresh tokens
///
/// Keys and validation rules are built once; clones share them through Arc.
#[derive(Clone)]
pub struct TokenService {
    keys: JwtKeys,
    config: TokenConfig,
    validation: Arc<Validation>,
}

impl TokenService {
    /// Call once at startup and store in AppState; never per request.
    pub fn new(
        secret: &str,
        access_token_expiry_secs: i64,
        refresh_token_expiry_secs: i64,
        issuer: impl Into<String>,
    ) -> Self {
        Self::from_keys(
            JwtKeys::new(secret),
            TokenConfig {
                access_token_expiry_secs,
                refresh_token_expiry_secs,
                issuer: issuer.into(),
            },
        )
    }

    pub fn from_keys(keys: JwtKeys, config: TokenConfig) -> Self {
        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.algorithms = ACCEPTED_ALGORITHMS.to_vec();
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "nbf", "iat", "iss", "sub"]);

        Self {
            keys,
            config,
            validation: Arc::new(validation),
        }
    }

    /// Issue an access token bound to the account's id, email and role
    pub fn issue_access_token(&self, user_id: Uuid, email: &str, role: Role) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.config.access_token_expiry_secs);

        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            role,
            token_type: TokenType::Access,
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: exp.timestamp(),
            iss: self.config.issuer.clone(),
        };

        self.sign(&claims)
            .map_err(|e| anyhow::anyhow!("Failed to generate access token: {}", e))
    }

    /// Issue a refresh token; it never embeds email or role
    pub fn issue_refresh_token(&self, user_id: Uuid) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.config.refresh_token_expiry_secs);

        let claims = RefreshClaims {
            sub: user_id,
            token_type: TokenType::Refresh,
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: exp.timestamp(),
            iss: self.config.issuer.clone(),
        };

        self.sign(&claims)
            .map_err(|e| anyhow::anyhow!("Failed to generate refresh token: {}", e))
    }

    fn sign<T: Serialize>(&self, claims: &T) -> jsonwebtoken::errors::Result<String> {
        encode(&Header::new(SIGNING_ALGORITHM), claims, self.keys.encoding())
    }

    fn decode<T: DeserializeOwned>(&self, token: &str) -> Result<T, TokenError> {
        decode::<T>(token, self.keys.decoding(), &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }

    /// Validate an access token and return its claims
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, TokenError> {
        let claims: Claims = self.decode(token)?;
        if claims.token_type != TokenType::Access {
            return Err(TokenError::Invalid);
        }
        Ok(claims)
    }

    /// Validate a refresh token and return the subject account ID
    pub fn validate_refresh_token(&self, token: &str) -> Result<Uuid, TokenError> {
        let claims: RefreshClaims = self.decode(token)?;
        if claims.token_type != TokenType::Refresh {
            return Err(TokenError::Invalid);
        }
        Ok(claims.sub)
    }

    /// Access token lifetime in seconds
    #[inline]
    pub fn access_token_expiry_secs(&self) -> i64 {
        self.config.access_token_expiry_secs
    }

    pub fn keys(&self) -> &JwtKeys {
        &self.keys
    }

    pub fn token_config(&self) -> &TokenConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ISSUER: &str = "storefront-api";
    /// base64url of `{"alg":"none","typ":"JWT"}`
    const NONE_HEADER: &str = "eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0";
    /// base64url of `{"alg":"RS256","typ":"JWT"}`
    const RS256_HEADER: &str = "eyJhbGciOiJSUzI1NiIsInR5cCI6IkpXVCJ9";

    fn create_test_service() -> TokenService {
        TokenService::new("test-secret", 900, 604800, ISSUER)
    }

    fn segments(token: &str) -> Vec<&str> {
        token.split('.').collect()
    }

    #[test]
    fn test_issue_and_validate_access_token() {
        let service = create_test_service();
        let user_id = Uuid::new_v4();

        let token = service
            .issue_access_token(user_id, "test@example.com", Role::User)
            .unwrap();
        let claims = service.validate_access_token(&token).unwrap();

        assert_eq!(claims.user_id(), user_id);
        assert_eq!(claims.email, "test@example.com");
        assert_eq!(claims.role, Role::User);
        assert_eq!(claims.iss, ISSUER);
        assert_eq!(claims.exp - claims.iat, 900);
        assert_eq!(claims.nbf, claims.iat);
    }

    #[test]
    fn test_issue_and_validate_refresh_token() {
        let service = create_test_service();
        let user_id = Uuid::new_v4();

        let token = service.issue_refresh_token(user_id).unwrap();
        assert_eq!(service.validate_refresh_token(&token).unwrap(), user_id);
    }

    #[test]
    fn test_refresh_token_does_not_embed_role_or_email() {
        let service = create_test_service();
        let token = service.issue_refresh_token(Uuid::new_v4()).unwrap();

        let claims: serde_json::Value =
            decode::<serde_json::Value>(&token, service.keys().decoding(), &service.validation)
                .unwrap()
                .claims;
        assert!(claims.get("role").is_none());
        assert!(claims.get("email").is_none());
    }

    #[test]
    fn test_token_types_are_not_interchangeable() {
        let service = create_test_service();
        let user_id = Uuid::new_v4();

        let access = service
            .issue_access_token(user_id, "a@b.com", Role::Admin)
            .unwrap();
        let refresh = service.issue_refresh_token(user_id).unwrap();

        assert_eq!(service.validate_refresh_token(&access), Err(TokenError::Invalid));
        assert_eq!(
            service.validate_access_token(&refresh).unwrap_err(),
            TokenError::Invalid
        );
    }

    #[test]
    fn test_expired_access_token() {
        let service = TokenService::new("test-secret", -3600, 604800, ISSUER);
        let token = service
            .issue_access_token(Uuid::new_v4(), "a@b.com", Role::User)
            .unwrap();

        assert_eq!(
            service.validate_access_token(&token).unwrap_err(),
            TokenError::Expired
        );
    }

    #[test]
    fn test_expired_refresh_token() {
        let service = TokenService::new("test-secret", 900, -3600, ISSUER);
        let token = service.issue_refresh_token(Uuid::new_v4()).unwrap();

        assert_eq!(
            service.validate_refresh_token(&token),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let service1 = TokenService::new("secret-key-1", 900, 604800, ISSUER);
        let service2 = TokenService::new("secret-key-2", 900, 604800, ISSUER);

        let token = service1
            .issue_access_token(Uuid::new_v4(), "a@b.com", Role::User)
            .unwrap();

        assert_eq!(
            service2.validate_access_token(&token).unwrap_err(),
            TokenError::Invalid
        );
    }

    #[test]
    fn test_expired_token_with_wrong_secret_is_invalid_not_expired() {
        let issuer = TokenService::new("secret-key-1", -3600, 604800, ISSUER);
        let verifier = TokenService::new("secret-key-2", 900, 604800, ISSUER);

        let token = issuer
            .issue_access_token(Uuid::new_v4(), "a@b.com", Role::User)
            .unwrap();

        assert_eq!(
            verifier.validate_access_token(&token).unwrap_err(),
            TokenError::Invalid
        );
    }

    #[test]
    fn test_foreign_issuer_is_invalid() {
        let other = TokenService::new("test-secret", 900, 604800, "someone-else");
        let token = other
            .issue_access_token(Uuid::new_v4(), "a@b.com", Role::User)
            .unwrap();

        assert_eq!(
            create_test_service().validate_access_token(&token).unwrap_err(),
            TokenError::Invalid
        );
    }

    #[test]
    fn test_alg_none_is_rejected() {
        let service = create_test_service();
        let token = service
            .issue_access_token(Uuid::new_v4(), "a@b.com", Role::Admin)
            .unwrap();
        let parts = segments(&token);

        let forged = format!("{}.{}.", NONE_HEADER, parts[1]);
        assert_eq!(
            service.validate_access_token(&forged).unwrap_err(),
            TokenError::Invalid
        );
    }

    #[test]
    fn test_asymmetric_alg_header_is_rejected() {
        let service = create_test_service();
        let token = service
            .issue_access_token(Uuid::new_v4(), "a@b.com", Role::Admin)
            .unwrap();
        let parts = segments(&token);

        let forged = format!("{}.{}.{}", RS256_HEADER, parts[1], parts[2]);
        assert_eq!(
            service.validate_access_token(&forged).unwrap_err(),
            TokenError::Invalid
        );
    }

    #[test]
    fn test_tampered_payload_is_rejected() {
        let service = create_test_service();
        let user_token = service
            .issue_access_token(Uuid::new_v4(), "a@b.com", Role::User)
            .unwrap();
        let admin_token = service
            .issue_access_token(Uuid::new_v4(), "a@b.com", Role::Admin)
            .unwrap();
        let user_parts = segments(&user_token);
        let admin_parts = segments(&admin_token);

        // Admin payload with the user token's signature
        let forged = format!("{}.{}.{}", user_parts[0], admin_parts[1], user_parts[2]);
        assert_eq!(
            service.validate_access_token(&forged).unwrap_err(),
            TokenError::Invalid
        );
    }

    #[test]
    fn test_malformed_tokens_are_invalid() {
        let service = create_test_service();
        for token in ["", "invalid-token", "invalid.token.here", "a.b", "...."] {
            assert_eq!(
                service.validate_access_token(token).unwrap_err(),
                TokenError::Invalid,
                "token {:?}",
                token
            );
        }
    }

    #[test]
    fn test_keys_can_be_shared() {
        let service = create_test_service();
        let service2 = TokenService::from_keys(service.keys().clone(), service.token_config().clone());
        let user_id = Uuid::new_v4();

        let token = service
            .issue_access_token(user_id, "a@b.com", Role::User)
            .unwrap();
        assert_eq!(service2.validate_access_token(&token).unwrap().sub, user_id);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn prop_access_token_round_trip(
            local in "[a-z0-9]{1,20}",
            admin in any::<bool>(),
        ) {
            let service = create_test_service();
            let user_id = Uuid::new_v4();
            let email = format!("{}@example.com", local);
            let role = if admin { Role::Admin } else { Role::User };

            let token = service.issue_access_token(user_id, &email, role).unwrap();
            let claims = service.validate_access_token(&token).unwrap();

            prop_assert_eq!(claims.sub, user_id);
            prop_assert_eq!(claims.email, email);
            prop_assert_eq!(claims.role, role);
        }
    }
}
