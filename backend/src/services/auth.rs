//! Registration, login, profile and token refresh
//!
//! # Performance
//!
//! Password hashing/verification runs on the blocking thread pool and token
//! signing uses the pre-computed keys held by `TokenService`.

use crate::auth::{PasswordService, TokenService};
use crate::error::{Resource, ServiceError};
use crate::repositories::{RepositoryError, UserRepository};
use chrono::Utc;
use std::sync::Arc;
use storefront_shared::validation::ValidateRequest;
use storefront_shared::{
    AuthResponse, LoginRequest, RefreshTokenRequest, RegisterRequest, Role, UpdateProfileRequest,
    User,
};
use tokio::sync::OnceCell;
use tracing::{debug, info};
use uuid::Uuid;

/// Verified on the unknown-email login path so both failure paths pay the
/// same hashing cost.
const DUMMY_PASSWORD: &str = "storefront-timing-equalizer";

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    tokens: TokenService,
    dummy_hash: Arc<OnceCell<String>>,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepository>, tokens: TokenService) -> Self {
        Self {
            users,
            tokens,
            dummy_hash: Arc::new(OnceCell::new()),
        }
    }

    /// Create a `user`-role account
    ///
    /// The email pre-check and a store-level duplicate from a racing request
    /// both surface as `DuplicateIdentity`.
    pub async fn register(&self, request: RegisterRequest) -> Result<User, ServiceError> {
        request.validate().map_err(ServiceError::Validation)?;

        match self.users.find_by_email(&request.email).await {
            Ok(_) => return Err(ServiceError::DuplicateIdentity),
            Err(RepositoryError::NotFound) => {}
            Err(e) => return Err(ServiceError::from_store(Resource::User)(e)),
        }

        let password_hash = PasswordService::hash_async(request.password)
            .await
            .map_err(ServiceError::Internal)?;

        let user = User::new(request.email, password_hash, request.name, Role::User);
        self.users
            .create(&user)
            .await
            .map_err(ServiceError::from_store(Resource::User))?;

        info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Exchange credentials for a token pair
    ///
    /// Unknown email and wrong password are the same `InvalidCredentials`.
    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse, ServiceError> {
        request.validate().map_err(ServiceError::Validation)?;

        let user = match self.users.find_by_email(&request.email).await {
            Ok(user) => user,
            Err(RepositoryError::NotFound) => {
                self.burn_verification(request.password).await?;
                debug!("Login for unknown email");
                return Err(ServiceError::InvalidCredentials);
            }
            Err(e) => return Err(ServiceError::from_store(Resource::User)(e)),
        };

        let valid = PasswordService::verify_async(request.password, user.password_hash.clone())
            .await
            .map_err(ServiceError::Internal)?;

        if !valid {
            debug!(user_id = %user.id, "Login with wrong password");
            return Err(ServiceError::InvalidCredentials);
        }

        self.issue_pair(user)
    }

    pub async fn get_profile(&self, user_id: Uuid) -> Result<User, ServiceError> {
        self.users
            .find_by_id(user_id)
            .await
            .map_err(ServiceError::from_store(Resource::User))
    }

    /// Replace the display name
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        request: UpdateProfileRequest,
    ) -> Result<User, ServiceError> {
        request.validate().map_err(ServiceError::Validation)?;

        let mut user = self.get_profile(user_id).await?;
        user.name = request.name;
        user.updated_at = Utc::now();

        self.users
            .update(&user)
            .await
            .map_err(ServiceError::from_store(Resource::User))?;

        Ok(user)
    }

    /// Mint a fresh pair from a refresh token
    ///
    /// Every token failure, expiry included, is `InvalidToken`. Role and email
    /// are re-read from the store. The presented token stays valid until it
    /// expires since nothing is tracked server-side.
    pub async fn refresh(&self, request: RefreshTokenRequest) -> Result<AuthResponse, ServiceError> {
        request.validate().map_err(ServiceError::Validation)?;

        let user_id = self
            .tokens
            .validate_refresh_token(&request.refresh_token)
            .map_err(|e| {
                debug!(error = %e, "Rejected refresh token");
                ServiceError::InvalidToken
            })?;

        let user = self.get_profile(user_id).await?;
        self.issue_pair(user)
    }

    fn issue_pair(&self, user: User) -> Result<AuthResponse, ServiceError> {
        let access_token = self
            .tokens
            .issue_access_token(user.id, &user.email, user.role)
            .map_err(ServiceError::Internal)?;
        let refresh_token = self
            .tokens
            .issue_refresh_token(user.id)
            .map_err(ServiceError::Internal)?;

        Ok(AuthResponse {
            access_token,
            refresh_token,
            expires_in: self.tokens.access_token_expiry_secs(),
            user,
        })
    }

    async fn burn_verification(&self, password: String) -> Result<(), ServiceError> {
        let hash = self
            .dummy_hash
            .get_or_try_init(|| PasswordService::hash_async(DUMMY_PASSWORD.to_string()))
            .await
            .map_err(ServiceError::Internal)?;

        PasswordService::verify_async(password, hash.clone())
            .await
            .map_err(ServiceError::Internal)?;
        Ok(())
    }
}
