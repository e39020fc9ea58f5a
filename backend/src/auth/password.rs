//! Password hashing using argon2
//!
//! Digests are PHC strings, so the salt and cost parameters travel with the
//! hash and verification needs nothing but the stored string.
//!
//! # Performance Considerations
//!
//! The work factor is tuned to roughly 100ms per operation on commodity
//! hardware. Async callers must go through `hash_async` / `verify_async` so
//! the cost lands on the blocking pool instead of a runtime worker.

use anyhow::Result;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

/// Memory cost in KiB
const MEMORY_COST_KIB: u32 = 19 * 1024;
/// Number of passes over memory
const TIME_COST: u32 = 3;
const PARALLELISM: u32 = 1;

/// Password hashing service
///
/// Uses Argon2id which is the recommended variant for password hashing.
pub struct PasswordService;

impl PasswordService {
    fn hasher() -> Result<Argon2<'static>> {
        let params = Params::new(MEMORY_COST_KIB, TIME_COST, PARALLELISM, None)
            .map_err(|e| anyhow::anyhow!("Invalid argon2 parameters: {}", e))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    /// Hash a password (blocking operation)
    pub fn hash(password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Self::hasher()?
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?;
        Ok(hash.to_string())
    }

    /// Hash a password on the blocking thread pool
    pub async fn hash_async(password: String) -> Result<String> {
        tokio::task::spawn_blocking(move || Self::hash(&password))
            .await
            .map_err(|e| anyhow::anyhow!("Task join error: {}", e))?
    }

    /// Verify a password against a stored digest (blocking operation)
    ///
    /// Parameters are read from the digest itself, so hashes produced under
    /// older cost settings keep verifying. A digest that cannot be parsed is
    /// an error, not a mismatch.
    pub fn verify(password: &str, hash: &str) -> Result<bool> {
        let parsed_hash =
            PasswordHash::new(hash).map_err(|e| anyhow::anyhow!("Invalid hash format: {}", e))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Verify a password on the blocking thread pool
    pub async fn verify_async(password: String, hash: String) -> Result<bool> {
        tokio::task::spawn_blocking(move || Self::verify(&password, &hash))
            .await
            .map_err(|e| anyhow::anyhow!("Task join error: {}", e))?
    }
}
