//! Initial administrator provisioning
//!
//! Runs once at startup, before the listener is bound.

use crate::config::AdminCredentials;
use crate::error::{Resource, ServiceError};
use crate::repositories::UserRepository;
use secrecy::ExposeSecret;
use storefront_shared::{Role, User};
use tracing::{info, warn};
use uuid::Uuid;

use super::PasswordService;

pub const ADMIN_PASSWORD_MIN_LEN: usize = 12;
pub const DEFAULT_ADMIN_NAME: &str = "System Administrator";

/// What the bootstrap run did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// An admin account already existed
    AdminExists,
    /// No credentials were supplied
    Skipped,
    Created(Uuid),
}

/// Ensure an admin account exists when credentials are supplied
///
/// Credentials are taken by value so the password is dropped (and zeroized)
/// when this returns. A password shorter than twelve characters is a
/// `Configuration` error and nothing is written.
pub async fn bootstrap_admin(
    users: &dyn UserRepository,
    credentials: Option<AdminCredentials>,
) -> Result<BootstrapOutcome, ServiceError> {
    if users
        .has_admin()
        .await
        .map_err(ServiceError::from_store(Resource::User))?
    {
        info!("Admin account already present, skipping bootstrap");
        return Ok(BootstrapOutcome::AdminExists);
    }

    let Some(credentials) = credentials else {
        warn!("ADMIN_EMAIL/ADMIN_PASSWORD not set, no admin account created");
        return Ok(BootstrapOutcome::Skipped);
    };

    let password = credentials.password.expose_secret();
    if password.chars().count() < ADMIN_PASSWORD_MIN_LEN {
        return Err(ServiceError::Configuration(format!(
            "admin password must be at least {} characters",
            ADMIN_PASSWORD_MIN_LEN
        )));
    }

    let password_hash = PasswordService::hash_async(password.to_owned())
        .await
        .map_err(ServiceError::Internal)?;

    let name = credentials
        .name
        .unwrap_or_else(|| DEFAULT_ADMIN_NAME.to_string());
    let admin = User::new(credentials.email, password_hash, name, Role::Admin);

    users
        .create(&admin)
        .await
        .map_err(ServiceError::from_store(Resource::User))?;

    info!(user_id = %admin.id, email = %admin.email, "Admin account created");
    Ok(BootstrapOutcome::Created(admin.id))
}
