//! Application state management
//!
//! Shared state handed to every handler through Axum's state extraction.
//! Keys, stores and services are built once at startup; cloning the state
//! only bumps reference counts.

use crate::auth::TokenService;
use crate::config::AppConfig;
use crate::rate_limit::{NoopRateLimiter, RateLimiter, TokenBucketLimiter};
use crate::repositories::{
    InMemoryProductRepository, InMemoryUserRepository, PgProductRepository, PgUserRepository,
    ProductRepository, UserRepository,
};
use crate::services::{AuthService, ProductService};
use sqlx::PgPool;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Pre-initialized token service with cached keys
    pub jwt: TokenService,
    pub users: Arc<dyn UserRepository>,
    pub auth: AuthService,
    pub products: ProductService,
    /// Shared by every request routed through this state
    pub rate_limiter: Arc<dyn RateLimiter>,
    /// Present only with the PostgreSQL backend
    pub db: Option<PgPool>,
}

impl AppState {
    /// Wire services over the given stores
    ///
    /// Derives the signing keys from the config secret; call once at startup.
    pub fn new(
        config: AppConfig,
        users: Arc<dyn UserRepository>,
        products: Arc<dyn ProductRepository>,
        db: Option<PgPool>,
    ) -> Self {
        let jwt = TokenService::new(
            &config.jwt.secret,
            config.jwt.access_token_expiry_secs,
            config.jwt.refresh_token_expiry_secs,
            config.jwt.issuer.clone(),
        );

        let rate_limiter: Arc<dyn RateLimiter> = match config.http.requests_per_minute {
            0 => Arc::new(NoopRateLimiter),
            limit => Arc::new(TokenBucketLimiter::per_minute(limit)),
        };

        Self {
            auth: AuthService::new(users.clone(), jwt.clone()),
            rate_limiter,
            products: ProductService::new(products),
            config: Arc::new(config),
            jwt,
            users,
            db,
        }
    }

    /// State backed by the in-memory stores
    pub fn in_memory(config: AppConfig) -> Self {
        Self::new(
            config,
            Arc::new(InMemoryUserRepository::new()),
            Arc::new(InMemoryProductRepository::new()),
            None,
        )
    }

    /// State backed by PostgreSQL
    pub fn postgres(config: AppConfig, pool: PgPool) -> Self {
        Self::new(
            config,
            Arc::new(PgUserRepository::new(pool.clone())),
            Arc::new(PgProductRepository::new(pool.clone())),
            Some(pool),
        )
    }

    #[inline]
    pub fn db(&self) -> Option<&PgPool> {
        self.db.as_ref()
    }

    #[inline]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[inline]
    pub fn jwt(&self) -> &TokenService {
        &self.jwt
    }

    #[inline]
    pub fn users(&self) -> &dyn UserRepository {
        self.users.as_ref()
    }
}
