//! Storefront Backend
//!
//! Demo e-commerce API: accounts with JWT authentication and a product
//! catalog with admin-only writes.
//!
//! ## Architecture
//!
//! The backend follows a layered architecture:
//! - Routes: HTTP request handling and the auth gatekeeper
//! - Services: Registration, login, refresh, catalog rules
//! - Repositories: In-memory or PostgreSQL stores behind one trait each

use anyhow::Result;
use storefront_backend::{
    auth::{bootstrap_admin, BootstrapOutcome},
    config::{self, AdminCredentials, StorageBackend},
    db, routes,
    state::AppState,
};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_tracing();

    let config = config::AppConfig::load()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        env = if config::AppConfig::is_production() { "production" } else { "development" },
        storage = ?config.storage.backend,
        "Starting Storefront Backend"
    );

    if config::AppConfig::is_production() {
        validate_production_config(&config)?;
    }

    let state = match config.storage.backend {
        StorageBackend::Memory => {
            warn!("Using in-memory storage; data is lost on restart");
            AppState::in_memory(config.clone())
        }
        StorageBackend::Postgres => {
            info!("Connecting to database...");
            let pool = db::create_pool(&config.database).await?;
            db::run_migrations(&pool).await?;
            AppState::postgres(config.clone(), pool)
        }
    };

    // Must finish before the listener is bound
    match bootstrap_admin(state.users(), AdminCredentials::from_env()).await {
        Ok(BootstrapOutcome::Created(id)) => info!(user_id = %id, "Admin bootstrap complete"),
        Ok(_) => {}
        Err(e) => {
            error!(error = %e, "Admin bootstrap failed");
            return Err(e.into());
        }
    }

    let app = routes::create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "Server listening");

    // Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if config::AppConfig::is_production() {
            "storefront_backend=info,tower_http=info".into()
        } else {
            "storefront_backend=debug,tower_http=debug,sqlx=warn".into()
        }
    });

    let subscriber = tracing_subscriber::registry().with(env_filter);

    if config::AppConfig::is_production() {
        // JSON logging for production (better for log aggregation)
        subscriber
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        subscriber
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}

/// Validate configuration for production deployment
fn validate_production_config(config: &config::AppConfig) -> Result<()> {
    if let Err(e) = config.validate_production() {
        error!("Configuration error: {}", e);
        anyhow::bail!("Invalid production configuration");
    }

    if config.storage.backend == StorageBackend::Memory {
        warn!("In-memory storage in production - ensure this is intentional");
    } else if config.database.url.contains("localhost") || config.database.url.contains("127.0.0.1") {
        warn!("Database URL contains localhost - ensure this is intentional for production");
    }

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
