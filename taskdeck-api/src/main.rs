//! # Taskdeck API Server
//!
//! REST API and WebSocket live channel for the Taskdeck task manager.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/taskdeck JWT_SECRET=$(openssl rand -hex 32) \
//!     cargo run -p taskdeck-api
//! ```
//!
//! Setting `DATABASE_URL=memory` runs against the in-memory store instead
//! (data is lost on exit).

use std::sync::Arc;

use anyhow::Context;
use sqlx::PgPool;
use taskdeck_api::{
    app::{build_router, AppState},
    config::Config,
};
use taskdeck_shared::{
    db::{
        migrations::run_migrations,
        pool::{close_pool, create_pool, DatabaseConfig},
    },
    store::{MemoryStore, PgStore, Store},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const IN_MEMORY_URL: &str = "memory";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskdeck_api=debug,taskdeck_shared=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Taskdeck API Server v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env().context("Failed to load configuration")?;

    let (store, pool): (Arc<dyn Store>, Option<PgPool>) = if config.database.url == IN_MEMORY_URL {
        tracing::warn!("Using in-memory store; data will not persist");
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        (store, None)
    } else {
        let pool = create_pool(DatabaseConfig {
            url: config.database.url.clone(),
            max_connections: config.database.max_connections,
            ..Default::default()
        })
        .await
        .context("Failed to connect to database")?;

        run_migrations(&pool).await.context("Failed to run migrations")?;
        let store: Arc<dyn Store> = Arc::new(PgStore::new(pool.clone()));
        (store, Some(pool))
    };

    let bind_address = config.bind_address();
    let app = build_router(AppState::new(store, config));

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if let Some(pool) = pool {
        close_pool(pool).await;
    }
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
