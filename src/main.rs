//! Lending Library Server
//!
//! REST API server for a lending library's inventory and checkouts.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lending_library_server::{
    api,
    config::{AppConfig, LoggingConfig, StorageKind},
    repository::PgStore,
    AppState, LendingLibrary,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    init_tracing(&config.logging);

    tracing::info!("Starting Lending Library Server v{}", env!("CARGO_PKG_VERSION"));

    let library = match config.storage.backend {
        StorageKind::Memory => {
            tracing::info!("Using in-memory storage");
            LendingLibrary::in_memory(&config.library)
        }
        StorageKind::Postgres => {
            let pool = PgPoolOptions::new()
                .max_connections(config.storage.max_connections)
                .min_connections(config.storage.min_connections)
                .connect(&config.storage.url)
                .await
                .context("Failed to connect to database")?;

            tracing::info!("Connected to database");

            let store = PgStore::new(pool);
            store.migrate().await.context("Failed to run database migrations")?;

            tracing::info!("Database migrations completed");

            LendingLibrary::new(Arc::new(store), &config.library)
        }
    };

    let addr = SocketAddr::new(
        config.server.host.parse().context("Invalid host address")?,
        config.server.port,
    );

    let state = AppState {
        library: Arc::new(library),
    };

    let app = api::router(state);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("lending_library_server={},tower_http=debug", logging.level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
