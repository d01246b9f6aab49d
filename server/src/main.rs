use axum::{http::StatusCode, routing::get, Router};
use clap::Parser;
use reading_server::clock::SystemClock;
use reading_server::config::Config;
use reading_server::db::{self, PgReadingStore};
use reading_server::memory::MemoryReadingStore;
use reading_server::store::ReadingStore;
use reading_server::{metrics, rest};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    config.validate()?;

    info!("Starting reading server");
    info!("HTTP server: {}", config.http_addr);
    info!("Recent window: {}s", config.window_secs);

    metrics::init_metrics()?;

    let store: Arc<dyn ReadingStore> = if config.memory {
        warn!("Using in-memory store, readings will not survive a restart");
        Arc::new(MemoryReadingStore::new())
    } else {
        info!("Database: {}", config.database_endpoint());
        let pool = match db::make_pool(
            &config.database_url,
            config.max_connections,
            config.acquire_timeout(),
        )
        .await
        {
            Ok(pool) => pool,
            Err(e) => {
                error!("Failed to connect to database: {}", e);
                std::process::exit(1);
            }
        };
        Arc::new(PgReadingStore::new(pool))
    };

    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .merge(rest::create_router(store, config.window(), Arc::new(SystemClock)));

    let listener = match tokio::net::TcpListener::bind(&config.http_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", config.http_addr, e);
            std::process::exit(1);
        }
    };

    info!("HTTP server listening on {}", config.http_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}

async fn metrics_handler() -> Result<String, StatusCode> {
    metrics::gather_metrics().map_err(|e| {
        error!("Failed to encode metrics: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })
}
