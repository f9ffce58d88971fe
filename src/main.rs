use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

use hive_live_backend::api;
use hive_live_backend::config::Config;
use hive_live_backend::storage::SqliteStorage;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!("Starting server on {}", config.server_address());
    match &config.live.jdbc_url {
        Some(_) => info!("Live endpoint configured"),
        None => info!("No live endpoint configured; set HIVESERVER2_JDBC_URL or SET hiveserver2.jdbc.url"),
    }

    // Initialize SQLite metastore
    let storage = Arc::new(SqliteStorage::new(&config.database.url).await.map_err(|e| {
        error!("Failed to initialize metastore: {}", e);
        e
    })?);

    // Create router with state
    let app: Router = api::routes::create_router_with_state(storage, config.clone()).map_err(|e| {
        error!("Failed to build live SQL context: {}", e);
        e
    })?;

    // Start server
    let addr: SocketAddr = config.server_address().parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
