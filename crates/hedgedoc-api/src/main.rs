//! hedgedoc-api - HTTP API server for the hedgedoc backend

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};

use hedgedoc_api::{logging, router, AppConfig, AppState, Repositories};
use hedgedoc_core::BackendType;
use hedgedoc_db::{log_pool_metrics, Database, FilesystemBackend, PoolConfig};

/// Interval between connection pool health log lines.
const POOL_METRICS_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let _file_guard = logging::init_tracing("hedgedoc_api=debug,tower_http=debug", "hedgedoc-api.log");

    let config = AppConfig::from_env().context("Invalid configuration")?;

    info!(
        subsystem = "api",
        host = %config.host,
        port = config.port,
        base_url = %config.base_url,
        media_backend = %config.media_backend,
        "Configuration loaded"
    );

    // Connect to database
    let pool_config = PoolConfig::new().max_connections(config.db_max_connections);
    let db = Database::connect_with_config(&config.database_url, pool_config).await?;
    db.migrate().await.context("Failed to run migrations")?;
    info!(subsystem = "api", "Database connected and migrated");

    let backend = match config.media_backend {
        BackendType::Filesystem => {
            let backend =
                FilesystemBackend::new(config.media_upload_path.clone(), config.base_url.clone());
            backend
                .validate()
                .await
                .map_err(|e| anyhow::anyhow!("Media storage is not usable: {}", e))?;
            info!(
                subsystem = "media",
                path = %backend.upload_path().display(),
                "Filesystem media backend ready"
            );
            Arc::new(backend)
        }
    };

    // Periodic pool health logging
    let metrics_pool = db.pool().clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(POOL_METRICS_INTERVAL);
        loop {
            interval.tick().await;
            log_pool_metrics(&metrics_pool);
        }
    });

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let state = AppState::new(config, Repositories::from_database(&db), backend);
    let app = router(state);

    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
