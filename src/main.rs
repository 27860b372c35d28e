//! eventpass-api server entry point.
//!
//! Loads configuration, selects the PostgreSQL or in-memory store, starts
//! the audit writer and serves the REST API.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

use eventpass_api::api;
use eventpass_api::app_state::AppState;
use eventpass_api::config::AppConfig;
use eventpass_api::domain::{BackupStore, MemoryBackupStore};
use eventpass_api::service::AuditTrail;
use eventpass_api::store::{MemoryStore, PostgresStore, Store};

const AUDIT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = AppConfig::from_env().map_err(|e| anyhow::anyhow!(e))?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    tracing::info!(addr = %config.listen_addr, "starting eventpass-api");

    // Build storage
    let store: Arc<dyn Store> = if config.persistence_enabled {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await
            .context("failed to connect to database")?;
        let store = PostgresStore::new(pool);
        store.migrate().await.context("failed to run migrations")?;
        tracing::info!("using PostgreSQL store");
        Arc::new(store)
    } else {
        tracing::warn!("persistence disabled; data is kept in memory only");
        Arc::new(MemoryStore::new())
    };

    let backups: Arc<dyn BackupStore> = if config.undo_ttl_secs > 0 {
        let secs = i64::try_from(config.undo_ttl_secs).unwrap_or(i64::MAX);
        Arc::new(MemoryBackupStore::with_ttl(chrono::Duration::seconds(secs)))
    } else {
        Arc::new(MemoryBackupStore::new())
    };

    // Build service layer
    let (audit, audit_writer) = AuditTrail::spawn(Arc::clone(&store), config.audit_queue_capacity);
    let app_state = AppState::new(store, backups, audit, &config);

    if let Some(admin) = &config.bootstrap_admin {
        app_state
            .auth
            .bootstrap_admin(admin)
            .await
            .context("failed to create bootstrap admin")?;
    }

    // Build router
    let app = api::build_app(
        app_state,
        Duration::from_secs(config.request_timeout_secs),
    );

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The writer exits once the router's trail clones are dropped.
    match tokio::time::timeout(AUDIT_DRAIN_TIMEOUT, audit_writer).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!(error = %e, "audit writer ended abnormally"),
        Err(_) => tracing::warn!("audit queue not drained before shutdown"),
    }
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
