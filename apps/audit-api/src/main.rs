//! Pipeline audit API server.
//!
//! Loads configuration, connects to PostgreSQL, applies migrations and
//! serves the audit routes until SIGINT/SIGTERM.

mod config;
mod logging;

use std::sync::Arc;

use axum::Router;
use config::Config;
use pipeaudit_api::{audit_routes, AuditApiState};
use pipeaudit_db::run_migrations;
use pipeaudit_reconciliation::PgEventStore;
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    logging::init_logging(&config.rust_log);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        host = %config.host,
        port = config.port,
        processing_timeout_minutes = config.reconciliation.processing_timeout_minutes,
        max_failure_rate = config.reconciliation.max_failure_rate,
        "Starting pipeline audit API"
    );

    let pool = match PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(config.db_acquire_timeout)
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => {
            info!("Database connection established");
            pool
        }
        Err(e) => {
            error!(error = %e, "Failed to connect to database");
            std::process::exit(1);
        }
    };

    if config.run_migrations {
        if let Err(e) = run_migrations(&pool).await {
            error!(error = %e, "Database migrations failed");
            std::process::exit(1);
        }
        info!("Database migrations applied");
    }

    let store = Arc::new(PgEventStore::new(pool));
    let state = AuditApiState::new(store, config.reconciliation.clone());

    let app = Router::new()
        .nest("/api/v1/audit", audit_routes(state))
        .layer(TraceLayer::new_for_http());

    let addr = match config.socket_addr() {
        Ok(a) => a,
        Err(e) => {
            error!(bind_addr = %config.bind_addr(), error = %e, "Invalid bind address");
            std::process::exit(1);
        }
    };

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!(%addr, error = %e, "Failed to bind to address");
            std::process::exit(1);
        }
    };

    info!(%addr, "Server listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }

    info!("Server shutdown complete");
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
