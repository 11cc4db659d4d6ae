//! # Tally Analytics API
//!
//! HTTP server for the dashboard's profit/loss reports.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Analytics API Server                             │
//! │                                                                         │
//! │  Dashboard ───► HTTP (8080) ───► Services ───► SQLite (read-only)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use analytics_api::{build_router, AppConfig, AppState};
use tally_db::{Database, DbConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tally=debug,analytics_api=debug,sqlx=warn")),
        )
        .with_target(true)
        .init();

    info!("Starting Tally Analytics API server...");

    // Load configuration
    let config = AppConfig::load().context("invalid configuration")?;
    info!(
        port = config.http_port,
        db_path = %config.database_path,
        default_range_days = config.policy.default_range_days,
        "Configuration loaded"
    );

    // Open database. The engine only reads: schema is owned by the platform
    // (or the seed tool), never migrated from here.
    let db = Database::new(
        DbConfig::new(&config.database_path)
            .max_connections(config.db_max_connections)
            .run_migrations(false),
    )
    .await
    .context("failed to open database")?;
    info!("Database ready");

    let addr = config.listen_addr();
    let app = build_router(AppState::new(db.clone(), config));

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
