//! # Tally Analytics API
//!
//! HTTP server for the dashboard's profit/loss widgets.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Analytics API                                    │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐│
//! │  │  Handlers      │  │  Services      │  │  Infrastructure            ││
//! │  │                │  │                │  │                            ││
//! │  │ • profit-      │  │ • CostResolver │  │ • tally-db (SQLite pool,   ││
//! │  │   breakdown    │─►│ • Bucketizer   │─►│   schema probe)            ││
//! │  │ • metrics      │  │ • Reconciler   │  │ • JWT validation           ││
//! │  │ • staff-       │  │ • metrics      │  │ • TraceLayer               ││
//! │  │   activity     │  │ • staff        │  │                            ││
//! │  │ • activity     │  │ • activity     │  │                            ││
//! │  │ • health       │  │                │  │                            ││
//! │  └────────────────┘  └────────────────┘  └────────────────────────────┘│
//! │                                                                         │
//! │  Stateless: every request re-probes the schema and recomputes.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables:
//! - `HTTP_PORT` - listener port (default: 8080)
//! - `BIND_ADDR` - listener address (default: 0.0.0.0)
//! - `TALLY_DB_PATH` - SQLite file (default: ./tally.db)
//! - `DB_MAX_CONNECTIONS` - pool size (default: 5)
//! - `JWT_SECRET` - secret for validating dashboard tokens
//! - `ANALYTICS_DEFAULT_RANGE_DAYS` - default window (default: 90)
//! - `ANALYTICS_ESTIMATED_COST_BPS` - estimated cost share (default: 7000)
//! - `ANALYTICS_DEFAULT_LABOUR_BPS` - default labour share (default: 5000)
//! - `ANALYTICS_ACTIVITY_LIMIT` - activity feed size (default: 50)

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod services;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use tally_db::Database;

// Re-exports
pub use auth::JwtManager;
pub use config::AppConfig;
pub use error::{ApiError, ApiResult};

/// Lifetime of tokens this server signs itself (tests, local tooling).
pub const TOKEN_LIFETIME_SECS: i64 = 3600;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub jwt: Arc<JwtManager>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(db: Database, config: AppConfig) -> Self {
        AppState {
            db,
            jwt: Arc::new(JwtManager::new(config.jwt_secret.clone(), TOKEN_LIFETIME_SECS)),
            config: Arc::new(config),
        }
    }
}

/// Builds the HTTP router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route(
            "/analytics/profit-breakdown",
            get(handlers::analytics::profit_breakdown),
        )
        .route("/analytics/metrics", get(handlers::analytics::metrics))
        .route(
            "/analytics/staff-activity",
            get(handlers::analytics::staff_activity),
        )
        .route("/analytics/activity", get(handlers::analytics::activity))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
