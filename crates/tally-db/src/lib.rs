//! # tally-db: Database Layer for Tally
//!
//! Read-only SQLite access for the analytics engine, built on sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally Data Flow                                  │
//! │                                                                         │
//! │  HTTP handler (profit-breakdown)                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     tally-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐  ┌───────────────┐  ┌───────────────┐      │   │
//! │  │   │   Database    │  │ Schema probe  │  │  Repositories │      │   │
//! │  │   │   (pool.rs)   │  │ (schema.rs)   │  │  sales, swap, │      │   │
//! │  │   │  SqlitePool   │  │ tables and    │◄─│  repair, ...  │      │   │
//! │  │   │               │  │ columns       │  │               │      │   │
//! │  │   └───────────────┘  └───────────────┘  └───────────────┘      │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   (reference schema in migrations/sqlite, or a legacy tenant)  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`schema`] - Optional table/column probing
//! - [`error`] - Database error types
//! - [`repository`] - Read-only repositories
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_db::{Database, DbConfig, SalesScope};
//!
//! let db = Database::new(DbConfig::new("./tally.db")).await?;
//! let caps = db.capabilities().await?;
//! let days = db.sales().daily_totals(&scope, &caps).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod schema;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::SalesScope;
pub use schema::SchemaCapabilities;

// Repository re-exports for convenience
pub use repository::module::ModuleRepository;
pub use repository::product::{ProductRepository, StockLevel};
pub use repository::repair::{RecentRepair, RepairPartRow, RepairRepository};
pub use repository::report_schedule::{ReportScheduleRepository, ScheduledReportStatus};
pub use repository::sales::{RecentSale, SalesRepository, StaffSalesRow};
pub use repository::swap::{RecentSwap, SwapRepository};
pub use repository::user::UserRepository;

/// Low-stock threshold for schemas without a per-product column.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 5;
