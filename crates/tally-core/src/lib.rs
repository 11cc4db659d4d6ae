//! # tally-core: Pure Reporting Logic for Tally
//!
//! This crate holds the profit/loss rules of the analytics engine as pure
//! functions over plain values. It never touches the database.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Dashboard widgets (JSON)                     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ HTTP                                   │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    analytics-api (axum)                         │   │
//! │  │    profit-breakdown, metrics, staff-activity, activity          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────┐          │   │
//! │  │   │  period  │ │   cost   │ │   swap   │ │  report  │          │   │
//! │  │   │ day/week │ │ priority │ │ realized │ │ buckets  │          │   │
//! │  │   │  /month  │ │  chain   │ │  profit  │ │ totals   │          │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────┘          │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tally-db (Database Layer)                    │   │
//! │  │           SQLite pool, schema probe, read-only repositories     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money type with integer arithmetic
//! - [`period`] - Date ranges, ISO weeks, months, bucket windows
//! - [`cost`] - Product cost chain and line-item matching
//! - [`swap`] - Swap profit realization
//! - [`repair`] - Repair totals and technician aggregate
//! - [`report`] - Priced buckets and reconciliation
//! - [`types`] - Roles, modules, request context, report policy
//! - [`validation`] - Query parameter checks
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use tally_core::cost::CostOutcome;
//! use tally_core::money::Money;
//!
//! // No product cost could be resolved for 100.00 of sales
//! let outcome = CostOutcome::with_estimate(Money::zero(), Money::from_cents(10_000), 7_000);
//! assert_eq!(outcome.cost.cents(), 7_000);
//! assert!(outcome.estimated);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cost;
pub mod error;
pub mod money;
pub mod period;
pub mod repair;
pub mod report;
pub mod swap;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use period::{DateRange, PeriodKey};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Share of revenue assumed as cost when nothing resolves (70%).
pub const DEFAULT_ESTIMATED_COST_BPS: u32 = 7_000;

/// Share of repair cost assumed as labour when none is recorded (50%).
pub const DEFAULT_LABOUR_BPS: u32 = 5_000;

/// Length of the default reporting window, in days.
pub const DEFAULT_RANGE_DAYS: u64 = 90;

/// Longest accepted identifier in query parameters.
pub const MAX_IDENTIFIER_LEN: usize = 64;

/// Upper bound for the live activity feed.
pub const MAX_ACTIVITY_LIMIT: i64 = 500;
