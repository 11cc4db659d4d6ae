//! # Repository Module
//!
//! Read-only repositories over the tenant schema.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Analytics service                                                     │
//! │       │                                                                 │
//! │       │  db.sales().daily_totals(&scope, &caps)                        │
//! │       ▼                                                                 │
//! │  SalesRepository                                                       │
//! │  ├── builds SQL for the columns `caps` says exist                      │
//! │  ├── binds every value (never interpolates input)                      │
//! │  └── maps rows into tally-core types (RawPeriodTotals, SoldLine...)   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Repositories return plain values; every profit rule lives in         │
//! │  tally-core.                                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`SalesRepository`](sales::SalesRepository) - Per-period totals, sold lines, staff totals
//! - [`ProductRepository`](product::ProductRepository) - Cost catalogue, stock levels
//! - [`SwapRepository`](swap::SwapRepository) - Swaps joined with profit links
//! - [`RepairRepository`](repair::RepairRepository) - Repairs and fitted parts
//! - [`ModuleRepository`](module::ModuleRepository) - Per-company feature flags
//! - [`ReportScheduleRepository`](report_schedule::ReportScheduleRepository) - Scheduled report status
//! - [`UserRepository`](user::UserRepository) - Staff display names

use chrono::{NaiveDate, NaiveDateTime};
use sqlx::{QueryBuilder, Sqlite};
use tally_core::period::{start_of_day, BucketWindow};

pub mod module;
pub mod product;
pub mod repair;
pub mod report_schedule;
pub mod sales;
pub mod swap;
pub mod user;

/// Storage format of every timestamp column.
pub const SQL_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Formats a timestamp for binding against TEXT columns.
pub fn sql_timestamp(at: NaiveDateTime) -> String {
    at.format(SQL_TIMESTAMP_FORMAT).to_string()
}

/// Parses a stored timestamp, tolerating the shapes legacy rows carry
/// (`T` separator, fractional seconds, bare dates).
pub fn parse_sql_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ]
    .iter()
    .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    .or_else(|| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().map(start_of_day))
}

/// Which sales a query covers: one company, one window, maybe one cashier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalesScope {
    pub company_id: String,
    pub window: BucketWindow,
    pub staff_id: Option<String>,
}

impl SalesScope {
    pub fn new(company_id: impl Into<String>, window: BucketWindow, staff_id: Option<String>) -> Self {
        SalesScope {
            company_id: company_id.into(),
            window,
            staff_id,
        }
    }

    /// Same scope over a different window.
    pub fn with_window(&self, window: BucketWindow) -> Self {
        SalesScope {
            window,
            ..self.clone()
        }
    }
}

/// Appends `<alias>.created_at BETWEEN ? AND ?`.
pub(crate) fn push_window(qb: &mut QueryBuilder<'_, Sqlite>, alias: &str, window: &BucketWindow) {
    qb.push(format!(" {alias}.created_at BETWEEN "));
    qb.push_bind(sql_timestamp(window.start));
    qb.push(" AND ");
    qb.push_bind(sql_timestamp(window.end));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sql_timestamp_shapes() {
        let expected = NaiveDate::from_ymd_opt(2025, 11, 5)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();
        assert_eq!(parse_sql_timestamp("2025-11-05 14:30:00"), Some(expected));
        assert_eq!(parse_sql_timestamp("2025-11-05T14:30:00"), Some(expected));
        assert_eq!(parse_sql_timestamp("2025-11-05 14:30:00.000"), Some(expected));
        assert_eq!(
            parse_sql_timestamp("2025-11-05").map(|t| t.date()),
            Some(expected.date())
        );
        assert_eq!(parse_sql_timestamp("yesterday"), None);
    }

    #[test]
    fn test_sql_timestamp_format() {
        let at = NaiveDate::from_ymd_opt(2025, 1, 2)
            .unwrap()
            .and_hms_opt(23, 59, 59)
            .unwrap();
        assert_eq!(sql_timestamp(at), "2025-01-02 23:59:59");
    }
}
