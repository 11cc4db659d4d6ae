//! # Schema Capabilities
//!
//! One probe per request answers "which optional tables and columns does
//! this database have?". Repositories consult the answer to shape their SQL
//! instead of failing on a missing column.
//!
//! ## Probe
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Schema Probe                                     │
//! │                                                                         │
//! │  SELECT name FROM sqlite_master WHERE type = 'table'                    │
//! │       │                                                                 │
//! │       ▼  for each table we care about                                   │
//! │  SELECT name FROM pragma_table_info(?1)                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SchemaCapabilities                                                     │
//! │  ├── has_table("swap_profit_links")                                     │
//! │  ├── has_column("sales", "is_swap_mode")                                │
//! │  └── cost_fields() → [CostPrice, Cost]   (PurchasePrice column absent)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::SqlitePool;
use std::collections::{HashMap, HashSet};
use tracing::debug;

use tally_core::cost::CostField;

use crate::error::DbResult;

/// Tables whose columns are probed.
const PROBED_TABLES: [&str; 10] = [
    "sales",
    "sale_items",
    "products",
    "swaps",
    "swap_profit_links",
    "repairs",
    "repair_parts",
    "company_modules",
    "scheduled_reports",
    "users",
];

/// What the connected database actually has.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaCapabilities {
    columns: HashMap<String, HashSet<String>>,
}

impl SchemaCapabilities {
    /// Builds capabilities from `(table, [columns])` pairs.
    pub fn from_tables<'a, I, C>(tables: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, C)>,
        C: IntoIterator<Item = &'a str>,
    {
        let columns = tables
            .into_iter()
            .map(|(table, cols)| {
                (
                    table.to_ascii_lowercase(),
                    cols.into_iter().map(str::to_ascii_lowercase).collect(),
                )
            })
            .collect();
        SchemaCapabilities { columns }
    }

    pub fn has_table(&self, table: &str) -> bool {
        self.columns.contains_key(&table.to_ascii_lowercase())
    }

    pub fn has_column(&self, table: &str, column: &str) -> bool {
        self.columns
            .get(&table.to_ascii_lowercase())
            .is_some_and(|cols| cols.contains(&column.to_ascii_lowercase()))
    }

    /// Product cost columns that exist, in resolution order.
    pub fn cost_fields(&self) -> Vec<CostField> {
        CostField::PRIORITY
            .into_iter()
            .filter(|field| self.has_column("products", field.column()))
            .collect()
    }

    /// SQL predicate keeping only pure sales (no swap transactions).
    ///
    /// `alias` is the alias of the `sales` table in the calling query.
    /// Returns `"1 = 1"` when neither marker column exists.
    pub fn pure_sales_predicate(&self, alias: &str) -> String {
        let mut clauses = Vec::with_capacity(2);
        if self.has_column("sales", "is_swap_mode") {
            clauses.push(format!("COALESCE({alias}.is_swap_mode, 0) = 0"));
        }
        if self.has_column("sales", "swap_id") {
            clauses.push(format!("({alias}.swap_id IS NULL OR {alias}.swap_id = '')"));
        }
        if clauses.is_empty() {
            "1 = 1".to_string()
        } else {
            clauses.join(" AND ")
        }
    }

    /// `<alias>.<column>` when the column exists, else `NULL`.
    pub fn column_or_null(&self, table: &str, alias: &str, column: &str) -> String {
        if self.has_column(table, column) {
            format!("{alias}.{column}")
        } else {
            "NULL".to_string()
        }
    }
}

/// Probes the database.
///
/// Tables that are absent simply do not appear in the result; the probe
/// itself only fails when SQLite cannot be queried at all.
pub async fn probe(pool: &SqlitePool) -> DbResult<SchemaCapabilities> {
    let present: Vec<String> =
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table'")
            .fetch_all(pool)
            .await?;
    let present: HashSet<String> = present.into_iter().map(|t| t.to_ascii_lowercase()).collect();

    let mut columns = HashMap::new();
    for table in PROBED_TABLES.iter().filter(|t| present.contains(**t)) {
        let cols: Vec<String> = sqlx::query_scalar("SELECT name FROM pragma_table_info(?1)")
            .bind(*table)
            .fetch_all(pool)
            .await?;
        columns.insert(
            table.to_string(),
            cols.into_iter().map(|c| c.to_ascii_lowercase()).collect::<HashSet<_>>(),
        );
    }

    debug!(tables = columns.len(), "Schema probed");
    Ok(SchemaCapabilities { columns })
}

// =============================================================================
// Unit Tests
// =============================================================================
