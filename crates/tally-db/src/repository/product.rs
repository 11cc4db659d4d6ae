//! # Product Repository
//!
//! Loads the cost catalogue and stock levels of one company.
//!
//! The catalogue query selects only the cost columns the schema probe
//! found; a missing column is selected as `NULL` so the row shape never
//! changes:
//!
//! ```text
//! SELECT id, name,
//!        p.cost_price_cents     AS cost_price_cents,      -- or NULL
//!        p.cost_cents           AS cost_cents,            -- or NULL
//!        NULL                   AS purchase_price_cents   -- column absent
//! FROM products p WHERE p.company_id = ?
//! ```

use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use tally_core::cost::{CostField, ProductCost};
use tally_core::money::Money;

use crate::error::DbResult;
use crate::schema::SchemaCapabilities;

#[derive(Debug, sqlx::FromRow)]
struct CostRow {
    id: String,
    name: String,
    cost_price_cents: Option<i64>,
    cost_cents: Option<i64>,
    purchase_price_cents: Option<i64>,
}

impl From<CostRow> for ProductCost {
    fn from(row: CostRow) -> Self {
        ProductCost {
            id: row.id,
            name: row.name,
            cost_price: row.cost_price_cents.map(Money::from_cents),
            cost: row.cost_cents.map(Money::from_cents),
            purchase_price: row.purchase_price_cents.map(Money::from_cents),
        }
    }
}

/// On-hand quantity of one product.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct StockLevel {
    pub product_id: String,
    pub quantity: i64,
    pub low_stock_threshold: i64,
}

impl StockLevel {
    pub fn is_low(&self) -> bool {
        self.quantity <= self.low_stock_threshold
    }
}

/// Repository for product reads.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Loads every product of a company with whichever cost columns exist.
    ///
    /// Rows come back in insertion order, which decides the winner when two
    /// products share a name.
    pub async fn cost_catalog(
        &self,
        company_id: &str,
        caps: &SchemaCapabilities,
    ) -> DbResult<Vec<ProductCost>> {
        if !caps.has_table("products") {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT CAST(p.id AS TEXT) AS id, COALESCE(CAST(p.name AS TEXT), '') AS name",
        );
        for field in CostField::PRIORITY {
            let column = field.column();
            let expr = caps.column_or_null("products", "p", column);
            qb.push(format!(", CAST({expr} AS INTEGER) AS {column}"));
        }
        qb.push(" FROM products p WHERE p.company_id = ");
        qb.push_bind(company_id.to_string());
        qb.push(" ORDER BY p.rowid");

        let rows = qb.build_query_as::<CostRow>().fetch_all(&self.pool).await?;

        debug!(
            company_id,
            products = rows.len(),
            cost_columns = caps.cost_fields().len(),
            "Loaded cost catalogue"
        );
        Ok(rows.into_iter().map(ProductCost::from).collect())
    }

    /// Stock levels of a company. Empty when the schema tracks no quantity.
    pub async fn stock_levels(
        &self,
        company_id: &str,
        caps: &SchemaCapabilities,
    ) -> DbResult<Vec<StockLevel>> {
        if !caps.has_column("products", "quantity") {
            return Ok(Vec::new());
        }

        let threshold = caps.column_or_null("products", "p", "low_stock_threshold");
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT CAST(p.id AS TEXT) AS product_id, COALESCE(p.quantity, 0) AS quantity, \
             COALESCE({threshold}, {}) AS low_stock_threshold \
             FROM products p WHERE p.company_id = ",
            crate::DEFAULT_LOW_STOCK_THRESHOLD
        ));
        qb.push_bind(company_id.to_string());
        qb.push(" ORDER BY p.rowid");

        let rows = qb.build_query_as::<StockLevel>().fetch_all(&self.pool).await?;
        Ok(rows)
    }
}

// =============================================================================
// Tests
// =============================================================================
