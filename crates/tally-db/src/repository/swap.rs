//! # Swap Repository
//!
//! Reads swaps together with their profit links.
//!
//! ## Realization Timestamp
//! ```text
//! swaps sw
//!   LEFT JOIN swap_profit_links l  ON l.swap_id = sw.id
//!   LEFT JOIN sales rs             ON rs.id = l.customer_item_sale_id
//!
//! realized_at = COALESCE(rs.created_at,     -- when the trade-in was resold
//!                        l.finalized_at,    -- resale row missing
//!                        l.created_at)
//!               only when l.customer_item_sale_id IS NOT NULL
//! ```
//!
//! Link columns other than `swap_id` are probed; a missing one reads as NULL.
//!
//! Without a `swap_profit_links` table every swap reads as unlinked, which
//! means no profit is ever realized.

use chrono::NaiveDateTime;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, warn};

use tally_core::money::Money;
use tally_core::period::BucketWindow;
use tally_core::swap::{LinkStatus, SwapEntry, SwapProfitLink};

use crate::error::DbResult;
use crate::repository::{parse_sql_timestamp, sql_timestamp};
use crate::schema::SchemaCapabilities;

const LINKS: &str = "swap_profit_links";

/// `realized_at` expression over the link columns this database has.
///
/// Only `swap_id` is required of a link table; everything else may be
/// missing on older schemas and reads as NULL.
fn realized_at_expr(caps: &SchemaCapabilities) -> String {
    let resold = caps.column_or_null(LINKS, "l", "customer_item_sale_id");
    let finalized = caps.column_or_null(LINKS, "l", "finalized_at");
    let linked = caps.column_or_null(LINKS, "l", "created_at");
    format!(
        "CASE WHEN {resold} IS NOT NULL AND {resold} <> '' \
         THEN COALESCE(rs.created_at, {finalized}, {linked}) END"
    )
}


#[derive(Debug, sqlx::FromRow)]
struct SwapRow {
    swap_id: String,
    created_at: String,
    total_value_cents: i64,
    has_link: i64,
    link_status: Option<String>,
    profit_estimate_cents: Option<i64>,
    final_profit_cents: Option<i64>,
    customer_item_sale_id: Option<String>,
    realized_at: Option<String>,
}

impl SwapRow {
    fn into_entry(self) -> Option<SwapEntry> {
        let created_at = parse_sql_timestamp(&self.created_at)?;
        let link = (self.has_link != 0).then(|| SwapProfitLink {
            status: LinkStatus::parse(self.link_status.as_deref()),
            profit_estimate: self.profit_estimate_cents.map(Money::from_cents),
            final_profit: self.final_profit_cents.map(Money::from_cents),
            customer_item_sale_id: self.customer_item_sale_id,
            realized_at: self.realized_at.as_deref().and_then(parse_sql_timestamp),
        });
        Some(SwapEntry {
            swap_id: self.swap_id,
            created_at,
            swap_value: Money::from_cents(self.total_value_cents),
            link,
        })
    }
}

/// A recent swap for the activity feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentSwap {
    pub id: String,
    pub status: String,
    pub value: Money,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, sqlx::FromRow)]
struct RecentSwapRow {
    id: String,
    status: String,
    total_value_cents: i64,
    created_at: String,
}

/// Repository for swap reads.
#[derive(Debug, Clone)]
pub struct SwapRepository {
    pool: SqlitePool,
}

impl SwapRepository {
    /// Creates a new SwapRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SwapRepository { pool }
    }

    /// Swaps that were either recorded or realized inside `window`.
    pub async fn entries(
        &self,
        company_id: &str,
        window: &BucketWindow,
        caps: &SchemaCapabilities,
    ) -> DbResult<Vec<SwapEntry>> {
        if !caps.has_table("swaps") {
            return Ok(Vec::new());
        }

        let value = caps.column_or_null("swaps", "sw", "total_value_cents");
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT CAST(sw.id AS TEXT) AS swap_id, CAST(sw.created_at AS TEXT) AS created_at, \
             COALESCE({value}, 0) AS total_value_cents, "
        ));

        let linked = caps.has_table(LINKS) && caps.has_column(LINKS, "swap_id");
        let realized_at = realized_at_expr(caps);
        if linked {
            let status = caps.column_or_null(LINKS, "l", "status");
            let estimate = caps.column_or_null(LINKS, "l", "profit_estimate_cents");
            let final_profit = caps.column_or_null(LINKS, "l", "final_profit_cents");
            let resold = caps.column_or_null(LINKS, "l", "customer_item_sale_id");
            qb.push(format!(
                "(l.swap_id IS NOT NULL) AS has_link, \
                 CAST({status} AS TEXT) AS link_status, \
                 {estimate} AS profit_estimate_cents, {final_profit} AS final_profit_cents, \
                 CAST({resold} AS TEXT) AS customer_item_sale_id, \
                 CAST({realized_at} AS TEXT) AS realized_at \
                 FROM swaps sw \
                 LEFT JOIN swap_profit_links l ON l.swap_id = sw.id \
                 LEFT JOIN sales rs ON rs.id = {resold}"
            ));
        } else {
            qb.push(
                "0 AS has_link, NULL AS link_status, NULL AS profit_estimate_cents, \
                 NULL AS final_profit_cents, NULL AS customer_item_sale_id, NULL AS realized_at \
                 FROM swaps sw",
            );
        }

        let (start, end) = (sql_timestamp(window.start), sql_timestamp(window.end));
        qb.push(" WHERE sw.company_id = ");
        qb.push_bind(company_id.to_string());
        qb.push(" AND ((sw.created_at BETWEEN ");
        qb.push_bind(start.clone());
        qb.push(" AND ");
        qb.push_bind(end.clone());
        qb.push(")");
        if linked {
            qb.push(format!(" OR ({realized_at} BETWEEN "));
            qb.push_bind(start);
            qb.push(" AND ");
            qb.push_bind(end);
            qb.push(")");
        }
        qb.push(") ORDER BY sw.created_at");

        let rows = qb.build_query_as::<SwapRow>().fetch_all(&self.pool).await?;

        let total = rows.len();
        let entries: Vec<SwapEntry> = rows.into_iter().filter_map(SwapRow::into_entry).collect();
        if entries.len() < total {
            warn!(
                company_id,
                skipped = total - entries.len(),
                "Skipped swaps with unreadable timestamps"
            );
        }

        debug!(company_id, swaps = entries.len(), linked, "Loaded swap entries");
        Ok(entries)
    }

    /// Most recent swaps of a company.
    pub async fn recent(
        &self,
        company_id: &str,
        limit: i64,
        caps: &SchemaCapabilities,
    ) -> DbResult<Vec<RecentSwap>> {
        if !caps.has_table("swaps") {
            return Ok(Vec::new());
        }

        let value = caps.column_or_null("swaps", "sw", "total_value_cents");
        let status = caps.column_or_null("swaps", "sw", "status");
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT CAST(sw.id AS TEXT) AS id, COALESCE(CAST({status} AS TEXT), 'pending') AS status, \
             COALESCE({value}, 0) AS total_value_cents, CAST(sw.created_at AS TEXT) AS created_at \
             FROM swaps sw WHERE sw.company_id = "
        ));
        qb.push_bind(company_id.to_string());
        qb.push(" ORDER BY sw.created_at DESC LIMIT ");
        qb.push_bind(limit);

        let rows = qb.build_query_as::<RecentSwapRow>().fetch_all(&self.pool).await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                Some(RecentSwap {
                    created_at: parse_sql_timestamp(&row.created_at)?,
                    id: row.id,
                    status: row.status,
                    value: Money::from_cents(row.total_value_cents),
                })
            })
            .collect())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::NaiveDate;

    fn november() -> BucketWindow {
        BucketWindow::from_dates(
            NaiveDate::from_ymd_opt(2025, 11, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 11, 30).unwrap(),
        )
    }

    async fn seed(db: &Database) {
        for sql in [
            "INSERT INTO swaps (id, company_id, total_value_cents, created_at) VALUES \
             ('sw-1', 'c-1', 30000, '2025-11-02 10:00:00'), \
             ('sw-2', 'c-1', 20000, '2025-11-03 10:00:00'), \
             ('sw-3', 'c-1', 10000, '2025-10-20 10:00:00')",
            "INSERT INTO sales (id, company_id, final_amount_cents, created_at) VALUES \
             ('resale-1', 'c-1', 40000, '2025-11-20 15:00:00'), \
             ('resale-3', 'c-1', 15000, '2025-11-05 09:00:00')",
            "INSERT INTO swap_profit_links (id, swap_id, customer_item_sale_id, profit_estimate_cents, final_profit_cents, status, created_at) VALUES \
             ('l-1', 'sw-1', 'resale-1', 1000, 1500, 'finalized', '2025-11-02 10:00:00'), \
             ('l-2', 'sw-2', NULL, 5000, NULL, 'pending', '2025-11-03 10:00:00'), \
             ('l-3', 'sw-3', 'resale-3', 700, NULL, 'finalized', '2025-10-20 10:00:00')",
        ] {
            sqlx::query(sql).execute(db.pool()).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_entries_use_resale_time() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        seed(&db).await;

        let caps = db.capabilities().await.unwrap();
        let entries = db.swaps().entries("c-1", &november(), &caps).await.unwrap();
        assert_eq!(entries.len(), 3);

        let sw1 = entries.iter().find(|e| e.swap_id == "sw-1").unwrap();
        assert!(sw1.is_realized());
        assert_eq!(sw1.realized_profit().cents(), 1500);
        assert_eq!(sw1.realized_at().to_string(), "2025-11-20 15:00:00");

        let sw2 = entries.iter().find(|e| e.swap_id == "sw-2").unwrap();
        assert!(!sw2.is_realized());
        assert!(sw2.realized_profit().is_zero());

        // recorded in October, pulled in because the resale is in November
        let sw3 = entries.iter().find(|e| e.swap_id == "sw-3").unwrap();
        assert_eq!(sw3.realized_profit().cents(), 700);
    }

    #[tokio::test]
    async fn test_entries_without_link_table() {
        let db = Database::new(DbConfig::in_memory().run_migrations(false))
            .await
            .unwrap();
        sqlx::query("CREATE TABLE swaps (id TEXT PRIMARY KEY, company_id TEXT, created_at TEXT)")
            .execute(db.pool())
            .await
            .unwrap();
        sqlx::query("INSERT INTO swaps VALUES ('sw-1', 'c-1', '2025-11-02 10:00:00')")
            .execute(db.pool())
            .await
            .unwrap();

        let caps = db.capabilities().await.unwrap();
        let entries = db.swaps().entries("c-1", &november(), &caps).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].link.is_none());
        assert!(entries[0].swap_value.is_zero());
    }

    #[tokio::test]
    async fn test_entries_with_legacy_link_table() {
        let db = Database::new(DbConfig::in_memory().run_migrations(false))
            .await
            .unwrap();
        for sql in [
            "CREATE TABLE swaps (id TEXT PRIMARY KEY, company_id TEXT, total_value_cents INTEGER, created_at TEXT)",
            "CREATE TABLE sales (id TEXT PRIMARY KEY, company_id TEXT, final_amount_cents INTEGER, created_at TEXT)",
            "CREATE TABLE swap_profit_links (id TEXT, swap_id TEXT, customer_item_sale_id TEXT, \
             profit_estimate_cents INTEGER, final_profit_cents INTEGER, status TEXT)",
            "INSERT INTO swaps VALUES ('sw-1', 'c-1', 30000, '2025-10-28 10:00:00')",
            "INSERT INTO sales VALUES ('s-resale', 'c-1', 40000, '2025-11-12 11:00:00')",
            "INSERT INTO swap_profit_links VALUES ('l-1', 'sw-1', 's-resale', 1000, 1500, 'finalized')",
        ] {
            sqlx::query(sql).execute(db.pool()).await.unwrap();
        }

        let caps = db.capabilities().await.unwrap();
        let entries = db.swaps().entries("c-1", &november(), &caps).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].is_realized());
        assert_eq!(entries[0].realized_profit().cents(), 1500);
        assert_eq!(entries[0].realized_at().to_string(), "2025-11-12 11:00:00");
    }
}
