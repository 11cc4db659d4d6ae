//! # Repair Repository
//!
//! Reads repairs and the parts fitted to them. Labour cost is read only
//! when the column exists; otherwise it arrives as `None` and the default
//! labour share applies.

use chrono::NaiveDateTime;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use tally_core::money::Money;
use tally_core::period::BucketWindow;
use tally_core::repair::RepairRecord;

use crate::error::DbResult;
use crate::repository::{parse_sql_timestamp, push_window};
use crate::schema::SchemaCapabilities;

#[derive(Debug, sqlx::FromRow)]
struct RepairRow {
    id: String,
    technician_id: Option<String>,
    status: String,
    repair_cost_cents: i64,
    labour_cost_cents: Option<i64>,
}

impl From<RepairRow> for RepairRecord {
    fn from(row: RepairRow) -> Self {
        RepairRecord {
            id: row.id,
            technician_id: row.technician_id,
            status: row.status,
            repair_cost: Money::from_cents(row.repair_cost_cents),
            labour_cost: row.labour_cost_cents.map(Money::from_cents),
        }
    }
}

/// A fitted part before its unit cost is resolved against the catalogue.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct RepairPartRow {
    pub repair_id: String,
    pub product_id: Option<String>,
    pub price_cents: i64,
    pub quantity: i64,
}

/// A recent repair for the activity feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentRepair {
    pub id: String,
    pub technician_id: Option<String>,
    pub status: String,
    pub amount: Money,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, sqlx::FromRow)]
struct RecentRepairRow {
    id: String,
    technician_id: Option<String>,
    status: String,
    repair_cost_cents: i64,
    created_at: String,
}

/// Repository for repair reads.
#[derive(Debug, Clone)]
pub struct RepairRepository {
    pool: SqlitePool,
}

impl RepairRepository {
    /// Creates a new RepairRepository.
    pub fn new(pool: SqlitePool) -> Self {
        RepairRepository { pool }
    }

    fn select_columns(caps: &SchemaCapabilities) -> String {
        let technician = caps.column_or_null("repairs", "r", "technician_id");
        let status = caps.column_or_null("repairs", "r", "status");
        let cost = caps.column_or_null("repairs", "r", "repair_cost_cents");
        format!(
            "CAST(r.id AS TEXT) AS id, CAST({technician} AS TEXT) AS technician_id, \
             COALESCE(CAST({status} AS TEXT), '') AS status, \
             COALESCE({cost}, 0) AS repair_cost_cents"
        )
    }

    /// Repairs of a company recorded inside `window`.
    pub async fn in_window(
        &self,
        company_id: &str,
        window: &BucketWindow,
        caps: &SchemaCapabilities,
    ) -> DbResult<Vec<RepairRecord>> {
        if !caps.has_table("repairs") {
            return Ok(Vec::new());
        }

        let labour = caps.column_or_null("repairs", "r", "labour_cost_cents");
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {}, CAST({labour} AS INTEGER) AS labour_cost_cents FROM repairs r WHERE r.company_id = ",
            Self::select_columns(caps)
        ));
        qb.push_bind(company_id.to_string());
        qb.push(" AND");
        push_window(&mut qb, "r", window);
        qb.push(" ORDER BY r.created_at");

        let rows = qb.build_query_as::<RepairRow>().fetch_all(&self.pool).await?;
        debug!(company_id, repairs = rows.len(), "Loaded repairs");
        Ok(rows.into_iter().map(RepairRecord::from).collect())
    }

    /// Parts fitted to the company's repairs recorded inside `window`.
    pub async fn parts_in_window(
        &self,
        company_id: &str,
        window: &BucketWindow,
        caps: &SchemaCapabilities,
    ) -> DbResult<Vec<RepairPartRow>> {
        if !caps.has_table("repair_parts") || !caps.has_table("repairs") {
            return Ok(Vec::new());
        }

        let product = caps.column_or_null("repair_parts", "rp", "product_id");
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT CAST(rp.repair_id AS TEXT) AS repair_id, CAST({product} AS TEXT) AS product_id, \
             COALESCE(rp.price_cents, 0) AS price_cents, COALESCE(rp.quantity, 1) AS quantity \
             FROM repair_parts rp JOIN repairs r ON r.id = rp.repair_id WHERE r.company_id = "
        ));
        qb.push_bind(company_id.to_string());
        qb.push(" AND");
        push_window(&mut qb, "r", window);

        let rows = qb.build_query_as::<RepairPartRow>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    /// Most recent repairs of a company.
    pub async fn recent(
        &self,
        company_id: &str,
        limit: i64,
        caps: &SchemaCapabilities,
    ) -> DbResult<Vec<RecentRepair>> {
        if !caps.has_table("repairs") {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {}, CAST(r.created_at AS TEXT) AS created_at FROM repairs r WHERE r.company_id = ",
            Self::select_columns(caps)
        ));
        qb.push_bind(company_id.to_string());
        qb.push(" ORDER BY r.created_at DESC LIMIT ");
        qb.push_bind(limit);

        let rows = qb.build_query_as::<RecentRepairRow>().fetch_all(&self.pool).await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                Some(RecentRepair {
                    created_at: parse_sql_timestamp(&row.created_at)?,
                    id: row.id,
                    technician_id: row.technician_id,
                    status: row.status,
                    amount: Money::from_cents(row.repair_cost_cents),
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

    #[tokio::test]
    async fn test_repairs_and_parts() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        for sql in [
            "INSERT INTO repairs (id, company_id, technician_id, repair_cost_cents, labour_cost_cents, status, created_at) VALUES \
             ('r-1', 'c-1', 't-1', 10000, NULL, 'completed', '2025-11-04 10:00:00'), \
             ('r-2', 'c-1', 't-2', 20000, 5000, 'pending', '2025-11-05 10:00:00'), \
             ('r-3', 'c-1', 't-1', 99900, NULL, 'completed', '2025-12-01 10:00:00')",
            "INSERT INTO repair_parts (id, repair_id, product_id, price_cents, quantity) VALUES \
             ('rp-1', 'r-1', 'p-1', 3000, 2), ('rp-3', 'r-3', 'p-1', 3000, 1)",
        ] {
            sqlx::query(sql).execute(db.pool()).await.unwrap();
        }

        let caps = db.capabilities().await.unwrap();
        let repairs = db.repairs().in_window("c-1", &november(), &caps).await.unwrap();
        assert_eq!(repairs.len(), 2);
        assert!(repairs[0].labour_cost.is_none());
        assert_eq!(repairs[1].labour_cost.map(|m| m.cents()), Some(5000));

        let parts = db.repairs().parts_in_window("c-1", &november(), &caps).await.unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].repair_id, "r-1");
        assert_eq!(parts[0].quantity, 2);
    }

    #[tokio::test]
    async fn test_legacy_repairs_without_labour_or_parts() {
        let db = Database::new(DbConfig::in_memory().run_migrations(false))
            .await
            .unwrap();
        sqlx::query("CREATE TABLE repairs (id TEXT PRIMARY KEY, company_id TEXT, technician_id TEXT, repair_cost_cents INTEGER, status TEXT, created_at TEXT)")
            .execute(db.pool())
            .await
            .unwrap();
        sqlx::query("INSERT INTO repairs VALUES ('r-1', 'c-1', 't-1', 8000, 'completed', '2025-11-04 10:00:00')")
            .execute(db.pool())
            .await
            .unwrap();

        let caps = db.capabilities().await.unwrap();
        let repairs = db.repairs().in_window("c-1", &november(), &caps).await.unwrap();
        assert_eq!(repairs.len(), 1);
        assert!(repairs[0].labour_cost.is_none());
        assert!(db.repairs().parts_in_window("c-1", &november(), &caps).await.unwrap().is_empty());
    }
}
