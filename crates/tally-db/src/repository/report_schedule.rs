//! # Scheduled Report Repository
//!
//! Status of the company's scheduled reports for the metrics page. The
//! table is optional.

use serde::Serialize;
use sqlx::SqlitePool;

use crate::error::DbResult;
use crate::repository::parse_sql_timestamp;
use crate::schema::SchemaCapabilities;

/// Summary of a company's scheduled reports.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ScheduledReportStatus {
    pub total: i64,
    pub active: i64,
    /// Earliest upcoming run among active reports.
    pub next_run_at: Option<String>,
    /// Latest completed run.
    pub last_run_at: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct StatusRow {
    total: i64,
    active: i64,
    next_run_at: Option<String>,
    last_run_at: Option<String>,
}

/// Repository for `scheduled_reports`.
#[derive(Debug, Clone)]
pub struct ReportScheduleRepository {
    pool: SqlitePool,
}

impl ReportScheduleRepository {
    /// Creates a new ReportScheduleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReportScheduleRepository { pool }
    }

    /// `None` when the database has no `scheduled_reports` table.
    pub async fn status(
        &self,
        company_id: &str,
        caps: &SchemaCapabilities,
    ) -> DbResult<Option<ScheduledReportStatus>> {
        if !caps.has_table("scheduled_reports") {
            return Ok(None);
        }

        let row: StatusRow = sqlx::query_as(
            "SELECT COUNT(*) AS total, \
                    COALESCE(SUM(CASE WHEN is_active = 1 THEN 1 ELSE 0 END), 0) AS active, \
                    MIN(CASE WHEN is_active = 1 THEN next_run_at END) AS next_run_at, \
                    MAX(last_run_at) AS last_run_at \
             FROM scheduled_reports WHERE company_id = ?1",
        )
        .bind(company_id)
        .fetch_one(&self.pool)
        .await?;

        // normalise whatever timestamp shape was stored
        let normalise = |raw: Option<String>| {
            raw.as_deref()
                .and_then(parse_sql_timestamp)
                .map(crate::repository::sql_timestamp)
        };

        Ok(Some(ScheduledReportStatus {
            total: row.total,
            active: row.active,
            next_run_at: normalise(row.next_run_at),
            last_run_at: normalise(row.last_run_at),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_status() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        sqlx::query(
            "INSERT INTO scheduled_reports (id, company_id, name, is_active, last_run_at, next_run_at) VALUES \
             ('sr-1', 'c-1', 'Weekly P&L', 1, '2025-11-03 06:00:00', '2025-11-10 06:00:00'), \
             ('sr-2', 'c-1', 'Old', 0, '2025-01-01 06:00:00', '2025-01-08 06:00:00')",
        )
        .execute(db.pool())
        .await
        .unwrap();

        let caps = db.capabilities().await.unwrap();
        let status = db.report_schedules().status("c-1", &caps).await.unwrap().unwrap();
        assert_eq!(status.total, 2);
        assert_eq!(status.active, 1);
        assert_eq!(status.next_run_at.as_deref(), Some("2025-11-10 06:00:00"));
        assert_eq!(status.last_run_at.as_deref(), Some("2025-11-03 06:00:00"));
    }

    #[tokio::test]
    async fn test_absent_table() {
        let db = Database::new(DbConfig::in_memory().run_migrations(false))
            .await
            .unwrap();
        let caps = db.capabilities().await.unwrap();
        assert!(db.report_schedules().status("c-1", &caps).await.unwrap().is_none());
    }
}
