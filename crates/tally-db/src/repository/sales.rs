//! # Sales Repository
//!
//! Revenue and line-item reads over `sales` / `sale_items`.
//!
//! Every query here goes through the same filter, so swap transactions that
//! live in the `sales` table never reach a sales figure:
//!
//! ```text
//! WHERE s.company_id = ?
//!   AND s.created_at BETWEEN ? AND ?          -- window, end at 23:59:59
//!   AND COALESCE(s.is_swap_mode, 0) = 0       -- only if the column exists
//!   AND (s.swap_id IS NULL OR s.swap_id = '') -- only if the column exists
//!   AND s.created_by = ?                      -- only with a staff filter
//! ```

use chrono::{NaiveDate, NaiveDateTime};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, warn};

use tally_core::cost::SoldLine;
use tally_core::money::Money;
use tally_core::period::{PeriodKey, YearMonth, DATE_FORMAT};
use tally_core::report::RawPeriodTotals;

use crate::error::DbResult;
use crate::repository::{parse_sql_timestamp, push_window, SalesScope};
use crate::schema::SchemaCapabilities;

#[derive(Debug, sqlx::FromRow)]
struct PeriodRow {
    period: Option<String>,
    sales_count: i64,
    revenue_cents: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct LineRow {
    sale_id: String,
    product_id: Option<String>,
    item_name: Option<String>,
    quantity: i64,
}

impl LineRow {
    fn into_line(self) -> SoldLine {
        SoldLine {
            product_id: self.product_id,
            item_name: self.item_name,
            quantity: self.quantity,
        }
    }
}

/// Sales count and revenue for one cashier.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct StaffSalesRow {
    pub staff_id: String,
    pub sales_count: i64,
    pub revenue_cents: i64,
}

/// A recent sale for the activity feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentSale {
    pub id: String,
    pub staff_id: Option<String>,
    pub amount: Money,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, sqlx::FromRow)]
struct RecentSaleRow {
    id: String,
    staff_id: Option<String>,
    final_amount_cents: i64,
    created_at: String,
}

/// Repository for sales reads.
#[derive(Debug, Clone)]
pub struct SalesRepository {
    pool: SqlitePool,
}

impl SalesRepository {
    /// Creates a new SalesRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SalesRepository { pool }
    }

    /// Appends the pure-sales filter for `scope` (alias `s`).
    fn push_scope(qb: &mut QueryBuilder<'_, Sqlite>, scope: &SalesScope, caps: &SchemaCapabilities) {
        qb.push(" WHERE s.company_id = ");
        qb.push_bind(scope.company_id.clone());
        qb.push(" AND");
        push_window(qb, "s", &scope.window);
        qb.push(" AND ");
        qb.push(caps.pure_sales_predicate("s"));
        if let Some(staff_id) = &scope.staff_id {
            qb.push(" AND CAST(s.created_by AS TEXT) = ");
            qb.push_bind(staff_id.clone());
        }
    }

    async fn period_totals(
        &self,
        format: &str,
        scope: &SalesScope,
        caps: &SchemaCapabilities,
    ) -> DbResult<Vec<PeriodRow>> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT strftime(");
        qb.push_bind(format.to_string());
        qb.push(
            ", s.created_at) AS period, \
             COUNT(*) AS sales_count, \
             COALESCE(SUM(s.final_amount_cents), 0) AS revenue_cents \
             FROM sales s",
        );
        Self::push_scope(&mut qb, scope, caps);
        qb.push(" GROUP BY period ORDER BY period DESC");

        let rows = qb.build_query_as::<PeriodRow>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    /// Per-day count and revenue, newest day first. Days without sales are absent.
    pub async fn daily_totals(
        &self,
        scope: &SalesScope,
        caps: &SchemaCapabilities,
    ) -> DbResult<Vec<RawPeriodTotals>> {
        let rows = self.period_totals("%Y-%m-%d", scope, caps).await?;

        let totals: Vec<RawPeriodTotals> = rows
            .into_iter()
            .filter_map(|row| {
                let label = row.period.as_deref()?;
                match NaiveDate::parse_from_str(label, DATE_FORMAT) {
                    Ok(date) => Some(RawPeriodTotals {
                        key: PeriodKey::Day(date),
                        sales_count: row.sales_count,
                        revenue: Money::from_cents(row.revenue_cents),
                    }),
                    Err(_) => {
                        warn!(label, "Skipping sales with unreadable date");
                        None
                    }
                }
            })
            .collect();

        debug!(company_id = %scope.company_id, days = totals.len(), "Loaded daily sales totals");
        Ok(totals)
    }

    /// Per-month count and revenue, newest month first. Empty months are absent.
    pub async fn monthly_totals(
        &self,
        scope: &SalesScope,
        caps: &SchemaCapabilities,
    ) -> DbResult<Vec<RawPeriodTotals>> {
        let rows = self.period_totals("%Y-%m", scope, caps).await?;

        let totals: Vec<RawPeriodTotals> = rows
            .into_iter()
            .filter_map(|row| {
                let month = YearMonth::parse(row.period.as_deref()?)?;
                Some(RawPeriodTotals {
                    key: PeriodKey::Month(month),
                    sales_count: row.sales_count,
                    revenue: Money::from_cents(row.revenue_cents),
                })
            })
            .collect();

        debug!(company_id = %scope.company_id, months = totals.len(), "Loaded monthly sales totals");
        Ok(totals)
    }

    /// Count and revenue over the whole scope.
    ///
    /// This is the primary query of a report: callers propagate its error.
    pub async fn range_totals(
        &self,
        scope: &SalesScope,
        caps: &SchemaCapabilities,
    ) -> DbResult<(i64, Money)> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT NULL AS period, COUNT(*) AS sales_count, \
             COALESCE(SUM(s.final_amount_cents), 0) AS revenue_cents FROM sales s",
        );
        Self::push_scope(&mut qb, scope, caps);

        let row = qb.build_query_as::<PeriodRow>().fetch_one(&self.pool).await?;
        Ok((row.sales_count, Money::from_cents(row.revenue_cents)))
    }

    /// Timestamp of the earliest pure sale at or before `scope.window.end`.
    ///
    /// The window start is ignored: monthly breakdowns reach back to the
    /// company's first sale.
    pub async fn first_sale_at(
        &self,
        scope: &SalesScope,
        caps: &SchemaCapabilities,
    ) -> DbResult<Option<NaiveDateTime>> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT MIN(s.created_at) FROM sales s WHERE s.company_id = ");
        qb.push_bind(scope.company_id.clone());
        qb.push(" AND s.created_at <= ");
        qb.push_bind(crate::repository::sql_timestamp(scope.window.end));
        qb.push(" AND ");
        qb.push(caps.pure_sales_predicate("s"));
        if let Some(staff_id) = &scope.staff_id {
            qb.push(" AND CAST(s.created_by AS TEXT) = ");
            qb.push_bind(staff_id.clone());
        }

        let first: Option<String> = qb
            .build_query_scalar::<Option<String>>()
            .fetch_one(&self.pool)
            .await?;
        Ok(first.as_deref().and_then(parse_sql_timestamp))
    }

    /// Line items of every pure sale in scope.
    pub async fn sold_lines(
        &self,
        scope: &SalesScope,
        caps: &SchemaCapabilities,
    ) -> DbResult<Vec<SoldLine>> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT CAST(si.sale_id AS TEXT) AS sale_id, ");
        Self::push_line_columns(&mut qb, caps);
        qb.push(" FROM sale_items si JOIN sales s ON s.id = si.sale_id");
        Self::push_scope(&mut qb, scope, caps);

        let rows = qb.build_query_as::<LineRow>().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(LineRow::into_line).collect())
    }

    /// Line items of specific sales, as `(sale_id, line)` pairs.
    pub async fn lines_for_sales(
        &self,
        sale_ids: &[String],
        caps: &SchemaCapabilities,
    ) -> DbResult<Vec<(String, SoldLine)>> {
        if sale_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new("SELECT CAST(si.sale_id AS TEXT) AS sale_id, ");
        Self::push_line_columns(&mut qb, caps);
        qb.push(" FROM sale_items si WHERE CAST(si.sale_id AS TEXT) IN (");
        let mut ids = qb.separated(", ");
        for id in sale_ids {
            ids.push_bind(id.clone());
        }
        ids.push_unseparated(")");

        let rows = qb.build_query_as::<LineRow>().fetch_all(&self.pool).await?;
        Ok(rows
            .into_iter()
            .map(|row| (row.sale_id.clone(), row.into_line()))
            .collect())
    }

    fn push_line_columns(qb: &mut QueryBuilder<'_, Sqlite>, caps: &SchemaCapabilities) {
        let product_id = caps.column_or_null("sale_items", "si", "product_id");
        let item_name = caps.column_or_null("sale_items", "si", "item_name");
        qb.push(format!(
            "CAST({product_id} AS TEXT) AS product_id, \
             CAST({item_name} AS TEXT) AS item_name, \
             COALESCE(si.quantity, 1) AS quantity"
        ));
    }

    /// Total units sold in scope.
    pub async fn items_sold(&self, scope: &SalesScope, caps: &SchemaCapabilities) -> DbResult<i64> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT COALESCE(SUM(si.quantity), 0) FROM sale_items si JOIN sales s ON s.id = si.sale_id",
        );
        Self::push_scope(&mut qb, scope, caps);

        let units: i64 = qb.build_query_scalar::<i64>().fetch_one(&self.pool).await?;
        Ok(units)
    }

    /// Count and revenue per cashier, highest revenue first.
    pub async fn staff_totals(
        &self,
        scope: &SalesScope,
        caps: &SchemaCapabilities,
    ) -> DbResult<Vec<StaffSalesRow>> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT CAST(s.created_by AS TEXT) AS staff_id, COUNT(*) AS sales_count, \
             COALESCE(SUM(s.final_amount_cents), 0) AS revenue_cents FROM sales s",
        );
        Self::push_scope(&mut qb, scope, caps);
        qb.push(" AND s.created_by IS NOT NULL GROUP BY s.created_by ORDER BY revenue_cents DESC, staff_id");

        let rows = qb.build_query_as::<StaffSalesRow>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    /// Most recent pure sales of a company.
    pub async fn recent(
        &self,
        company_id: &str,
        limit: i64,
        caps: &SchemaCapabilities,
    ) -> DbResult<Vec<RecentSale>> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT CAST(s.id AS TEXT) AS id, CAST(s.created_by AS TEXT) AS staff_id, \
             s.final_amount_cents, CAST(s.created_at AS TEXT) AS created_at \
             FROM sales s WHERE s.company_id = ",
        );
        qb.push_bind(company_id.to_string());
        qb.push(" AND ");
        qb.push(caps.pure_sales_predicate("s"));
        qb.push(" ORDER BY s.created_at DESC LIMIT ");
        qb.push_bind(limit);

        let rows = qb.build_query_as::<RecentSaleRow>().fetch_all(&self.pool).await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                Some(RecentSale {
                    created_at: parse_sql_timestamp(&row.created_at)?,
                    id: row.id,
                    staff_id: row.staff_id,
                    amount: Money::from_cents(row.final_amount_cents),
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
    use tally_core::period::{BucketWindow, DateRange};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn insert_sale(db: &Database, id: &str, company: &str, amount: i64, at: &str, swap_mode: bool) {
        sqlx::query(
            "INSERT INTO sales (id, company_id, created_by, final_amount_cents, is_swap_mode, created_at) \
             VALUES (?1, ?2, 'u-1', ?3, ?4, ?5)",
        )
        .bind(id)
        .bind(company)
        .bind(amount)
        .bind(swap_mode)
        .bind(at)
        .execute(db.pool())
        .await
        .unwrap();
    }

    fn november_scope(company: &str) -> SalesScope {
        let range = DateRange::new(date(2025, 11, 1), date(2025, 11, 30)).unwrap();
        SalesScope::new(company, range.window(), None)
    }

    #[tokio::test]
    async fn test_daily_totals_exclude_swaps_and_other_companies() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        insert_sale(&db, "s-1", "c-1", 10_000, "2025-11-05 10:00:00", false).await;
        insert_sale(&db, "s-2", "c-1", 5_000, "2025-11-05 23:59:59", false).await;
        insert_sale(&db, "s-3", "c-1", 99_900, "2025-11-05 12:00:00", true).await;
        insert_sale(&db, "s-4", "c-2", 1_000, "2025-11-05 12:00:00", false).await;
        insert_sale(&db, "s-5", "c-1", 2_000, "2025-11-07 09:00:00", false).await;

        let caps = db.capabilities().await.unwrap();
        let days = db.sales().daily_totals(&november_scope("c-1"), &caps).await.unwrap();

        assert_eq!(days.len(), 2);
        assert_eq!(days[0].key, PeriodKey::Day(date(2025, 11, 7)));
        assert_eq!(days[1].sales_count, 2);
        assert_eq!(days[1].revenue.cents(), 15_000);
    }

    #[tokio::test]
    async fn test_first_sale_ignores_window_start() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        insert_sale(&db, "s-1", "c-1", 100, "2025-06-15 08:00:00", false).await;
        insert_sale(&db, "s-2", "c-1", 100, "2025-11-02 08:00:00", false).await;
        insert_sale(&db, "s-3", "c-1", 100, "2025-12-02 08:00:00", false).await;

        let caps = db.capabilities().await.unwrap();
        let first = db.sales().first_sale_at(&november_scope("c-1"), &caps).await.unwrap();
        assert_eq!(first.map(|t| t.date()), Some(date(2025, 6, 15)));

        let none = db.sales().first_sale_at(&november_scope("c-9"), &caps).await.unwrap();
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn test_staff_filter_and_lines() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        insert_sale(&db, "s-1", "c-1", 10_000, "2025-11-05 10:00:00", false).await;
        sqlx::query(
            "INSERT INTO sale_items (id, sale_id, product_id, item_name, quantity, unit_price_cents) \
             VALUES ('i-1', 's-1', 'p-1', 'Case', 2, 5000)",
        )
        .execute(db.pool())
        .await
        .unwrap();

        let caps = db.capabilities().await.unwrap();
        let scope = november_scope("c-1");
        let lines = db.sales().sold_lines(&scope, &caps).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].product_id.as_deref(), Some("p-1"));
        assert_eq!(lines[0].quantity, 2);
        assert_eq!(db.sales().items_sold(&scope, &caps).await.unwrap(), 2);

        let other_staff = SalesScope::new("c-1", scope.window, Some("u-2".to_string()));
        assert!(db.sales().sold_lines(&other_staff, &caps).await.unwrap().is_empty());

        let by_sale = db.sales().lines_for_sales(&["s-1".to_string()], &caps).await.unwrap();
        assert_eq!(by_sale[0].0, "s-1");
    }

    #[tokio::test]
    async fn test_legacy_sales_without_swap_columns() {
        let db = Database::new(DbConfig::in_memory().run_migrations(false))
            .await
            .unwrap();
        sqlx::query("CREATE TABLE sales (id TEXT PRIMARY KEY, company_id TEXT, created_by TEXT, final_amount_cents INTEGER, created_at TEXT)")
            .execute(db.pool())
            .await
            .unwrap();
        sqlx::query("INSERT INTO sales VALUES ('s-1', 'c-1', 'u-1', 4200, '2025-11-05 10:00:00')")
            .execute(db.pool())
            .await
            .unwrap();

        let caps = db.capabilities().await.unwrap();
        let window = BucketWindow::from_dates(date(2025, 11, 1), date(2025, 11, 30));
        let (count, revenue) = db
            .sales()
            .range_totals(&SalesScope::new("c-1", window, None), &caps)
            .await
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(revenue.cents(), 4_200);
    }
}
