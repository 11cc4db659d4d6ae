//! Dashboard metrics: one section per module plus the reconciled profit.
//!
//! A section whose module is disabled for the company renders as `null`.

use serde::Serialize;
use tracing::debug;

use tally_core::money::Money;
use tally_core::repair::RepairStats;
use tally_core::report::ReportTotals;
use tally_core::swap::SwapStats;
use tally_core::types::ModuleKey;
use tally_db::{DbResult, ScheduledReportStatus};

use super::cost_resolver::CostResolver;
use super::reconciler::profit_report;
use super::{degraded, ReportSession};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesSection {
    pub total_sales: i64,
    pub total_revenue: Money,
    pub average_sale: Money,
    pub items_sold: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventorySection {
    pub total_products: i64,
    pub total_units: i64,
    /// On-hand units at resolved unit cost.
    pub stock_value: Money,
    pub low_stock_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsReport {
    pub sales: Option<SalesSection>,
    pub repairs: Option<RepairStats>,
    pub swaps: Option<SwapStats>,
    pub inventory: Option<InventorySection>,
    pub profit: ReportTotals,
    pub scheduled_reports: Option<ScheduledReportStatus>,
}

/// Mean sale value, rounded to the cent.
fn average(revenue: Money, count: i64) -> Money {
    if count <= 0 {
        return Money::zero();
    }
    Money::from_cents((revenue.cents() as f64 / count as f64).round() as i64)
}

async fn inventory(session: &ReportSession, resolver: &CostResolver) -> InventorySection {
    let levels = degraded(
        "stock_levels",
        session
            .db
            .products()
            .stock_levels(session.company_id(), &session.caps)
            .await,
    );

    let mut section = InventorySection {
        total_products: levels.len() as i64,
        total_units: 0,
        stock_value: Money::zero(),
        low_stock_count: 0,
    };
    for level in &levels {
        let units = level.quantity.max(0);
        section.total_units += units;
        section.stock_value += resolver
            .unit_cost(Some(level.product_id.as_str()))
            .multiply_quantity(units);
        if level.is_low() {
            section.low_stock_count += 1;
        }
    }
    section
}

/// Builds every metrics section for a session.
pub async fn metrics(session: &ReportSession) -> DbResult<MetricsReport> {
    let resolver = CostResolver::load(session).await;
    let report = profit_report(session, &resolver).await?;

    let sales = if session.module_enabled(ModuleKey::Pos) {
        let items_sold = degraded(
            "items_sold",
            session.db.sales().items_sold(&session.scope(), &session.caps).await,
        );
        Some(SalesSection {
            total_sales: report.sales.sales_count,
            total_revenue: report.sales.revenue,
            average_sale: average(report.sales.revenue, report.sales.sales_count),
            items_sold,
        })
    } else {
        None
    };

    let inventory = if session.module_enabled(ModuleKey::Inventory) {
        Some(inventory(session, &resolver).await)
    } else {
        None
    };

    let scheduled_reports = degraded(
        "scheduled_reports",
        session
            .db
            .report_schedules()
            .status(session.company_id(), &session.caps)
            .await,
    );

    debug!(
        company_id = session.company_id(),
        sales = sales.is_some(),
        inventory = inventory.is_some(),
        scheduled = scheduled_reports.is_some(),
        "Metrics assembled"
    );

    Ok(MetricsReport {
        sales,
        repairs: session
            .module_enabled(ModuleKey::Repairs)
            .then_some(report.repairs),
        swaps: session
            .module_enabled(ModuleKey::Swaps)
            .then_some(report.swaps),
        inventory,
        profit: report.totals,
        scheduled_reports,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fixtures::*;
    use tally_core::ReportPolicy;

    #[test]
    fn test_average_rounds_to_cent() {
        assert_eq!(average(Money::from_cents(1_000), 3), Money::from_cents(333));
        assert_eq!(average(Money::from_cents(2_000), 3), Money::from_cents(667));
        assert!(average(Money::from_cents(500), 0).is_zero());
    }

    #[tokio::test]
    async fn test_metrics_sections() {
        let db = database().await;
        exec(
            &db,
            "INSERT INTO products (id, company_id, name, quantity, low_stock_threshold, cost_price_cents) VALUES \
             ('p-1', 'c-1', 'Case', 10, 5, 2000), ('p-2', 'c-1', 'Cable', 2, 5, NULL)",
        )
        .await;
        exec(
            &db,
            "INSERT INTO sales (id, company_id, final_amount_cents, created_at) VALUES \
             ('s-1', 'c-1', 10000, '2025-11-05 14:30:00'), ('s-2', 'c-1', 5000, '2025-11-06 10:00:00')",
        )
        .await;
        exec(
            &db,
            "INSERT INTO sale_items (id, sale_id, product_id, item_name, quantity, unit_price_cents) VALUES \
             ('i-1', 's-1', 'p-1', 'Case', 2, 5000), ('i-2', 's-2', 'p-2', 'Cable', 5, 1000)",
        )
        .await;
        exec(&db, "INSERT INTO company_modules (company_id, module_key, enabled) VALUES ('c-1', 'swaps', 0)").await;

        let ctx = context("c-1", date(2025, 11, 1), date(2025, 11, 30));
        let session = ReportSession::open(&db, ctx, ReportPolicy::default()).await.unwrap();
        let report = metrics(&session).await.unwrap();

        let sales = report.sales.unwrap();
        assert_eq!(sales.total_sales, 2);
        assert_eq!(sales.total_revenue, Money::from_cents(15_000));
        assert_eq!(sales.average_sale, Money::from_cents(7_500));
        assert_eq!(sales.items_sold, 7);

        let inventory = report.inventory.unwrap();
        assert_eq!(inventory.total_products, 2);
        assert_eq!(inventory.total_units, 12);
        assert_eq!(inventory.stock_value, Money::from_cents(20_000));
        assert_eq!(inventory.low_stock_count, 1);

        assert!(report.swaps.is_none());
        assert!(report.repairs.is_some());
        assert_eq!(report.scheduled_reports, Some(ScheduledReportStatus::default()));
        assert_eq!(report.profit.sales_revenue, Money::from_cents(15_000));
    }
}
