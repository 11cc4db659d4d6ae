//! # Cross-Entity Profit Reconciler
//!
//! Joins sales buckets, realized swap profit and repair revenue into one
//! set of totals.
//!
//! ```text
//! range_totals (primary, errors propagate)
//!        │
//! Bucketizer ──► daily / weekly / monthly
//!        │               │
//!        │        preferred: monthly → weekly → daily → raw totals
//!        ▼               ▼
//!   swap entries ──► summarize(range) ──► realized revenue + profit
//!   repairs + parts ──► repair revenue (reported beside, never in profit)
//!        │
//!        ▼
//!   reconcile() ──► ReportTotals { revenue, cost, sales_profit, swap_profit,
//!                                  profit >= 0, margin, source }
//! ```

use tracing::info;

use tally_core::cost::CostOutcome;
use tally_core::repair::{summarize_repairs, RepairPartLine, RepairRecord, RepairStats};
use tally_core::report::{reconcile, ProfitBreakdown, ReportTotals, SalesTotals};
use tally_core::swap::{summarize, SwapStats};
use tally_core::types::ModuleKey;
use tally_db::DbResult;

use super::bucketizer::Bucketizer;
use super::cost_resolver::CostResolver;
use super::{degraded, ReportSession};

/// Everything the profit endpoints render.
#[derive(Debug, Clone)]
pub struct ProfitReport {
    pub breakdown: ProfitBreakdown,
    pub sales: SalesTotals,
    pub swaps: SwapStats,
    pub repairs: RepairStats,
    pub totals: ReportTotals,
}

/// Repairs recorded in the range and the parts fitted to them, parts priced
/// at catalogue cost.
pub async fn repair_inputs(
    session: &ReportSession,
    resolver: &CostResolver,
) -> (Vec<RepairRecord>, Vec<RepairPartLine>) {
    if !session.module_enabled(ModuleKey::Repairs) {
        return (Vec::new(), Vec::new());
    }

    let window = session.ctx.range.window();
    let repairs_repo = session.db.repairs();
    let repairs = degraded(
        "repairs",
        repairs_repo
            .in_window(session.company_id(), &window, &session.caps)
            .await,
    );
    let parts = degraded(
        "repair_parts",
        repairs_repo
            .parts_in_window(session.company_id(), &window, &session.caps)
            .await,
    );

    let parts = parts
        .into_iter()
        .map(|part| RepairPartLine {
            unit_cost: resolver.unit_cost(part.product_id.as_deref()),
            selling_price: tally_core::Money::from_cents(part.price_cents),
            repair_id: part.repair_id,
            quantity: part.quantity,
        })
        .collect();

    (repairs, parts)
}

/// Builds the full profit report for a session.
///
/// Only the range revenue query can fail the report.
pub async fn profit_report(session: &ReportSession, resolver: &CostResolver) -> DbResult<ProfitReport> {
    let scope = session.scope();
    let (sales_count, revenue) = session.db.sales().range_totals(&scope, &session.caps).await?;

    let bucketizer = Bucketizer::new(session, resolver).await;
    let breakdown = bucketizer.breakdown().await;

    // without buckets the raw totals are the source and need their own cost
    let cost = if breakdown.preferred().is_none() {
        resolver.cost_for(session, &scope, revenue).await
    } else {
        CostOutcome::default()
    };
    let sales = SalesTotals {
        sales_count,
        revenue,
        cost,
    };

    let swaps = summarize(bucketizer.swap_entries(), &session.ctx.range);

    let (repair_records, parts) = repair_inputs(session, resolver).await;
    let repairs = summarize_repairs(&repair_records, &parts, session.policy.default_labour_bps);

    let totals = reconcile(&breakdown, &sales, &swaps, repairs.revenue);

    info!(
        company_id = session.company_id(),
        source = ?totals.source,
        sales_profit = %totals.sales_profit,
        swap_profit = %totals.swap_profit,
        profit = %totals.profit,
        cost_is_estimated = totals.cost_is_estimated,
        "Report reconciled"
    );

    Ok(ProfitReport {
        breakdown,
        sales,
        swaps,
        repairs,
        totals,
    })
}
