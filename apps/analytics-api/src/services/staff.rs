//! Staff activity: sales per cashier and repairs per technician.

use serde::Serialize;
use tracing::debug;

use tally_core::repair::{aggregate_technicians, TechnicianSummary};
use tally_core::report::StaffPerformance;
use tally_core::types::ModuleKey;
use tally_core::Money;
use tally_db::DbResult;

use super::cost_resolver::CostResolver;
use super::reconciler::repair_inputs;
use super::{degraded, ReportSession};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StaffActivity {
    pub staff: Vec<StaffPerformance>,
    pub technicians: Vec<TechnicianSummary>,
}

/// Per-cashier sales priced through the Cost Resolver, and the technician
/// aggregate.
///
/// The cashier totals are the primary query here and propagate their error.
pub async fn staff_activity(session: &ReportSession) -> DbResult<StaffActivity> {
    let resolver = CostResolver::load(session).await;
    let names = degraded(
        "user_names",
        session.db.users().names(session.company_id(), &session.caps).await,
    );

    let mut staff = Vec::new();
    if session.module_enabled(ModuleKey::Pos) {
        let rows = session
            .db
            .sales()
            .staff_totals(&session.scope(), &session.caps)
            .await?;

        for row in rows {
            let staff_ctx = session.ctx.for_staff(&row.staff_id);
            let scope = tally_db::SalesScope::new(
                staff_ctx.company_id,
                staff_ctx.range.window(),
                staff_ctx.staff_filter,
            );
            let revenue = Money::from_cents(row.revenue_cents);
            let cost = resolver.cost_for(session, &scope, revenue).await;
            let name = names.get(&row.staff_id).cloned();
            staff.push(StaffPerformance::new(row.staff_id, name, row.sales_count, revenue, cost));
        }
    }

    let (repairs, parts) = repair_inputs(session, &resolver).await;
    let technicians = aggregate_technicians(&repairs, &parts, &names, session.policy.default_labour_bps);

    debug!(
        company_id = session.company_id(),
        staff = staff.len(),
        technicians = technicians.len(),
        "Staff activity assembled"
    );

    Ok(StaffActivity { staff, technicians })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fixtures::*;
    use tally_core::repair::UNASSIGNED_TECHNICIAN;
    use tally_core::ReportPolicy;

    #[tokio::test]
    async fn test_staff_and_technicians() {
        let db = database().await;
        for sql in [
            "INSERT INTO users (id, company_id, full_name) VALUES ('u-1', 'c-1', 'Casey'), ('u-t', 'c-1', 'Taylor')",
            "INSERT INTO products (id, company_id, name, cost_price_cents) VALUES ('p-1', 'c-1', 'Case', 2000)",
            "INSERT INTO sales (id, company_id, created_by, final_amount_cents, created_at) VALUES \
             ('s-1', 'c-1', 'u-1', 10000, '2025-11-05 10:00:00'), \
             ('s-2', 'c-1', 'u-2', 3000, '2025-11-06 10:00:00')",
            "INSERT INTO sale_items (id, sale_id, product_id, item_name, quantity, unit_price_cents) VALUES \
             ('i-1', 's-1', 'p-1', 'Case', 2, 5000)",
            "INSERT INTO repairs (id, company_id, technician_id, repair_cost_cents, labour_cost_cents, status, created_at) VALUES \
             ('r-1', 'c-1', 'u-t', 8000, 2000, 'completed', '2025-11-07 10:00:00'), \
             ('r-2', 'c-1', NULL, 4000, NULL, 'pending', '2025-11-08 10:00:00')",
        ] {
            exec(&db, sql).await;
        }

        let ctx = context("c-1", date(2025, 11, 1), date(2025, 11, 30));
        let session = ReportSession::open(&db, ctx, ReportPolicy::default()).await.unwrap();
        let activity = staff_activity(&session).await.unwrap();

        assert_eq!(activity.staff.len(), 2);
        let casey = &activity.staff[0];
        assert_eq!(casey.staff_id, "u-1");
        assert_eq!(casey.staff_name.as_deref(), Some("Casey"));
        assert_eq!(casey.cost, Money::from_cents(4_000));
        assert_eq!(casey.profit, Money::from_cents(6_000));

        let other = &activity.staff[1];
        assert_eq!(other.staff_id, "u-2");
        assert!(other.staff_name.is_none());
        assert!(other.cost_is_estimated);
        assert_eq!(other.profit, Money::from_cents(900));

        assert_eq!(activity.technicians.len(), 2);
        let taylor = &activity.technicians[0];
        assert_eq!(taylor.technician_name.as_deref(), Some("Taylor"));
        assert_eq!(taylor.workmanship_profit, Money::from_cents(6_000));
        let unassigned = &activity.technicians[1];
        assert_eq!(unassigned.technician_id, UNASSIGNED_TECHNICIAN);
        assert_eq!(unassigned.labour_cost, Money::from_cents(2_000));
    }
}
