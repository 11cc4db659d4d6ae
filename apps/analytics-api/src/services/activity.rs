//! Live activity feed: latest sales, repairs and swaps, newest first.
//!
//! ```text
//! recent sales   (limit) ─┐
//! recent repairs (limit) ─┼──► merge by created_at desc ──► first `limit`
//! recent swaps   (limit) ─┘
//! ```
//!
//! Sales carry their profit through the Cost Resolver; repairs and swaps
//! carry their status.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::debug;

use tally_core::money::Money;
use tally_core::report::profit_after_cost;
use tally_core::types::ModuleKey;
use tally_db::repository::sql_timestamp;
use tally_db::DbResult;

use super::cost_resolver::CostResolver;
use super::{degraded, ReportSession};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Sale,
    Repair,
    Swap,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityItem {
    pub kind: ActivityKind,
    pub id: String,
    pub amount: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profit: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_is_estimated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Cashier or technician.
    pub staff_id: Option<String>,
    #[serde(serialize_with = "serialize_timestamp")]
    pub created_at: NaiveDateTime,
}

fn serialize_timestamp<S: serde::Serializer>(at: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&sql_timestamp(*at))
}

/// Latest `limit` events of the company.
///
/// Recent sales are the primary query; repairs and swaps degrade to empty.
pub async fn recent_activity(session: &ReportSession, limit: i64) -> DbResult<Vec<ActivityItem>> {
    let company_id = session.company_id();
    let mut items = Vec::new();

    if session.module_enabled(ModuleKey::Pos) {
        let sales_repo = session.db.sales();
        let sales = sales_repo.recent(company_id, limit, &session.caps).await?;

        let ids: Vec<String> = sales.iter().map(|sale| sale.id.clone()).collect();
        let lines = degraded("activity_lines", sales_repo.lines_for_sales(&ids, &session.caps).await);
        let revenues: HashMap<String, Money> =
            sales.iter().map(|sale| (sale.id.clone(), sale.amount)).collect();

        let resolver = CostResolver::load(session).await;
        let priced = resolver.price_sales(lines, &revenues);

        items.extend(sales.into_iter().map(|sale| {
            let cost = priced.get(&sale.id).copied().unwrap_or_default();
            ActivityItem {
                kind: ActivityKind::Sale,
                profit: Some(profit_after_cost(sale.amount, cost.cost)),
                cost_is_estimated: Some(cost.estimated),
                status: None,
                staff_id: sale.staff_id,
                amount: sale.amount,
                created_at: sale.created_at,
                id: sale.id,
            }
        }));
    }

    if session.module_enabled(ModuleKey::Repairs) {
        let repairs = degraded(
            "activity_repairs",
            session.db.repairs().recent(company_id, limit, &session.caps).await,
        );
        items.extend(repairs.into_iter().map(|repair| ActivityItem {
            kind: ActivityKind::Repair,
            id: repair.id,
            amount: repair.amount,
            profit: None,
            cost_is_estimated: None,
            status: Some(repair.status),
            staff_id: repair.technician_id,
            created_at: repair.created_at,
        }));
    }

    if session.module_enabled(ModuleKey::Swaps) {
        let swaps = degraded(
            "activity_swaps",
            session.db.swaps().recent(company_id, limit, &session.caps).await,
        );
        items.extend(swaps.into_iter().map(|swap| ActivityItem {
            kind: ActivityKind::Swap,
            id: swap.id,
            amount: swap.value,
            profit: None,
            cost_is_estimated: None,
            status: Some(swap.status),
            staff_id: None,
            created_at: swap.created_at,
        }));
    }

    items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
    items.truncate(usize::try_from(limit).unwrap_or(0));

    debug!(company_id, items = items.len(), limit, "Activity feed assembled");
    Ok(items)
}
