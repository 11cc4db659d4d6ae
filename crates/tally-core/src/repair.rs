//! # Repair & Technician Figures
//!
//! Repairs contribute revenue to the company totals. What the technician
//! earned (workmanship and parts margin) is reported on the side and never
//! blended into Net Profit.
//!
//! ```text
//! workmanship_profit = repair_cost - labour_cost
//!                      labour_cost defaults to repair_cost × 50% when unset
//! parts_profit       = Σ (selling_price - unit_cost) × quantity
//! ```

use serde::Serialize;
use std::collections::HashMap;
use ts_rs::TS;

use crate::money::Money;

/// Repair statuses that count as completed work.
pub const COMPLETED_STATUSES: [&str; 3] = ["completed", "delivered", "collected"];

/// One repair row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairRecord {
    pub id: String,
    pub technician_id: Option<String>,
    pub status: String,
    pub repair_cost: Money,
    /// Explicit labour cost; `None` when the column is absent or NULL.
    pub labour_cost: Option<Money>,
}

impl RepairRecord {
    pub fn is_completed(&self) -> bool {
        let status = self.status.trim().to_ascii_lowercase();
        COMPLETED_STATUSES.contains(&status.as_str())
    }

    pub fn labour_cost(&self, default_labour_bps: u32) -> Money {
        self.labour_cost
            .unwrap_or_else(|| self.repair_cost.percentage_of(default_labour_bps))
    }

    pub fn workmanship_profit(&self, default_labour_bps: u32) -> Money {
        self.repair_cost - self.labour_cost(default_labour_bps)
    }
}

/// A part fitted during a repair, with its unit cost already resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairPartLine {
    pub repair_id: String,
    pub selling_price: Money,
    pub unit_cost: Money,
    pub quantity: i64,
}

impl RepairPartLine {
    pub fn revenue(&self) -> Money {
        self.selling_price.multiply_quantity(self.quantity.max(0))
    }

    pub fn cost(&self) -> Money {
        self.unit_cost.multiply_quantity(self.quantity.max(0))
    }

    pub fn profit(&self) -> Money {
        self.revenue() - self.cost()
    }
}

// =============================================================================
// Company-wide Repair Summary
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, TS)]
#[ts(export)]
pub struct RepairStats {
    pub total_repairs: i64,
    pub completed_repairs: i64,
    pub revenue: Money,
    pub parts_revenue: Money,
    pub parts_cost: Money,
    pub parts_profit: Money,
    pub workmanship_profit: Money,
}

pub fn summarize_repairs(
    repairs: &[RepairRecord],
    parts: &[RepairPartLine],
    default_labour_bps: u32,
) -> RepairStats {
    let mut stats = RepairStats::default();

    for repair in repairs {
        stats.total_repairs += 1;
        if repair.is_completed() {
            stats.completed_repairs += 1;
        }
        stats.revenue += repair.repair_cost;
        stats.workmanship_profit += repair.workmanship_profit(default_labour_bps);
    }

    for part in parts {
        stats.parts_revenue += part.revenue();
        stats.parts_cost += part.cost();
    }
    stats.parts_profit = stats.parts_revenue - stats.parts_cost;

    stats
}

// =============================================================================
// Per-Technician Aggregate
// =============================================================================

/// Sentinel key for repairs that have no technician assigned.
pub const UNASSIGNED_TECHNICIAN: &str = "unassigned";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct TechnicianSummary {
    pub technician_id: String,
    pub technician_name: Option<String>,
    pub repairs: i64,
    pub completed_repairs: i64,
    pub repair_revenue: Money,
    pub labour_cost: Money,
    pub workmanship_profit: Money,
    pub parts_revenue: Money,
    pub parts_cost: Money,
    pub parts_profit: Money,
}

impl TechnicianSummary {
    fn new(technician_id: &str) -> Self {
        TechnicianSummary {
            technician_id: technician_id.to_string(),
            technician_name: None,
            repairs: 0,
            completed_repairs: 0,
            repair_revenue: Money::zero(),
            labour_cost: Money::zero(),
            workmanship_profit: Money::zero(),
            parts_revenue: Money::zero(),
            parts_cost: Money::zero(),
            parts_profit: Money::zero(),
        }
    }
}

/// Groups repairs and their parts by technician.
///
/// Rows come back ordered by repair revenue, highest first; ties are broken
/// by technician id so the output is stable across runs.
pub fn aggregate_technicians(
    repairs: &[RepairRecord],
    parts: &[RepairPartLine],
    names: &HashMap<String, String>,
    default_labour_bps: u32,
) -> Vec<TechnicianSummary> {
    let mut by_tech: HashMap<String, TechnicianSummary> = HashMap::new();
    let mut repair_owner: HashMap<&str, String> = HashMap::with_capacity(repairs.len());

    for repair in repairs {
        let tech = repair
            .technician_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .unwrap_or(UNASSIGNED_TECHNICIAN)
            .to_string();

        let summary = by_tech
            .entry(tech.clone())
            .or_insert_with(|| TechnicianSummary::new(&tech));
        let labour = repair.labour_cost(default_labour_bps);

        summary.repairs += 1;
        if repair.is_completed() {
            summary.completed_repairs += 1;
        }
        summary.repair_revenue += repair.repair_cost;
        summary.labour_cost += labour;
        summary.workmanship_profit += repair.repair_cost - labour;

        repair_owner.insert(repair.id.as_str(), tech);
    }

    for part in parts {
        let Some(tech) = repair_owner.get(part.repair_id.as_str()) else {
            continue;
        };
        if let Some(summary) = by_tech.get_mut(tech) {
            summary.parts_revenue += part.revenue();
            summary.parts_cost += part.cost();
            summary.parts_profit += part.profit();
        }
    }

    let mut rows: Vec<TechnicianSummary> = by_tech
        .into_values()
        .map(|mut summary| {
            summary.technician_name = names.get(&summary.technician_id).cloned();
            summary
        })
        .collect();

    rows.sort_by(|a, b| {
        b.repair_revenue
            .cmp(&a.repair_revenue)
            .then_with(|| a.technician_id.cmp(&b.technician_id))
    });
    rows
}

// =============================================================================
// Unit Tests
// =============================================================================
