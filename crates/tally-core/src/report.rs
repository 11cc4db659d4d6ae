//! # Report Assembly
//!
//! Turns raw per-period sales totals into priced buckets, and reconciles
//! the buckets with swap and repair figures into one set of totals.
//!
//! ## Reconciliation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Cross-Entity Reconciliation                         │
//! │                                                                         │
//! │  Preferred breakdown:  monthly ─► weekly ─► daily ─► raw sales totals   │
//! │                        (first non-empty wins)                           │
//! │                                                                         │
//! │  sales_profit = Σ bucket.profit_before_swaps   (same buckets the user   │
//! │                                                 sees, so they agree)    │
//! │  swap_profit  = realized swap profit in range                          │
//! │  profit       = max(0, sales_profit + swap_profit)                      │
//! │  margin       = profit / revenue × 100          (0 when revenue is 0)   │
//! │                                                                         │
//! │  repair_revenue is reported alongside. Technician workmanship is NOT   │
//! │  part of profit.                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use ts_rs::TS;

use crate::cost::CostOutcome;
use crate::money::Money;
use crate::period::{IsoWeekKey, PeriodKey, YearMonth};
use crate::swap::SwapStats;

/// `max(0, revenue - cost)`.
pub fn profit_after_cost(revenue: Money, cost: Money) -> Money {
    (revenue - cost).clamp_non_negative()
}

// =============================================================================
// Raw Period Totals
// =============================================================================

/// Sales count and revenue for one period, before any cost is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawPeriodTotals {
    pub key: PeriodKey,
    pub sales_count: i64,
    pub revenue: Money,
}

/// Rolls daily rows up into ISO weeks, newest week first.
///
/// Rows that are not daily are ignored.
pub fn roll_up_weeks(daily: &[RawPeriodTotals]) -> Vec<RawPeriodTotals> {
    let mut weeks: BTreeMap<IsoWeekKey, (i64, Money)> = BTreeMap::new();

    for row in daily {
        if let PeriodKey::Day(date) = row.key {
            let slot = weeks
                .entry(IsoWeekKey::from_date(date))
                .or_insert((0, Money::zero()));
            slot.0 += row.sales_count;
            slot.1 += row.revenue;
        }
    }

    weeks
        .into_iter()
        .rev()
        .map(|(week, (sales_count, revenue))| RawPeriodTotals {
            key: PeriodKey::Week(week),
            sales_count,
            revenue,
        })
        .collect()
}

/// Lays monthly rows over a month span, inserting zero rows for months
/// with no sales. Output follows the order of `span`.
pub fn fill_months(span: &[YearMonth], monthly: &[RawPeriodTotals]) -> Vec<RawPeriodTotals> {
    let found: HashMap<YearMonth, &RawPeriodTotals> = monthly
        .iter()
        .filter_map(|row| match row.key {
            PeriodKey::Month(month) => Some((month, row)),
            _ => None,
        })
        .collect();

    span.iter()
        .map(|month| match found.get(month) {
            Some(row) => **row,
            None => RawPeriodTotals {
                key: PeriodKey::Month(*month),
                sales_count: 0,
                revenue: Money::zero(),
            },
        })
        .collect()
}

// =============================================================================
// Period Bucket
// =============================================================================

/// One priced row of a breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodBucket {
    pub key: PeriodKey,
    pub sales_count: i64,
    pub revenue: Money,
    pub cost: Money,
    pub cost_is_estimated: bool,
    /// `max(0, revenue - cost)`
    pub profit_before_swaps: Money,
    /// Realized swap profit whose resale happened in this period.
    pub swap_profit: Money,
    /// `max(0, profit_before_swaps + swap_profit)`
    pub profit: Money,
}

impl PeriodBucket {
    pub fn new(raw: RawPeriodTotals, cost: CostOutcome, swap_profit: Money) -> Self {
        let profit_before_swaps = profit_after_cost(raw.revenue, cost.cost);
        PeriodBucket {
            key: raw.key,
            sales_count: raw.sales_count,
            revenue: raw.revenue,
            cost: cost.cost,
            cost_is_estimated: cost.estimated,
            profit_before_swaps,
            swap_profit,
            profit: (profit_before_swaps + swap_profit).clamp_non_negative(),
        }
    }
}

/// Renders as `{ "<date|week|month>": label, sales_count, revenue, ... }`.
impl Serialize for PeriodBucket {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(8))?;
        map.serialize_entry(self.key.field_name(), &self.key.to_string())?;
        map.serialize_entry("sales_count", &self.sales_count)?;
        map.serialize_entry("revenue", &self.revenue)?;
        map.serialize_entry("cost", &self.cost)?;
        map.serialize_entry("profit", &self.profit)?;
        map.serialize_entry("sales_profit", &self.profit_before_swaps)?;
        map.serialize_entry("swap_profit", &self.swap_profit)?;
        map.serialize_entry("cost_is_estimated", &self.cost_is_estimated)?;
        map.end()
    }
}

// =============================================================================
// Breakdown
// =============================================================================

/// Which sequence the totals were taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum BreakdownSource {
    Monthly,
    Weekly,
    Daily,
    Raw,
}

/// The three bucket sequences, each newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfitBreakdown {
    pub daily: Vec<PeriodBucket>,
    pub weekly: Vec<PeriodBucket>,
    pub monthly: Vec<PeriodBucket>,
}

impl ProfitBreakdown {
    /// The first non-empty sequence in monthly → weekly → daily order.
    pub fn preferred(&self) -> Option<(BreakdownSource, &[PeriodBucket])> {
        [
            (BreakdownSource::Monthly, &self.monthly),
            (BreakdownSource::Weekly, &self.weekly),
            (BreakdownSource::Daily, &self.daily),
        ]
        .into_iter()
        .find(|(_, buckets)| !buckets.is_empty())
        .map(|(source, buckets)| (source, buckets.as_slice()))
    }

    /// Number of buckets whose cost was estimated, across all sequences.
    pub fn estimated_buckets(&self) -> usize {
        self.daily
            .iter()
            .chain(&self.weekly)
            .chain(&self.monthly)
            .filter(|bucket| bucket.cost_is_estimated)
            .count()
    }
}

/// Unbucketed sales totals for the range; the last-resort source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SalesTotals {
    pub sales_count: i64,
    pub revenue: Money,
    pub cost: CostOutcome,
}

// =============================================================================
// Report Totals
// =============================================================================

/// Company-wide figures shown next to the breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct ReportTotals {
    /// Sales revenue plus realized swap revenue.
    pub revenue: Money,
    pub sales_revenue: Money,
    pub swap_revenue: Money,
    /// Reported alongside; not part of `revenue` or `profit`.
    pub repair_revenue: Money,
    pub cost: Money,
    pub cost_is_estimated: bool,
    pub sales_profit: Money,
    pub swap_profit: Money,
    pub profit: Money,
    /// Percentage with two decimals.
    pub margin: f64,
    pub source: BreakdownSource,
}

/// `profit / revenue × 100`, rounded to two decimals; `0` when revenue is not positive.
pub fn margin_percent(profit: Money, revenue: Money) -> f64 {
    if !revenue.is_positive() {
        return 0.0;
    }
    let pct = profit.cents() as f64 / revenue.cents() as f64 * 100.0;
    (pct * 100.0).round() / 100.0
}

/// Merges sales buckets, swap statistics and repair revenue.
///
/// Totals come from one sequence only (monthly, then weekly, then daily,
/// then the raw range totals). The cost estimate is decided per bucket, so
/// the sequences need not agree with each other: a month that resolved some
/// cost is not estimated as a whole, while its unmatched days each carry the
/// estimate. Σ daily profit can then be lower than Σ monthly profit; only
/// the preferred sequence is guaranteed to sum to `sales_profit`.
///
/// ## Example
/// ```rust
/// use tally_core::money::Money;
/// use tally_core::report::{reconcile, ProfitBreakdown, SalesTotals};
/// use tally_core::swap::SwapStats;
///
/// let totals = reconcile(
///     &ProfitBreakdown::default(),
///     &SalesTotals::default(),
///     &SwapStats::default(),
///     Money::zero(),
/// );
/// assert!(totals.profit.is_zero());
/// assert_eq!(totals.margin, 0.0);
/// ```
pub fn reconcile(
    breakdown: &ProfitBreakdown,
    raw: &SalesTotals,
    swaps: &SwapStats,
    repair_revenue: Money,
) -> ReportTotals {
    let (source, sales_revenue, cost, cost_is_estimated, sales_profit) =
        match breakdown.preferred() {
            Some((source, buckets)) => (
                source,
                buckets.iter().map(|b| b.revenue).sum::<Money>(),
                buckets.iter().map(|b| b.cost).sum::<Money>(),
                buckets.iter().any(|b| b.cost_is_estimated),
                buckets.iter().map(|b| b.profit_before_swaps).sum::<Money>(),
            ),
            None => (
                BreakdownSource::Raw,
                raw.revenue,
                raw.cost.cost,
                raw.cost.estimated,
                profit_after_cost(raw.revenue, raw.cost.cost),
            ),
        };

    let revenue = sales_revenue + swaps.realized_revenue;
    let profit = (sales_profit + swaps.realized_profit).clamp_non_negative();

    ReportTotals {
        revenue,
        sales_revenue,
        swap_revenue: swaps.realized_revenue,
        repair_revenue,
        cost,
        cost_is_estimated,
        sales_profit,
        swap_profit: swaps.realized_profit,
        profit,
        margin: margin_percent(profit, revenue),
        source,
    }
}

// =============================================================================
// Staff Performance
// =============================================================================

/// Sales figures for one cashier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct StaffPerformance {
    pub staff_id: String,
    pub staff_name: Option<String>,
    pub sales_count: i64,
    pub revenue: Money,
    pub cost: Money,
    pub profit: Money,
    pub cost_is_estimated: bool,
}

impl StaffPerformance {
    pub fn new(
        staff_id: String,
        staff_name: Option<String>,
        sales_count: i64,
        revenue: Money,
        cost: CostOutcome,
    ) -> Self {
        StaffPerformance {
            staff_id,
            staff_name,
            sales_count,
            revenue,
            cost: cost.cost,
            profit: profit_after_cost(revenue, cost.cost),
            cost_is_estimated: cost.estimated,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn raw(key: PeriodKey, count: i64, revenue: i64) -> RawPeriodTotals {
        RawPeriodTotals {
            key,
            sales_count: count,
            revenue: Money::from_cents(revenue),
        }
    }

    fn resolved(cents: i64) -> CostOutcome {
        CostOutcome {
            cost: Money::from_cents(cents),
            estimated: false,
        }
    }

    #[test]
    fn test_bucket_profit_clamped() {
        let key = PeriodKey::Day(date(2025, 11, 5));
        let bucket = PeriodBucket::new(raw(key, 1, 1_000), resolved(5_000), Money::zero());
        assert!(bucket.profit_before_swaps.is_zero());
        assert!(bucket.profit.is_zero());

        let with_loss = PeriodBucket::new(raw(key, 1, 1_000), resolved(500), Money::from_cents(-900));
        assert_eq!(with_loss.profit_before_swaps.cents(), 500);
        assert!(with_loss.profit.is_zero());
    }

    #[test]
    fn test_bucket_serializes_with_period_field() {
        let key = PeriodKey::Month(YearMonth::from_date(date(2025, 11, 5)));
        let bucket = PeriodBucket::new(raw(key, 1, 10_000), resolved(4_000), Money::zero());
        let json = serde_json::to_value(bucket).unwrap();

        assert_eq!(json["month"], "2025-11");
        assert_eq!(json["sales_count"], 1);
        assert_eq!(json["revenue"], 100.0);
        assert_eq!(json["cost"], 40.0);
        assert_eq!(json["profit"], 60.0);
        assert_eq!(json["cost_is_estimated"], false);
        assert!(json.get("date").is_none());
    }

    #[test]
    fn test_roll_up_weeks_groups_by_monday() {
        let daily = vec![
            raw(PeriodKey::Day(date(2025, 11, 10)), 1, 100), // Mon W46
            raw(PeriodKey::Day(date(2025, 11, 9)), 2, 200),  // Sun W45
            raw(PeriodKey::Day(date(2025, 11, 3)), 3, 300),  // Mon W45
        ];
        let weeks = roll_up_weeks(&daily);
        assert_eq!(weeks.len(), 2);
        assert_eq!(weeks[0].key.to_string(), "2025-W46");
        assert_eq!(weeks[1].key.to_string(), "2025-W45");
        assert_eq!(weeks[1].sales_count, 5);
        assert_eq!(weeks[1].revenue.cents(), 500);
    }

    #[test]
    fn test_fill_months_zero_fills_gaps() {
        let span = crate::period::month_span_desc(date(2025, 9, 14), date(2025, 11, 30));
        let rows = vec![raw(PeriodKey::Month(YearMonth::from_date(date(2025, 9, 1))), 4, 400)];
        let filled = fill_months(&span, &rows);

        let labels: Vec<String> = filled.iter().map(|r| r.key.to_string()).collect();
        assert_eq!(labels, vec!["2025-11", "2025-10", "2025-09"]);
        assert_eq!(filled[0].sales_count, 0);
        assert_eq!(filled[2].revenue.cents(), 400);
    }

    #[test]
    fn test_estimates_make_sequences_diverge() {
        let policy_bps = 7_000;
        let month = PeriodKey::Month(YearMonth::from_date(date(2025, 11, 1)));
        let priced_day = PeriodKey::Day(date(2025, 11, 5));
        let unmatched_day = PeriodKey::Day(date(2025, 11, 20));

        let breakdown = ProfitBreakdown {
            monthly: vec![PeriodBucket::new(raw(month, 2, 12_500), resolved(4_000), Money::zero())],
            weekly: Vec::new(),
            daily: vec![
                PeriodBucket::new(
                    raw(unmatched_day, 1, 2_500),
                    CostOutcome::with_estimate(Money::zero(), Money::from_cents(2_500), policy_bps),
                    Money::zero(),
                ),
                PeriodBucket::new(raw(priced_day, 1, 10_000), resolved(4_000), Money::zero()),
            ],
        };

        let totals = reconcile(&breakdown, &SalesTotals::default(), &SwapStats::default(), Money::zero());
        let daily_sum: Money = breakdown.daily.iter().map(|b| b.profit_before_swaps).sum();

        assert_eq!(totals.source, BreakdownSource::Monthly);
        assert_eq!(totals.sales_profit, Money::from_cents(8_500));
        assert!(!totals.cost_is_estimated);
        assert_eq!(daily_sum, Money::from_cents(6_750));
        assert!(breakdown.daily[0].cost_is_estimated);
    }

    #[test]
    fn test_reconcile_sums_preferred_breakdown() {
        let jan = PeriodKey::Month(YearMonth::from_date(date(2025, 1, 1)));
        let feb = PeriodKey::Month(YearMonth::from_date(date(2025, 2, 1)));
        let breakdown = ProfitBreakdown {
            daily: vec![],
            weekly: vec![],
            monthly: vec![
                PeriodBucket::new(raw(feb, 2, 10_000), resolved(12_000), Money::zero()),
                PeriodBucket::new(raw(jan, 1, 10_000), resolved(4_000), Money::zero()),
            ],
        };

        let totals = reconcile(&breakdown, &SalesTotals::default(), &SwapStats::default(), Money::zero());
        let bucket_sum: Money = breakdown.monthly.iter().map(|b| b.profit_before_swaps).sum();
        assert_eq!(totals.sales_profit, bucket_sum);
        assert_eq!(totals.sales_profit.cents(), 6_000);
        assert_eq!(totals.source, BreakdownSource::Monthly);
    }

    #[test]
    fn test_reconcile_falls_back_to_daily() {
        let day = PeriodKey::Day(date(2025, 3, 3));
        let breakdown = ProfitBreakdown {
            daily: vec![PeriodBucket::new(raw(day, 1, 4_200), resolved(0), Money::zero())],
            weekly: vec![],
            monthly: vec![],
        };
        let totals = reconcile(&breakdown, &SalesTotals::default(), &SwapStats::default(), Money::zero());
        assert_eq!(totals.sales_profit.cents(), 4_200);
        assert_eq!(totals.source, BreakdownSource::Daily);
    }

    #[test]
    fn test_reconcile_raw_fallback_and_swaps() {
        let raw_totals = SalesTotals {
            sales_count: 1,
            revenue: Money::from_cents(10_000),
            cost: resolved(4_000),
        };
        let swaps = SwapStats {
            realized_swaps: 1,
            realized_revenue: Money::from_cents(5_000),
            realized_profit: Money::from_cents(1_500),
            ..Default::default()
        };

        let totals = reconcile(&ProfitBreakdown::default(), &raw_totals, &swaps, Money::from_cents(900));
        assert_eq!(totals.source, BreakdownSource::Raw);
        assert_eq!(totals.sales_profit.cents(), 6_000);
        assert_eq!(totals.profit.cents(), 7_500);
        assert_eq!(totals.revenue.cents(), 15_000);
        assert_eq!(totals.repair_revenue.cents(), 900);
        assert_eq!(totals.margin, 50.0);
    }

    #[test]
    fn test_margin_zero_without_revenue() {
        assert_eq!(margin_percent(Money::from_cents(100), Money::zero()), 0.0);
        assert_eq!(margin_percent(Money::from_cents(1), Money::from_cents(3)), 33.33);
    }
}
