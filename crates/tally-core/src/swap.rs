//! # Swap Profit
//!
//! Trade-in swaps earn profit only once the traded-in item is resold.
//!
//! ## Realization
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Swap Lifecycle                                     │
//! │                                                                         │
//! │  Swap recorded ──► link { status: pending, profit_estimate }            │
//! │       │                     contributes 0 (item still on the shelf)     │
//! │       ▼                                                                 │
//! │  Customer item resold ──► link.customer_item_sale_id = <sale>           │
//! │       │                     REALIZED: contributes final_profit,         │
//! │       │                     or profit_estimate when final is unset      │
//! │       ▼                                                                 │
//! │  realized_at = resale time  (bucket the profit lands in)                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDateTime;
use serde::Serialize;
use ts_rs::TS;

use crate::money::Money;
use crate::period::{BucketWindow, DateRange};

/// Status column of `swap_profit_links`. Informational only: realization is
/// decided by the resale reference, not by this flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    Pending,
    Finalized,
}

impl LinkStatus {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()) {
            Some(s) if s == "finalized" || s == "finalised" => LinkStatus::Finalized,
            _ => LinkStatus::Pending,
        }
    }
}

/// One swap and its (optional) profit link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapEntry {
    pub swap_id: String,
    pub created_at: NaiveDateTime,
    /// Value of the traded-in item, counted as revenue once realized.
    pub swap_value: Money,
    pub link: Option<SwapProfitLink>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapProfitLink {
    pub status: LinkStatus,
    pub profit_estimate: Option<Money>,
    pub final_profit: Option<Money>,
    pub customer_item_sale_id: Option<String>,
    /// When the customer item was resold (falls back to finalization time).
    pub realized_at: Option<NaiveDateTime>,
}

impl SwapProfitLink {
    pub fn is_realized(&self) -> bool {
        self.customer_item_sale_id
            .as_deref()
            .is_some_and(|id| !id.trim().is_empty())
    }

    /// Profit this link contributes: zero until realized.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    /// use tally_core::swap::{LinkStatus, SwapProfitLink};
    ///
    /// let mut link = SwapProfitLink {
    ///     status: LinkStatus::Pending,
    ///     profit_estimate: Some(Money::from_cents(10_000)),
    ///     final_profit: None,
    ///     customer_item_sale_id: None,
    ///     realized_at: None,
    /// };
    /// assert!(link.realized_profit().is_zero());
    ///
    /// link.customer_item_sale_id = Some("sale-7".into());
    /// assert_eq!(link.realized_profit().cents(), 10_000);
    /// ```
    pub fn realized_profit(&self) -> Money {
        if !self.is_realized() {
            return Money::zero();
        }
        self.final_profit
            .or(self.profit_estimate)
            .unwrap_or_default()
    }

    /// Estimated profit still waiting on a resale.
    pub fn open_estimate(&self) -> Money {
        if self.is_realized() {
            Money::zero()
        } else {
            self.profit_estimate.unwrap_or_default()
        }
    }
}

impl SwapEntry {
    pub fn is_realized(&self) -> bool {
        self.link.as_ref().is_some_and(SwapProfitLink::is_realized)
    }

    pub fn realized_profit(&self) -> Money {
        self.link
            .as_ref()
            .map(SwapProfitLink::realized_profit)
            .unwrap_or_default()
    }

    /// Moment the profit is recognised. Only meaningful when realized.
    pub fn realized_at(&self) -> NaiveDateTime {
        self.link
            .as_ref()
            .and_then(|link| link.realized_at)
            .unwrap_or(self.created_at)
    }

    fn realized_within(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        self.is_realized() && (start..=end).contains(&self.realized_at())
    }
}

// =============================================================================
// Aggregates
// =============================================================================

/// Realized swap profit whose resale fell inside `window`.
pub fn realized_profit_in(entries: &[SwapEntry], window: &BucketWindow) -> Money {
    entries
        .iter()
        .filter(|entry| entry.realized_within(window.start, window.end))
        .map(SwapEntry::realized_profit)
        .sum()
}

/// Swap statistics for a date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, TS)]
#[ts(export)]
pub struct SwapStats {
    /// Swaps recorded in the range.
    pub total_swaps: i64,
    /// Swaps whose customer item was resold in the range.
    pub realized_swaps: i64,
    /// Swaps recorded in the range that are still open.
    pub pending_swaps: i64,
    pub realized_revenue: Money,
    pub realized_profit: Money,
    /// Estimated profit sitting on unsold trade-ins.
    pub open_estimate: Money,
}

/// Summarises swaps over `range`.
///
/// Counting uses the swap's own timestamp; realized figures use the resale
/// timestamp, so a swap taken in October and resold in November shows up
/// as realized in a November report.
pub fn summarize(entries: &[SwapEntry], range: &DateRange) -> SwapStats {
    let (start, end) = (range.start_at(), range.end_at());
    let mut stats = SwapStats::default();

    for entry in entries {
        if (start..=end).contains(&entry.created_at) {
            stats.total_swaps += 1;
            if !entry.is_realized() {
                stats.pending_swaps += 1;
                if let Some(link) = &entry.link {
                    stats.open_estimate += link.open_estimate();
                }
            }
        }

        if entry.realized_within(start, end) {
            stats.realized_swaps += 1;
            stats.realized_revenue += entry.swap_value;
            stats.realized_profit += entry.realized_profit();
        }
    }

    stats
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::start_of_day;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        start_of_day(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    fn entry(id: &str, created: NaiveDateTime, link: Option<SwapProfitLink>) -> SwapEntry {
        SwapEntry {
            swap_id: id.to_string(),
            created_at: created,
            swap_value: Money::from_cents(30_000),
            link,
        }
    }

    fn link(estimate: i64, final_profit: Option<i64>, resale: Option<NaiveDateTime>) -> SwapProfitLink {
        SwapProfitLink {
            status: if resale.is_some() { LinkStatus::Finalized } else { LinkStatus::Pending },
            profit_estimate: Some(Money::from_cents(estimate)),
            final_profit: final_profit.map(Money::from_cents),
            customer_item_sale_id: resale.map(|_| "sale-1".to_string()),
            realized_at: resale,
        }
    }

    #[test]
    fn test_open_link_contributes_nothing() {
        let open = link(5_000, None, None);
        assert!(open.realized_profit().is_zero());
        assert_eq!(open.open_estimate().cents(), 5_000);
    }

    #[test]
    fn test_final_profit_preferred_over_estimate() {
        let done = link(5_000, Some(1_500), Some(at(2025, 11, 10)));
        assert_eq!(done.realized_profit().cents(), 1_500);

        let no_final = link(5_000, None, Some(at(2025, 11, 10)));
        assert_eq!(no_final.realized_profit().cents(), 5_000);
    }

    #[test]
    fn test_status_alone_does_not_realize() {
        let mut l = link(5_000, Some(1_500), None);
        l.status = LinkStatus::Finalized;
        assert!(l.realized_profit().is_zero());
    }

    #[test]
    fn test_summarize_splits_realized_and_pending() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2025, 11, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 11, 30).unwrap(),
        )
        .unwrap();
        let entries = vec![
            entry("s-1", at(2025, 11, 2), Some(link(1_000, Some(1_500), Some(at(2025, 11, 20))))),
            entry("s-2", at(2025, 11, 3), Some(link(5_000, None, None))),
            entry("s-3", at(2025, 11, 4), None),
            // taken in October, resold in November
            entry("s-4", at(2025, 10, 20), Some(link(700, None, Some(at(2025, 11, 5))))),
        ];

        let stats = summarize(&entries, &range);
        assert_eq!(stats.total_swaps, 3);
        assert_eq!(stats.pending_swaps, 2);
        assert_eq!(stats.realized_swaps, 2);
        assert_eq!(stats.realized_profit.cents(), 2_200);
        assert_eq!(stats.realized_revenue.cents(), 60_000);
        assert_eq!(stats.open_estimate.cents(), 5_000);
    }

    #[test]
    fn test_realized_profit_in_window() {
        let entries = vec![
            entry("s-1", at(2025, 11, 2), Some(link(0, Some(1_500), Some(at(2025, 11, 20))))),
            entry("s-2", at(2025, 11, 2), Some(link(0, Some(900), Some(at(2025, 12, 1))))),
        ];
        let november = BucketWindow::from_dates(
            NaiveDate::from_ymd_opt(2025, 11, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 11, 30).unwrap(),
        );
        assert_eq!(realized_profit_in(&entries, &november).cents(), 1_500);
    }
}
