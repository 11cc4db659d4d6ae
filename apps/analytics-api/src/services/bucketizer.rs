//! # Period Bucketizer
//!
//! Builds the daily, weekly and monthly profit sequences for one request.
//!
//! ## Windows
//! ```text
//!            date_from                                  date_to
//!                │                                         │
//! daily    ......[d][d][d][d][d][d][d][d][d][d][d][d][d][d]│   clipped to the range
//! weekly   ......[  w (Mon-Sun)  ][  w  ][  w  ][  w  ][ w]│   clipped to the range
//! monthly  [ m ][ m ][    m     ][    m     ][     m       ]│   first sale → date_to
//!          ▲
//!          month of the company's first pure sale
//! ```
//!
//! Every bucket is priced on its own window: the Cost Resolver runs over
//! the bucket's line items and realized swap profit is attributed by resale
//! date.

use tracing::{debug, info};

use tally_core::period::{month_span_desc, BucketWindow, YearMonth};
use tally_core::report::{fill_months, roll_up_weeks, PeriodBucket, ProfitBreakdown, RawPeriodTotals};
use tally_core::swap::{realized_profit_in, SwapEntry};
use tally_core::types::ModuleKey;

use super::cost_resolver::CostResolver;
use super::{degraded, ReportSession};

/// Prices raw period totals into buckets.
pub struct Bucketizer<'a> {
    session: &'a ReportSession,
    resolver: &'a CostResolver,
    swaps: Vec<SwapEntry>,
}

impl<'a> Bucketizer<'a> {
    /// Loads the swaps that may be realized in any bucket of the report.
    ///
    /// Swap profit is only attributed when the swaps module is enabled.
    pub async fn new(session: &'a ReportSession, resolver: &'a CostResolver) -> Bucketizer<'a> {
        let swaps = if session.module_enabled(ModuleKey::Swaps) {
            let window = Self::report_window(session).await;
            degraded(
                "swap_entries",
                session
                    .db
                    .swaps()
                    .entries(session.company_id(), &window, &session.caps)
                    .await,
            )
        } else {
            Vec::new()
        };

        Bucketizer {
            session,
            resolver,
            swaps,
        }
    }

    /// Widest window any bucket covers: from the first month of sales (or
    /// `date_from`, whichever is earlier) through `date_to`.
    async fn report_window(session: &ReportSession) -> BucketWindow {
        let range = session.ctx.range;
        let first_sale = degraded(
            "first_sale",
            session.db.sales().first_sale_at(&session.scope(), &session.caps).await,
        );
        let first_day = first_sale
            .map(|at| YearMonth::from_date(at.date()).first_day())
            .map_or(range.from, |first| first.min(range.from));
        BucketWindow::from_dates(first_day, range.to)
    }

    pub fn swap_entries(&self) -> &[SwapEntry] {
        &self.swaps
    }

    /// Prices one raw row on `window`.
    async fn price(&self, raw: RawPeriodTotals, window: BucketWindow) -> PeriodBucket {
        let scope = self.session.scope().with_window(window);
        let cost = self.resolver.cost_for(self.session, &scope, raw.revenue).await;
        let swap_profit = realized_profit_in(&self.swaps, &window);
        PeriodBucket::new(raw, cost, swap_profit)
    }

    async fn price_all(&self, rows: Vec<RawPeriodTotals>, clip_start: bool) -> Vec<PeriodBucket> {
        let range = &self.session.ctx.range;
        let mut buckets = Vec::with_capacity(rows.len());
        for raw in rows {
            let window = if clip_start {
                raw.key.window().clip(range)
            } else {
                raw.key.window().clip_end(range.to)
            };
            buckets.push(self.price(raw, window).await);
        }
        buckets
    }

    /// Daily rows, newest first; days without sales are absent.
    pub async fn daily_totals(&self) -> Vec<RawPeriodTotals> {
        degraded(
            "daily_totals",
            self.session
                .db
                .sales()
                .daily_totals(&self.session.scope(), &self.session.caps)
                .await,
        )
    }

    /// Monthly rows from the first pure sale through `date_to`, zero months
    /// included, newest first.
    pub async fn monthly_totals(&self) -> Vec<RawPeriodTotals> {
        let sales = self.session.db.sales();
        let scope = self.session.scope();
        let range = self.session.ctx.range;

        let Some(first_sale) = degraded(
            "first_sale",
            sales.first_sale_at(&scope, &self.session.caps).await,
        ) else {
            return Vec::new();
        };

        let first_day = first_sale.date();
        let span = month_span_desc(first_day, range.to);
        let monthly_scope = scope.with_window(BucketWindow::from_dates(first_day, range.to));
        let monthly = degraded(
            "monthly_totals",
            sales.monthly_totals(&monthly_scope, &self.session.caps).await,
        );
        fill_months(&span, &monthly)
    }

    /// Builds all three sequences.
    pub async fn breakdown(&self) -> ProfitBreakdown {
        let daily_raw = self.daily_totals().await;
        let weekly_raw = roll_up_weeks(&daily_raw);
        let monthly_raw = self.monthly_totals().await;

        let breakdown = ProfitBreakdown {
            daily: self.price_all(daily_raw, true).await,
            weekly: self.price_all(weekly_raw, true).await,
            monthly: self.price_all(monthly_raw, false).await,
        };

        info!(
            company_id = self.session.company_id(),
            daily = breakdown.daily.len(),
            weekly = breakdown.weekly.len(),
            monthly = breakdown.monthly.len(),
            estimated = breakdown.estimated_buckets(),
            swaps = self.swaps.len(),
            "Profit breakdown built"
        );
        debug!(staff_id = ?self.session.ctx.staff_filter, "Breakdown scope");
        breakdown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fixtures::*;
    use tally_core::money::Money;
    use tally_core::ReportPolicy;

    async fn session_with(sql: &[&str], from: (i32, u32, u32), to: (i32, u32, u32)) -> ReportSession {
        let db = database().await;
        for stmt in sql {
            exec(&db, stmt).await;
        }
        let ctx = context("c-1", date(from.0, from.1, from.2), date(to.0, to.1, to.2));
        ReportSession::open(&db, ctx, ReportPolicy::default()).await.unwrap()
    }

    const ONE_SALE: [&str; 3] = [
        "INSERT INTO products (id, company_id, name, cost_price_cents) VALUES ('p-1', 'c-1', 'Case', 2000)",
        "INSERT INTO sales (id, company_id, final_amount_cents, created_at) VALUES ('s-1', 'c-1', 10000, '2025-11-05 14:30:00')",
        "INSERT INTO sale_items (id, sale_id, product_id, item_name, quantity, unit_price_cents) VALUES ('i-1', 's-1', 'p-1', 'Case', 2, 5000)",
    ];

    #[tokio::test]
    async fn test_single_sale_in_every_sequence() {
        let session = session_with(&ONE_SALE, (2025, 11, 1), (2025, 11, 30)).await;
        let resolver = CostResolver::load(&session).await;
        let breakdown = Bucketizer::new(&session, &resolver).await.breakdown().await;

        assert_eq!(breakdown.daily.len(), 1);
        assert_eq!(breakdown.weekly.len(), 1);
        assert_eq!(breakdown.monthly.len(), 1);

        let month = &breakdown.monthly[0];
        assert_eq!(month.key.to_string(), "2025-11");
        assert_eq!(month.sales_count, 1);
        assert_eq!(month.revenue, Money::from_cents(10_000));
        assert_eq!(month.cost, Money::from_cents(4_000));
        assert_eq!(month.profit, Money::from_cents(6_000));
        assert!(!month.cost_is_estimated);

        assert_eq!(breakdown.weekly[0].key.to_string(), "2025-W45");
        assert_eq!(breakdown.daily[0].profit, Money::from_cents(6_000));
    }

    #[tokio::test]
    async fn test_months_reach_back_to_first_sale() {
        let mut sql = ONE_SALE.to_vec();
        sql.push(
            "INSERT INTO sales (id, company_id, final_amount_cents, created_at) VALUES ('s-0', 'c-1', 5000, '2025-08-20 09:00:00')",
        );
        let session = session_with(&sql, (2025, 11, 1), (2025, 11, 30)).await;
        let resolver = CostResolver::load(&session).await;
        let breakdown = Bucketizer::new(&session, &resolver).await.breakdown().await;

        let labels: Vec<String> = breakdown.monthly.iter().map(|b| b.key.to_string()).collect();
        assert_eq!(labels, vec!["2025-11", "2025-10", "2025-09", "2025-08"]);
        assert_eq!(breakdown.monthly[1].sales_count, 0);
        assert!(breakdown.monthly[1].revenue.is_zero());

        // the August sale has no items: estimated at 70%
        let august = &breakdown.monthly[3];
        assert_eq!(august.cost, Money::from_cents(3_500));
        assert!(august.cost_is_estimated);

        // daily stays inside the requested range
        assert_eq!(breakdown.daily.len(), 1);
    }

    #[tokio::test]
    async fn test_swap_mode_sales_excluded() {
        let mut sql = ONE_SALE.to_vec();
        sql.push(
            "INSERT INTO sales (id, company_id, final_amount_cents, is_swap_mode, swap_id, created_at) \
             VALUES ('s-swap', 'c-1', 90000, 1, 'sw-1', '2025-11-05 15:00:00')",
        );
        let session = session_with(&sql, (2025, 11, 1), (2025, 11, 30)).await;
        let resolver = CostResolver::load(&session).await;
        let bucketizer = Bucketizer::new(&session, &resolver).await;

        let first = bucketizer.breakdown().await;
        assert_eq!(first.daily[0].revenue, Money::from_cents(10_000));
        assert_eq!(first.monthly[0].sales_count, 1);

        let second = bucketizer.breakdown().await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_realized_swap_profit_lands_in_resale_bucket() {
        let mut sql = ONE_SALE.to_vec();
        sql.extend([
            "INSERT INTO swaps (id, company_id, total_value_cents, created_at) VALUES \
             ('sw-1', 'c-1', 30000, '2025-10-20 10:00:00'), ('sw-2', 'c-1', 20000, '2025-11-02 10:00:00')",
            "INSERT INTO sales (id, company_id, final_amount_cents, is_swap_mode, created_at) VALUES \
             ('s-resale', 'c-1', 32000, 1, '2025-11-12 11:00:00')",
            "INSERT INTO swap_profit_links (id, swap_id, customer_item_sale_id, profit_estimate_cents, final_profit_cents, status) VALUES \
             ('l-1', 'sw-1', 's-resale', 2000, 1500, 'finalized'), \
             ('l-2', 'sw-2', NULL, 5000, NULL, 'pending')",
        ]);
        let session = session_with(&sql, (2025, 11, 1), (2025, 11, 30)).await;
        let resolver = CostResolver::load(&session).await;
        let breakdown = Bucketizer::new(&session, &resolver).await.breakdown().await;

        let month = &breakdown.monthly[0];
        assert_eq!(month.swap_profit, Money::from_cents(1_500));
        assert_eq!(month.profit_before_swaps, Money::from_cents(6_000));
        assert_eq!(month.profit, Money::from_cents(7_500));

        // the resale day has no pure sales, so no daily row carries it
        assert!(breakdown.daily.iter().all(|d| d.swap_profit.is_zero()));
        let week = breakdown.weekly.iter().find(|w| w.key.to_string() == "2025-W45").unwrap();
        assert!(week.swap_profit.is_zero());
    }

    #[tokio::test]
    async fn test_staff_filter_narrows_buckets() {
        let sql = [
            "INSERT INTO sales (id, company_id, created_by, final_amount_cents, created_at) VALUES \
             ('s-1', 'c-1', 'u-1', 10000, '2025-11-05 10:00:00'), \
             ('s-2', 'c-1', 'u-2', 4000, '2025-11-05 11:00:00')",
        ];
        let db = database().await;
        for stmt in sql {
            exec(&db, stmt).await;
        }
        let mut ctx = context("c-1", date(2025, 11, 1), date(2025, 11, 30));
        ctx.staff_filter = Some("u-2".to_string());
        let session = ReportSession::open(&db, ctx, ReportPolicy::default()).await.unwrap();
        let resolver = CostResolver::load(&session).await;
        let breakdown = Bucketizer::new(&session, &resolver).await.breakdown().await;

        assert_eq!(breakdown.daily[0].revenue, Money::from_cents(4_000));
        assert_eq!(breakdown.monthly[0].revenue, Money::from_cents(4_000));
    }
}
