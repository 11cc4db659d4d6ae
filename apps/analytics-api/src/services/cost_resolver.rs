//! # Cost Resolver
//!
//! Prices sold goods against the company's product catalogue.
//!
//! ```text
//! load()  ── products (whichever cost columns exist) ──► ProductCatalog
//!
//! cost_for(scope, revenue)
//!    sale_items in scope ──► match by id, else by name
//!                       ──► Σ unit_cost × quantity
//!                       ──► 0 with revenue > 0 ? revenue × 70%, estimated
//! ```
//!
//! The catalogue is loaded once per request; every bucket after that costs
//! one line-item query and a pure pass over the catalogue.

use std::collections::HashMap;

use tracing::{debug, warn};

use tally_core::cost::{resolve_lines, CostOutcome, ProductCatalog, SoldLine};
use tally_core::money::Money;
use tally_db::SalesScope;

use super::{degraded, ReportSession};

/// Catalogue-backed cost lookups for one request.
#[derive(Debug, Clone)]
pub struct CostResolver {
    catalog: ProductCatalog,
    estimated_cost_bps: u32,
}

impl CostResolver {
    pub fn new(catalog: ProductCatalog, estimated_cost_bps: u32) -> Self {
        CostResolver {
            catalog,
            estimated_cost_bps,
        }
    }

    /// Loads the company catalogue. An unreadable catalogue is empty, which
    /// routes every bucket through the estimate.
    pub async fn load(session: &ReportSession) -> Self {
        let products = degraded(
            "cost_catalog",
            session
                .db
                .products()
                .cost_catalog(session.company_id(), &session.caps)
                .await,
        );

        debug!(
            company_id = session.company_id(),
            products = products.len(),
            "Cost catalogue loaded"
        );
        CostResolver::new(ProductCatalog::new(products), session.policy.estimated_cost_bps)
    }

    pub fn catalog(&self) -> &ProductCatalog {
        &self.catalog
    }

    /// Cost of the pure sales in `scope` that brought in `revenue`.
    pub async fn cost_for(
        &self,
        session: &ReportSession,
        scope: &SalesScope,
        revenue: Money,
    ) -> CostOutcome {
        if !revenue.is_positive() {
            return CostOutcome::default();
        }

        let lines = match session.db.sales().sold_lines(scope, &session.caps).await {
            Ok(lines) => lines,
            Err(error) => {
                warn!(
                    stage = "sold_lines",
                    %error,
                    start = %scope.window.start,
                    end = %scope.window.end,
                    "Line items unreadable, estimating cost"
                );
                Vec::new()
            }
        };

        self.price_lines(&lines, revenue)
    }

    /// Applies the catalogue and the estimate fallback to a set of lines.
    pub fn price_lines(&self, lines: &[SoldLine], revenue: Money) -> CostOutcome {
        let resolution = resolve_lines(&self.catalog, lines);
        if resolution.unmatched_lines > 0 {
            debug!(
                matched = resolution.matched_lines,
                unmatched = resolution.unmatched_lines,
                "Some line items matched no product"
            );
        }
        CostOutcome::with_estimate(resolution.cost, revenue, self.estimated_cost_bps)
    }

    /// Prices several sales at once from `(sale_id, line)` pairs.
    ///
    /// `revenues` maps each sale to its final amount; sales without lines
    /// still get the estimate.
    pub fn price_sales(
        &self,
        lines: Vec<(String, SoldLine)>,
        revenues: &HashMap<String, Money>,
    ) -> HashMap<String, CostOutcome> {
        let mut by_sale: HashMap<String, Vec<SoldLine>> = HashMap::new();
        for (sale_id, line) in lines {
            by_sale.entry(sale_id).or_default().push(line);
        }

        revenues
            .iter()
            .map(|(sale_id, revenue)| {
                let lines = by_sale.get(sale_id).map(Vec::as_slice).unwrap_or(&[]);
                (sale_id.clone(), self.price_lines(lines, *revenue))
            })
            .collect()
    }

    /// Unit cost of a catalogue product; zero when the id is unknown.
    pub fn unit_cost(&self, product_id: Option<&str>) -> Money {
        product_id
            .and_then(|id| self.catalog.by_id(id.trim()))
            .map(|product| product.unit_cost())
            .unwrap_or_default()
    }
}
