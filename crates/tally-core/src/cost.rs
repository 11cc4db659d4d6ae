//! # Cost Resolution
//!
//! Pure resolution of the cost of sold line items against a product
//! catalogue that was loaded once for the request.
//!
//! ## Resolution Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Cost Resolution                                  │
//! │                                                                         │
//! │  SoldLine { product_id?, item_name?, quantity }                         │
//! │        │                                                                │
//! │        ├── product_id present? ──► catalogue.by_id                      │
//! │        │                                                                │
//! │        └── no product_id ───────► catalogue.by_name (trimmed, lower)    │
//! │                 │                                                       │
//! │                 ▼                                                       │
//! │  unit cost: cost_price ──► cost ──► purchase_price ──► 0                │
//! │             (first value that is present AND > 0 wins)                  │
//! │                 │                                                       │
//! │                 ▼                                                       │
//! │  line cost = unit cost × quantity                                       │
//! │                                                                         │
//! │  Σ line costs == 0 and revenue > 0  ──►  cost = revenue × 70%           │
//! │                                          cost_is_estimated = true       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Which cost columns exist is a schema question answered before any of
//! this runs; a column that does not exist simply arrives here as `None`.

use std::collections::HashMap;

use crate::money::Money;

// =============================================================================
// Cost Fields
// =============================================================================

/// A product column that may carry a unit cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CostField {
    CostPrice,
    Cost,
    PurchasePrice,
}

impl CostField {
    /// Resolution order, highest priority first.
    pub const PRIORITY: [CostField; 3] = [
        CostField::CostPrice,
        CostField::Cost,
        CostField::PurchasePrice,
    ];

    /// Column name in the `products` table.
    pub const fn column(&self) -> &'static str {
        match self {
            CostField::CostPrice => "cost_price_cents",
            CostField::Cost => "cost_cents",
            CostField::PurchasePrice => "purchase_price_cents",
        }
    }
}

// =============================================================================
// Product Cost Record
// =============================================================================

/// The cost-relevant slice of a product row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProductCost {
    pub id: String,
    pub name: String,
    pub cost_price: Option<Money>,
    pub cost: Option<Money>,
    pub purchase_price: Option<Money>,
}

impl ProductCost {
    pub fn field(&self, field: CostField) -> Option<Money> {
        match field {
            CostField::CostPrice => self.cost_price,
            CostField::Cost => self.cost,
            CostField::PurchasePrice => self.purchase_price,
        }
    }

    /// Unit cost through the priority chain. Zero means "not set".
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::cost::ProductCost;
    /// use tally_core::money::Money;
    ///
    /// let product = ProductCost {
    ///     cost_price: Some(Money::zero()),
    ///     cost: Some(Money::from_cents(1500)),
    ///     ..Default::default()
    /// };
    /// assert_eq!(product.unit_cost().cents(), 1500);
    /// ```
    pub fn unit_cost(&self) -> Money {
        CostField::PRIORITY
            .iter()
            .filter_map(|field| self.field(*field))
            .find(|value| value.is_positive())
            .unwrap_or_default()
    }
}

/// Normalises a product or line-item name for matching.
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

// =============================================================================
// Catalogue
// =============================================================================

/// One company's products, indexed for line-item matching.
#[derive(Debug, Clone, Default)]
pub struct ProductCatalog {
    products: Vec<ProductCost>,
    by_id: HashMap<String, usize>,
    by_name: HashMap<String, usize>,
}

impl ProductCatalog {
    /// Builds the indexes. When two products share a name, the first one
    /// in `products` wins name lookups.
    pub fn new(products: Vec<ProductCost>) -> Self {
        let mut by_id = HashMap::with_capacity(products.len());
        let mut by_name = HashMap::with_capacity(products.len());

        for (idx, product) in products.iter().enumerate() {
            by_id.entry(product.id.clone()).or_insert(idx);
            let key = name_key(&product.name);
            if !key.is_empty() {
                by_name.entry(key).or_insert(idx);
            }
        }

        ProductCatalog {
            products,
            by_id,
            by_name,
        }
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn products(&self) -> &[ProductCost] {
        &self.products
    }

    pub fn by_id(&self, id: &str) -> Option<&ProductCost> {
        self.by_id.get(id).map(|idx| &self.products[*idx])
    }

    pub fn by_name(&self, name: &str) -> Option<&ProductCost> {
        self.by_name.get(&name_key(name)).map(|idx| &self.products[*idx])
    }

    /// Finds the product a sold line refers to.
    ///
    /// A line that carries a product id is matched by id only; the name is
    /// consulted just for lines with no id at all.
    pub fn lookup(&self, line: &SoldLine) -> Option<&ProductCost> {
        match line.product_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => self.by_id(id),
            _ => line.item_name.as_deref().and_then(|name| self.by_name(name)),
        }
    }
}

// =============================================================================
// Line Resolution
// =============================================================================

/// A sold line item as read from `sale_items`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoldLine {
    pub product_id: Option<String>,
    pub item_name: Option<String>,
    pub quantity: i64,
}

/// Result of resolving a set of lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CostResolution {
    pub cost: Money,
    pub matched_lines: usize,
    pub unmatched_lines: usize,
}

/// Sums `unit cost × quantity` over every line. Never fails.
pub fn resolve_lines<'a, I>(catalog: &ProductCatalog, lines: I) -> CostResolution
where
    I: IntoIterator<Item = &'a SoldLine>,
{
    let mut resolution = CostResolution::default();

    for line in lines {
        let quantity = line.quantity.max(0);
        match catalog.lookup(line) {
            Some(product) => {
                resolution.cost += product.unit_cost().multiply_quantity(quantity);
                resolution.matched_lines += 1;
            }
            None => resolution.unmatched_lines += 1,
        }
    }

    resolution
}

// =============================================================================
// Estimated Cost Fallback
// =============================================================================

/// Final cost of a bucket after the estimate fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CostOutcome {
    pub cost: Money,
    pub estimated: bool,
}

impl CostOutcome {
    /// Applies the fallback: a zero resolved cost against positive revenue
    /// becomes `revenue × estimated_cost_bps`.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::cost::CostOutcome;
    /// use tally_core::money::Money;
    ///
    /// let outcome = CostOutcome::with_estimate(Money::zero(), Money::from_cents(10_000), 7_000);
    /// assert_eq!(outcome.cost.cents(), 7_000);
    /// assert!(outcome.estimated);
    /// ```
    pub fn with_estimate(resolved: Money, revenue: Money, estimated_cost_bps: u32) -> Self {
        if resolved.is_zero() && revenue.is_positive() {
            CostOutcome {
                cost: revenue.percentage_of(estimated_cost_bps),
                estimated: true,
            }
        } else {
            CostOutcome {
                cost: resolved.clamp_non_negative(),
                estimated: false,
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: &str, name: &str) -> ProductCost {
        ProductCost {
            id: id.to_string(),
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn line(product_id: Option<&str>, name: Option<&str>, quantity: i64) -> SoldLine {
        SoldLine {
            product_id: product_id.map(str::to_string),
            item_name: name.map(str::to_string),
            quantity,
        }
    }

    #[test]
    fn test_unit_cost_priority_chain() {
        let mut p = product("p-1", "Case");
        assert!(p.unit_cost().is_zero());

        p.purchase_price = Some(Money::from_cents(300));
        assert_eq!(p.unit_cost().cents(), 300);

        p.cost = Some(Money::from_cents(200));
        assert_eq!(p.unit_cost().cents(), 200);

        p.cost_price = Some(Money::from_cents(100));
        assert_eq!(p.unit_cost().cents(), 100);
    }

    #[test]
    fn test_only_cost_column_set() {
        let mut p = product("p-1", "Charger");
        p.cost = Some(Money::from_cents(1250));
        assert_eq!(p.unit_cost().cents(), 1250);
    }

    #[test]
    fn test_name_match_only_without_product_id() {
        let mut p = product("p-1", "  iPhone Case ");
        p.cost_price = Some(Money::from_cents(2000));
        let catalog = ProductCatalog::new(vec![p]);

        assert!(catalog.lookup(&line(None, Some("iphone case"), 1)).is_some());
        // an id that is not in the catalogue does not fall back to the name
        assert!(catalog.lookup(&line(Some("p-404"), Some("iphone case"), 1)).is_none());
    }

    #[test]
    fn test_resolve_lines_counts_matches() {
        let mut p = product("p-1", "Cable");
        p.cost_price = Some(Money::from_cents(2000));
        let catalog = ProductCatalog::new(vec![p]);

        let lines = vec![
            line(Some("p-1"), None, 2),
            line(None, Some("Unknown thing"), 1),
        ];
        let resolution = resolve_lines(&catalog, &lines);
        assert_eq!(resolution.cost.cents(), 4000);
        assert_eq!(resolution.matched_lines, 1);
        assert_eq!(resolution.unmatched_lines, 1);
    }

    #[test]
    fn test_estimate_only_when_cost_zero_and_revenue_positive() {
        let revenue = Money::from_cents(10_000);

        let resolved = CostOutcome::with_estimate(Money::from_cents(4000), revenue, 7_000);
        assert_eq!(resolved, CostOutcome { cost: Money::from_cents(4000), estimated: false });

        let estimated = CostOutcome::with_estimate(Money::zero(), revenue, 7_000);
        assert_eq!(estimated.cost.cents(), 7000);
        assert!(estimated.estimated);

        let empty = CostOutcome::with_estimate(Money::zero(), Money::zero(), 7_000);
        assert!(!empty.estimated);
        assert!(empty.cost.is_zero());
    }
}
