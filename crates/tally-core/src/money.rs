//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM IN REPORTS                                  │
//! │                                                                         │
//! │  Summing 30 daily profits as floats:                                    │
//! │    Σ daily ≠ monthly total by a few hundredths  ❌ WRONG!               │
//! │                                                                         │
//! │  The dashboard shows "Net Profit" next to the breakdown table and the  │
//! │  two MUST agree to the cent.                                            │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    Every bucket, every total, every estimate is an i64 of cents.       │
//! │    Floats only appear at the JSON boundary (two decimal places).       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::money::Money;
//!
//! let revenue = Money::from_cents(10_000); // 100.00
//! let cost = Money::from_cents(4_000);     //  40.00
//! assert_eq!((revenue - cost).cents(), 6_000);
//!
//! // 70% of revenue, used when no product cost can be found
//! assert_eq!(revenue.percentage_of(7_000).cents(), 7_000);
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use ts_rs::TS;

/// Basis points in one whole (100%).
pub const BPS_SCALE: i128 = 10_000;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: profit before clamping can be negative
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Serialization**: rendered as a decimal number in major units
///   (`10050` cents → `100.5`), because dashboard widgets plot amounts
///   directly. Deserialization accepts the same representation.
///
/// ## Where Money Flows
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                                                                         │
/// │  sales.final_amount_cents ──► PeriodBucket.revenue ──┐                  │
/// │                                                      ├──► ReportTotals │
/// │  sale_items × unit cost ────► PeriodBucket.cost ─────┘                  │
/// │                                                                         │
/// │  swap_profit_links.final_profit_cents ──► swap_profit                  │
/// │                                                                         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, TS)]
#[ts(export)]
pub struct Money(#[ts(type = "number")] i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from a decimal amount in major units.
    ///
    /// Rounds half away from zero to the nearest cent. Only used at the
    /// boundaries (JSON input, legacy REAL columns), never in arithmetic.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// assert_eq!(Money::from_major(100.0).cents(), 10_000);
    /// assert_eq!(Money::from_major(0.125).cents(), 13);
    /// ```
    pub fn from_major(amount: f64) -> Self {
        if !amount.is_finite() {
            return Money::zero();
        }
        Money((amount * 100.0).round() as i64)
    }

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the value in major units as a float, for display only.
    #[inline]
    pub fn to_major(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn major_part(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Clamps negative values to zero.
    ///
    /// ## Why?
    /// Cost overruns are reported as zero profit, never as a negative
    /// figure. Every profit that leaves this crate passes through here.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(-500).clamp_non_negative(), Money::zero());
    /// assert_eq!(Money::from_cents(500).clamp_non_negative().cents(), 500);
    /// ```
    #[inline]
    pub const fn clamp_non_negative(self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            self
        }
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// let unit_cost = Money::from_cents(2000);
    /// assert_eq!(unit_cost.multiply_quantity(2).cents(), 4000);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Returns `bps` basis points of this amount (7000 bps = 70%).
    ///
    /// ## Implementation
    /// Integer math with half-up rounding: `(amount * bps + 5000) / 10000`.
    /// i128 keeps large multi-year totals from overflowing.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// let revenue = Money::from_cents(10_000);
    /// assert_eq!(revenue.percentage_of(7_000).cents(), 7_000); // 70%
    /// assert_eq!(revenue.percentage_of(5_000).cents(), 5_000); // 50%
    /// ```
    pub fn percentage_of(&self, bps: u32) -> Money {
        let scaled = self.0 as i128 * bps as i128;
        let half = BPS_SCALE / 2;
        let rounded = if scaled >= 0 {
            (scaled + half) / BPS_SCALE
        } else {
            (scaled - half) / BPS_SCALE
        };
        Money(rounded as i64)
    }
}

// =============================================================================
// Serde (major units at the boundary)
// =============================================================================

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_major())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = f64::deserialize(deserializer)?;
        Ok(Money::from_major(amount))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation shows money with two decimals.
///
/// ## Note
/// This is for logs. Currency symbols are a dashboard concern.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major_part().abs(), self.cents_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.major_part(), 10);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_from_major_rounds_to_cent() {
        assert_eq!(Money::from_major(19.999).cents(), 2000);
        assert_eq!(Money::from_major(-5.5).cents(), -550);
        assert_eq!(Money::from_major(f64::NAN), Money::zero());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "10.99");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-5.50");
        assert_eq!(format!("{}", Money::zero()), "0.00");
    }

    #[test]
    fn test_percentage_of_rounding() {
        // 70% of 0.01 = 0.007 → 0.01
        assert_eq!(Money::from_cents(1).percentage_of(7_000).cents(), 1);
        // 70% of 33.33 = 23.331 → 23.33
        assert_eq!(Money::from_cents(3333).percentage_of(7_000).cents(), 2333);
        // negative amounts round away from zero symmetrically
        assert_eq!(Money::from_cents(-3).percentage_of(5_000).cents(), -2);
    }

    #[test]
    fn test_clamp_non_negative() {
        assert!(Money::from_cents(-1).clamp_non_negative().is_zero());
        assert_eq!(Money::from_cents(42).clamp_non_negative().cents(), 42);
    }

    #[test]
    fn test_sum() {
        let parts = [Money::from_cents(100), Money::from_cents(250), Money::from_cents(-50)];
        let total: Money = parts.iter().sum();
        assert_eq!(total.cents(), 300);
    }

    #[test]
    fn test_serializes_as_major_units() {
        let json = serde_json::to_string(&Money::from_cents(10050)).unwrap();
        assert_eq!(json, "100.5");

        let back: Money = serde_json::from_str("42.1").unwrap();
        assert_eq!(back.cents(), 4210);
    }
}
