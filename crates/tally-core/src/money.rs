//! # Money Module
//!
//! Provides the `Money` type for monetary values and `DiscountRate` for
//! sale-level percentage discounts.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  A sale stores subtotal, discount and total. With floats the stored     │
//! │  line subtotals may not add up to the stored sale subtotal.             │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents + Basis Points                             │
//! │    price 1099 cents × 3 = 3297 cents, exactly                           │
//! │    10% discount = 1000 bps, rounded once, half-up                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::money::{DiscountRate, Money};
//!
//! let price = Money::from_cents(1099); // $10.99
//! let line = price * 3i64;             // $32.97
//! let off = line.percentage(DiscountRate::from_bps(1000));
//! assert_eq!(off.cents(), 330);        // $3.297 → $3.30
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: Subtraction of discounts never needs a separate type
/// - **Single field tuple struct**: Zero-cost abstraction over i64
///
/// ## Where Money is Used
/// ```text
/// Product.price_cents ──► CartLine.unit_price_cents ──► line subtotal
///                                                          │
///                     Sale.subtotal ◄──────── Σ ───────────┘
///                          │
///                          ├──► discount value (DiscountRate)
///                          ▼
///                     Sale.total = subtotal − discount value
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // Represents $10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit (dollars) portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit (cents) portion (always 0-99).
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

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies money by a quantity, saturating at the `i64` bounds.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(299); // $2.99
    /// let line_total = unit_price.multiply_quantity(3);
    /// assert_eq!(line_total.cents(), 897); // $8.97
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }

    /// Returns `rate` of this amount, rounded half-up to the cent.
    ///
    /// ## Implementation
    /// Integer math: `(amount * bps + 5000) / 10000`.
    /// At 10000 bps (100%) the result is exactly the amount, so a full
    /// discount always leaves a zero total.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::{DiscountRate, Money};
    ///
    /// let subtotal = Money::from_cents(1000);
    /// assert_eq!(subtotal.percentage(DiscountRate::from_bps(825)).cents(), 83);
    /// assert_eq!(subtotal.percentage(DiscountRate::full()).cents(), 1000);
    /// ```
    pub fn percentage(&self, rate: DiscountRate) -> Money {
        // i128 prevents overflow on large amounts
        let cents = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_cents(cents as i64)
    }
}

/// Display shows money as `$12.34`. Debug/log formatting only; the web
/// client localises amounts itself.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}${}.{:02}",
            sign,
            self.dollars().abs(),
            self.cents_part()
        )
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

// Addition and multiplication saturate. Prices are capped well below the
// point where a full cart could reach the bounds.
impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
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

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        self.multiply_quantity(qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Discount Rate
// =============================================================================

/// Sale-level discount in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000, so 10000 bps = 100%.
/// The cashier types a percentage; it is converted once, at the edge,
/// and all arithmetic after that is integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DiscountRate(u32);

impl DiscountRate {
    /// Largest accepted rate (100%).
    pub const MAX_BPS: u32 = 10_000;

    /// Creates a rate from basis points, saturating at 100%.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        if bps > Self::MAX_BPS {
            DiscountRate(Self::MAX_BPS)
        } else {
            DiscountRate(bps)
        }
    }

    /// Parses a percentage entered by the cashier.
    ///
    /// ## Errors
    /// `CoreError::InvalidDiscount` for NaN, infinities, or values outside
    /// `[0, 100]`.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::DiscountRate;
    ///
    /// assert_eq!(DiscountRate::from_percentage(12.5).unwrap().bps(), 1250);
    /// assert!(DiscountRate::from_percentage(101.0).is_err());
    /// assert!(DiscountRate::from_percentage(-1.0).is_err());
    /// ```
    pub fn from_percentage(pct: f64) -> CoreResult<Self> {
        if !pct.is_finite() || !(0.0..=100.0).contains(&pct) {
            return Err(CoreError::InvalidDiscount { percent: pct });
        }
        Ok(DiscountRate::from_bps((pct * 100.0).round() as u32))
    }

    /// Converts a percentage, clamping it into `[0, 100]`. NaN becomes 0.
    ///
    /// Used for live totals while the cart is being edited.
    pub fn clamped(pct: f64) -> Self {
        if pct.is_nan() {
            return DiscountRate::none();
        }
        let pct = pct.clamp(0.0, 100.0);
        DiscountRate::from_bps((pct * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// No discount.
    #[inline]
    pub const fn none() -> Self {
        DiscountRate(0)
    }

    /// 100% discount.
    #[inline]
    pub const fn full() -> Self {
        DiscountRate(Self::MAX_BPS)
    }

    /// Checks if the rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for DiscountRate {
    fn default() -> Self {
        DiscountRate::none()
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
        assert_eq!(money.dollars(), 10);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "$10.99");
        assert_eq!(format!("{}", Money::from_cents(500)), "$5.00");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-$5.50");
        assert_eq!(format!("{}", Money::from_cents(0)), "$0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3i64).cents(), 3000);

        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total.cents(), 2000);
    }

    #[test]
    fn test_arithmetic_saturates_instead_of_panicking() {
        let big = Money::from_cents(i64::MAX / 2);

        assert_eq!(big.multiply_quantity(999).cents(), i64::MAX);
        assert_eq!((big * 3i64).cents(), i64::MAX);

        let total: Money = vec![big, big, big].into_iter().sum();
        assert_eq!(total.cents(), i64::MAX);

        let mut acc = big;
        acc += big;
        acc += big;
        assert_eq!(acc.cents(), i64::MAX);
    }

    #[test]
    fn test_percentage_rounds_half_up() {
        // $10.00 at 8.25% = $0.825 → $0.83
        let amount = Money::from_cents(1000);
        assert_eq!(amount.percentage(DiscountRate::from_bps(825)).cents(), 83);
        // $0.05 at 10% = $0.005 → $0.01
        let small = Money::from_cents(5);
        assert_eq!(small.percentage(DiscountRate::from_bps(1000)).cents(), 1);
    }

    #[test]
    fn test_percentage_boundaries() {
        let amount = Money::from_cents(12_345);
        assert_eq!(amount.percentage(DiscountRate::none()), Money::zero());
        assert_eq!(amount.percentage(DiscountRate::full()), amount);
    }

    #[test]
    fn test_discount_rate_from_percentage() {
        assert_eq!(DiscountRate::from_percentage(0.0).unwrap().bps(), 0);
        assert_eq!(DiscountRate::from_percentage(100.0).unwrap().bps(), 10_000);
        assert_eq!(DiscountRate::from_percentage(7.25).unwrap().bps(), 725);

        assert!(DiscountRate::from_percentage(100.01).is_err());
        assert!(DiscountRate::from_percentage(-0.5).is_err());
        assert!(DiscountRate::from_percentage(f64::NAN).is_err());
        assert!(DiscountRate::from_percentage(f64::INFINITY).is_err());
    }

    #[test]
    fn test_discount_rate_clamped() {
        assert_eq!(DiscountRate::clamped(-20.0), DiscountRate::none());
        assert_eq!(DiscountRate::clamped(250.0), DiscountRate::full());
        assert_eq!(DiscountRate::clamped(f64::NAN), DiscountRate::none());
        assert_eq!(DiscountRate::clamped(15.0).bps(), 1500);
    }

    #[test]
    fn test_from_bps_saturates() {
        assert_eq!(DiscountRate::from_bps(20_000), DiscountRate::full());
    }
}
