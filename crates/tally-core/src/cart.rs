//! # Cart Model
//!
//! Session-local staging area for line items before a sale is committed.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Operations                                      │
//! │                                                                         │
//! │  Cashier Action           Cart Method             State Change          │
//! │  ──────────────           ───────────             ────────────          │
//! │                                                                         │
//! │  Click Product ──────────► add_item() ──────────► qty + 1 or push      │
//! │                                                                         │
//! │  +/- Buttons ────────────► update_quantity() ───► qty + delta          │
//! │                                                   (≤ 0 removes line)    │
//! │                                                                         │
//! │  Click Remove ───────────► remove_line() ───────► lines.remove(i)      │
//! │                                                                         │
//! │  Click Clear ────────────► clear() ─────────────► lines.clear()        │
//! │                                                                         │
//! │  View Totals ────────────► compute_totals() ────► (read only)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Stock Checks
//! The ceiling applied here comes from the stock the caller saw when it
//! added the item. It keeps the cashier from building an impossible cart,
//! nothing more. The commit engine re-reads persisted stock before writing.
//!
//! A cart belongs to one session. It is plain data with no interior locking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::{DiscountRate, Money};
use crate::types::{ItemKind, Product, Service};
use crate::validation::validate_price_cents;
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

// =============================================================================
// Sellable
// =============================================================================

/// Anything that can be put on a cart line.
pub trait Sellable {
    fn kind(&self) -> ItemKind;
    fn item_id(&self) -> &str;
    fn name(&self) -> &str;
    fn unit_price(&self) -> Money;
}

impl Sellable for Product {
    fn kind(&self) -> ItemKind {
        ItemKind::Product
    }

    fn item_id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn unit_price(&self) -> Money {
        self.price()
    }
}

impl Sellable for Service {
    fn kind(&self) -> ItemKind {
        ItemKind::Service
    }

    fn item_id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn unit_price(&self) -> Money {
        self.price()
    }
}

// =============================================================================
// Cart Line
// =============================================================================

/// A line in the cart.
///
/// ## Design Notes
/// Name and price are frozen when the item is first added. If the catalog
/// changes afterwards the cart keeps showing (and charging) what the cashier
/// saw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub item_id: String,
    pub kind: ItemKind,
    /// Name at time of adding (frozen)
    pub name: String,
    /// Price in cents at time of adding (frozen)
    pub unit_price_cents: i64,
    pub quantity: i64,
    /// Last known stock for product lines, `None` for services.
    pub stock_snapshot: Option<i64>,
    #[ts(as = "String")]
    pub added_at: DateTime<Utc>,
}

impl CartLine {
    fn from_item(item: &impl Sellable, quantity: i64, stock: Option<i64>) -> Self {
        CartLine {
            item_id: item.item_id().to_string(),
            kind: item.kind(),
            name: item.name().to_string(),
            unit_price_cents: item.unit_price().cents(),
            quantity,
            stock_snapshot: stock,
            added_at: Utc::now(),
        }
    }

    /// unit price × quantity
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.unit_price_cents).multiply_quantity(self.quantity)
    }

    fn matches(&self, kind: ItemKind, id: &str) -> bool {
        self.kind == kind && self.item_id == id
    }

    fn check_ceiling(&self, quantity: i64) -> CoreResult<()> {
        if self.kind != ItemKind::Product {
            return Ok(());
        }
        match self.stock_snapshot {
            Some(available) if quantity > available => Err(CoreError::InsufficientStock {
                product_id: self.item_id.clone(),
                name: self.name.clone(),
                available,
                requested: quantity,
            }),
            _ => Ok(()),
        }
    }
}

// =============================================================================
// Cart
// =============================================================================

/// The shopping cart.
///
/// ## Invariants
/// - Lines are unique by `(kind, item_id)`; adding again bumps the quantity
/// - Quantity is always ≥ 1 (a line that would drop to 0 is removed)
/// - At most [`MAX_CART_ITEMS`] lines and [`MAX_ITEM_QUANTITY`] per line
/// - Product lines never exceed their stock snapshot
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Creates a new empty cart.
    pub fn new() -> Self {
        Cart { lines: Vec::new() }
    }

    /// Adds one unit of `item`, or bumps the existing line by one.
    ///
    /// `available_stock` is the stock the caller currently sees for the
    /// product; it is ignored for services. On error the cart is unchanged.
    pub fn add_item(&mut self, item: &impl Sellable, available_stock: Option<i64>) -> CoreResult<()> {
        self.add_quantity(item, 1, available_stock)
    }

    /// Adds `quantity` units of `item`. Same rules as [`Cart::add_item`].
    pub fn add_quantity(
        &mut self,
        item: &impl Sellable,
        quantity: i64,
        available_stock: Option<i64>,
    ) -> CoreResult<()> {
        if quantity <= 0 {
            return Err(ValidationError::MustBePositive {
                field: "quantity".to_string(),
            }
            .into());
        }
        validate_price_cents(item.unit_price().cents())?;

        let kind = item.kind();
        let stock = match kind {
            ItemKind::Product => available_stock,
            ItemKind::Service => None,
        };

        if let Some(line) = self
            .lines
            .iter_mut()
            .find(|l| l.matches(kind, item.item_id()))
        {
            let new_qty = line.quantity.saturating_add(quantity);
            check_max_quantity(new_qty)?;

            let mut candidate = line.clone();
            if stock.is_some() {
                candidate.stock_snapshot = stock;
            }
            candidate.check_ceiling(new_qty)?;

            candidate.quantity = new_qty;
            *line = candidate;
            return Ok(());
        }

        check_max_quantity(quantity)?;
        if self.lines.len() >= MAX_CART_ITEMS {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_ITEMS,
            });
        }

        let line = CartLine::from_item(item, quantity, stock);
        line.check_ceiling(quantity)?;
        self.lines.push(line);
        Ok(())
    }

    /// Changes the quantity of the line at `index` by `delta`.
    ///
    /// A result of zero or less removes the line.
    pub fn update_quantity(&mut self, index: usize, delta: i64) -> CoreResult<()> {
        let line = self
            .lines
            .get_mut(index)
            .ok_or(CoreError::LineNotFound { index })?;

        let new_qty = line.quantity.saturating_add(delta);
        if new_qty <= 0 {
            self.lines.remove(index);
            return Ok(());
        }

        check_max_quantity(new_qty)?;
        line.check_ceiling(new_qty)?;
        line.quantity = new_qty;
        Ok(())
    }

    /// Removes the line at `index`.
    pub fn remove_line(&mut self, index: usize) -> CoreResult<CartLine> {
        if index >= self.lines.len() {
            return Err(CoreError::LineNotFound { index });
        }
        Ok(self.lines.remove(index))
    }

    /// Records a newer stock figure for a product line.
    ///
    /// Does not touch the quantity: a line above its new ceiling is reported
    /// at commit, not silently trimmed.
    pub fn refresh_stock(&mut self, kind: ItemKind, id: &str, stock: i64) -> CoreResult<()> {
        let line = self
            .lines
            .iter_mut()
            .find(|l| l.matches(kind, id))
            .ok_or_else(|| CoreError::ItemNotInCart {
                kind,
                id: id.to_string(),
            })?;
        if kind == ItemKind::Product {
            line.stock_snapshot = Some(stock);
        }
        Ok(())
    }

    /// Clears all lines from the cart.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of distinct lines.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Sum of quantities across all lines.
    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Sum of line subtotals.
    pub fn subtotal(&self) -> Money {
        self.lines.iter().map(CartLine::subtotal).sum()
    }

    /// Totals for a discount percentage, clamped to `[0, 100]`.
    ///
    /// Pure: the same cart and percentage always give the same totals.
    pub fn compute_totals(&self, discount_percent: f64) -> CartTotals {
        self.totals_with(DiscountRate::clamped(discount_percent))
    }

    /// Totals for an already validated discount rate.
    pub fn totals_with(&self, rate: DiscountRate) -> CartTotals {
        let subtotal = self.subtotal();
        let discount = subtotal.percentage(rate);
        CartTotals {
            line_count: self.line_count(),
            total_quantity: self.total_quantity(),
            subtotal_cents: subtotal.cents(),
            discount_bps: rate.bps(),
            discount_cents: discount.cents(),
            total_cents: (subtotal - discount).cents(),
        }
    }
}

fn check_max_quantity(quantity: i64) -> CoreResult<()> {
    if quantity > MAX_ITEM_QUANTITY {
        return Err(CoreError::QuantityTooLarge {
            requested: quantity,
            max: MAX_ITEM_QUANTITY,
        });
    }
    Ok(())
}

/// Cart totals summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    pub line_count: usize,
    pub total_quantity: i64,
    pub subtotal_cents: i64,
    pub discount_bps: u32,
    pub discount_cents: i64,
    pub total_cents: i64,
}

impl CartTotals {
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MAX_PRICE_CENTS;

    fn product(id: &str, price_cents: i64, stock: i64) -> Product {
        Product {
            id: id.to_string(),
            tenant_id: "tenant-a".to_string(),
            name: format!("Product {}", id),
            category: "General".to_string(),
            description: None,
            price_cents,
            stock,
            min_stock: 5,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn service(id: &str, price_cents: i64) -> Service {
        Service {
            id: id.to_string(),
            tenant_id: "tenant-a".to_string(),
            name: format!("Service {}", id),
            description: None,
            price_cents,
            duration_minutes: 30,
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_add_same_item_increments_quantity() {
        let mut cart = Cart::new();
        let p = product("1", 999, 5);

        cart.add_item(&p, Some(p.stock)).unwrap();
        cart.add_item(&p, Some(p.stock)).unwrap();

        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.total_quantity(), 2);
        assert_eq!(cart.subtotal().cents(), 1998);
    }

    #[test]
    fn test_product_and_service_with_same_id_are_distinct_lines() {
        let mut cart = Cart::new();
        cart.add_item(&product("x", 100, 5), Some(5)).unwrap();
        cart.add_item(&service("x", 200), None).unwrap();

        assert_eq!(cart.line_count(), 2);
    }

    #[test]
    fn test_add_beyond_stock_fails_and_leaves_cart_unchanged() {
        let mut cart = Cart::new();
        let p = product("1", 500, 2);

        cart.add_item(&p, Some(2)).unwrap();
        cart.add_item(&p, Some(2)).unwrap();
        let err = cart.add_item(&p, Some(2)).unwrap_err();

        assert!(matches!(
            err,
            CoreError::InsufficientStock {
                available: 2,
                requested: 3,
                ..
            }
        ));
        assert_eq!(cart.total_quantity(), 2);
    }

    #[test]
    fn test_out_of_stock_product_cannot_be_added() {
        let mut cart = Cart::new();
        let p = product("1", 500, 0);

        assert!(cart.add_item(&p, Some(0)).is_err());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_unbounded_price_is_rejected_before_it_reaches_totals() {
        let mut cart = Cart::new();
        let p = product("huge", i64::MAX / 2, 10_000);

        let err = cart.add_quantity(&p, MAX_ITEM_QUANTITY, Some(p.stock)).unwrap_err();

        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::OutOfRange {
                max: MAX_PRICE_CENTS,
                ..
            })
        ));
        assert!(cart.is_empty());
        assert_eq!(cart.compute_totals(0.0).total_cents, 0);
    }

    #[test]
    fn test_full_cart_at_price_ceiling_totals_exactly() {
        let mut cart = Cart::new();
        for i in 0..MAX_CART_ITEMS {
            let p = product(&i.to_string(), MAX_PRICE_CENTS, MAX_ITEM_QUANTITY);
            cart.add_quantity(&p, MAX_ITEM_QUANTITY, Some(p.stock)).unwrap();
        }

        let expected = MAX_PRICE_CENTS * MAX_ITEM_QUANTITY * MAX_CART_ITEMS as i64;
        let totals = cart.compute_totals(0.0);
        assert_eq!(totals.subtotal_cents, expected);
        assert_eq!(totals.total_cents, expected);

        let half = cart.compute_totals(50.0);
        assert_eq!(half.discount_cents, expected / 2);
        assert_eq!(half.total_cents, expected - expected / 2);

        assert_eq!(cart.compute_totals(100.0).total_cents, 0);
    }

    #[test]
    fn test_huge_quantity_delta_is_rejected_without_overflow() {
        let mut cart = Cart::new();
        let s = service("s1", 100);
        cart.add_quantity(&s, 5, None).unwrap();

        assert!(matches!(
            cart.add_quantity(&s, i64::MAX, None),
            Err(CoreError::QuantityTooLarge { .. })
        ));
        assert!(matches!(
            cart.update_quantity(0, i64::MAX),
            Err(CoreError::QuantityTooLarge { .. })
        ));
        assert_eq!(cart.total_quantity(), 5);
    }

    #[test]
    fn test_services_have_no_stock_ceiling() {
        let mut cart = Cart::new();
        let s = service("s1", 3000);

        cart.add_quantity(&s, 50, Some(0)).unwrap();
        assert_eq!(cart.total_quantity(), 50);
        assert_eq!(cart.lines()[0].stock_snapshot, None);
    }

    #[test]
    fn test_add_quantity_rejects_non_positive() {
        let mut cart = Cart::new();
        let err = cart.add_quantity(&product("1", 100, 5), 0, Some(5)).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn test_update_quantity_to_zero_removes_line() {
        let mut cart = Cart::new();
        cart.add_quantity(&product("1", 100, 5), 2, Some(5)).unwrap();

        cart.update_quantity(0, -2).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_quantity_above_stock_fails() {
        let mut cart = Cart::new();
        cart.add_quantity(&product("1", 100, 3), 2, Some(3)).unwrap();

        assert!(cart.update_quantity(0, 1).is_ok());
        let err = cart.update_quantity(0, 1).unwrap_err();
        assert_eq!(err.deficit(), Some(1));
        assert_eq!(cart.total_quantity(), 3);
    }

    #[test]
    fn test_update_quantity_bad_index() {
        let mut cart = Cart::new();
        assert!(matches!(
            cart.update_quantity(3, 1),
            Err(CoreError::LineNotFound { index: 3 })
        ));
    }

    #[test]
    fn test_remove_line() {
        let mut cart = Cart::new();
        cart.add_item(&product("1", 100, 5), Some(5)).unwrap();
        cart.add_item(&service("2", 100), None).unwrap();

        let removed = cart.remove_line(0).unwrap();
        assert_eq!(removed.item_id, "1");
        assert_eq!(cart.line_count(), 1);
        assert!(cart.remove_line(5).is_err());
        assert_eq!(cart.line_count(), 1);
    }

    #[test]
    fn test_max_lines() {
        let mut cart = Cart::new();
        for i in 0..MAX_CART_ITEMS {
            cart.add_item(&service(&i.to_string(), 100), None).unwrap();
        }
        let err = cart.add_item(&service("one-too-many", 100), None).unwrap_err();
        assert!(matches!(err, CoreError::CartTooLarge { .. }));
    }

    #[test]
    fn test_max_quantity_per_line() {
        let mut cart = Cart::new();
        let s = service("s1", 100);
        cart.add_quantity(&s, MAX_ITEM_QUANTITY, None).unwrap();
        assert!(matches!(
            cart.add_item(&s, None),
            Err(CoreError::QuantityTooLarge { .. })
        ));
    }

    #[test]
    fn test_refresh_stock_lowers_ceiling() {
        let mut cart = Cart::new();
        cart.add_quantity(&product("1", 100, 5), 2, Some(5)).unwrap();
        cart.refresh_stock(ItemKind::Product, "1", 2).unwrap();

        assert!(cart.update_quantity(0, 1).is_err());
        assert!(cart.refresh_stock(ItemKind::Product, "nope", 2).is_err());
    }

    #[test]
    fn test_compute_totals_is_pure() {
        let mut cart = Cart::new();
        cart.add_quantity(&product("1", 1999, 10), 3, Some(10)).unwrap();
        cart.add_item(&service("2", 4550), None).unwrap();

        let first = cart.compute_totals(12.5);
        let second = cart.compute_totals(12.5);
        assert_eq!(first, second);
        assert_eq!(cart.total_quantity(), 4);
    }

    #[test]
    fn test_discount_boundaries() {
        let mut cart = Cart::new();
        cart.add_quantity(&product("1", 1234, 10), 3, Some(10)).unwrap();

        let none = cart.compute_totals(0.0);
        assert_eq!(none.total_cents, none.subtotal_cents);
        assert_eq!(none.discount_cents, 0);

        let full = cart.compute_totals(100.0);
        assert_eq!(full.discount_cents, full.subtotal_cents);
        assert_eq!(full.total_cents, 0);
    }

    #[test]
    fn test_discount_is_clamped() {
        let mut cart = Cart::new();
        cart.add_item(&product("1", 1000, 10), Some(10)).unwrap();

        assert_eq!(cart.compute_totals(150.0).total_cents, 0);
        assert_eq!(cart.compute_totals(-5.0).total_cents, 1000);
        assert_eq!(cart.compute_totals(f64::NAN).total_cents, 1000);
    }

    #[test]
    fn test_discount_rounds_to_cent() {
        let mut cart = Cart::new();
        cart.add_item(&product("1", 999, 10), Some(10)).unwrap();

        // 999 × 10% = 99.9 → 100
        let totals = cart.compute_totals(10.0);
        assert_eq!(totals.discount_cents, 100);
        assert_eq!(totals.total_cents, 899);
        assert_eq!(totals.subtotal_cents - totals.discount_cents, totals.total_cents);
    }

    #[test]
    fn test_clear() {
        let mut cart = Cart::new();
        cart.add_item(&product("1", 999, 5), Some(5)).unwrap();
        assert!(!cart.is_empty());

        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.compute_totals(10.0).total_cents, 0);
    }
}
