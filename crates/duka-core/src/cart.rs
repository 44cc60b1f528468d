//! # Cart and Order Aggregation
//!
//! The in-progress sale: ordered lines, an optional customer and free text.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Operations                                      │
//! │                                                                         │
//! │  Cashier Action          Method                  Effect                 │
//! │  ──────────────          ──────                  ──────                 │
//! │                                                                         │
//! │  Scan / pick product ──► add_product() ────────► push or merge line     │
//! │  [+] / [−] buttons ────► increment()/decrement()► qty ± 1, Remove at 1  │
//! │  Type quantity ────────► set_quantity() ───────► qty = n (n ≥ 1)        │
//! │  Line discount ────────► set_discount() ───────► validated discount     │
//! │  Pick customer ────────► attach_customer() ────► credit sale unlocked   │
//! │  Totals panel ─────────► totals(vat) ──────────► OrderTotals            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - Lines are unique by `product_id`; insertion order is display order
//! - Every line has `1 <= quantity <= MAX_ITEM_QUANTITY`
//! - A line's quantity never exceeds the product's known stock
//! - A stored discount passed [`validate_discount`] when it was set

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::pricing::{self, validate_discount, Discount, QuantityChange};
use crate::types::{Customer, CustomerAttachment, Product, TaxRate};
use crate::validation::{normalize_note, validate_cart_size, validate_price, validate_quantity};

// =============================================================================
// Cart Item
// =============================================================================

/// A line in the cart.
///
/// Product data is frozen when the line is created, so a price change in the
/// back office does not reprice a cart that is already being rung up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CartItem {
    pub product_id: String,
    pub name: String,
    pub unit_price: Money,
    /// Stock at the time the line was created, `None` when untracked.
    pub available_stock: Option<i64>,
    pub quantity: i64,
    #[serde(default)]
    pub discount: Discount,
}

impl CartItem {
    /// Creates a new line from a product.
    pub fn from_product(product: &Product, quantity: i64) -> Self {
        CartItem {
            product_id: product.id.clone(),
            name: product.name.clone(),
            unit_price: product.price(),
            available_stock: product.current_stock,
            quantity,
            discount: Discount::none(),
        }
    }

    /// unit_price × quantity, before discount.
    pub fn raw_amount(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }

    /// The discount resolved against the current quantity.
    pub fn discount_amount(&self) -> Money {
        self.discount.amount_for(self.raw_amount())
    }

    /// Line total after discount.
    pub fn line_total(&self) -> Money {
        pricing::line_total(self.unit_price, self.quantity, self.discount)
    }

    fn check_stock(&self, quantity: i64) -> CoreResult<()> {
        match self.available_stock {
            Some(available) if quantity > available => Err(CoreError::InsufficientStock {
                product: self.name.clone(),
                available,
                requested: quantity,
            }),
            _ => Ok(()),
        }
    }
}

// =============================================================================
// Order Totals
// =============================================================================

/// Aggregate view of a cart.
///
/// ## Tax Inclusive
/// ```text
/// gross_total = subtotal            (prices already include VAT)
/// net_total   = gross / (1 + rate)
/// vat_amount  = gross − net
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct OrderTotals {
    pub subtotal: Money,
    /// Sum of resolved line discounts (informational).
    pub discount_total: Money,
    /// Sum of quantities, not number of lines.
    pub total_items: i64,
    pub gross_total: Money,
    pub vat_rate: TaxRate,
    pub net_total: Money,
    pub vat_amount: Money,
}

// =============================================================================
// Cart
// =============================================================================

/// The shopping cart.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Cart {
    items: Vec<CartItem>,
    #[serde(default)]
    customer: CustomerAttachment,
    #[serde(default)]
    remarks: Option<String>,
    #[serde(default)]
    pin: Option<String>,
}

impl Cart {
    /// Creates a new empty cart.
    pub fn new() -> Self {
        Cart::default()
    }

    /// Adds a product to the cart or increases quantity if already present.
    ///
    /// ## Returns
    /// - `Ok(())` on success
    /// - `Err` if the quantity is invalid, exceeds stock, or the cart is full
    pub fn add_product(&mut self, product: &Product, quantity: i64) -> CoreResult<()> {
        validate_quantity(quantity)?;
        validate_price(product.price())?;

        if let Some(item) = self.items.iter_mut().find(|i| i.product_id == product.id) {
            let new_qty = item.quantity + quantity;
            validate_quantity(new_qty)?;
            item.check_stock(new_qty)?;
            item.quantity = new_qty;
            return Ok(());
        }

        validate_cart_size(self.items.len()).map_err(|_| CoreError::CartTooLarge {
            max: crate::MAX_CART_ITEMS,
        })?;

        let item = CartItem::from_product(product, quantity);
        item.check_stock(quantity)?;
        self.items.push(item);
        Ok(())
    }

    /// Sets the quantity of a line. Zero is rejected; use [`Cart::remove_line`].
    pub fn set_quantity(&mut self, product_id: &str, quantity: i64) -> CoreResult<()> {
        validate_quantity(quantity)?;
        let item = self.line_mut(product_id)?;
        item.check_stock(quantity)?;
        item.quantity = quantity;
        Ok(())
    }

    /// Adds one to a line's quantity.
    pub fn increment(&mut self, product_id: &str) -> CoreResult<QuantityChange> {
        let item = self.line_mut(product_id)?;
        let change = pricing::increment(item.quantity);
        if let QuantityChange::Set(quantity) = change {
            validate_quantity(quantity)?;
            item.check_stock(quantity)?;
            item.quantity = quantity;
        }
        Ok(change)
    }

    /// Removes one from a line's quantity.
    ///
    /// At quantity 1 the line is removed and `QuantityChange::Remove` is
    /// returned so the caller can drop the row from its display.
    pub fn decrement(&mut self, product_id: &str) -> CoreResult<QuantityChange> {
        let item = self.line_mut(product_id)?;
        let change = pricing::decrement(item.quantity);
        match change {
            QuantityChange::Set(quantity) => item.quantity = quantity,
            QuantityChange::Remove => {
                self.remove_line(product_id)?;
            }
        }
        Ok(change)
    }

    /// Sets or replaces the discount of a line.
    pub fn set_discount(&mut self, product_id: &str, discount: Discount) -> CoreResult<()> {
        let item = self.line_mut(product_id)?;
        validate_discount(discount, item.unit_price, item.quantity)?;
        item.discount = discount;
        Ok(())
    }

    /// Removes a line by product ID.
    pub fn remove_line(&mut self, product_id: &str) -> CoreResult<CartItem> {
        let index = self
            .items
            .iter()
            .position(|i| i.product_id == product_id)
            .ok_or_else(|| CoreError::LineNotFound(product_id.to_string()))?;
        Ok(self.items.remove(index))
    }

    pub fn attach_customer(&mut self, customer: Customer) {
        self.customer = CustomerAttachment::Attached(customer);
    }

    pub fn detach_customer(&mut self) {
        self.customer = CustomerAttachment::None;
    }

    pub fn set_remarks(&mut self, remarks: Option<&str>) -> CoreResult<()> {
        self.remarks = normalize_note("remarks", remarks)?;
        Ok(())
    }

    pub fn set_pin(&mut self, pin: Option<&str>) -> CoreResult<()> {
        self.pin = normalize_note("pin", pin)?;
        Ok(())
    }

    /// Clears all lines, the customer and free text.
    pub fn clear(&mut self) {
        *self = Cart::new();
    }

    pub fn lines(&self) -> &[CartItem] {
        &self.items
    }

    pub fn customer(&self) -> &CustomerAttachment {
        &self.customer
    }

    pub fn remarks(&self) -> Option<&str> {
        self.remarks.as_deref()
    }

    pub fn pin(&self) -> Option<&str> {
        self.pin.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the number of distinct lines.
    pub fn line_count(&self) -> usize {
        self.items.len()
    }

    /// Returns the total quantity of all items.
    pub fn total_items(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Sum of line totals.
    pub fn subtotal(&self) -> Money {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Aggregates the cart.
    ///
    /// ## Example
    /// ```rust
    /// use duka_core::cart::Cart;
    /// use duka_core::pricing::Discount;
    /// use duka_core::types::{Product, TaxRate};
    ///
    /// let product = Product {
    ///     id: "p1".into(),
    ///     name: "Rice 2kg".into(),
    ///     selling_price_cents: 10_000,
    ///     current_stock: Some(10),
    ///     is_active: true,
    /// };
    /// let mut cart = Cart::new();
    /// cart.add_product(&product, 2).unwrap();
    /// cart.set_discount("p1", Discount::percent(10)).unwrap();
    ///
    /// let totals = cart.totals(TaxRate::from_bps(1600));
    /// assert_eq!(totals.gross_total.cents(), 18_000);
    /// assert_eq!(totals.total_items, 2);
    /// assert_eq!(totals.net_total + totals.vat_amount, totals.gross_total);
    /// ```
    pub fn totals(&self, vat_rate: TaxRate) -> OrderTotals {
        let subtotal = self.subtotal();
        let (net_total, vat_amount) = subtotal.split_inclusive_tax(vat_rate);
        OrderTotals {
            subtotal,
            discount_total: self.items.iter().map(CartItem::discount_amount).sum(),
            total_items: self.total_items(),
            gross_total: subtotal,
            vat_rate,
            net_total,
            vat_amount,
        }
    }

    fn line_mut(&mut self, product_id: &str) -> CoreResult<&mut CartItem> {
        self.items
            .iter_mut()
            .find(|i| i.product_id == product_id)
            .ok_or_else(|| CoreError::LineNotFound(product_id.to_string()))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
