//! # Domain Types
//!
//! Boundary records shared by the checkout core and its collaborators.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  consumed                       produced on finalize                    │
//! │  ┌─────────────────┐           ┌─────────────────┐                     │
//! │  │    Product      │           │      Sale       │ 1                   │
//! │  │  selling_price  │           │  totals, notes  │───┐                 │
//! │  │  current_stock  │           └─────────────────┘   │                 │
//! │  └─────────────────┘                                 │ *               │
//! │  ┌─────────────────┐           ┌─────────────────┐   ├─► SaleLine      │
//! │  │ PaymentMethod   │──kind────►│  SalePayment    │◄──┘                 │
//! │  │ Cash / Mpesa /  │           │ amount, ref no  │                     │
//! │  │ CreditNote/Other│           └─────────────────┘                     │
//! │  └─────────────────┘                                                    │
//! │  ┌─────────────────┐                                                    │
//! │  │    Customer     │──► CustomerAttachment on the Cart                 │
//! │  └─────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Debt records live in [`crate::debt`], suspended carts in [`crate::suspended`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 1600 bps = 16% (Kenyan VAT)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage (for configuration input).
    pub fn from_percentage(pct: f64) -> Self {
        TaxRate((pct * 100.0).round() as u32)
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

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }
}

impl Default for TaxRate {
    /// The standard VAT rate.
    fn default() -> Self {
        TaxRate(crate::DEFAULT_VAT_RATE_BPS)
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product as the checkout sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name shown to cashier and on receipt.
    pub name: String,

    /// Selling price in cents.
    pub selling_price_cents: i64,

    /// Current stock level, `None` when stock is not tracked.
    pub current_stock: Option<i64>,

    /// Whether product is active (soft delete).
    pub is_active: bool,
}

impl Product {
    /// Returns the selling price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.selling_price_cents)
    }

    /// Checks if the requested quantity is covered by stock.
    pub fn can_sell(&self, quantity: i64) -> bool {
        match self.current_stock {
            Some(stock) => stock >= quantity,
            None => true,
        }
    }
}

// =============================================================================
// Payment Methods
// =============================================================================

/// Closed set of payment method behaviours.
///
/// ## Input Rules
/// ```text
/// ┌──────────────┬──────────────────────┬─────────────────────────────┐
/// │ Kind         │ Reference required?  │ Notes                       │
/// ├──────────────┼──────────────────────┼─────────────────────────────┤
/// │ Cash         │ no                   │ only kind that gives change │
/// │ Mpesa        │ yes (transaction id) │ mobile money                │
/// │ CreditNote   │ no                   │ redeemed store credit       │
/// │ Other        │ yes                  │ card, bank transfer, cheque │
/// └──────────────┴──────────────────────┴─────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethodKind {
    Cash,
    Mpesa,
    CreditNote,
    Other,
}

impl PaymentMethodKind {
    /// Whether an entry of this kind needs a reference number once it carries an amount.
    pub const fn requires_reference(&self) -> bool {
        matches!(self, PaymentMethodKind::Mpesa | PaymentMethodKind::Other)
    }

    /// Field label used in validation messages.
    pub const fn reference_label(&self) -> &'static str {
        match self {
            PaymentMethodKind::Mpesa => "M-Pesa reference number",
            _ => "reference number",
        }
    }
}

/// A configured payment method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PaymentMethod {
    pub id: String,
    pub name: String,
    pub kind: PaymentMethodKind,
    pub is_active: bool,
}

// =============================================================================
// Customer
// =============================================================================

/// A customer attached to a sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Customer {
    pub name: String,
    pub telephone: Option<String>,
    /// Outstanding balance at the time the customer was looked up.
    pub balance: Money,
}

impl Customer {
    /// Creates a customer with no outstanding balance.
    pub fn new(name: impl Into<String>, telephone: Option<String>) -> Self {
        Customer {
            name: name.into(),
            telephone,
            balance: Money::zero(),
        }
    }
}

/// Whether the sale carries a customer.
///
/// Attachment is the gate that unlocks credit: only an `Attached` cart may
/// finalize with less tendered than the gross total.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", content = "customer", rename_all = "snake_case")]
pub enum CustomerAttachment {
    #[default]
    None,
    Attached(Customer),
}

impl CustomerAttachment {
    /// Returns the attached customer, if any.
    pub fn customer(&self) -> Option<&Customer> {
        match self {
            CustomerAttachment::None => None,
            CustomerAttachment::Attached(customer) => Some(customer),
        }
    }

    pub fn is_attached(&self) -> bool {
        matches!(self, CustomerAttachment::Attached(_))
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A finalized sale header.
///
/// All monetary columns are cents. `total_cents` is tax inclusive;
/// `net_cents + vat_cents == total_cents`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub receipt_number: String,
    pub customer_name: Option<String>,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub net_cents: i64,
    pub vat_cents: i64,
    pub total_cents: i64,
    pub tendered_cents: i64,
    pub change_cents: i64,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub sale_date: DateTime<Utc>,
}

impl Sale {
    /// Returns the gross total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// Amount left unpaid at the till (becomes a debt when a customer is attached).
    pub fn unpaid(&self) -> Money {
        (self.total() - Money::from_cents(self.tendered_cents)).non_negative()
    }
}

/// A line item in a sale.
/// Uses snapshot pattern to freeze product data at time of sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleLine {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    /// Product name at time of sale (frozen).
    pub name_snapshot: String,
    pub quantity: i64,
    /// Unit price in cents at time of sale (frozen).
    pub unit_price_cents: i64,
    /// Resolved discount amount for the whole line.
    pub discount_cents: i64,
    /// unit_price × quantity − discount.
    pub line_total_cents: i64,
}

/// One accepted tender of a sale.
/// A sale can have several for split tender (cash + M-Pesa).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SalePayment {
    pub id: String,
    pub sale_id: String,
    pub payment_method_id: String,
    pub method_name: String,
    pub method_kind: PaymentMethodKind,
    pub amount_cents: i64,
    pub reference_number: Option<String>,
}

impl SalePayment {
    /// Returns the payment amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
