//! # Cart Line Pricing
//!
//! Turns a unit price, a quantity and a discount into a line total.
//!
//! ## Formula
//! ```text
//! raw      = unit_price × quantity
//! discount = Percentage(bps) → raw × bps / 10000   (half-up to the cent)
//!            Fixed(amount)   → min(amount, raw)
//! total    = raw − discount                         (never negative)
//! ```
//!
//! `line_total` clamps so a total is always computable. Cart mutators run
//! [`validate_discount`] first, so an out-of-range discount is rejected with a
//! reason instead of silently clamped.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::validation::ValidationResult;

/// 100% in basis points.
pub const FULL_PERCENT_BPS: u32 = 10_000;

// =============================================================================
// Discount
// =============================================================================

/// A per-line discount. The two modes are mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Discount {
    /// Percentage of the raw line amount, in basis points (1250 = 12.5%).
    Percentage { bps: u32 },
    /// Fixed amount off the whole line.
    Fixed { amount: Money },
}

impl Discount {
    /// No discount.
    pub const fn none() -> Self {
        Discount::Percentage { bps: 0 }
    }

    /// Percentage discount from a whole-number percent (10 → 10%).
    pub const fn percent(pct: u32) -> Self {
        Discount::Percentage { bps: pct * 100 }
    }

    /// Fixed discount.
    pub const fn fixed(amount: Money) -> Self {
        Discount::Fixed { amount }
    }

    pub fn is_none(&self) -> bool {
        match self {
            Discount::Percentage { bps } => *bps == 0,
            Discount::Fixed { amount } => amount.is_zero(),
        }
    }

    /// Resolves the discount against a raw line amount, clamped to `[0, raw]`.
    pub fn amount_for(&self, raw: Money) -> Money {
        let amount = match self {
            Discount::Percentage { bps } => raw.percentage_of((*bps).min(FULL_PERCENT_BPS)),
            Discount::Fixed { amount } => *amount,
        };
        amount.non_negative().min(raw.non_negative())
    }
}

impl Default for Discount {
    fn default() -> Self {
        Discount::none()
    }
}

// =============================================================================
// Line Pricing
// =============================================================================

/// Computes a line total.
///
/// ## Example
/// ```rust
/// use duka_core::money::Money;
/// use duka_core::pricing::{line_total, Discount};
///
/// // 2 × 100.00 with 10% off
/// let total = line_total(Money::from_cents(10_000), 2, Discount::percent(10));
/// assert_eq!(total.cents(), 18_000);
///
/// // Fixed discount larger than the line clamps to zero
/// let total = line_total(Money::from_cents(500), 1, Discount::fixed(Money::from_cents(900)));
/// assert!(total.is_zero());
/// ```
pub fn line_total(unit_price: Money, quantity: i64, discount: Discount) -> Money {
    let raw = unit_price.multiply_quantity(quantity).non_negative();
    raw - discount.amount_for(raw)
}

/// Validates a discount against the line it applies to.
///
/// ## Rules
/// - Percentage must be within 0..=100%
/// - Fixed amount must be non-negative and no larger than the raw line amount
pub fn validate_discount(discount: Discount, unit_price: Money, quantity: i64) -> ValidationResult<()> {
    match discount {
        Discount::Percentage { bps } => {
            if bps > FULL_PERCENT_BPS {
                return Err(ValidationError::OutOfRange {
                    field: "discount percentage".to_string(),
                    min: 0,
                    max: 100,
                });
            }
        }
        Discount::Fixed { amount } => {
            if amount.is_negative() {
                return Err(ValidationError::Negative {
                    field: "discount".to_string(),
                });
            }
            let raw = unit_price.multiply_quantity(quantity);
            if amount > raw {
                return Err(ValidationError::ExceedsAmount {
                    field: "discount".to_string(),
                    limit: raw,
                });
            }
        }
    }
    Ok(())
}

// =============================================================================
// Quantity Stepping
// =============================================================================

/// Outcome of stepping a line's quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "quantity", rename_all = "snake_case")]
pub enum QuantityChange {
    /// The line keeps existing with this quantity.
    Set(i64),
    /// Decrementing a line at quantity 1: the line must be removed.
    Remove,
}

/// Steps a quantity up by one.
pub fn increment(quantity: i64) -> QuantityChange {
    QuantityChange::Set(quantity.max(0) + 1)
}

/// Steps a quantity down by one, never below 1.
///
/// ```rust
/// use duka_core::pricing::{decrement, QuantityChange};
///
/// assert_eq!(decrement(3), QuantityChange::Set(2));
/// assert_eq!(decrement(1), QuantityChange::Remove);
/// ```
pub fn decrement(quantity: i64) -> QuantityChange {
    if quantity <= 1 {
        QuantityChange::Remove
    } else {
        QuantityChange::Set(quantity - 1)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
