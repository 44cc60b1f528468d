//! # Error Types
//!
//! Domain-specific error types for duka-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  duka-core errors (this file)                                          │
//! │  ├── CoreError        - Policy, conflict and ledger failures           │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  duka-db errors (separate crate)                                       │
//! │  └── DbError          - Persistence failures (wraps CoreError)         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → caller                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include the amounts in messages: a cashier must see the exact shortfall
//! 3. Errors are enum variants, never String
//! 4. Every variant has a [`ErrorCategory`] so callers can pick a UI treatment

use serde::Serialize;
use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found in the cart.
    #[error("Product not in cart: {0}")]
    LineNotFound(String),

    /// Insufficient stock to add the requested quantity.
    ///
    /// ## User Workflow
    /// ```text
    /// Add to Cart (qty: 5)
    ///      │
    ///      ▼
    /// Check stock: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { product: "Sugar 1kg", available: 3, requested: 5 }
    /// ```
    #[error("Insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    /// Cart has exceeded maximum allowed lines.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Nothing to finalize or suspend.
    #[error("Cart is empty")]
    EmptyCart,

    /// Tender does not cover the gross total and no customer is attached.
    ///
    /// ## User Workflow
    /// ```text
    /// Gross 500.00, tendered 450.00, no customer
    ///      │
    ///      ▼
    /// InsufficientTender { shortfall: 50.00 }
    ///      │
    ///      ▼
    /// UI: "Insufficient payment: short by 50.00. Attach a customer to sell on credit"
    /// ```
    #[error(
        "Insufficient payment: short by {shortfall}. Attach a customer to sell on credit"
    )]
    InsufficientTender { shortfall: Money },

    /// Tender exceeds the gross total by more than the configured limit.
    #[error("Excessive overpayment: {overpayment} over a total of {total}. Please verify the payment amount")]
    ExcessiveOverpayment { overpayment: Money, total: Money },

    /// A debt payment larger than the outstanding balance.
    #[error("Payment amount cannot exceed outstanding balance: {amount} > {balance}")]
    PaymentExceedsBalance { amount: Money, balance: Money },

    /// A debt has nothing left to pay.
    #[error("Debt {0} is already settled")]
    DebtSettled(String),

    /// Another writer committed a payment against the same debt first.
    #[error("Balance of debt {debt_id} changed, please retry")]
    BalanceChanged { debt_id: String },

    /// A parked sale id that is not (or no longer) in the pending set.
    #[error("Suspended sale not found: {0}")]
    SuspendedSaleNotFound(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Coarse classification used to choose how an error is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    /// User-correctable input, reported inline.
    Validation,
    /// Blocks finalize with a single actionable message.
    Policy,
    /// Lost a concurrent race; retry after reloading.
    Conflict,
    /// Referenced entity is absent.
    NotFound,
}

impl CoreError {
    /// Returns the category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            CoreError::Validation(_)
            | CoreError::PaymentExceedsBalance { .. }
            | CoreError::DebtSettled(_)
            | CoreError::CartTooLarge { .. }
            | CoreError::InsufficientStock { .. } => ErrorCategory::Validation,
            CoreError::InsufficientTender { .. }
            | CoreError::ExcessiveOverpayment { .. }
            | CoreError::EmptyCart => ErrorCategory::Policy,
            CoreError::BalanceChanged { .. } => ErrorCategory::Conflict,
            CoreError::LineNotFound(_) | CoreError::SuspendedSaleNotFound(_) => {
                ErrorCategory::NotFound
            }
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when cashier input doesn't meet requirements and are
/// reported next to the offending field.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} cannot be negative")]
    Negative { field: String },

    /// A monetary value larger than what it applies to.
    #[error("{field} cannot exceed {limit}")]
    ExceedsAmount { field: String, limit: Money },

    /// Invalid format (e.g., invalid UUID, malformed amount).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Referenced option is disabled.
    #[error("{field} '{value}' is not active")]
    Inactive { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
