//! # duka-core: Pure Checkout Logic for Duka POS
//!
//! This crate is the **heart** of the checkout. It prices carts, reconciles
//! multi-tender payments, decides whether a sale may be finalized and keeps the
//! debt state machine, all as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Duka POS Checkout                                │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │               ★ duka-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │  pricing ──► cart ──► tender ──► settlement ──► Sale (+ Debt)   │   │
//! │  │                                                                 │   │
//! │  │  debt: pending → partial → paid (overdue derived)              │   │
//! │  │  suspended: park / resume cart snapshots                       │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    duka-db (Database Layer)                     │   │
//! │  │     SQLite pool, migrations, repositories, finalize_cart        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`types`] - Boundary records (Product, PaymentMethod, Sale, ...)
//! - [`pricing`] - Line totals and discounts
//! - [`cart`] - The cart and its aggregate totals
//! - [`tender`] - Tender entries and allocation
//! - [`settlement`] - Sufficiency decision and finalize
//! - [`debt`] - Customer receivables
//! - [`suspended`] - Parked carts
//! - [`error`] - Domain error types
//! - [`validation`] - Field-level rules
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic; "now" is always a parameter
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64)
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use duka_core::money::Money;
//! use duka_core::types::TaxRate;
//!
//! // Prices are VAT inclusive: 116.00 at 16% is 100.00 net + 16.00 VAT
//! let gross = Money::from_cents(11_600);
//! let (net, vat) = gross.split_inclusive_tax(TaxRate::from_bps(1600));
//!
//! assert_eq!(net.cents(), 10_000);
//! assert_eq!(vat.cents(), 1_600);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod debt;
pub mod error;
pub mod money;
pub mod pricing;
pub mod settlement;
pub mod suspended;
pub mod tender;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{Cart, CartItem, OrderTotals};
pub use debt::{Debt, DebtPayment, DebtStatus};
pub use error::{CoreError, CoreResult, ErrorCategory, ValidationError};
pub use money::{Money, SETTLEMENT_TOLERANCE};
pub use pricing::{Discount, QuantityChange};
pub use settlement::{CheckoutPolicy, FinalizedSale, SettlementState};
pub use suspended::{SuspendedSale, SuspendedSaleStore};
pub use tender::{TenderEntry, TenderSet, TenderSummary};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines allowed in a single cart
///
/// ## Business Reason
/// Prevents runaway carts and keeps a receipt printable.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single line
///
/// ## Business Reason
/// Catches keying slips (typing 1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Maximum amount of a single tender entry, in cents (10,000,000.00)
///
/// ## Business Reason
/// Catches keying slips and keeps tender sums far from `i64` overflow.
pub const MAX_TENDER_CENTS: i64 = 1_000_000_000;

/// Maximum length of remarks, PIN and payment notes.
pub const MAX_NOTE_LENGTH: usize = 1000;

/// Standard VAT rate in basis points (16%).
pub const DEFAULT_VAT_RATE_BPS: u32 = 1600;

/// Tender may exceed the gross total by at most this much (20%) before
/// finalize asks the cashier to verify the amount.
pub const DEFAULT_MAX_OVERPAYMENT_BPS: u32 = 2000;
