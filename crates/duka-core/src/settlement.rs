//! # Settlement Policy
//!
//! Decides whether a cart may be finalized with the tenders offered, and
//! builds the records a finalized sale produces.
//!
//! ## Decision Table
//! ```text
//! ┌──────────────────────┬─────────────────────────────┬──────────────────────────┐
//! │ Customer             │ tendered vs gross           │ Outcome                  │
//! ├──────────────────────┼─────────────────────────────┼──────────────────────────┤
//! │ (cart empty)         │ -                           │ Unsettled                │
//! │ None                 │ tendered ≥ gross − 0.01     │ Sufficient, no debt      │
//! │ None                 │ tendered < gross − 0.01     │ Insufficient(shortfall)  │
//! │ Attached(customer)   │ tendered ≥ gross            │ Sufficient, no debt      │
//! │ Attached(customer)   │ tendered < gross            │ Sufficient, Debt created │
//! └──────────────────────┴─────────────────────────────┴──────────────────────────┘
//! ```
//!
//! ## Finalize Flow
//! ```text
//! Cart + TenderSet + CheckoutPolicy + now
//!      │
//!      ├── EmptyCart?                     ──► CoreError::EmptyCart
//!      ├── validate_tenders()             ──► ValidationError (missing ref, ...)
//!      ├── overpayment above limit?       ──► CoreError::ExcessiveOverpayment
//!      ├── evaluate() == Insufficient?    ──► CoreError::InsufficientTender
//!      ▼
//! FinalizedSale { sale, lines, payments, debt? }
//! ```
//!
//! Nothing here touches storage: `duka-db` persists a [`FinalizedSale`] in one
//! transaction and only then clears the cart.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::cart::{Cart, OrderTotals};
use crate::debt::Debt;
use crate::error::{CoreError, CoreResult};
use crate::money::{Money, SETTLEMENT_TOLERANCE};
use crate::tender::{allocate, validate_tenders, TenderEntry, TenderSet, TenderSummary};
use crate::types::{CustomerAttachment, Sale, SaleLine, SalePayment, TaxRate};
use crate::DEFAULT_MAX_OVERPAYMENT_BPS;

// =============================================================================
// Checkout Policy
// =============================================================================

/// Store-level settings that shape a checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CheckoutPolicy {
    /// VAT rate prices are inclusive of.
    pub vat_rate: TaxRate,
    /// Largest accepted overpayment as a share of the gross total, `None` for no limit.
    pub max_overpayment_bps: Option<u32>,
    /// Days until a credit sale falls due, `None` for open-ended debts.
    pub credit_term_days: Option<i64>,
    /// Price list tag recorded on suspended sales.
    pub price_list: Option<String>,
}

impl Default for CheckoutPolicy {
    fn default() -> Self {
        CheckoutPolicy {
            vat_rate: TaxRate::default(),
            max_overpayment_bps: Some(DEFAULT_MAX_OVERPAYMENT_BPS),
            credit_term_days: None,
            price_list: None,
        }
    }
}

impl CheckoutPolicy {
    /// Due date for a debt opened at `now`.
    pub fn due_date(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.credit_term_days.map(|days| now + Duration::days(days))
    }
}

// =============================================================================
// Settlement State
// =============================================================================

/// Outcome of evaluating tenders against a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "state", rename_all = "snake_case")]
#[ts(export)]
pub enum SettlementState {
    /// Nothing to settle yet (empty cart).
    Unsettled,
    /// The sale may be finalized. `debt` is the amount that will be owed.
    Sufficient {
        total_tendered: Money,
        change_due: Money,
        debt: Money,
    },
    /// Finalize is blocked until `shortfall` more is tendered or a customer is attached.
    Insufficient { total_tendered: Money, shortfall: Money },
}

impl SettlementState {
    pub fn is_sufficient(&self) -> bool {
        matches!(self, SettlementState::Sufficient { .. })
    }
}

/// Pure sufficiency decision.
///
/// ## Example
/// ```rust
/// use duka_core::money::Money;
/// use duka_core::settlement::{decide, SettlementState};
/// use duka_core::tender::TenderSummary;
/// use duka_core::types::{Customer, CustomerAttachment};
///
/// let summary = TenderSummary {
///     total_tendered: Money::zero(),
///     change_due: Money::zero(),
///     shortfall: Money::from_cents(18_000),
/// };
///
/// let walk_in = decide(&CustomerAttachment::None, Money::from_cents(18_000), summary);
/// assert!(!walk_in.is_sufficient());
///
/// let alice = CustomerAttachment::Attached(Customer::new("Alice", None));
/// let credit = decide(&alice, Money::from_cents(18_000), summary);
/// assert!(matches!(credit, SettlementState::Sufficient { debt, .. } if debt.cents() == 18_000));
/// ```
pub fn decide(
    customer: &CustomerAttachment,
    gross_total: Money,
    summary: TenderSummary,
) -> SettlementState {
    let TenderSummary {
        total_tendered,
        change_due,
        shortfall,
    } = summary;

    match customer {
        CustomerAttachment::None if total_tendered >= gross_total - SETTLEMENT_TOLERANCE => {
            SettlementState::Sufficient {
                total_tendered,
                change_due,
                debt: Money::zero(),
            }
        }
        CustomerAttachment::None => SettlementState::Insufficient {
            total_tendered,
            shortfall,
        },
        CustomerAttachment::Attached(_) => SettlementState::Sufficient {
            total_tendered,
            change_due,
            debt: shortfall,
        },
    }
}

/// Evaluates a cart against its tender set.
pub fn evaluate(cart: &Cart, tenders: &TenderSet, vat_rate: TaxRate) -> SettlementState {
    if cart.is_empty() {
        return SettlementState::Unsettled;
    }
    let gross_total = cart.totals(vat_rate).gross_total;
    decide(cart.customer(), gross_total, tenders.summary(gross_total))
}

// =============================================================================
// Finalize
// =============================================================================

/// Everything a successful checkout writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct FinalizedSale {
    pub sale: Sale,
    pub lines: Vec<SaleLine>,
    pub payments: Vec<SalePayment>,
    pub debt: Option<Debt>,
    pub totals: OrderTotals,
    pub summary: TenderSummary,
}

impl FinalizedSale {
    /// Change to hand back. Display only.
    pub fn change_due(&self) -> Money {
        self.summary.change_due
    }
}

/// Validates and settles a cart, producing the sale records.
///
/// The cart is only read; the caller clears it once the records are stored.
pub fn finalize(
    cart: &Cart,
    tenders: &TenderSet,
    policy: &CheckoutPolicy,
    now: DateTime<Utc>,
) -> CoreResult<FinalizedSale> {
    if cart.is_empty() {
        return Err(CoreError::EmptyCart);
    }

    let accepted = validate_tenders(tenders.entries())?;
    let totals = cart.totals(policy.vat_rate);
    let gross_total = totals.gross_total;
    let summary = allocate(&accepted, gross_total);

    if let Some(limit_bps) = policy.max_overpayment_bps {
        let limit = gross_total.percentage_of(limit_bps);
        if summary.change_due > limit {
            return Err(CoreError::ExcessiveOverpayment {
                overpayment: summary.change_due,
                total: gross_total,
            });
        }
    }

    let debt_amount = match decide(cart.customer(), gross_total, summary) {
        SettlementState::Sufficient { debt, .. } => debt,
        SettlementState::Insufficient { shortfall, .. } => {
            return Err(CoreError::InsufficientTender { shortfall });
        }
        SettlementState::Unsettled => return Err(CoreError::EmptyCart),
    };

    let sale_id = Uuid::new_v4().to_string();
    let receipt_number = receipt_number(&sale_id, now);

    let lines = cart
        .lines()
        .iter()
        .map(|item| SaleLine {
            id: Uuid::new_v4().to_string(),
            sale_id: sale_id.clone(),
            product_id: item.product_id.clone(),
            name_snapshot: item.name.clone(),
            quantity: item.quantity,
            unit_price_cents: item.unit_price.cents(),
            discount_cents: item.discount_amount().cents(),
            line_total_cents: item.line_total().cents(),
        })
        .collect();

    let payments = accepted
        .iter()
        .map(|entry| sale_payment(&sale_id, entry))
        .collect();

    let debt = match cart.customer() {
        CustomerAttachment::Attached(customer) if debt_amount.is_positive() => Some(
            Debt::from_shortfall(
                customer,
                &sale_id,
                &receipt_number,
                debt_amount,
                policy.due_date(now),
                now,
            )?,
        ),
        _ => None,
    };

    let sale = Sale {
        id: sale_id,
        receipt_number,
        customer_name: cart.customer().customer().map(|c| c.name.clone()),
        subtotal_cents: totals.subtotal.cents(),
        discount_cents: totals.discount_total.cents(),
        net_cents: totals.net_total.cents(),
        vat_cents: totals.vat_amount.cents(),
        total_cents: gross_total.cents(),
        tendered_cents: summary.total_tendered.cents(),
        change_cents: summary.change_due.cents(),
        notes: cart.remarks().map(str::to_string),
        sale_date: now,
    };

    Ok(FinalizedSale {
        sale,
        lines,
        payments,
        debt,
        totals,
        summary,
    })
}

fn sale_payment(sale_id: &str, entry: &TenderEntry) -> SalePayment {
    SalePayment {
        id: Uuid::new_v4().to_string(),
        sale_id: sale_id.to_string(),
        payment_method_id: entry.method_id.clone(),
        method_name: entry.method_name.clone(),
        method_kind: entry.kind,
        amount_cents: entry.amount.cents(),
        reference_number: entry.reference.clone(),
    }
}

/// `RCP-YYYYMMDD-XXXXXX`, the suffix being the tail of the sale id.
fn receipt_number(sale_id: &str, now: DateTime<Utc>) -> String {
    let tail = sale_id.get(sale_id.len().saturating_sub(6)..).unwrap_or(sale_id);
    format!("RCP-{}-{}", now.format("%Y%m%d"), tail.to_uppercase())
}

// =============================================================================
// Unit Tests
// =============================================================================
