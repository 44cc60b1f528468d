//! # Debt Ledger
//!
//! Receivables created when a customer-attached sale is under-tendered.
//!
//! ## Debt Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   finalize (shortfall > 0, customer attached)                           │
//! │        │                                                                │
//! │        ▼                                                                │
//! │   ┌─────────┐  pay < balance  ┌─────────┐  pay = balance  ┌──────┐      │
//! │   │ pending │ ──────────────► │ partial │ ──────────────► │ paid │      │
//! │   └────┬────┘                 └────┬────┘                 └──────┘      │
//! │        │ pay = balance             │                          ▲         │
//! │        └───────────────────────────┼──────────────────────────┘         │
//! │                                    │                                    │
//! │   due_date passed, balance > 0 ───►  overdue (replaces pending/partial) │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Status is always derived from the amounts and dates, never assigned.
//! Every applied payment bumps `version`; the database layer uses it to let
//! exactly one of two concurrent payments commit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::money::{Money, SETTLEMENT_TOLERANCE};
use crate::types::Customer;
use crate::validation::{normalize_note, validate_customer_name, validate_payment_amount};

// =============================================================================
// Debt Status
// =============================================================================

/// Status of a receivable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum DebtStatus {
    Pending,
    Partial,
    Paid,
    Overdue,
}

impl DebtStatus {
    /// Stored text form.
    pub const fn as_str(&self) -> &'static str {
        match self {
            DebtStatus::Pending => "pending",
            DebtStatus::Partial => "partial",
            DebtStatus::Paid => "paid",
            DebtStatus::Overdue => "overdue",
        }
    }

    pub const ALL: [DebtStatus; 4] = [
        DebtStatus::Pending,
        DebtStatus::Partial,
        DebtStatus::Paid,
        DebtStatus::Overdue,
    ];

    /// Whether money is still owed.
    pub const fn is_open(&self) -> bool {
        !matches!(self, DebtStatus::Paid)
    }

    /// Derives the status from amounts and due date.
    ///
    /// A residual balance within [`SETTLEMENT_TOLERANCE`] counts as paid only
    /// once a payment has been made; a debt nobody has paid towards is open
    /// for any positive balance.
    pub fn derive(
        amount_paid: Money,
        balance: Money,
        due_date: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        let settled = !balance.is_positive()
            || (amount_paid.is_positive() && balance <= SETTLEMENT_TOLERANCE);

        if settled {
            DebtStatus::Paid
        } else if due_date.is_some_and(|due| due < now) {
            DebtStatus::Overdue
        } else if amount_paid.is_positive() {
            DebtStatus::Partial
        } else {
            DebtStatus::Pending
        }
    }
}

// =============================================================================
// Debt
// =============================================================================

/// A customer receivable.
///
/// ## Invariants
/// - `balance_cents == amount_cents - amount_paid_cents`
/// - `0 <= balance_cents <= amount_cents`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Debt {
    pub id: String,
    pub customer_name: String,
    pub customer_contact: Option<String>,
    /// The sale that produced this debt, if any.
    pub sale_id: Option<String>,
    pub amount_cents: i64,
    pub amount_paid_cents: i64,
    pub balance_cents: i64,
    #[ts(as = "String")]
    pub debt_date: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub due_date: Option<DateTime<Utc>>,
    pub status: DebtStatus,
    pub notes: Option<String>,
    /// Incremented on every committed payment.
    pub version: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Debt {
    /// Opens a new debt.
    pub fn new(
        customer_name: &str,
        customer_contact: Option<&str>,
        sale_id: Option<String>,
        amount: Money,
        due_date: Option<DateTime<Utc>>,
        notes: Option<&str>,
        now: DateTime<Utc>,
    ) -> CoreResult<Self> {
        let customer_name = validate_customer_name(customer_name)?;
        validate_payment_amount(amount).map_err(|_| {
            crate::error::ValidationError::MustBePositive {
                field: "debt amount".to_string(),
            }
        })?;

        Ok(Debt {
            id: Uuid::new_v4().to_string(),
            customer_name,
            customer_contact: customer_contact
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string),
            sale_id,
            amount_cents: amount.cents(),
            amount_paid_cents: 0,
            balance_cents: amount.cents(),
            debt_date: now,
            due_date,
            status: DebtStatus::derive(Money::zero(), amount, due_date, now),
            notes: normalize_note("notes", notes)?,
            version: 0,
            created_at: now,
            updated_at: now,
        })
    }

    /// Opens the debt for an under-tendered sale.
    pub fn from_shortfall(
        customer: &Customer,
        sale_id: &str,
        receipt_number: &str,
        shortfall: Money,
        due_date: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> CoreResult<Self> {
        let notes = format!("Partial payment for sale {}", receipt_number);
        Debt::new(
            &customer.name,
            customer.telephone.as_deref(),
            Some(sale_id.to_string()),
            shortfall,
            due_date,
            Some(&notes),
            now,
        )
    }

    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }

    pub fn amount_paid(&self) -> Money {
        Money::from_cents(self.amount_paid_cents)
    }

    pub fn balance(&self) -> Money {
        Money::from_cents(self.balance_cents)
    }

    /// Status as of `now`, including the overdue check.
    pub fn effective_status(&self, now: DateTime<Utc>) -> DebtStatus {
        DebtStatus::derive(self.amount_paid(), self.balance(), self.due_date, now)
    }

    /// Re-derives the stored status. Returns true if it changed.
    pub fn refresh_status(&mut self, now: DateTime<Utc>) -> bool {
        let status = self.effective_status(now);
        if status == self.status {
            return false;
        }
        self.status = status;
        self.updated_at = now;
        true
    }

    /// Applies a payment.
    ///
    /// On error the debt is left exactly as it was.
    ///
    /// ## Example
    /// ```rust
    /// use chrono::Utc;
    /// use duka_core::debt::{Debt, DebtStatus};
    /// use duka_core::money::Money;
    ///
    /// let now = Utc::now();
    /// let mut debt = Debt::new("Alice", None, None, Money::from_cents(18_000), None, None, now).unwrap();
    ///
    /// debt.record_payment(Money::from_cents(10_000), None, None, now).unwrap();
    /// assert_eq!(debt.balance().cents(), 8_000);
    /// assert_eq!(debt.status, DebtStatus::Partial);
    ///
    /// assert!(debt.record_payment(Money::from_cents(10_000), None, None, now).is_err());
    /// assert_eq!(debt.balance().cents(), 8_000);
    /// ```
    pub fn record_payment(
        &mut self,
        amount: Money,
        payment_method_id: Option<String>,
        notes: Option<&str>,
        now: DateTime<Utc>,
    ) -> CoreResult<DebtPayment> {
        validate_payment_amount(amount)?;
        let notes = normalize_note("notes", notes)?;

        if self.balance_cents <= 0 {
            return Err(CoreError::DebtSettled(self.id.clone()));
        }
        if amount > self.balance() {
            return Err(CoreError::PaymentExceedsBalance {
                amount,
                balance: self.balance(),
            });
        }

        self.amount_paid_cents += amount.cents();
        self.balance_cents -= amount.cents();
        self.status = self.effective_status(now);
        self.version += 1;
        self.updated_at = now;

        Ok(DebtPayment {
            id: Uuid::new_v4().to_string(),
            debt_id: self.id.clone(),
            amount_cents: amount.cents(),
            payment_method_id,
            notes,
            created_at: now,
        })
    }
}

// =============================================================================
// Debt Payment
// =============================================================================

/// One payment against a debt. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct DebtPayment {
    pub id: String,
    pub debt_id: String,
    pub amount_cents: i64,
    pub payment_method_id: Option<String>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl DebtPayment {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
