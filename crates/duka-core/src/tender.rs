//! # Tender Allocation
//!
//! Payment entries offered against a sale and the arithmetic over them.
//!
//! ## Split Tender
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Gross 500.00                                                           │
//! │                                                                         │
//! │  [x] Cash         300.00                                                │
//! │  [x] M-Pesa       250.00   ref QJK12AB                                  │
//! │  [ ] Credit note  100.00   (not selected, ignored)                      │
//! │  ─────────────────────────                                              │
//! │  total_tendered   550.00                                                │
//! │  change_due        50.00   (display only, never stored as a tender)     │
//! │  shortfall          0.00                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{PaymentMethod, PaymentMethodKind};
use crate::validation::{normalize_reference, validate_tender_amount, ValidationResult};

// =============================================================================
// Tender Entry
// =============================================================================

/// One payment method's contribution to a sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TenderEntry {
    pub method_id: String,
    pub method_name: String,
    pub kind: PaymentMethodKind,
    /// Whether the method was active when the entry was created.
    pub method_active: bool,
    pub amount: Money,
    pub reference: Option<String>,
    pub selected: bool,
}

impl TenderEntry {
    /// Creates a selected entry for a payment method.
    pub fn for_method(method: &PaymentMethod, amount: Money) -> Self {
        TenderEntry {
            method_id: method.id.clone(),
            method_name: method.name.clone(),
            kind: method.kind,
            method_active: method.is_active,
            amount,
            reference: None,
            selected: true,
        }
    }

    /// Builder-style reference number.
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// Whether this entry contributes to the total.
    pub fn counts(&self) -> bool {
        self.selected && self.amount.is_positive()
    }
}

// =============================================================================
// Tender Set
// =============================================================================

/// The tenders of one checkout, at most one entry per payment method.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TenderSet {
    entries: Vec<TenderEntry>,
}

impl TenderSet {
    pub fn new() -> Self {
        TenderSet::default()
    }

    /// Inserts an entry, replacing any existing entry for the same method.
    pub fn set(&mut self, entry: TenderEntry) {
        match self.entries.iter_mut().find(|e| e.method_id == entry.method_id) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    /// Removes the entry for a method, returning it if present.
    pub fn remove(&mut self, method_id: &str) -> Option<TenderEntry> {
        let index = self.entries.iter().position(|e| e.method_id == method_id)?;
        Some(self.entries.remove(index))
    }

    /// Toggles whether a method's entry counts. Returns false when absent.
    pub fn select(&mut self, method_id: &str, selected: bool) -> bool {
        match self.entries.iter_mut().find(|e| e.method_id == method_id) {
            Some(entry) => {
                entry.selected = selected;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, method_id: &str) -> Option<&TenderEntry> {
        self.entries.iter().find(|e| e.method_id == method_id)
    }

    pub fn entries(&self) -> &[TenderEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Shorthand for [`allocate`] over this set.
    pub fn summary(&self, gross_total: Money) -> TenderSummary {
        allocate(&self.entries, gross_total)
    }
}

impl FromIterator<TenderEntry> for TenderSet {
    fn from_iter<I: IntoIterator<Item = TenderEntry>>(iter: I) -> Self {
        let mut set = TenderSet::new();
        for entry in iter {
            set.set(entry);
        }
        set
    }
}

// =============================================================================
// Allocation
// =============================================================================

/// Totals over a tender set for a given gross amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TenderSummary {
    pub total_tendered: Money,
    /// max(0, tendered − gross).
    pub change_due: Money,
    /// max(0, gross − tendered).
    pub shortfall: Money,
}

/// Sums the counted entries against the gross total.
///
/// Entries that skipped [`validate_tenders`] may hold any amount; the sum
/// saturates rather than overflowing.
///
/// ## Example
/// ```rust
/// use duka_core::money::Money;
/// use duka_core::tender::{allocate, TenderEntry};
/// use duka_core::types::{PaymentMethod, PaymentMethodKind};
///
/// let cash = PaymentMethod {
///     id: "cash".into(),
///     name: "Cash".into(),
///     kind: PaymentMethodKind::Cash,
///     is_active: true,
/// };
/// let entries = [TenderEntry::for_method(&cash, Money::from_cents(20_000))];
///
/// let summary = allocate(&entries, Money::from_cents(18_000));
/// assert_eq!(summary.change_due.cents(), 2_000);
/// assert!(summary.shortfall.is_zero());
/// ```
pub fn allocate(entries: &[TenderEntry], gross_total: Money) -> TenderSummary {
    let total_tendered: Money = entries
        .iter()
        .filter(|e| e.counts())
        .fold(Money::zero(), |total, e| total.saturating_add(e.amount));

    TenderSummary {
        total_tendered,
        change_due: (total_tendered - gross_total).non_negative(),
        shortfall: (gross_total - total_tendered).non_negative(),
    }
}

/// Applies the per-method input rules and returns the entries that will be
/// recorded as payments, with references normalized.
///
/// ## Rules
/// - No selected entry may carry a negative amount
/// - A counted entry must belong to an active method
/// - A counted `Mpesa` / `Other` entry needs a non-blank reference
pub fn validate_tenders(entries: &[TenderEntry]) -> ValidationResult<Vec<TenderEntry>> {
    let mut accepted = Vec::new();

    for entry in entries.iter().filter(|e| e.selected) {
        validate_tender_amount(entry.amount)?;
        if !entry.counts() {
            continue;
        }

        if !entry.method_active {
            return Err(ValidationError::Inactive {
                field: "payment method".to_string(),
                value: entry.method_name.clone(),
            });
        }

        let reference = normalize_reference(entry.reference.as_deref())?;
        if entry.kind.requires_reference() && reference.is_none() {
            return Err(ValidationError::Required {
                field: entry.kind.reference_label().to_string(),
            });
        }

        accepted.push(TenderEntry {
            reference,
            ..entry.clone()
        });
    }

    Ok(accepted)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn method(id: &str, kind: PaymentMethodKind) -> PaymentMethod {
        PaymentMethod {
            id: id.to_string(),
            name: id.to_uppercase(),
            kind,
            is_active: true,
        }
    }

    fn cents(c: i64) -> Money {
        Money::from_cents(c)
    }

    #[test]
    fn test_allocate_split_tender() {
        let mut set = TenderSet::new();
        set.set(TenderEntry::for_method(&method("cash", PaymentMethodKind::Cash), cents(30_000)));
        set.set(
            TenderEntry::for_method(&method("mpesa", PaymentMethodKind::Mpesa), cents(25_000))
                .with_reference("QJK12AB"),
        );
        let mut note = TenderEntry::for_method(
            &method("note", PaymentMethodKind::CreditNote),
            cents(10_000),
        );
        note.selected = false;
        set.set(note);

        let summary = set.summary(cents(50_000));
        assert_eq!(summary.total_tendered.cents(), 55_000);
        assert_eq!(summary.change_due.cents(), 5_000);
        assert!(summary.shortfall.is_zero());
    }

    #[test]
    fn test_allocate_shortfall_is_exact() {
        let entries = [TenderEntry::for_method(
            &method("cash", PaymentMethodKind::Cash),
            cents(44_999),
        )];
        let summary = allocate(&entries, cents(50_000));
        assert_eq!(summary.shortfall.cents(), 5_001);
        assert!(summary.change_due.is_zero());
    }

    #[test]
    fn test_oversized_tenders_are_rejected() {
        let entries = [
            TenderEntry::for_method(&method("cash", PaymentMethodKind::Cash), cents(i64::MAX - 1)),
            TenderEntry::for_method(&method("note", PaymentMethodKind::CreditNote), cents(i64::MAX - 1)),
        ];

        assert!(matches!(
            validate_tenders(&entries),
            Err(ValidationError::OutOfRange { .. })
        ));

        let summary = allocate(&entries, cents(18_000));
        assert_eq!(summary.total_tendered.cents(), i64::MAX);
        assert_eq!(summary.change_due.cents(), i64::MAX - 18_000);
        assert!(summary.shortfall.is_zero());
    }

    #[test]
    fn test_set_replaces_same_method() {
        let cash = method("cash", PaymentMethodKind::Cash);
        let mut set = TenderSet::new();
        set.set(TenderEntry::for_method(&cash, cents(100)));
        set.set(TenderEntry::for_method(&cash, cents(700)));

        assert_eq!(set.entries().len(), 1);
        assert_eq!(set.get("cash").unwrap().amount.cents(), 700);
        assert!(set.remove("cash").is_some());
        assert!(set.is_empty());
    }

    #[test]
    fn test_mpesa_requires_reference() {
        let mpesa = method("mpesa", PaymentMethodKind::Mpesa);
        let entry = TenderEntry::for_method(&mpesa, cents(50_000)).with_reference("  ");

        let err = validate_tenders(&[entry.clone()]).unwrap_err();
        assert_eq!(err.to_string(), "M-Pesa reference number is required");

        let fixed = entry.with_reference("QJK12AB");
        let accepted = validate_tenders(&[fixed]).unwrap();
        assert_eq!(accepted[0].reference.as_deref(), Some("QJK12AB"));
        assert_eq!(allocate(&accepted, cents(50_000)).shortfall, Money::zero());
    }

    #[test]
    fn test_zero_amount_needs_no_reference() {
        let other = method("card", PaymentMethodKind::Other);
        let accepted = validate_tenders(&[TenderEntry::for_method(&other, Money::zero())]).unwrap();
        assert!(accepted.is_empty());
    }

    #[test]
    fn test_rejects_negative_and_inactive() {
        let cash = method("cash", PaymentMethodKind::Cash);
        assert!(matches!(
            validate_tenders(&[TenderEntry::for_method(&cash, cents(-1))]),
            Err(ValidationError::Negative { .. })
        ));

        let mut retired = method("cheque", PaymentMethodKind::Other);
        retired.is_active = false;
        let entry = TenderEntry::for_method(&retired, cents(100)).with_reference("CHQ-1");
        assert!(matches!(
            validate_tenders(&[entry]),
            Err(ValidationError::Inactive { .. })
        ));
    }
}
