//! # Validation Module
//!
//! Field-level input rules shared by the cart, tender and debt modules.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Frontend                                                     │
//! │  └── Immediate feedback (empty field, not a number)                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: duka-core                                                    │
//! │  └── THIS MODULE + cart/tender/debt rules                              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite (duka-db)                                             │
//! │  ├── CHECK (balance_cents >= 0)                                        │
//! │  └── Conditional UPDATEs for stock and debt balances                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY, MAX_NOTE_LENGTH, MAX_TENDER_CENTS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a customer name and returns it trimmed.
///
/// ## Example
/// ```rust
/// use duka_core::validation::validate_customer_name;
///
/// assert_eq!(validate_customer_name("  Alice ").unwrap(), "Alice");
/// assert!(validate_customer_name("   ").is_err());
/// ```
pub fn validate_customer_name(name: &str) -> ValidationResult<String> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "customer name".to_string(),
        });
    }

    if name.len() > 255 {
        return Err(ValidationError::TooLong {
            field: "customer name".to_string(),
            max: 255,
        });
    }

    Ok(name.to_string())
}

/// Normalizes an optional reference number: blank becomes `None`.
///
/// ## Rules
/// - Surrounding whitespace is dropped
/// - Maximum 100 characters
pub fn normalize_reference(reference: Option<&str>) -> ValidationResult<Option<String>> {
    let Some(reference) = reference.map(str::trim).filter(|r| !r.is_empty()) else {
        return Ok(None);
    };

    if reference.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "reference number".to_string(),
            max: 100,
        });
    }

    Ok(Some(reference.to_string()))
}

/// Validates free text (remarks, notes); blank becomes `None`.
pub fn normalize_note(field: &str, note: Option<&str>) -> ValidationResult<Option<String>> {
    let Some(note) = note.map(str::trim).filter(|n| !n.is_empty()) else {
        return Ok(None);
    };

    if note.len() > MAX_NOTE_LENGTH {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NOTE_LENGTH,
        });
    }

    Ok(Some(note.to_string()))
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity value.
///
/// ## Rules
/// - Must be positive (> 0): a zero-quantity line is an input error,
///   removing a line is a separate operation
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (free items)
pub fn validate_price(price: Money) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::Negative {
            field: "price".to_string(),
        });
    }

    Ok(())
}

/// Validates a tendered amount.
///
/// ## Rules
/// - Must be non-negative; zero is an unused method
/// - Must not exceed MAX_TENDER_CENTS
pub fn validate_tender_amount(amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::Negative {
            field: "tendered amount".to_string(),
        });
    }

    if amount.cents() > MAX_TENDER_CENTS {
        return Err(ValidationError::OutOfRange {
            field: "tendered amount".to_string(),
            min: 0,
            max: MAX_TENDER_CENTS,
        });
    }

    Ok(())
}

/// Validates a debt payment amount.
///
/// ## Rules
/// - Must be positive (> 0)
pub fn validate_payment_amount(amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "payment amount".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates cart size before a new line is added.
///
/// ## Rules
/// - Must not exceed MAX_CART_ITEMS (100)
pub fn validate_cart_size(current_items: usize) -> ValidationResult<()> {
    if current_items >= MAX_CART_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "cart items".to_string(),
            min: 0,
            max: MAX_CART_ITEMS as i64,
        });
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string format.
///
/// ## Example
/// ```rust
/// use duka_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_customer_name() {
        assert_eq!(validate_customer_name("Alice").unwrap(), "Alice");
        assert!(validate_customer_name("").is_err());
        assert!(validate_customer_name(&"A".repeat(300)).is_err());
    }

    #[test]
    fn test_normalize_reference() {
        assert_eq!(normalize_reference(None).unwrap(), None);
        assert_eq!(normalize_reference(Some("   ")).unwrap(), None);
        assert_eq!(
            normalize_reference(Some(" QJK12AB ")).unwrap(),
            Some("QJK12AB".to_string())
        );
        assert!(normalize_reference(Some(&"X".repeat(101))).is_err());
    }

    #[test]
    fn test_normalize_note() {
        assert_eq!(normalize_note("remarks", Some("")).unwrap(), None);
        assert!(normalize_note("remarks", Some(&"x".repeat(MAX_NOTE_LENGTH + 1))).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_amounts() {
        assert!(validate_price(Money::zero()).is_ok());
        assert!(validate_price(Money::from_cents(-1)).is_err());

        assert!(validate_tender_amount(Money::zero()).is_ok());
        assert!(validate_tender_amount(Money::from_cents(-1)).is_err());
        assert!(validate_tender_amount(Money::from_cents(MAX_TENDER_CENTS)).is_ok());
        assert!(matches!(
            validate_tender_amount(Money::from_cents(MAX_TENDER_CENTS + 1)),
            Err(ValidationError::OutOfRange { .. })
        ));

        assert!(validate_payment_amount(Money::from_cents(1)).is_ok());
        assert!(validate_payment_amount(Money::zero()).is_err());
    }

    #[test]
    fn test_validate_cart_size() {
        assert!(validate_cart_size(0).is_ok());
        assert!(validate_cart_size(MAX_CART_ITEMS - 1).is_ok());
        assert!(validate_cart_size(MAX_CART_ITEMS).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("123").is_err());
    }
}
