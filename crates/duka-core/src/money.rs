//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  A till that sums tenders in floats drifts a cent at a time, and the   │
//! │  "is it paid?" check needs a fudge factor to hide it.                  │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    Every amount is an i64 count of cents. Sums are exact.              │
//! │    Rounding happens in exactly two places: percentage discounts and    │
//! │    the inclusive VAT split, both half-up to the cent.                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use duka_core::money::Money;
//!
//! let price = Money::from_cents(10_000); // 100.00
//! let line = price.multiply_quantity(2); // 200.00
//! assert_eq!(line.to_string(), "200.00");
//!
//! // Boundary values arrive as decimal strings
//! let parsed = Money::parse("1,250.5").unwrap();
//! assert_eq!(parsed.cents(), 125_050);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::types::TaxRate;

/// Sufficiency tolerance for settlement and debt comparisons (one cent).
pub const SETTLEMENT_TOLERANCE: Money = Money::from_cents(1);

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: differences such as `tendered - gross` can go negative
///   before they are clamped into change or shortfall
/// - **Single field tuple struct**: Zero-cost abstraction over i64
///
/// ## Where Money Flows
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                                                                         │
/// │  Product.selling_price ──► CartItem.unit_price ──► line_total           │
/// │                                                                         │
/// │  Cart.subtotal ══ gross_total ──► VAT split (net + vat)                 │
/// │                      │                                                  │
/// │  TenderEntry.amount ─┴─► total_tendered ──► change_due / shortfall      │
/// │                                                  │                      │
/// │                                                  ▼                      │
/// │                                       Debt.amount ──► Debt.balance      │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use duka_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // 10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// For negative amounts only the major unit carries the sign:
    /// `from_major_minor(-5, 50)` is -5.50.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Parses a decimal amount as typed by a cashier or sent by an API.
    ///
    /// ## Accepted Input
    /// - Optional leading `-`
    /// - Thousands separators (`,`) are ignored
    /// - At most two fractional digits (`12`, `12.5`, `12.50`)
    ///
    /// ## Example
    /// ```rust
    /// use duka_core::money::Money;
    ///
    /// assert_eq!(Money::parse("180").unwrap().cents(), 18_000);
    /// assert_eq!(Money::parse("0.05").unwrap().cents(), 5);
    /// assert!(Money::parse("1.005").is_err());
    /// assert!(Money::parse("abc").is_err());
    /// ```
    pub fn parse(input: &str) -> Result<Money, ValidationError> {
        let invalid = |reason: &str| ValidationError::InvalidFormat {
            field: "amount".to_string(),
            reason: reason.to_string(),
        };

        let cleaned: String = input.trim().chars().filter(|c| *c != ',').collect();
        if cleaned.is_empty() {
            return Err(ValidationError::Required {
                field: "amount".to_string(),
            });
        }

        let (negative, digits) = match cleaned.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, cleaned.as_str()),
        };

        let (major_str, minor_str) = match digits.split_once('.') {
            Some((major, minor)) => (major, minor),
            None => (digits, ""),
        };

        if major_str.is_empty() && minor_str.is_empty() {
            return Err(invalid("must contain digits"));
        }
        if !major_str.chars().all(|c| c.is_ascii_digit())
            || !minor_str.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid("must be a decimal number"));
        }
        if minor_str.len() > 2 {
            return Err(invalid("at most two decimal places"));
        }

        let major: i64 = if major_str.is_empty() {
            0
        } else {
            major_str.parse().map_err(|_| invalid("value too large"))?
        };
        let minor: i64 = match minor_str.len() {
            0 => 0,
            1 => minor_str.parse::<i64>().map_err(|_| invalid("bad fraction"))? * 10,
            _ => minor_str.parse().map_err(|_| invalid("bad fraction"))?,
        };

        let cents = major
            .checked_mul(100)
            .and_then(|c| c.checked_add(minor))
            .ok_or_else(|| invalid("value too large"))?;

        Ok(Money(if negative { -cents } else { cents }))
    }

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Clamps negative values to zero.
    ///
    /// Change due and shortfall are both `max(0, a - b)`; this is that `max`.
    #[inline]
    pub const fn non_negative(&self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            *self
        }
    }

    /// Adds, clamping at the `i64` bounds instead of overflowing.
    #[inline]
    pub const fn saturating_add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use duka_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(299);
    /// assert_eq!(unit_price.multiply_quantity(3).cents(), 897);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Returns `bps / 10000` of this amount, rounded half-up to the cent.
    ///
    /// ## Example
    /// ```rust
    /// use duka_core::money::Money;
    ///
    /// let raw = Money::from_cents(20_000); // 200.00
    /// assert_eq!(raw.percentage_of(1000).cents(), 2_000); // 10% = 20.00
    /// assert_eq!(Money::from_cents(5).percentage_of(5000).cents(), 3); // 2.5 → 3
    /// ```
    pub fn percentage_of(&self, bps: u32) -> Money {
        Money(div_round_half_up(self.0 as i128 * bps as i128, 10_000) as i64)
    }

    /// Splits a tax-inclusive amount into `(net, vat)`.
    ///
    /// ## Formula
    /// ```text
    /// net = gross / (1 + rate)     rounded half-up to the cent
    /// vat = gross - net            so net + vat == gross, always
    /// ```
    ///
    /// ## Example
    /// ```rust
    /// use duka_core::money::Money;
    /// use duka_core::types::TaxRate;
    ///
    /// let gross = Money::from_cents(11_600); // 116.00 at 16% VAT
    /// let (net, vat) = gross.split_inclusive_tax(TaxRate::from_bps(1600));
    /// assert_eq!(net.cents(), 10_000);
    /// assert_eq!(vat.cents(), 1_600);
    /// ```
    pub fn split_inclusive_tax(&self, rate: TaxRate) -> (Money, Money) {
        let denominator = 10_000 + rate.bps() as i128;
        let net = Money(div_round_half_up(self.0 as i128 * 10_000, denominator) as i64);
        (net, *self - net)
    }
}

/// Integer division rounding halves away from zero.
fn div_round_half_up(numerator: i128, denominator: i128) -> i128 {
    let doubled = numerator * 2;
    if (numerator >= 0) == (denominator > 0) {
        (doubled + denominator.abs()) / (denominator * 2)
    } else {
        (doubled - denominator.abs()) / (denominator * 2)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display renders two decimal places with no currency symbol (`-12.50`).
///
/// Currency symbols belong to the receipt/UI layer.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

/// Multiplication by i64 (for quantity calculations).
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
