//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  With floats:                                                           │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  A day of canteen sales summed as floats drifts by fractions of a      │
//! │  rupiah, and the daily report no longer matches the cash drawer.       │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units                                      │
//! │    Rupiah has no coins below 1, so 1 unit = Rp 1.                      │
//! │    Currencies with cents use decimals = 2 in CurrencyFormat.           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use kantin_core::money::Money;
//!
//! let price = Money::from_minor(1500);     // Rp 1.500
//! let line = price * 3;                    // Rp 4.500
//! let margin = price - Money::from_minor(1000);
//! assert_eq!(margin.minor(), 500);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit.
///
/// ## Design Decisions
/// - **i64 (signed)**: Profit goes negative when an item is sold below cost
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Serializes as a bare integer**: CSV columns stay plain numbers
/// - **Operators saturate**: `+`, `-`, `*` clamp at the i64 bounds instead of
///   wrapping or panicking. Values that are written to the ledger go through
///   the `checked_*` methods instead, so a clamped amount is never stored.
///
/// ## Where Money Flows
/// ```text
/// Product.cost_price ──┐
///                      ├──► TransactionRecord.unit_cost / unit_price (snapshot)
/// Product.sell_price ──┘              │
///                                     ▼
///                      TransactionRecord.profit ──► PeriodSummary.profit
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    ///
    /// ## Example
    /// ```rust
    /// use kantin_core::money::Money;
    ///
    /// let price = Money::from_minor(1500);
    /// assert_eq!(price.minor(), 1500);
    /// ```
    #[inline]
    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn minor(&self) -> i64 {
        self.0
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

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies money by a quantity.
    ///
    /// ## User Workflow
    /// ```text
    /// Product: Roti Bakar Rp 1.500
    /// Quantity: 3
    ///      │
    ///      ▼
    /// multiply_quantity(3) ← THIS FUNCTION
    ///      │
    ///      ▼
    /// Line Total: Rp 4.500
    /// ```
    ///
    /// Saturates at the i64 bounds. Report totals use this.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }

    /// Multiplies by a quantity, returning `None` on overflow.
    ///
    /// Used for every amount that ends up in a ledger row.
    #[inline]
    pub fn checked_multiply_quantity(&self, qty: i64) -> Option<Self> {
        self.0.checked_mul(qty).map(Money)
    }

    /// Subtraction returning `None` on overflow.
    #[inline]
    pub fn checked_sub(&self, other: Money) -> Option<Self> {
        self.0.checked_sub(other.0).map(Money)
    }

    /// Integer average over `count` items (rounded half away from zero).
    ///
    /// Returns zero when `count` is zero so empty reports never divide by zero.
    pub fn average_over(&self, count: u64) -> Money {
        if count == 0 {
            return Money::zero();
        }
        let count = count as i128;
        let total = self.0 as i128;
        let half = count / 2;
        let rounded = if total >= 0 {
            (total + half) / count
        } else {
            (total - half) / count
        };
        Money(rounded as i64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows the raw minor-unit amount.
///
/// ## Note
/// Use [`CurrencyFormat::format`] for anything an operator reads.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
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
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_sub(other.0);
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        self.multiply_quantity(qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Currency Formatting
// =============================================================================

/// How money is rendered for the operator.
///
/// ## Default (Rupiah)
/// ```text
/// 1500      → "Rp 1.500"
/// 1250000   → "Rp 1.250.000"
/// -500      → "-Rp 500"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrencyFormat {
    /// Symbol printed before the amount.
    pub symbol: String,

    /// Number of minor-unit digits (0 for Rupiah, 2 for cents).
    pub decimals: u8,

    /// Digit group separator.
    pub thousands_separator: String,

    /// Separator between whole and fractional part.
    pub decimal_separator: String,
}

impl Default for CurrencyFormat {
    fn default() -> Self {
        CurrencyFormat {
            symbol: "Rp".to_string(),
            decimals: 0,
            thousands_separator: ".".to_string(),
            decimal_separator: ",".to_string(),
        }
    }
}

impl CurrencyFormat {
    /// Formats an amount, e.g. `Rp 1.500`.
    pub fn format(&self, amount: Money) -> String {
        let minor = amount.minor();
        let sign = if minor < 0 { "-" } else { "" };
        let abs = minor.unsigned_abs();

        let divisor = 10_u64.pow(self.decimals as u32);
        let whole = abs / divisor;
        let frac = abs % divisor;

        let grouped = group_digits(whole, &self.thousands_separator);

        if self.decimals > 0 {
            format!(
                "{}{} {}{}{:0width$}",
                sign,
                self.symbol,
                grouped,
                self.decimal_separator,
                frac,
                width = self.decimals as usize
            )
        } else {
            format!("{}{} {}", sign, self.symbol, grouped)
        }
    }
}

fn group_digits(value: u64, separator: &str) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push_str(separator);
        }
        out.push(ch);
    }
    out
}

// =============================================================================
// Unit Tests
// =============================================================================
