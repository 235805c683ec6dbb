//! Fixed-point loyalty point amounts.

use std::fmt;

/// Validation errors returned when constructing [`Points`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PointsValidationError {
    /// The amount was negative.
    #[error("point amount must not be negative")]
    Negative,
    /// The amount was NaN or infinite.
    #[error("point amount must be finite")]
    NonFinite,
    /// The amount does not fit the storage range.
    #[error("point amount is out of range")]
    OutOfRange,
}

/// Non-negative point amount stored in hundredths.
///
/// The accrual service reports decimal amounts; they are rounded to two
/// places on entry so ledger sums stay exact.
///
/// # Examples
/// ```
/// use gophermart::domain::Points;
///
/// let amount = Points::from_decimal(500.0).unwrap();
/// assert_eq!(amount.hundredths(), 50_000);
/// assert_eq!(amount.to_string(), "500.00");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Points(i64);

impl Points {
    /// Zero points.
    pub const ZERO: Self = Self(0);

    /// Build from a count of hundredths.
    pub fn from_hundredths(hundredths: i64) -> Result<Self, PointsValidationError> {
        if hundredths < 0 {
            return Err(PointsValidationError::Negative);
        }
        Ok(Self(hundredths))
    }

    /// Build from a decimal amount, rounding half away from zero to two places.
    pub fn from_decimal(amount: f64) -> Result<Self, PointsValidationError> {
        if !amount.is_finite() {
            return Err(PointsValidationError::NonFinite);
        }
        if amount < 0.0 {
            return Err(PointsValidationError::Negative);
        }
        let scaled = (amount * 100.0).round();
        if scaled >= i64::MAX as f64 {
            return Err(PointsValidationError::OutOfRange);
        }
        // Finite, non-negative, and range-checked above.
        Ok(Self(scaled as i64))
    }

    /// Amount in hundredths.
    pub fn hundredths(self) -> i64 {
        self.0
    }

    /// Return whether the amount is strictly positive.
    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Add two amounts, returning `None` on overflow.
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }
}

impl fmt::Display for Points {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

/// Derived balance of a user's ledger entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoyaltyBalance {
    /// Accrued minus spent.
    pub current: Points,
    /// Total spent across all entries.
    pub spent: Points,
}
