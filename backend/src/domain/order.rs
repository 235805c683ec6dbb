//! Purchase orders tracked for loyalty accrual.
//!
//! Orders are created by the upload path in state [`OrderStatus::New`] and
//! are only ever moved forward by the reconciliation engine.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use super::UserId;

/// Validation errors returned by [`OrderNumber::new`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderNumberValidationError {
    /// The number was an empty string.
    #[error("order number must not be empty")]
    Empty,
    /// The number contained something other than ASCII digits.
    #[error("order number must contain only ASCII digits")]
    NonDigit,
    /// The number started with `0`.
    #[error("order number must not start with zero")]
    LeadingZero,
}

/// Externally generated order number.
///
/// ## Invariants
/// - Non-empty, ASCII digits only, no leading zero.
///
/// Ordering is numeric: a shorter number sorts before a longer one and equal
/// lengths compare lexicographically. Repository cursors rely on this.
///
/// # Examples
/// ```
/// use gophermart::domain::OrderNumber;
///
/// let number = OrderNumber::new("79927398713").unwrap();
/// assert!(number.has_valid_checksum());
/// assert!(OrderNumber::new("9").unwrap() < OrderNumber::new("10").unwrap());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Validate and construct an order number.
    pub fn new(raw: impl Into<String>) -> Result<Self, OrderNumberValidationError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(OrderNumberValidationError::Empty);
        }
        if !raw.bytes().all(|byte| byte.is_ascii_digit()) {
            return Err(OrderNumberValidationError::NonDigit);
        }
        if raw.starts_with('0') {
            return Err(OrderNumberValidationError::LeadingZero);
        }
        Ok(Self(raw))
    }

    /// Borrow the digit string.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Return whether the number passes the Luhn checksum.
    pub fn has_valid_checksum(&self) -> bool {
        let sum: u32 = self
            .0
            .bytes()
            .rev()
            .enumerate()
            .map(|(position, byte)| {
                let digit = u32::from(byte - b'0');
                if position % 2 == 1 {
                    let doubled = digit * 2;
                    if doubled > 9 { doubled - 9 } else { doubled }
                } else {
                    digit
                }
            })
            .sum();
        sum % 10 == 0
    }
}

impl Ord for OrderNumber {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .len()
            .cmp(&other.0.len())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for OrderNumber {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for OrderNumber {
    type Err = OrderNumberValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Order processing status.
///
/// `Processed` and `Invalid` are terminal; only non-final orders are polled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    /// Uploaded, not yet acknowledged by the accrual service.
    New,
    /// Acknowledged by the accrual service, calculation in progress.
    Processing,
    /// Rejected by the accrual service; no points granted.
    Invalid,
    /// Calculation finished; points granted.
    Processed,
}

impl OrderStatus {
    /// Statuses that are never polled again.
    pub const FINAL: [Self; 2] = [Self::Invalid, Self::Processed];

    /// Statuses eligible for polling.
    pub const NON_FINAL: [Self; 2] = [Self::New, Self::Processing];

    /// Upper-case wire and storage representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Processing => "PROCESSING",
            Self::Invalid => "INVALID",
            Self::Processed => "PROCESSED",
        }
    }

    /// Return whether the status is terminal.
    pub fn is_final(self) -> bool {
        Self::FINAL.contains(&self)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown status label.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown order status: {0}")]
pub struct ParseOrderStatusError(pub String);

impl FromStr for OrderStatus {
    type Err = ParseOrderStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(Self::New),
            "PROCESSING" => Ok(Self::Processing),
            "INVALID" => Ok(Self::Invalid),
            "PROCESSED" => Ok(Self::Processed),
            other => Err(ParseOrderStatusError(other.to_owned())),
        }
    }
}

/// Stored order as seen by the reconciliation engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    /// Globally unique order number.
    pub number: OrderNumber,
    /// Owning user; never changes after upload.
    pub user_id: UserId,
    /// Current processing status.
    pub status: OrderStatus,
    /// Upload timestamp.
    pub uploaded_at: DateTime<Utc>,
}
