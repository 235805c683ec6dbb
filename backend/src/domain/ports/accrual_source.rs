//! Driven port for looking up order accruals in the external accrual service.
//!
//! The domain owns the outcome shape so the scheduler can stay
//! adapter-agnostic. Expected protocol states (confirmed, not registered,
//! rate limited) are `Ok` variants; only genuine failures are errors.

use std::time::Duration;

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::{OrderNumber, OrderStatus, Points};

/// Calculation status as reported by the accrual service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalAccrualStatus {
    /// Order is known to the service; calculation not started.
    Registered,
    /// Calculation in progress.
    Processing,
    /// Order rejected; no accrual will be granted.
    Invalid,
    /// Calculation finished.
    Processed,
}

impl ExternalAccrualStatus {
    /// Parse the service's upper-case status label.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "REGISTERED" => Some(Self::Registered),
            "PROCESSING" => Some(Self::Processing),
            "INVALID" => Some(Self::Invalid),
            "PROCESSED" => Some(Self::Processed),
            _ => None,
        }
    }

    /// Local order status this external status advances the order to.
    ///
    /// `Registered` counts as acknowledged, so it maps to `Processing`.
    pub fn order_status(self) -> OrderStatus {
        match self {
            Self::Registered | Self::Processing => OrderStatus::Processing,
            Self::Invalid => OrderStatus::Invalid,
            Self::Processed => OrderStatus::Processed,
        }
    }
}

/// Accrual calculation result returned with HTTP 200.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccrualReport {
    /// Order number echoed by the service.
    pub order: OrderNumber,
    /// Calculation status.
    pub status: ExternalAccrualStatus,
    /// Granted amount; zero when the service omits it.
    pub accrual: Points,
}

/// Throttling hints carried by a 429 response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RateLimitHint {
    /// Parsed "No more than N requests per minute" limit.
    pub max_requests_per_minute: Option<u32>,
    /// Parsed `Retry-After` header.
    pub retry_after: Option<Duration>,
}

/// Successful protocol outcomes of one lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccrualLookup {
    /// HTTP 200 with a well-formed body.
    Confirmed(AccrualReport),
    /// HTTP 204: the service does not know the order yet.
    NotRegistered,
    /// HTTP 429: the caller must back off.
    RateLimited(RateLimitHint),
}

define_port_error! {
    /// Errors surfaced while calling the accrual service.
    pub enum AccrualSourceError {
        /// The service answered with a 5xx status.
        ServerUnavailable { status: u16, message: String } =>
            "accrual service unavailable ({status}): {message}",
        /// The service answered with a status outside the protocol.
        UnexpectedStatus { status: u16, message: String } =>
            "accrual service returned unexpected status {status}: {message}",
        /// Network transport failed before a response was received.
        Transport { message: String } =>
            "accrual transport failed: {message}",
        /// The call exceeded its timeout.
        Timeout { message: String } =>
            "accrual request timed out: {message}",
        /// A 200 response body could not be decoded.
        Decode { message: String } =>
            "accrual response decode failed: {message}",
    }
}

impl AccrualSourceError {
    /// Return whether the error reflects malformed data rather than an
    /// unreachable service.
    pub fn is_data_quality(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }
}

/// Port for per-order accrual lookups.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccrualSource: Send + Sync {
    /// Look up the accrual state of one order.
    ///
    /// Dropping the returned future aborts the in-flight request.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// use gophermart::domain::OrderNumber;
    /// use gophermart::domain::ports::{AccrualLookup, AccrualSource, FixtureAccrualSource};
    ///
    /// let source = FixtureAccrualSource;
    /// let number = OrderNumber::new("79927398713")?;
    /// assert_eq!(source.lookup(&number).await?, AccrualLookup::NotRegistered);
    /// ```
    async fn lookup(&self, order: &OrderNumber) -> Result<AccrualLookup, AccrualSourceError>;
}

/// Fixture implementation that never knows any order.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureAccrualSource;

#[async_trait]
impl AccrualSource for FixtureAccrualSource {
    async fn lookup(&self, _order: &OrderNumber) -> Result<AccrualLookup, AccrualSourceError> {
        Ok(AccrualLookup::NotRegistered)
    }
}
