//! Driven port for reading non-final orders and applying confirmed accruals.
//!
//! `apply_accrual` is the only write the reconciliation engine performs. Its
//! contract is atomic and guarded:
//!
//! - the status change and the optional ledger credit commit together or not
//!   at all;
//! - the write only proceeds while the stored status is non-final and differs
//!   from the requested one, so re-applying the same confirmed result is a
//!   no-op instead of a second credit;
//! - a credit is appended only for `PROCESSED` with a positive amount.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::{Order, OrderNumber, OrderStatus, Points, UserId};

/// Batch request for orders still awaiting a final status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonFinalOrdersRequest {
    /// Maximum number of orders to return.
    pub limit: u32,
    /// Only return orders numerically after this one.
    pub resume_after: Option<OrderNumber>,
}

/// Confirmed accrual to apply to one order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccrualUpdate {
    /// Order being advanced.
    pub order: OrderNumber,
    /// Target status.
    pub status: OrderStatus,
    /// Amount reported by the accrual service.
    pub accrual: Points,
}

/// Result of a guarded accrual write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccrualUpdateOutcome {
    /// Status moved to `PROCESSED` and one ledger entry was appended.
    Credited {
        /// Owner of the order and the new ledger entry.
        user_id: UserId,
        /// Credited amount.
        amount: Points,
    },
    /// Status moved without a ledger credit.
    StatusChanged,
    /// The guard rejected the write: the order is final, missing, or already
    /// in the requested status.
    Unchanged,
}

define_port_error! {
    /// Persistence errors exposed by the order ledger.
    pub enum OrderLedgerRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "order ledger connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "order ledger query failed: {message}",
    }
}

/// Port for the order and loyalty-ledger store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderLedgerRepository: Send + Sync {
    /// Return up to `limit` non-final orders after the cursor, ascending by
    /// order number.
    async fn non_final_orders(
        &self,
        request: &NonFinalOrdersRequest,
    ) -> Result<Vec<Order>, OrderLedgerRepositoryError>;

    /// Atomically advance an order and credit its owner when processed.
    async fn apply_accrual(
        &self,
        update: &AccrualUpdate,
    ) -> Result<AccrualUpdateOutcome, OrderLedgerRepositoryError>;
}

/// Fixture implementation with no orders.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureOrderLedgerRepository;

#[async_trait]
impl OrderLedgerRepository for FixtureOrderLedgerRepository {
    async fn non_final_orders(
        &self,
        _request: &NonFinalOrdersRequest,
    ) -> Result<Vec<Order>, OrderLedgerRepositoryError> {
        Ok(Vec::new())
    }

    async fn apply_accrual(
        &self,
        _update: &AccrualUpdate,
    ) -> Result<AccrualUpdateOutcome, OrderLedgerRepositoryError> {
        Ok(AccrualUpdateOutcome::Unchanged)
    }
}
