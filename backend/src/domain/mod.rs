//! Domain primitives, ports, and the accrual reconciliation engine.
//!
//! Purpose: define strongly typed order and ledger values and the background
//! process that keeps local order status in step with the external accrual
//! service. Persistence and HTTP concerns live behind the traits in
//! [`ports`].
//!
//! Public surface:
//! - Error / ErrorCode — domain error payload and stable identifier.
//! - OrderNumber, OrderStatus, Order — orders awaiting accrual.
//! - Points, LoyaltyBalance — fixed-point ledger amounts.
//! - UserId — ledger owner identity.
//! - ReconciliationEngine, ReconciliationScheduler — the polling loop.

pub mod accrual_reconciliation;
pub mod error;
pub mod order;
pub mod points;
pub mod ports;
pub mod user;

pub use self::accrual_reconciliation::{
    DEFAULT_BATCH_SIZE, DEFAULT_POLL_INTERVAL, DEFAULT_RATE_LIMIT_COOLDOWN, ReconciliationConfig,
    ReconciliationEngine, ReconciliationPorts, ReconciliationRuntime, ReconciliationScheduler,
    ReconciliationSleeper, TokioSleeper,
};
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::order::{
    Order, OrderNumber, OrderNumberValidationError, OrderStatus, ParseOrderStatusError,
};
pub use self::points::{LoyaltyBalance, Points, PointsValidationError};
pub use self::user::{UserId, UserValidationError};
