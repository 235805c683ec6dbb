//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod accrual_source;
mod loyalty_balance_query;
mod order_ledger_repository;
mod reconciliation_metrics;

#[cfg(test)]
pub use accrual_source::MockAccrualSource;
pub use accrual_source::{
    AccrualLookup, AccrualReport, AccrualSource, AccrualSourceError, ExternalAccrualStatus,
    FixtureAccrualSource, RateLimitHint,
};
#[cfg(test)]
pub use loyalty_balance_query::MockLoyaltyBalanceQuery;
pub use loyalty_balance_query::{
    FixtureLoyaltyBalanceQuery, LoyaltyBalanceQuery, LoyaltyBalanceQueryError,
};
#[cfg(test)]
pub use order_ledger_repository::MockOrderLedgerRepository;
pub use order_ledger_repository::{
    AccrualUpdate, AccrualUpdateOutcome, FixtureOrderLedgerRepository, NonFinalOrdersRequest,
    OrderLedgerRepository, OrderLedgerRepositoryError,
};
#[cfg(test)]
pub use reconciliation_metrics::MockReconciliationMetrics;
pub use reconciliation_metrics::{
    CycleOutcome, NoOpReconciliationMetrics, ReconciliationCycleSummary, ReconciliationMetrics,
    ReconciliationMetricsError,
};

#[cfg(test)]
mod tests;
