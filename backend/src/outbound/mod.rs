//! Outbound adapters implementing the domain ports.
//!
//! - **accrual**: reqwest client for the external accrual service
//! - **persistence**: PostgreSQL ledger adapters using Diesel
//! - **metrics**: Prometheus counters (feature-gated)
//!
//! Adapters translate between domain types and infrastructure
//! representations. They contain no reconciliation logic.

pub mod accrual;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod persistence;
