//! Gophermart loyalty ledger: accrual reconciliation worker.
//!
//! The [`domain`] layer owns order and points types, the driven ports, and
//! the reconciliation engine. [`outbound`] adapters connect those ports to the
//! accrual HTTP service and PostgreSQL; [`inbound`] serves health probes;
//! [`settings`] loads runtime configuration.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

pub mod domain;
pub mod inbound;
pub mod outbound;
pub mod settings;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
