//! PostgreSQL adapters for the loyalty ledger.
//!
//! The reconciler reads the non-final order backlog and applies confirmed
//! accruals through [`DieselOrderLedgerRepository`]; balances are derived from
//! the points ledger by [`DieselLoyaltyBalanceQuery`]. Diesel rows and schema
//! definitions stay private to this module.
//!
//! ```ignore
//! use gophermart::outbound::persistence::{DbPool, DieselOrderLedgerRepository, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/gophermart")).await?;
//! let ledger = DieselOrderLedgerRepository::new(pool);
//! ```

mod diesel_basic_error_mapping;
mod diesel_loyalty_balance_query;
mod diesel_order_ledger_repository;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_loyalty_balance_query::DieselLoyaltyBalanceQuery;
pub use diesel_order_ledger_repository::DieselOrderLedgerRepository;
pub use migrations::{MIGRATIONS, MigrationError, run_pending_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
