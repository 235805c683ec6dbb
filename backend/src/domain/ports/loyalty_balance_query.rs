//! Driven port for deriving a user's point balance from ledger entries.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::{LoyaltyBalance, UserId};

define_port_error! {
    /// Errors exposed while summing ledger entries.
    pub enum LoyaltyBalanceQueryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "loyalty balance connection failed: {message}",
        /// Query failed or returned an out-of-range sum.
        Query { message: String } =>
            "loyalty balance query failed: {message}",
    }
}

/// Read model over append-only ledger entries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LoyaltyBalanceQuery: Send + Sync {
    /// Sum accrued and spent amounts for one user.
    ///
    /// Users with no entries have a zero balance.
    async fn balance(&self, user_id: &UserId) -> Result<LoyaltyBalance, LoyaltyBalanceQueryError>;
}

/// Fixture implementation reporting an empty ledger.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureLoyaltyBalanceQuery;

#[async_trait]
impl LoyaltyBalanceQuery for FixtureLoyaltyBalanceQuery {
    async fn balance(&self, _user_id: &UserId) -> Result<LoyaltyBalance, LoyaltyBalanceQueryError> {
        Ok(LoyaltyBalance::default())
    }
}
