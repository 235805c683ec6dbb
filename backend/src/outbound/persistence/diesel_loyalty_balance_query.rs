//! PostgreSQL-backed loyalty balance read model.
//!
//! The worker binary never reads balances; this adapter serves operators and
//! the integration suite verifying that each accrual credits the owner once.

use async_trait::async_trait;
use diesel::sql_query;
use diesel::sql_types::Uuid as SqlUuid;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{LoyaltyBalanceQuery, LoyaltyBalanceQueryError};
use crate::domain::{LoyaltyBalance, Points, UserId};

use super::diesel_basic_error_mapping::{map_basic_diesel_error, map_basic_pool_error};
use super::models::LedgerTotalsRow;
use super::pool::DbPool;

const LEDGER_TOTALS_SQL: &str = r#"
SELECT COALESCE(SUM(accrued_hundredths), 0)::bigint AS accrued,
       COALESCE(SUM(spent_hundredths), 0)::bigint AS spent
FROM loyalty_points
WHERE user_id = $1
"#;

/// Diesel-backed implementation of [`LoyaltyBalanceQuery`].
#[derive(Clone)]
pub struct DieselLoyaltyBalanceQuery {
    pool: DbPool,
}

impl DieselLoyaltyBalanceQuery {
    /// Create a query adapter backed by `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn totals_to_balance(totals: LedgerTotalsRow) -> Result<LoyaltyBalance, LoyaltyBalanceQueryError> {
    let remaining = totals.accrued.checked_sub(totals.spent).ok_or_else(|| {
        LoyaltyBalanceQueryError::query("ledger totals overflow")
    })?;
    let current = Points::from_hundredths(remaining).map_err(|error| {
        LoyaltyBalanceQueryError::query(format!("current balance: {error}"))
    })?;
    let spent = Points::from_hundredths(totals.spent)
        .map_err(|error| LoyaltyBalanceQueryError::query(format!("spent total: {error}")))?;
    Ok(LoyaltyBalance { current, spent })
}

#[async_trait]
impl LoyaltyBalanceQuery for DieselLoyaltyBalanceQuery {
    async fn balance(&self, user_id: &UserId) -> Result<LoyaltyBalance, LoyaltyBalanceQueryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|error| map_basic_pool_error(error, LoyaltyBalanceQueryError::connection))?;

        let totals: LedgerTotalsRow = sql_query(LEDGER_TOTALS_SQL)
            .bind::<SqlUuid, _>(*user_id.as_uuid())
            .get_result(&mut conn)
            .await
            .map_err(|error| {
                map_basic_diesel_error(
                    error,
                    "sum loyalty points",
                    LoyaltyBalanceQueryError::query,
                    LoyaltyBalanceQueryError::connection,
                )
            })?;

        totals_to_balance(totals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn subtracts_spent_from_accrued() {
        let balance = totals_to_balance(LedgerTotalsRow {
            accrued: 72_950,
            spent: 2_950,
        })
        .expect("balance");
        assert_eq!(balance.current.to_string(), "700.00");
        assert_eq!(balance.spent.to_string(), "29.50");
    }

    #[rstest]
    fn overdrawn_ledger_is_reported_as_query_error() {
        let error = totals_to_balance(LedgerTotalsRow {
            accrued: 100,
            spent: 200,
        })
        .expect_err("negative balance must be rejected");
        assert!(matches!(error, LoyaltyBalanceQueryError::Query { .. }));
    }
}
