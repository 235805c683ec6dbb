//! PostgreSQL-backed order ledger adapter.
//!
//! Reads the non-final backlog in numeric order and applies confirmed
//! accruals with a status-guarded update plus an optional ledger credit in one
//! transaction.

use async_trait::async_trait;
use diesel::OptionalExtension;
use diesel::prelude::*;
use diesel::sql_query;
use diesel::sql_types::{BigInt, Nullable, Text};
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::domain::ports::{
    AccrualUpdate, AccrualUpdateOutcome, NonFinalOrdersRequest, OrderLedgerRepository,
    OrderLedgerRepositoryError,
};
use crate::domain::{Order, OrderNumber, OrderStatus, UserId};

use super::diesel_basic_error_mapping::{map_basic_diesel_error, map_basic_pool_error};
use super::models::{NewLoyaltyPointsRow, OrderRow};
use super::pool::{DbPool, PoolError};
use super::schema::{loyalty_points, orders};

/// Diesel-backed implementation of [`OrderLedgerRepository`].
#[derive(Clone)]
pub struct DieselOrderLedgerRepository {
    pool: DbPool,
}

impl DieselOrderLedgerRepository {
    /// Create a repository backed by `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

// `char_length` first so digit strings compare numerically.
const NON_FINAL_ORDERS_SQL: &str = r#"
SELECT number, user_id, status, uploaded_at
FROM orders
WHERE status IN ('NEW', 'PROCESSING')
  AND ($1::text IS NULL OR (char_length(number), number) > (char_length($1), $1))
ORDER BY char_length(number), number
LIMIT $2
"#;

fn map_pool_error(error: PoolError) -> OrderLedgerRepositoryError {
    map_basic_pool_error(error, OrderLedgerRepositoryError::connection)
}

fn map_diesel_error(
    operation: &'static str,
) -> impl FnOnce(diesel::result::Error) -> OrderLedgerRepositoryError {
    move |error| {
        map_basic_diesel_error(
            error,
            operation,
            OrderLedgerRepositoryError::query,
            OrderLedgerRepositoryError::connection,
        )
    }
}

fn row_to_order(row: OrderRow) -> Result<Order, OrderLedgerRepositoryError> {
    let number = OrderNumber::new(row.number.as_str()).map_err(|error| {
        OrderLedgerRepositoryError::query(format!("stored order {:?}: {error}", row.number))
    })?;
    let status = row.status.parse::<OrderStatus>().map_err(|error| {
        OrderLedgerRepositoryError::query(format!("stored order {number}: {error}"))
    })?;
    Ok(Order {
        number,
        user_id: UserId::from_uuid(row.user_id),
        status,
        uploaded_at: row.uploaded_at,
    })
}

#[async_trait]
impl OrderLedgerRepository for DieselOrderLedgerRepository {
    async fn non_final_orders(
        &self,
        request: &NonFinalOrdersRequest,
    ) -> Result<Vec<Order>, OrderLedgerRepositoryError> {
        if request.limit == 0 {
            return Ok(Vec::new());
        }

        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<OrderRow> = sql_query(NON_FINAL_ORDERS_SQL)
            .bind::<Nullable<Text>, _>(request.resume_after.as_ref().map(OrderNumber::as_str))
            .bind::<BigInt, _>(i64::from(request.limit))
            .load(&mut conn)
            .await
            .map_err(map_diesel_error("load non-final orders"))?;

        rows.into_iter().map(row_to_order).collect()
    }

    async fn apply_accrual(
        &self,
        update: &AccrualUpdate,
    ) -> Result<AccrualUpdateOutcome, OrderLedgerRepositoryError> {
        use diesel_async::AsyncConnection as _;
        use diesel_async::scoped_futures::ScopedFutureExt as _;

        let number = update.order.as_str();
        let target = update.status.as_str();
        let non_final: Vec<&str> = OrderStatus::NON_FINAL
            .iter()
            .map(|status| status.as_str())
            .collect();
        let credit = update.status == OrderStatus::Processed && update.accrual.is_positive();
        let amount = update.accrual;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        // The status guard and the credit share one transaction so a
        // repeated confirmation can neither re-credit nor half-apply.
        let owner = conn
            .transaction(|conn| {
                async move {
                    let owner: Option<Uuid> = diesel::update(
                        orders::table
                            .filter(orders::number.eq(number))
                            .filter(orders::status.eq_any(non_final))
                            .filter(orders::status.ne(target)),
                    )
                    .set(orders::status.eq(target))
                    .returning(orders::user_id)
                    .get_result(conn)
                    .await
                    .optional()?;

                    if let Some(user_id) = owner.filter(|_| credit) {
                        diesel::insert_into(loyalty_points::table)
                            .values(&NewLoyaltyPointsRow {
                                user_id,
                                order_number: Some(number),
                                accrued_hundredths: amount.hundredths(),
                                spent_hundredths: 0,
                            })
                            .execute(conn)
                            .await?;
                    }

                    Ok::<_, diesel::result::Error>(owner)
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error("apply accrual"))?;

        Ok(match owner {
            None => AccrualUpdateOutcome::Unchanged,
            Some(user_id) if credit => AccrualUpdateOutcome::Credited {
                user_id: UserId::from_uuid(user_id),
                amount,
            },
            Some(_) => AccrualUpdateOutcome::StatusChanged,
        })
    }
}
