//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. They exist solely to satisfy Diesel's
//! type requirements for queries and mutations.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::BigInt;
use uuid::Uuid;

use super::schema::{loyalty_points, orders};

/// Row read from the orders table.
#[derive(Debug, Clone, Queryable, QueryableByName, Selectable)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct OrderRow {
    pub number: String,
    pub user_id: Uuid,
    pub status: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Insertable ledger credit.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = loyalty_points)]
pub(crate) struct NewLoyaltyPointsRow<'a> {
    pub user_id: Uuid,
    pub order_number: Option<&'a str>,
    pub accrued_hundredths: i64,
    pub spent_hundredths: i64,
}

/// Per-user ledger sums.
#[derive(Debug, Clone, Copy, QueryableByName)]
pub(crate) struct LedgerTotalsRow {
    #[diesel(sql_type = BigInt)]
    pub accrued: i64,
    #[diesel(sql_type = BigInt)]
    pub spent: i64,
}
