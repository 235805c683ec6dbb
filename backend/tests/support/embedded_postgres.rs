//! Schema and seed helpers for suites running against embedded PostgreSQL.
//!
//! Seeding goes through a synchronous Diesel connection so fixtures exist
//! before the async pool under test is built.

use diesel::pg::PgConnection;
use diesel::sql_types::{BigInt, Nullable, Text, Uuid as SqlUuid};
use diesel::{Connection, QueryableByName, RunQueryDsl, sql_query};
use gophermart::domain::{OrderStatus, UserId};
use gophermart::outbound::persistence::run_pending_migrations;

fn connect(url: &str) -> Result<PgConnection, String> {
    PgConnection::establish(url).map_err(|error| format!("connect {url}: {error}"))
}

/// Apply the crate's embedded migrations.
pub fn migrate_schema(url: &str) -> Result<(), String> {
    run_pending_migrations(url)
        .map(|_| ())
        .map_err(|error| error.to_string())
}

/// Insert a user with a random id and return it.
pub fn seed_user(url: &str, login: &str) -> Result<UserId, String> {
    let user_id = UserId::random();
    sql_query("INSERT INTO users (id, login) VALUES ($1, $2)")
        .bind::<SqlUuid, _>(*user_id.as_uuid())
        .bind::<Text, _>(login)
        .execute(&mut connect(url)?)
        .map_err(|error| format!("seed user {login}: {error}"))?;
    Ok(user_id)
}

/// Insert an order owned by `user_id`.
pub fn seed_order(
    url: &str,
    number: &str,
    user_id: &UserId,
    status: OrderStatus,
) -> Result<(), String> {
    sql_query("INSERT INTO orders (number, user_id, status) VALUES ($1, $2, $3)")
        .bind::<Text, _>(number)
        .bind::<SqlUuid, _>(*user_id.as_uuid())
        .bind::<Text, _>(status.as_str())
        .execute(&mut connect(url)?)
        .map_err(|error| format!("seed order {number}: {error}"))?;
    Ok(())
}

/// Insert a withdrawal of `hundredths` for `user_id`.
pub fn seed_withdrawal(url: &str, user_id: &UserId, hundredths: i64) -> Result<(), String> {
    sql_query("INSERT INTO loyalty_points (user_id, spent_hundredths) VALUES ($1, $2)")
        .bind::<SqlUuid, _>(*user_id.as_uuid())
        .bind::<BigInt, _>(hundredths)
        .execute(&mut connect(url)?)
        .map_err(|error| format!("seed withdrawal: {error}"))?;
    Ok(())
}

#[derive(QueryableByName)]
struct StatusRow {
    #[diesel(sql_type = Text)]
    status: String,
}

/// Stored status text for `number`.
pub fn order_status(url: &str, number: &str) -> Result<String, String> {
    let row: StatusRow = sql_query("SELECT status FROM orders WHERE number = $1")
        .bind::<Text, _>(number)
        .get_result(&mut connect(url)?)
        .map_err(|error| format!("read order {number}: {error}"))?;
    Ok(row.status)
}

/// Ledger credit as read back from `loyalty_points`.
#[derive(Debug, PartialEq, Eq, QueryableByName)]
pub struct CreditRow {
    /// Credited order.
    #[diesel(sql_type = Nullable<Text>)]
    pub order_number: Option<String>,
    /// Credited hundredths.
    #[diesel(sql_type = BigInt)]
    pub accrued_hundredths: i64,
}

/// Every ledger credit, ordered by insertion.
pub fn ledger_credits(url: &str) -> Result<Vec<CreditRow>, String> {
    sql_query(
        "SELECT order_number, accrued_hundredths FROM loyalty_points \
         WHERE accrued_hundredths > 0 ORDER BY id",
    )
    .load(&mut connect(url)?)
    .map_err(|error| format!("read ledger: {error}"))
}
