//! Shared Diesel error mapping for the ledger adapters.
//!
//! Both adapters expose the same `Connection`/`Query` error split, so the
//! mapping is written once against constructor closures.

use tracing::debug;

use super::pool::PoolError;

/// Map pool errors into a repository-specific connection error constructor.
pub fn map_basic_pool_error<E, C>(error: PoolError, connection: C) -> E
where
    C: FnOnce(String) -> E,
{
    let message = match error {
        PoolError::Checkout { message } | PoolError::Build { message } => message,
    };
    connection(message)
}

/// Map Diesel errors into query/connection constructors.
///
/// Database messages are logged at `debug` with their kind and the failing
/// operation; callers only see a short, stable message.
pub fn map_basic_diesel_error<E, Q, C>(
    error: diesel::result::Error,
    operation: &'static str,
    query: Q,
    connection: C,
) -> E
where
    Q: FnOnce(String) -> E,
    C: FnOnce(String) -> E,
{
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), operation, "diesel operation failed");
        }
        _ => debug!(%error, operation, "diesel operation failed"),
    }

    match error {
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _)
        | DieselError::BrokenTransactionManager => {
            connection(format!("{operation}: database connection error"))
        }
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            query(format!("{operation}: unique constraint violated"))
        }
        DieselError::DatabaseError(DatabaseErrorKind::SerializationFailure, _) => {
            query(format!("{operation}: serialization failure"))
        }
        DieselError::NotFound => query(format!("{operation}: record not found")),
        _ => query(format!("{operation}: database error")),
    }
}
