//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match the database migrations exactly. They are used
//! by Diesel for compile-time query validation and type-safe SQL generation.
//!
//! # Maintenance
//!
//! When migrations change the schema, this file should be regenerated or
//! manually updated to reflect those changes. The `diesel print-schema`
//! command can generate these definitions from a live database.

diesel::table! {
    /// Registered ledger owners.
    users (id) {
        /// Primary key: UUID v4 identifier.
        id -> Uuid,
        /// Unique login name.
        login -> Text,
        /// Record creation timestamp.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Uploaded purchase orders awaiting or holding an accrual result.
    orders (number) {
        /// Primary key: digit-only order number.
        number -> Text,
        /// Owning user.
        user_id -> Uuid,
        /// `NEW`, `PROCESSING`, `INVALID`, or `PROCESSED`.
        status -> Text,
        /// Upload timestamp.
        uploaded_at -> Timestamptz,
    }
}

diesel::table! {
    /// Append-only loyalty ledger.
    ///
    /// Accrual credits link to their order; withdrawals leave
    /// `order_number` empty.
    loyalty_points (id) {
        /// Surrogate key.
        id -> Int8,
        /// Ledger owner.
        user_id -> Uuid,
        /// Credited order, unique when present.
        order_number -> Nullable<Text>,
        /// Credited amount in hundredths.
        accrued_hundredths -> Int8,
        /// Withdrawn amount in hundredths.
        spent_hundredths -> Int8,
        /// Entry timestamp.
        created_at -> Timestamptz,
    }
}

diesel::joinable!(orders -> users (user_id));
diesel::joinable!(loyalty_points -> users (user_id));

diesel::allow_tables_to_appear_in_same_query!(users, orders, loyalty_points);
