//! Shared helpers for gophermart integration tests.
//!
//! Each file under `tests/` compiles as its own crate; suites pull these in
//! with `mod support;` and use what they need.
#![allow(dead_code, reason = "each suite uses a different subset of helpers")]

pub mod accrual_stub;
pub mod cluster_skip;
pub mod embedded_postgres;

pub use cluster_skip::handle_cluster_setup_failure;
