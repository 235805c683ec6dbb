//! Accrual service outbound adapters.
//!
//! This module provides a thin HTTP implementation of the `AccrualSource`
//! port.

mod dto;
mod http_client;

pub use http_client::{AccrualHttpClient, AccrualHttpClientError};
