//! Inbound adapters.
//!
//! The reconciler has no business endpoints; [`http`] only serves the probes
//! orchestrators use to watch the worker process.

pub mod http;
