//! Domain port surface for reconciliation cycle counters.
//!
//! The scheduler reports one summary per polling cycle. Adapters may export
//! it to Prometheus; failures to record are never fatal to the loop.

use std::time::Duration;

use async_trait::async_trait;

use super::define_port_error;

define_port_error! {
    /// Errors exposed when recording reconciliation metrics.
    pub enum ReconciliationMetricsError {
        /// Metric exporter rejected the write.
        Export { message: String } =>
            "reconciliation metrics exporter failed: {message}",
    }
}

/// How a polling cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Every dispatched lookup finished and results were applied.
    Completed,
    /// A lookup was rate limited; the remainder of the batch was abandoned.
    Throttled {
        /// Rate budget for the next cycle.
        next_budget: u32,
        /// Suspension before the next cycle.
        cooldown: Duration,
    },
    /// The batch could not be fetched; nothing was dispatched.
    FetchFailed,
    /// Shutdown was requested while the batch was in flight.
    Cancelled,
}

impl CycleOutcome {
    /// Stable label used in logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Throttled { .. } => "throttled",
            Self::FetchFailed => "fetch_failed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Per-cycle tallies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconciliationCycleSummary {
    /// Batch size requested from the repository.
    pub batch_limit: u32,
    /// Orders returned by the repository.
    pub fetched: usize,
    /// Orders moved to `PROCESSED` with a ledger credit.
    pub credited: usize,
    /// Orders whose status moved without a credit.
    pub status_changed: usize,
    /// Confirmed results the repository guard turned into no-ops.
    pub unchanged: usize,
    /// Lookups answered with 204.
    pub not_registered: usize,
    /// Lookups that failed with a transport, status, or decode error.
    pub lookup_failures: usize,
    /// Confirmed results the repository failed to persist.
    pub update_failures: usize,
    /// Orders left untouched because the batch was cut short.
    pub skipped: usize,
    /// How the cycle ended.
    pub outcome: CycleOutcome,
}

impl ReconciliationCycleSummary {
    /// Empty summary for a cycle with the given batch limit.
    pub fn empty(batch_limit: u32, outcome: CycleOutcome) -> Self {
        Self {
            batch_limit,
            fetched: 0,
            credited: 0,
            status_changed: 0,
            unchanged: 0,
            not_registered: 0,
            lookup_failures: 0,
            update_failures: 0,
            skipped: 0,
            outcome,
        }
    }
}

/// Metrics recording port for reconciliation cycles.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReconciliationMetrics: Send + Sync {
    /// Record one finished cycle.
    ///
    /// ```rust,ignore
    /// use gophermart::domain::ports::{
    ///     CycleOutcome, NoOpReconciliationMetrics, ReconciliationCycleSummary,
    ///     ReconciliationMetrics,
    /// };
    ///
    /// # async fn demo() {
    /// let metrics = NoOpReconciliationMetrics;
    /// let summary = ReconciliationCycleSummary::empty(20, CycleOutcome::Completed);
    /// assert!(metrics.record_cycle(&summary).await.is_ok());
    /// # }
    /// ```
    async fn record_cycle(
        &self,
        summary: &ReconciliationCycleSummary,
    ) -> Result<(), ReconciliationMetricsError>;
}

/// Metrics sink that discards every summary.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpReconciliationMetrics;

#[async_trait]
impl ReconciliationMetrics for NoOpReconciliationMetrics {
    async fn record_cycle(
        &self,
        _summary: &ReconciliationCycleSummary,
    ) -> Result<(), ReconciliationMetricsError> {
        Ok(())
    }
}
