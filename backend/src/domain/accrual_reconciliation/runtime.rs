//! Port and runtime dependency bundles for the reconciliation engine.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mockable::{Clock, DefaultClock};

use crate::domain::ports::{AccrualSource, OrderLedgerRepository, ReconciliationMetrics};

use super::ReconciliationSleeper;

/// Port bundle required by the reconciliation engine.
pub struct ReconciliationPorts {
    /// Outbound accrual service adapter.
    pub source: Arc<dyn AccrualSource>,
    /// Order ledger persistence adapter.
    pub ledger: Arc<dyn OrderLedgerRepository>,
    /// Cycle metrics adapter.
    pub metrics: Arc<dyn ReconciliationMetrics>,
}

impl ReconciliationPorts {
    /// Build a strongly-typed engine port bundle.
    pub fn new(
        source: Arc<dyn AccrualSource>,
        ledger: Arc<dyn OrderLedgerRepository>,
        metrics: Arc<dyn ReconciliationMetrics>,
    ) -> Self {
        Self {
            source,
            ledger,
            metrics,
        }
    }
}

/// Runtime helpers used for pacing and cycle timing.
pub struct ReconciliationRuntime {
    /// Async sleep implementation.
    pub sleeper: Arc<dyn ReconciliationSleeper>,
    /// Clock used to time cycles.
    pub clock: Arc<dyn Clock>,
}

impl Default for ReconciliationRuntime {
    fn default() -> Self {
        Self {
            sleeper: Arc::new(TokioSleeper),
            clock: Arc::new(DefaultClock),
        }
    }
}

/// Tokio-based sleeper implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl ReconciliationSleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
