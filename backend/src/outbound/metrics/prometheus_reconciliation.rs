//! Prometheus adapter for reconciliation cycle counters.
//!
//! Two counter families are maintained: `reconciliation_cycles_total` keyed by
//! cycle outcome, and `reconciliation_orders_total` keyed by what happened to
//! each fetched order.

use async_trait::async_trait;
use prometheus::{IntCounterVec, Opts, Registry};

use crate::domain::ports::{
    ReconciliationCycleSummary, ReconciliationMetrics, ReconciliationMetricsError,
};

/// Prometheus-backed recorder for reconciliation cycles.
pub struct PrometheusReconciliationMetrics {
    cycles_total: IntCounterVec,
    orders_total: IntCounterVec,
}

impl PrometheusReconciliationMetrics {
    /// Create and register counters with the provided registry.
    ///
    /// # Errors
    ///
    /// Returns an error when Prometheus rejects metric registration.
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let cycles_total = IntCounterVec::new(
            Opts::new(
                "reconciliation_cycles_total",
                "Reconciliation polling cycles by outcome",
            ),
            &["outcome"],
        )?;
        let orders_total = IntCounterVec::new(
            Opts::new(
                "reconciliation_orders_total",
                "Orders handled by the reconciler by result",
            ),
            &["result"],
        )?;
        registry.register(Box::new(cycles_total.clone()))?;
        registry.register(Box::new(orders_total.clone()))?;
        Ok(Self {
            cycles_total,
            orders_total,
        })
    }

    fn add_orders(&self, result: &str, count: usize) {
        if count == 0 {
            return;
        }
        let count = u64::try_from(count).unwrap_or(u64::MAX);
        self.orders_total.with_label_values(&[result]).inc_by(count);
    }
}

#[async_trait]
impl ReconciliationMetrics for PrometheusReconciliationMetrics {
    async fn record_cycle(
        &self,
        summary: &ReconciliationCycleSummary,
    ) -> Result<(), ReconciliationMetricsError> {
        self.cycles_total
            .with_label_values(&[summary.outcome.as_str()])
            .inc();
        self.add_orders("credited", summary.credited);
        self.add_orders("status_changed", summary.status_changed);
        self.add_orders("unchanged", summary.unchanged);
        self.add_orders("not_registered", summary.not_registered);
        self.add_orders("lookup_failed", summary.lookup_failures);
        self.add_orders("update_failed", summary.update_failures);
        self.add_orders("skipped", summary.skipped);
        Ok(())
    }
}
