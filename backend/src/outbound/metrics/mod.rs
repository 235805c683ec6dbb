//! Prometheus exporters for domain metrics ports (feature `metrics`).

mod prometheus_reconciliation;

pub use prometheus_reconciliation::PrometheusReconciliationMetrics;
