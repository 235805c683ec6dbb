//! One reconciliation cycle: fetch, dispatch, apply, account.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use mockable::Clock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::{Order, OrderNumber};
use crate::domain::ports::{
    AccrualLookup, AccrualReport, AccrualSource, AccrualUpdate, AccrualUpdateOutcome, CycleOutcome,
    OrderLedgerRepository, ReconciliationCycleSummary, ReconciliationMetrics,
};

use super::ReconciliationConfig;
use super::dispatch::{self, LookupSlot};
use super::policy::SchedulerState;
use super::runtime::ReconciliationPorts;

/// Drives single reconciliation cycles and carries the rate budget and
/// resumption cursor between them.
pub struct ReconciliationScheduler {
    source: Arc<dyn AccrualSource>,
    ledger: Arc<dyn OrderLedgerRepository>,
    metrics: Arc<dyn ReconciliationMetrics>,
    clock: Arc<dyn Clock>,
    state: SchedulerState,
}

impl ReconciliationScheduler {
    /// Build a scheduler with a full budget and no cursor.
    pub fn new(
        ports: ReconciliationPorts,
        clock: Arc<dyn Clock>,
        config: ReconciliationConfig,
    ) -> Self {
        Self {
            source: ports.source,
            ledger: ports.ledger,
            metrics: ports.metrics,
            clock,
            state: SchedulerState::new(config.initial_batch_size, config.rate_limit_cooldown),
        }
    }

    /// Batch size the next cycle will request.
    pub fn rate_budget(&self) -> u32 {
        self.state.budget()
    }

    /// Order after which the next cycle resumes, if any.
    pub fn cursor(&self) -> Option<&OrderNumber> {
        self.state.cursor()
    }

    /// Run one cycle.
    ///
    /// Fetches up to the current budget of non-final orders after the
    /// cursor, looks them all up concurrently and applies every result that
    /// precedes the first rate-limited order. Failures are counted in the
    /// returned summary and logged; none of them abort the cycle.
    pub async fn run_cycle(&mut self, shutdown: &CancellationToken) -> ReconciliationCycleSummary {
        let started = self.clock.utc();
        let request = self.state.next_request();
        let limit = request.limit;

        let orders = match self.ledger.non_final_orders(&request).await {
            Ok(mut orders) => {
                orders.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
                orders
            }
            Err(error) => {
                warn!(%error, limit, "failed to fetch non-final orders");
                let summary = ReconciliationCycleSummary::empty(limit, CycleOutcome::FetchFailed);
                return self.finish(summary, started).await;
            }
        };

        let mut summary = ReconciliationCycleSummary::empty(limit, CycleOutcome::Completed);
        summary.fetched = orders.len();
        if orders.is_empty() {
            self.state.record_completed(&orders, limit);
            return self.finish(summary, started).await;
        }

        let batch = dispatch::dispatch_batch(self.source.as_ref(), &orders, shutdown).await;
        if shutdown.is_cancelled() {
            summary.skipped = orders.len();
            summary.outcome = CycleOutcome::Cancelled;
            return self.finish(summary, started).await;
        }

        let cutoff = batch.cutoff();
        let first_unresolved = batch.first_unresolved();
        let rate_limited = batch.rate_limited;
        summary.skipped = orders.len().saturating_sub(cutoff);
        for (order, slot) in orders.iter().zip(batch.results).take(cutoff) {
            self.apply_slot(order, slot, &mut summary).await;
        }

        match rate_limited {
            Some((index, hint)) => {
                let decision = self.state.record_throttled(&orders, first_unresolved, hint);
                let throttled_order = orders.get(index).map(|order| order.number.as_str());
                info!(
                    order = throttled_order.unwrap_or_default(),
                    next_budget = decision.next_budget,
                    cooldown_secs = decision.cooldown.as_secs(),
                    abandoned = summary.skipped,
                    "accrual service rate limited the batch"
                );
                summary.outcome = CycleOutcome::Throttled {
                    next_budget: decision.next_budget,
                    cooldown: decision.cooldown,
                };
            }
            None => self.state.record_completed(&orders, limit),
        }

        self.finish(summary, started).await
    }

    async fn apply_slot(
        &self,
        order: &Order,
        slot: LookupSlot,
        summary: &mut ReconciliationCycleSummary,
    ) {
        match slot {
            Some(Ok(AccrualLookup::Confirmed(report))) => {
                self.apply_report(order, report, summary).await;
            }
            Some(Ok(AccrualLookup::NotRegistered)) => {
                debug!(order = %order.number, "order not registered with accrual service");
                summary.not_registered += 1;
            }
            Some(Err(error)) => {
                warn!(
                    order = %order.number,
                    %error,
                    data_quality = error.is_data_quality(),
                    "accrual lookup failed"
                );
                summary.lookup_failures += 1;
            }
            // Below the cutoff a 429 cannot occur; a missing slot means the
            // lookup was cancelled.
            Some(Ok(AccrualLookup::RateLimited(_))) | None => summary.skipped += 1,
        }
    }

    async fn apply_report(
        &self,
        order: &Order,
        report: AccrualReport,
        summary: &mut ReconciliationCycleSummary,
    ) {
        if report.order != order.number {
            warn!(
                order = %order.number,
                reported = %report.order,
                "accrual service answered for a different order"
            );
            summary.lookup_failures += 1;
            return;
        }

        let update = AccrualUpdate {
            order: report.order,
            status: report.status.order_status(),
            accrual: report.accrual,
        };
        if update.status == order.status {
            debug!(order = %update.order, status = %update.status, "order status unchanged");
            summary.unchanged += 1;
            return;
        }

        match self.ledger.apply_accrual(&update).await {
            Ok(AccrualUpdateOutcome::Credited { user_id, amount }) => {
                info!(order = %update.order, %user_id, %amount, "accrual credited");
                summary.credited += 1;
            }
            Ok(AccrualUpdateOutcome::StatusChanged) => {
                info!(order = %update.order, status = %update.status, "order status advanced");
                summary.status_changed += 1;
            }
            Ok(AccrualUpdateOutcome::Unchanged) => {
                debug!(order = %update.order, "accrual update rejected by status guard");
                summary.unchanged += 1;
            }
            Err(error) => {
                warn!(order = %update.order, %error, "failed to apply accrual");
                summary.update_failures += 1;
            }
        }
    }

    async fn finish(
        &self,
        summary: ReconciliationCycleSummary,
        started: DateTime<Utc>,
    ) -> ReconciliationCycleSummary {
        let elapsed_ms = (self.clock.utc() - started).num_milliseconds();
        if summary.fetched == 0 && summary.outcome == CycleOutcome::Completed {
            debug!(limit = summary.batch_limit, elapsed_ms, "no orders awaiting accrual");
        } else {
            info!(
                outcome = summary.outcome.as_str(),
                limit = summary.batch_limit,
                fetched = summary.fetched,
                credited = summary.credited,
                status_changed = summary.status_changed,
                unchanged = summary.unchanged,
                not_registered = summary.not_registered,
                lookup_failures = summary.lookup_failures,
                update_failures = summary.update_failures,
                skipped = summary.skipped,
                elapsed_ms,
                "reconciliation cycle finished"
            );
        }

        // A failed counter write never affects reconciliation.
        if let Err(error) = self.metrics.record_cycle(&summary).await {
            debug!(%error, "failed to record reconciliation metrics");
        }
        summary
    }
}
