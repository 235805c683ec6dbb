//! Domain orchestration for accrual reconciliation.
//!
//! The engine repeatedly asks the order ledger for orders that have not yet
//! reached a final status, queries the accrual service for each of them
//! concurrently, and persists whatever the service confirmed. The external
//! service is rate limited, so the scheduler owns a per-cycle budget and a
//! resumption cursor that let it back off and pick up where it stopped.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::domain::Error;
use crate::domain::ports::CycleOutcome;

mod dispatch;
mod policy;
mod runtime;
mod scheduler;

pub use runtime::{ReconciliationPorts, ReconciliationRuntime, TokioSleeper};
pub use scheduler::ReconciliationScheduler;

/// Default number of orders looked up per cycle.
pub const DEFAULT_BATCH_SIZE: u32 = 20;
/// Default idle pause between cycles.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Default suspension after the accrual service throttles a lookup.
pub const DEFAULT_RATE_LIMIT_COOLDOWN: Duration = Duration::from_secs(60);

/// Engine configuration controlling pacing and back-off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationConfig {
    /// Pause between cycles that were not throttled.
    pub poll_interval: Duration,
    /// Rate budget for the first cycle and upper bound for later ones.
    pub initial_batch_size: u32,
    /// Suspension after a 429 that carried no `Retry-After` header.
    pub rate_limit_cooldown: Duration,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            initial_batch_size: DEFAULT_BATCH_SIZE,
            rate_limit_cooldown: DEFAULT_RATE_LIMIT_COOLDOWN,
        }
    }
}

impl ReconciliationConfig {
    /// Reject configurations the scheduler cannot run with.
    ///
    /// ```rust
    /// use gophermart::domain::ReconciliationConfig;
    ///
    /// let mut config = ReconciliationConfig::default();
    /// assert!(config.validate().is_ok());
    /// config.initial_batch_size = 0;
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), Error> {
        if self.initial_batch_size == 0 {
            return Err(Error::invalid_request(
                "reconciliation batch size must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Async sleeping abstraction for cycle pacing and cooldowns.
#[async_trait]
pub trait ReconciliationSleeper: Send + Sync {
    /// Suspend execution for `duration`.
    ///
    /// ```rust,no_run
    /// use async_trait::async_trait;
    /// use gophermart::domain::ReconciliationSleeper;
    /// use std::sync::{Arc, Mutex};
    /// use std::time::Duration;
    /// #[derive(Default)]
    /// struct CountingSleeper {
    ///     calls: Arc<Mutex<u32>>,
    /// }
    /// #[async_trait]
    /// impl ReconciliationSleeper for CountingSleeper {
    ///     async fn sleep(&self, _duration: Duration) {
    ///         *self.calls.lock().expect("calls mutex") += 1;
    ///     }
    /// }
    /// # async fn demo() {
    /// let sleeper = CountingSleeper::default();
    /// sleeper.sleep(Duration::from_millis(25)).await;
    /// assert_eq!(*sleeper.calls.lock().expect("calls mutex"), 1);
    /// # }
    /// ```
    async fn sleep(&self, duration: Duration);
}

/// Long-running accrual reconciliation process.
pub struct ReconciliationEngine {
    scheduler: ReconciliationScheduler,
    sleeper: Arc<dyn ReconciliationSleeper>,
    poll_interval: Duration,
}

impl ReconciliationEngine {
    /// Build an engine using the Tokio sleeper and the system clock.
    /// ```rust,ignore
    /// let engine = ReconciliationEngine::new(ports, ReconciliationConfig::default())?;
    /// ```
    pub fn new(ports: ReconciliationPorts, config: ReconciliationConfig) -> Result<Self, Error> {
        Self::with_runtime(ports, ReconciliationRuntime::default(), config)
    }

    /// Build an engine with injected runtime abstractions.
    pub fn with_runtime(
        ports: ReconciliationPorts,
        runtime: ReconciliationRuntime,
        config: ReconciliationConfig,
    ) -> Result<Self, Error> {
        config.validate()?;
        let poll_interval = config.poll_interval;
        let ReconciliationRuntime { sleeper, clock } = runtime;
        Ok(Self {
            scheduler: ReconciliationScheduler::new(ports, clock, config),
            sleeper,
            poll_interval,
        })
    }

    /// Scheduler state, exposed for inspection.
    pub fn scheduler(&self) -> &ReconciliationScheduler {
        &self.scheduler
    }

    /// Run cycles until `shutdown` is cancelled.
    ///
    /// Errors from the repository or the accrual service are logged and
    /// retried on later cycles; they never end the loop.
    ///
    /// ```rust,ignore
    /// let shutdown = CancellationToken::new();
    /// let handle = tokio::spawn(engine.run(shutdown.clone()));
    /// shutdown.cancel();
    /// handle.await?;
    /// ```
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(
            batch_size = self.scheduler.rate_budget(),
            poll_interval_ms = duration_millis(self.poll_interval),
            "accrual reconciliation started"
        );

        while !shutdown.is_cancelled() {
            let summary = self.scheduler.run_cycle(&shutdown).await;
            let pause = match summary.outcome {
                CycleOutcome::Cancelled => break,
                CycleOutcome::Throttled { cooldown, .. } => cooldown,
                CycleOutcome::Completed | CycleOutcome::FetchFailed => self.poll_interval,
            };

            debug!(pause_ms = duration_millis(pause), "waiting before next cycle");
            tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                () = self.sleeper.sleep(pause) => {}
            }
        }

        info!("accrual reconciliation stopped");
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
