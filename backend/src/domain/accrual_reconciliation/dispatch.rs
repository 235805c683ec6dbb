//! Concurrent lookup fan-out for one batch.
//!
//! Every order in the batch is looked up at once. The first 429 cancels the
//! batch token, which resolves every lookup still in flight to `None` and
//! drops its request future.

use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use tokio_util::sync::CancellationToken;

use crate::domain::Order;
use crate::domain::ports::{AccrualLookup, AccrualSource, AccrualSourceError, RateLimitHint};

/// Per-order lookup result; `None` when the lookup was cancelled.
pub type LookupSlot = Option<Result<AccrualLookup, AccrualSourceError>>;

/// Collected results of one batch, indexed like the input orders.
#[derive(Debug)]
pub struct BatchLookups {
    pub results: Vec<LookupSlot>,
    /// Lowest batch index answered with 429, with its hint.
    pub rate_limited: Option<(usize, RateLimitHint)>,
}

impl BatchLookups {
    /// Index of the first order whose result must not be applied.
    pub fn cutoff(&self) -> usize {
        self.rate_limited
            .map_or(self.results.len(), |(index, _)| index)
    }

    /// Index of the first order below the cutoff without a result.
    pub fn first_unresolved(&self) -> usize {
        let cutoff = self.cutoff();
        self.results
            .iter()
            .take(cutoff)
            .position(Option::is_none)
            .unwrap_or(cutoff)
    }
}

/// Look up every order concurrently, stopping early on a 429 or shutdown.
pub async fn dispatch_batch(
    source: &dyn AccrualSource,
    orders: &[Order],
    shutdown: &CancellationToken,
) -> BatchLookups {
    let batch_token = shutdown.child_token();
    let mut in_flight: FuturesUnordered<_> = orders
        .iter()
        .enumerate()
        .map(|(index, order)| {
            let token = &batch_token;
            async move {
                let slot = tokio::select! {
                    biased;
                    () = token.cancelled() => None,
                    result = source.lookup(&order.number) => Some(result),
                };
                (index, slot)
            }
        })
        .collect();

    let mut results: Vec<LookupSlot> = std::iter::repeat_with(|| None)
        .take(orders.len())
        .collect();
    let mut rate_limited: Option<(usize, RateLimitHint)> = None;

    while let Some((index, slot)) = in_flight.next().await {
        if let Some(Ok(AccrualLookup::RateLimited(hint))) = &slot {
            if rate_limited.is_none_or(|(first, _)| index < first) {
                rate_limited = Some((index, *hint));
            }
            batch_token.cancel();
        }
        if let Some(entry) = results.get_mut(index) {
            *entry = slot;
        }
    }

    BatchLookups {
        results,
        rate_limited,
    }
}
