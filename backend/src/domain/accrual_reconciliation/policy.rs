//! Rate budget and resumption cursor bookkeeping.
//!
//! The accrual service throttles callers per minute. After a 429 the budget
//! shrinks to the advertised limit (or half of the current budget when the
//! service gives no figure) and the cursor points at the last order whose
//! result was applied, so the next cycle starts with the first abandoned one.

use std::time::Duration;

use crate::domain::ports::{NonFinalOrdersRequest, RateLimitHint};
use crate::domain::{Order, OrderNumber};

/// Decision taken after a throttled cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleDecision {
    /// Budget for the next cycle.
    pub next_budget: u32,
    /// Suspension before the next cycle.
    pub cooldown: Duration,
}

/// Mutable scheduler state carried between cycles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerState {
    ceiling: u32,
    budget: u32,
    cursor: Option<OrderNumber>,
    default_cooldown: Duration,
}

impl SchedulerState {
    /// Start with the full budget and no cursor.
    pub fn new(initial_batch_size: u32, default_cooldown: Duration) -> Self {
        let ceiling = initial_batch_size.max(1);
        Self {
            ceiling,
            budget: ceiling,
            cursor: None,
            default_cooldown,
        }
    }

    pub fn budget(&self) -> u32 {
        self.budget
    }

    pub fn cursor(&self) -> Option<&OrderNumber> {
        self.cursor.as_ref()
    }

    /// Repository request for the next cycle.
    pub fn next_request(&self) -> NonFinalOrdersRequest {
        NonFinalOrdersRequest {
            limit: self.budget,
            resume_after: self.cursor.clone(),
        }
    }

    /// Move the cursor after a cycle whose lookups all finished.
    ///
    /// A full batch means more orders may follow, so the next cycle resumes
    /// after its last order. A short batch reached the end of the backlog and
    /// the next cycle wraps around to the start.
    pub fn record_completed(&mut self, orders: &[Order], limit: u32) {
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        self.cursor = if orders.len() < limit {
            None
        } else {
            orders.last().map(|order| order.number.clone())
        };
    }

    /// Shrink the budget and park the cursor after a rate-limited cycle.
    ///
    /// `first_unresolved` is the batch index of the earliest order whose
    /// result was not applied. The cursor is left untouched when that is the
    /// first order of the batch.
    pub fn record_throttled(
        &mut self,
        orders: &[Order],
        first_unresolved: usize,
        hint: RateLimitHint,
    ) -> ThrottleDecision {
        let next_budget = match hint.max_requests_per_minute {
            Some(limit) => limit.min(self.ceiling).max(1),
            None => (self.budget / 2).max(1),
        };
        self.budget = next_budget;

        if let Some(last_applied) = first_unresolved
            .checked_sub(1)
            .and_then(|index| orders.get(index))
        {
            self.cursor = Some(last_applied.number.clone());
        }

        ThrottleDecision {
            next_budget,
            cooldown: hint.retry_after.unwrap_or(self.default_cooldown),
        }
    }
}
