//! Shared test doubles for accrual reconciliation tests.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeDelta, Utc};
use mockable::Clock;
use tokio_util::sync::CancellationToken;

use crate::domain::ports::{
    AccrualLookup, AccrualReport, AccrualSource, AccrualSourceError, AccrualUpdate,
    AccrualUpdateOutcome, ExternalAccrualStatus, LoyaltyBalanceQuery, LoyaltyBalanceQueryError,
    NonFinalOrdersRequest, OrderLedgerRepository, OrderLedgerRepositoryError, RateLimitHint,
};
use crate::domain::{
    LoyaltyBalance, Order, OrderNumber, OrderStatus, Points, ReconciliationSleeper, UserId,
};

fn lock<'a, T>(mutex: &'a Mutex<T>, name: &str) -> MutexGuard<'a, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(_) => panic!("{name} mutex poisoned"),
    }
}

/// Parse an order number, panicking on invalid input.
pub fn order_number(raw: &str) -> OrderNumber {
    match OrderNumber::new(raw) {
        Ok(number) => number,
        Err(error) => panic!("invalid order number {raw}: {error}"),
    }
}

/// Build a stored order.
pub fn order(raw: &str, user_id: UserId, status: OrderStatus) -> Order {
    Order {
        number: order_number(raw),
        user_id,
        status,
        uploaded_at: Utc::now(),
    }
}

/// Build a points amount from hundredths, panicking on negatives.
pub fn points(hundredths: i64) -> Points {
    match Points::from_hundredths(hundredths) {
        Ok(points) => points,
        Err(error) => panic!("invalid points {hundredths}: {error}"),
    }
}

/// Confirmed lookup for `raw` with the given status and amount.
pub fn confirmed(raw: &str, status: ExternalAccrualStatus, hundredths: i64) -> AccrualLookup {
    AccrualLookup::Confirmed(AccrualReport {
        order: order_number(raw),
        status,
        accrual: points(hundredths),
    })
}

/// 429 lookup carrying a per-minute limit.
pub fn rate_limited(max_requests_per_minute: u32) -> AccrualLookup {
    AccrualLookup::RateLimited(RateLimitHint {
        max_requests_per_minute: Some(max_requests_per_minute),
        retry_after: None,
    })
}

/// Ledger entry kept by [`InMemoryOrderLedger`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub user_id: UserId,
    pub order: Option<OrderNumber>,
    pub accrued: Points,
    pub spent: Points,
}

/// Order and ledger store honouring the guarded update contract.
#[derive(Default)]
pub struct InMemoryOrderLedger {
    orders: Mutex<BTreeMap<OrderNumber, Order>>,
    entries: Mutex<Vec<LedgerEntry>>,
    fetch_requests: Mutex<Vec<NonFinalOrdersRequest>>,
    stale_snapshots: Mutex<VecDeque<Vec<Order>>>,
    updates: Mutex<Vec<AccrualUpdate>>,
    failing_fetches: Mutex<usize>,
    failing_updates: Mutex<HashSet<OrderNumber>>,
}

impl InMemoryOrderLedger {
    pub fn with_orders(orders: impl IntoIterator<Item = Order>) -> Self {
        let ledger = Self::default();
        for order in orders {
            ledger.insert(order);
        }
        ledger
    }

    pub fn insert(&self, order: Order) {
        lock(&self.orders, "orders").insert(order.number.clone(), order);
    }

    /// Record a withdrawal against `user_id`.
    pub fn spend(&self, user_id: UserId, amount: Points) {
        lock(&self.entries, "entries").push(LedgerEntry {
            user_id,
            order: None,
            accrued: Points::ZERO,
            spent: amount,
        });
    }

    /// Serve `orders` verbatim from the next fetch, as a cycle that read the
    /// backlog before another writer finalised it would see them.
    pub fn serve_stale_snapshot(&self, orders: impl IntoIterator<Item = Order>) {
        lock(&self.stale_snapshots, "stale snapshots").push_back(orders.into_iter().collect());
    }

    /// Make the next `count` fetches fail.
    pub fn fail_next_fetches(&self, count: usize) {
        *lock(&self.failing_fetches, "failing fetches") = count;
    }

    /// Make every update for `order` fail.
    pub fn fail_updates_for(&self, order: OrderNumber) {
        lock(&self.failing_updates, "failing updates").insert(order);
    }

    pub fn order(&self, number: &OrderNumber) -> Option<Order> {
        lock(&self.orders, "orders").get(number).cloned()
    }

    pub fn status_of(&self, raw: &str) -> Option<OrderStatus> {
        self.order(&order_number(raw)).map(|order| order.status)
    }

    pub fn entries(&self) -> Vec<LedgerEntry> {
        lock(&self.entries, "entries").clone()
    }

    pub fn fetch_requests(&self) -> Vec<NonFinalOrdersRequest> {
        lock(&self.fetch_requests, "fetch requests").clone()
    }

    /// Every update the engine attempted, accepted or not.
    pub fn updates(&self) -> Vec<AccrualUpdate> {
        lock(&self.updates, "updates").clone()
    }

    pub fn updated_orders(&self) -> Vec<OrderNumber> {
        self.updates()
            .into_iter()
            .map(|update| update.order)
            .collect()
    }
}

#[async_trait]
impl OrderLedgerRepository for InMemoryOrderLedger {
    async fn non_final_orders(
        &self,
        request: &NonFinalOrdersRequest,
    ) -> Result<Vec<Order>, OrderLedgerRepositoryError> {
        lock(&self.fetch_requests, "fetch requests").push(request.clone());
        {
            let mut failing = lock(&self.failing_fetches, "failing fetches");
            if *failing > 0 {
                *failing -= 1;
                return Err(OrderLedgerRepositoryError::connection("scripted outage"));
            }
        }
        if let Some(snapshot) = lock(&self.stale_snapshots, "stale snapshots").pop_front() {
            return Ok(snapshot);
        }

        let limit = usize::try_from(request.limit).unwrap_or(usize::MAX);
        Ok(lock(&self.orders, "orders")
            .values()
            .filter(|order| !order.status.is_final())
            .filter(|order| {
                request
                    .resume_after
                    .as_ref()
                    .is_none_or(|cursor| &order.number > cursor)
            })
            .take(limit)
            .cloned()
            .collect())
    }

    async fn apply_accrual(
        &self,
        update: &AccrualUpdate,
    ) -> Result<AccrualUpdateOutcome, OrderLedgerRepositoryError> {
        lock(&self.updates, "updates").push(update.clone());
        if lock(&self.failing_updates, "failing updates").contains(&update.order) {
            return Err(OrderLedgerRepositoryError::query("scripted write failure"));
        }

        let mut orders = lock(&self.orders, "orders");
        let Some(order) = orders.get_mut(&update.order) else {
            return Ok(AccrualUpdateOutcome::Unchanged);
        };
        if order.status.is_final() || order.status == update.status {
            return Ok(AccrualUpdateOutcome::Unchanged);
        }

        order.status = update.status;
        if update.status == OrderStatus::Processed && update.accrual.is_positive() {
            lock(&self.entries, "entries").push(LedgerEntry {
                user_id: order.user_id,
                order: Some(update.order.clone()),
                accrued: update.accrual,
                spent: Points::ZERO,
            });
            return Ok(AccrualUpdateOutcome::Credited {
                user_id: order.user_id,
                amount: update.accrual,
            });
        }
        Ok(AccrualUpdateOutcome::StatusChanged)
    }
}

#[async_trait]
impl LoyaltyBalanceQuery for InMemoryOrderLedger {
    async fn balance(&self, user_id: &UserId) -> Result<LoyaltyBalance, LoyaltyBalanceQueryError> {
        let entries = lock(&self.entries, "entries");
        let (accrued, spent) = entries
            .iter()
            .filter(|entry| &entry.user_id == user_id)
            .fold((0_i64, 0_i64), |(accrued, spent), entry| {
                (
                    accrued + entry.accrued.hundredths(),
                    spent + entry.spent.hundredths(),
                )
            });
        let current = Points::from_hundredths(accrued - spent)
            .map_err(|error| LoyaltyBalanceQueryError::query(error.to_string()))?;
        let spent = Points::from_hundredths(spent)
            .map_err(|error| LoyaltyBalanceQueryError::query(error.to_string()))?;
        Ok(LoyaltyBalance { current, spent })
    }
}

/// Accrual source answering from per-order scripts.
///
/// Orders without a script answer `NotRegistered`. Orders marked with
/// [`ScriptedAccrualSource::hang_on`] never answer, so their lookups only
/// finish through cancellation.
#[derive(Default)]
pub struct ScriptedAccrualSource {
    scripts: Mutex<HashMap<OrderNumber, VecDeque<Result<AccrualLookup, AccrualSourceError>>>>,
    hanging: Mutex<HashSet<OrderNumber>>,
    calls: Mutex<Vec<OrderNumber>>,
}

impl ScriptedAccrualSource {
    /// Queue `response` for the next lookup of `raw`.
    pub fn respond(&self, raw: &str, response: Result<AccrualLookup, AccrualSourceError>) {
        lock(&self.scripts, "scripts")
            .entry(order_number(raw))
            .or_default()
            .push_back(response);
    }

    pub fn hang_on(&self, raw: &str) {
        lock(&self.hanging, "hanging").insert(order_number(raw));
    }

    pub fn calls(&self) -> Vec<OrderNumber> {
        lock(&self.calls, "calls").clone()
    }

    pub fn call_count(&self, raw: &str) -> usize {
        let number = order_number(raw);
        lock(&self.calls, "calls")
            .iter()
            .filter(|call| **call == number)
            .count()
    }
}

#[async_trait]
impl AccrualSource for ScriptedAccrualSource {
    async fn lookup(&self, order: &OrderNumber) -> Result<AccrualLookup, AccrualSourceError> {
        lock(&self.calls, "calls").push(order.clone());
        let hangs = lock(&self.hanging, "hanging").contains(order);
        if hangs {
            std::future::pending::<()>().await;
        }
        lock(&self.scripts, "scripts")
            .get_mut(order)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Ok(AccrualLookup::NotRegistered))
    }
}

/// Clock whose time only moves when told to.
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn advance(&self, delta: Duration) {
        let delta = match TimeDelta::from_std(delta) {
            Ok(delta) => delta,
            Err(error) => {
                panic!("failed to convert Duration to TimeDelta: {error}; delta={delta:?}")
            }
        };
        *lock(&self.0, "clock") += delta;
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *lock(&self.0, "clock")
    }
}

/// Sleeper that records each pause and cancels `shutdown` once `limit`
/// pauses were requested.
pub struct CancellingSleeper {
    shutdown: CancellationToken,
    limit: usize,
    pauses: Mutex<Vec<Duration>>,
}

impl CancellingSleeper {
    pub fn new(shutdown: CancellationToken, limit: usize) -> Self {
        Self {
            shutdown,
            limit,
            pauses: Mutex::new(Vec::new()),
        }
    }

    pub fn pauses(&self) -> Vec<Duration> {
        lock(&self.pauses, "pauses").clone()
    }
}

#[async_trait]
impl ReconciliationSleeper for CancellingSleeper {
    async fn sleep(&self, duration: Duration) {
        let recorded = {
            let mut pauses = lock(&self.pauses, "pauses");
            pauses.push(duration);
            pauses.len()
        };
        if recorded >= self.limit {
            self.shutdown.cancel();
        }
        tokio::task::yield_now().await;
    }
}
