//! Contract checks for port fixtures, mocks, and error constructors.

use super::*;
use crate::domain::{Order, OrderNumber, OrderStatus, Points, UserId};
use chrono::Utc;
use mockall::predicate::eq;
use rstest::{fixture, rstest};

#[fixture]
fn order_number() -> OrderNumber {
    OrderNumber::new("79927398713").expect("valid order number")
}

#[rstest]
#[tokio::test]
async fn fixture_ledger_has_no_orders_and_ignores_updates(order_number: OrderNumber) {
    let repo = FixtureOrderLedgerRepository;
    let orders = repo
        .non_final_orders(&NonFinalOrdersRequest {
            limit: 20,
            resume_after: None,
        })
        .await
        .expect("fixture fetch succeeds");
    assert!(orders.is_empty());

    let outcome = repo
        .apply_accrual(&AccrualUpdate {
            order: order_number,
            status: OrderStatus::Processed,
            accrual: Points::from_hundredths(100).expect("non-negative"),
        })
        .await
        .expect("fixture update succeeds");
    assert_eq!(outcome, AccrualUpdateOutcome::Unchanged);
}

#[rstest]
#[tokio::test]
async fn mock_ledger_receives_cursor_request(order_number: OrderNumber) {
    let user_id = UserId::random();
    let expected = NonFinalOrdersRequest {
        limit: 5,
        resume_after: Some(order_number.clone()),
    };
    let returned = vec![Order {
        number: OrderNumber::new("12345678903").expect("valid order number"),
        user_id,
        status: OrderStatus::New,
        uploaded_at: Utc::now(),
    }];

    let mut repo = MockOrderLedgerRepository::new();
    let response = returned.clone();
    repo.expect_non_final_orders()
        .with(eq(expected.clone()))
        .times(1)
        .return_once(move |_| Ok(response));

    let orders = repo
        .non_final_orders(&expected)
        .await
        .expect("mock fetch succeeds");
    assert_eq!(orders, returned);
}

#[rstest]
#[tokio::test]
async fn fixture_balance_is_zero() {
    let balance = FixtureLoyaltyBalanceQuery
        .balance(&UserId::random())
        .await
        .expect("fixture balance succeeds");
    assert_eq!(balance.current, Points::ZERO);
    assert_eq!(balance.spent, Points::ZERO);
}

#[rstest]
#[tokio::test]
async fn no_op_metrics_accepts_every_summary() {
    let summary = ReconciliationCycleSummary::empty(20, CycleOutcome::FetchFailed);
    assert!(NoOpReconciliationMetrics.record_cycle(&summary).await.is_ok());
}

#[rstest]
#[case(OrderLedgerRepositoryError::connection("refused"), "order ledger connection failed: refused")]
#[case(OrderLedgerRepositoryError::query("syntax"), "order ledger query failed: syntax")]
fn ledger_errors_render_messages(#[case] error: OrderLedgerRepositoryError, #[case] expected: &str) {
    assert_eq!(error.to_string(), expected);
}

#[rstest]
#[case(CycleOutcome::Completed, "completed")]
#[case(CycleOutcome::FetchFailed, "fetch_failed")]
#[case(CycleOutcome::Cancelled, "cancelled")]
#[case(
    CycleOutcome::Throttled { next_budget: 5, cooldown: std::time::Duration::from_secs(60) },
    "throttled"
)]
fn cycle_outcomes_have_stable_labels(#[case] outcome: CycleOutcome, #[case] expected: &str) {
    assert_eq!(outcome.as_str(), expected);
}
