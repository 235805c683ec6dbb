//! Integration tests for `AccrualHttpClient` against a local stub service.

use std::time::Duration;

use gophermart::domain::OrderNumber;
use gophermart::domain::ports::{
    AccrualLookup, AccrualSource, AccrualSourceError, ExternalAccrualStatus, RateLimitHint,
};
use gophermart::outbound::accrual::AccrualHttpClient;
use gophermart::test_support::accrual_reconciliation::points;
use url::Url;
use rstest::rstest;

mod support;

use support::accrual_stub::{AccrualStub, StubReply};

const ORDER: &str = "79927398713";

fn number() -> OrderNumber {
    OrderNumber::new(ORDER).expect("valid order number")
}

fn client_for(base_url: Url) -> AccrualHttpClient {
    AccrualHttpClient::new(base_url, Duration::from_secs(5)).expect("client builds")
}

async fn lookup_with(reply: Option<StubReply>) -> Result<AccrualLookup, AccrualSourceError> {
    let stub = AccrualStub::start(reply.map(|reply| (ORDER.to_owned(), reply)));
    let result = client_for(stub.base_url()).lookup(&number()).await;
    assert_eq!(stub.requests(), vec![ORDER.to_owned()]);
    stub.stop().await;
    result
}

#[rstest]
#[actix_rt::test]
async fn processed_order_is_confirmed_with_its_accrual() {
    let lookup = lookup_with(Some(StubReply::processed(ORDER, 500.0)))
        .await
        .expect("lookup succeeds");

    let AccrualLookup::Confirmed(report) = lookup else {
        panic!("expected a confirmed report, got {lookup:?}");
    };
    assert_eq!(report.order, number());
    assert_eq!(report.status, ExternalAccrualStatus::Processed);
    assert_eq!(report.accrual, points(50_000));
}

#[rstest]
#[case("REGISTERED", ExternalAccrualStatus::Registered)]
#[case("PROCESSING", ExternalAccrualStatus::Processing)]
#[case("INVALID", ExternalAccrualStatus::Invalid)]
#[actix_rt::test]
async fn intermediate_statuses_carry_no_accrual(
    #[case] wire: &str,
    #[case] expected: ExternalAccrualStatus,
) {
    let lookup = lookup_with(Some(StubReply::status(ORDER, wire)))
        .await
        .expect("lookup succeeds");

    let AccrualLookup::Confirmed(report) = lookup else {
        panic!("expected a confirmed report, got {lookup:?}");
    };
    assert_eq!(report.status, expected);
    assert!(!report.accrual.is_positive());
}

#[rstest]
#[actix_rt::test]
async fn unknown_order_is_not_registered() {
    let lookup = lookup_with(None).await.expect("lookup succeeds");
    assert_eq!(lookup, AccrualLookup::NotRegistered);
}

#[rstest]
#[case(Some(30), Some(Duration::from_secs(30)))]
#[case(None, None)]
#[actix_rt::test]
async fn throttling_reports_the_limit_and_retry_after(
    #[case] retry_after: Option<u64>,
    #[case] expected_retry: Option<Duration>,
) {
    let lookup = lookup_with(Some(StubReply::TooManyRequests {
        limit: 5,
        retry_after,
    }))
    .await
    .expect("a 429 is a lookup outcome, not an error");

    assert_eq!(
        lookup,
        AccrualLookup::RateLimited(RateLimitHint {
            max_requests_per_minute: Some(5),
            retry_after: expected_retry,
        })
    );
}

#[rstest]
#[actix_rt::test]
async fn server_errors_map_to_server_unavailable() {
    let error = lookup_with(Some(StubReply::Status(500, "internal error".to_owned())))
        .await
        .expect_err("500 is an error");
    assert_eq!(
        error,
        AccrualSourceError::server_unavailable(500_u16, "internal error")
    );
}

#[rstest]
#[actix_rt::test]
async fn client_errors_map_to_unexpected_status() {
    let error = lookup_with(Some(StubReply::Status(404, String::new())))
        .await
        .expect_err("404 is an error");
    assert_eq!(
        error,
        AccrualSourceError::unexpected_status(404_u16, "status 404")
    );
}

#[rstest]
#[actix_rt::test]
async fn malformed_payload_is_a_decode_error() {
    let error = lookup_with(Some(StubReply::Json("{\"order\":".to_owned())))
        .await
        .expect_err("truncated JSON is an error");
    assert!(matches!(error, AccrualSourceError::Decode { .. }));
}

#[rstest]
#[actix_rt::test]
async fn refused_connection_is_a_transport_error() {
    let addr = std::net::TcpListener::bind("127.0.0.1:0")
        .and_then(|listener| listener.local_addr())
        .expect("reserve a port");
    let base = Url::parse(&format!("http://{addr}")).expect("base URL");

    let error = client_for(base)
        .lookup(&number())
        .await
        .expect_err("nothing listens on the port");
    assert!(matches!(error, AccrualSourceError::Transport { .. }));
}
