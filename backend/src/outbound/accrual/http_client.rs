//! Reqwest-backed accrual service adapter.
//!
//! This adapter owns transport details only: URL construction, timeout and
//! HTTP status mapping, 429 hint parsing, and JSON decoding into domain
//! reports.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use url::Url;

use super::dto::AccrualResponseDto;
use crate::domain::OrderNumber;
use crate::domain::ports::{
    AccrualLookup, AccrualReport, AccrualSource, AccrualSourceError, RateLimitHint,
};

const DEFAULT_USER_AGENT: &str = "gophermart-accrual-reconciler/0.1";
const RATE_LIMIT_PREFIX: &str = "No more than ";
const RATE_LIMIT_SUFFIX: &str = " requests per minute";

/// Errors raised while building the adapter.
#[derive(Debug, thiserror::Error)]
pub enum AccrualHttpClientError {
    /// The base URL cannot be extended with a path.
    #[error("accrual base URL `{0}` cannot carry a path")]
    InvalidBaseUrl(String),
    /// The reqwest client could not be constructed.
    #[error("failed to build accrual HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Accrual source adapter performing `GET {base}/api/orders/{number}`.
pub struct AccrualHttpClient {
    client: Client,
    base_url: Url,
}

impl AccrualHttpClient {
    /// Build an adapter using a reqwest client with an explicit request timeout.
    /// ```rust,ignore
    /// let base = Url::parse("http://localhost:5000")?;
    /// let client = AccrualHttpClient::new(base, Duration::from_secs(10))?;
    /// ```
    /// # Errors
    ///
    /// Returns an error when the base URL cannot carry a path or the reqwest
    /// client cannot be constructed.
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, AccrualHttpClientError> {
        if base_url.cannot_be_a_base() {
            return Err(AccrualHttpClientError::InvalidBaseUrl(base_url.to_string()));
        }
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(DEFAULT_USER_AGENT)
            .build()?;
        Ok(Self { client, base_url })
    }

    fn order_url(&self, order: &OrderNumber) -> Result<Url, AccrualSourceError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                AccrualSourceError::transport(format!(
                    "accrual base URL `{}` cannot carry a path",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(["api", "orders", order.as_str()]);
        Ok(url)
    }
}

#[async_trait]
impl AccrualSource for AccrualHttpClient {
    async fn lookup(&self, order: &OrderNumber) -> Result<AccrualLookup, AccrualSourceError> {
        let url = self.order_url(order)?;
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        match status {
            StatusCode::NO_CONTENT => Ok(AccrualLookup::NotRegistered),
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = parse_retry_after(response.headers());
                // A 429 stays a 429 even when its body cannot be read.
                let body = response.text().await.unwrap_or_default();
                Ok(AccrualLookup::RateLimited(RateLimitHint {
                    max_requests_per_minute: parse_rate_limit_message(&body),
                    retry_after,
                }))
            }
            StatusCode::OK => {
                let body = response.bytes().await.map_err(map_transport_error)?;
                parse_report(body.as_ref()).map(AccrualLookup::Confirmed)
            }
            _ => {
                let body = response.bytes().await.map_err(map_transport_error)?;
                Err(map_status_error(status, body.as_ref()))
            }
        }
    }
}

fn parse_report(body: &[u8]) -> Result<AccrualReport, AccrualSourceError> {
    let decoded: AccrualResponseDto = serde_json::from_slice(body).map_err(|error| {
        AccrualSourceError::decode(format!("invalid accrual JSON payload: {error}"))
    })?;
    decoded
        .into_domain_report()
        .map_err(AccrualSourceError::decode)
}

/// Extract `N` from "No more than N requests per minute allowed".
fn parse_rate_limit_message(body: &str) -> Option<u32> {
    let (_, tail) = body.split_once(RATE_LIMIT_PREFIX)?;
    let (count, _) = tail.split_once(RATE_LIMIT_SUFFIX)?;
    count.trim().parse().ok()
}

/// Delay-seconds form of `Retry-After`; HTTP dates are ignored.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?;
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

fn map_transport_error(error: reqwest::Error) -> AccrualSourceError {
    if error.is_timeout() {
        AccrualSourceError::timeout(error.to_string())
    } else {
        AccrualSourceError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> AccrualSourceError {
    let body_preview = body_preview(body);
    let message = if body_preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        body_preview
    };

    if status.is_server_error() {
        AccrualSourceError::server_unavailable(status.as_u16(), message)
    } else {
        AccrualSourceError::unexpected_status(status.as_u16(), message)
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for non-network accrual mapping helpers.

    use super::*;
    use crate::domain::Points;
    use crate::domain::ports::ExternalAccrualStatus;
    use reqwest::header::HeaderValue;
    use rstest::rstest;

    fn client(base: &str) -> AccrualHttpClient {
        let base = Url::parse(base).expect("valid base URL");
        AccrualHttpClient::new(base, Duration::from_secs(1)).expect("client builds")
    }

    #[rstest]
    #[case("http://localhost:5000", "http://localhost:5000/api/orders/79927398713")]
    #[case("http://localhost:5000/", "http://localhost:5000/api/orders/79927398713")]
    #[case("http://accrual.internal/v2/", "http://accrual.internal/v2/api/orders/79927398713")]
    fn builds_order_url_below_base(#[case] base: &str, #[case] expected: &str) {
        let number = OrderNumber::new("79927398713").expect("valid order number");
        let url = client(base).order_url(&number).expect("url builds");
        assert_eq!(url.as_str(), expected);
    }

    #[test]
    fn rejects_base_urls_without_paths() {
        let base = Url::parse("mailto:accrual@example.com").expect("valid URL");
        let result = AccrualHttpClient::new(base, Duration::from_secs(1));
        assert!(matches!(
            result,
            Err(AccrualHttpClientError::InvalidBaseUrl(_))
        ));
    }

    #[rstest]
    #[case("No more than 5 requests per minute allowed", Some(5))]
    #[case("No more than 60 requests per minute allowed\n", Some(60))]
    #[case("rate limited", None)]
    #[case("No more than many requests per minute allowed", None)]
    #[case("", None)]
    fn parses_rate_limit_message(#[case] body: &str, #[case] expected: Option<u32>) {
        assert_eq!(parse_rate_limit_message(body), expected);
    }

    #[rstest]
    #[case(Some("60"), Some(Duration::from_secs(60)))]
    #[case(Some(" 7 "), Some(Duration::from_secs(7)))]
    #[case(Some("Wed, 21 Oct 2015 07:28:00 GMT"), None)]
    #[case(None, None)]
    fn parses_retry_after_seconds(#[case] header: Option<&str>, #[case] expected: Option<Duration>) {
        let mut headers = HeaderMap::new();
        if let Some(value) = header {
            headers.insert(RETRY_AFTER, HeaderValue::from_str(value).expect("header value"));
        }
        assert_eq!(parse_retry_after(&headers), expected);
    }

    #[rstest]
    #[case::internal(StatusCode::INTERNAL_SERVER_ERROR, true)]
    #[case::unavailable(StatusCode::SERVICE_UNAVAILABLE, true)]
    #[case::not_found(StatusCode::NOT_FOUND, false)]
    #[case::bad_request(StatusCode::BAD_REQUEST, false)]
    fn maps_http_statuses_to_expected_domain_errors(
        #[case] status: StatusCode,
        #[case] server_side: bool,
    ) {
        let error = map_status_error(status, b"  upstream\n  unavailable ");
        if server_side {
            assert_eq!(
                error,
                AccrualSourceError::server_unavailable(status.as_u16(), "upstream unavailable")
            );
        } else {
            assert_eq!(
                error,
                AccrualSourceError::unexpected_status(status.as_u16(), "upstream unavailable")
            );
        }
    }

    #[test]
    fn empty_error_bodies_fall_back_to_status_text() {
        let error = map_status_error(StatusCode::BAD_GATEWAY, b"");
        assert_eq!(
            error,
            AccrualSourceError::server_unavailable(502_u16, "status 502")
        );
    }

    #[test]
    fn parses_processed_report() {
        let body = br#"{"order":"79927398713","status":"PROCESSED","accrual":500}"#;
        let report = parse_report(body).expect("report decodes");
        assert_eq!(report.order.as_str(), "79927398713");
        assert_eq!(report.status, ExternalAccrualStatus::Processed);
        assert_eq!(report.accrual, Points::from_hundredths(50_000).expect("points"));
    }

    #[test]
    fn missing_accrual_defaults_to_zero() {
        let body = br#"{"order":"79927398713","status":"REGISTERED"}"#;
        let report = parse_report(body).expect("report decodes");
        assert_eq!(report.status, ExternalAccrualStatus::Registered);
        assert_eq!(report.accrual, Points::ZERO);
    }

    #[rstest]
    #[case::not_json(&b"<html>oops</html>"[..])]
    #[case::unknown_status(&br#"{"order":"79927398713","status":"DONE"}"#[..])]
    #[case::bad_order(&br#"{"order":"79-92","status":"PROCESSED","accrual":1}"#[..])]
    #[case::negative_accrual(&br#"{"order":"79927398713","status":"PROCESSED","accrual":-1}"#[..])]
    #[case::missing_status(&br#"{"order":"79927398713"}"#[..])]
    fn malformed_reports_map_to_decode_errors(#[case] body: &[u8]) {
        let error = parse_report(body).expect_err("decode should fail");
        assert!(
            matches!(error, AccrualSourceError::Decode { .. }),
            "malformed payloads should map to Decode errors",
        );
    }

    #[test]
    fn long_bodies_are_truncated_in_previews() {
        let body = "x".repeat(400);
        let preview = body_preview(body.as_bytes());
        assert_eq!(preview.chars().count(), 163);
        assert!(preview.ends_with("..."));
    }
}
