//! Thin HTTP client for the external accrual authority.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::models::AccrualStatus;

/// Result of asking the authority about one order.
#[derive(Debug, Clone)]
pub enum LookupOutcome {
    /// 200: the authority knows the order.
    Known {
        status: AccrualStatus,
        accrual: Option<Decimal>,
    },
    /// 204: the order is not registered with the authority.
    Unknown,
    /// 429 carrying a parseable `Retry-After`.
    RateLimited { retry_after: Duration },
    /// Network failure, bad payload, unexpected status, or a 429 whose
    /// `Retry-After` is missing or unparseable.
    TransportFailure(String),
}

/// Capability the coordinator polls through. Swappable for an in-memory
/// double in tests.
#[async_trait]
pub trait AuthorityClient: Send + Sync + 'static {
    async fn lookup(&self, order_num: &str) -> LookupOutcome;
}

#[derive(Debug, Deserialize)]
struct AuthorityReply {
    status: AccrualStatus,
    accrual: Option<Decimal>,
}

/// Stateless `reqwest`-backed client. Shares no locks with the
/// coordinator.
pub struct HttpAuthorityClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpAuthorityClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            base_url: base_url.into(),
            http,
        })
    }
}

#[async_trait]
impl AuthorityClient for HttpAuthorityClient {
    async fn lookup(&self, order_num: &str) -> LookupOutcome {
        let url = format!("{}/api/orders/{}", self.base_url, order_num);

        let response = match self.http.get(&url).send().await {
            Ok(response) => response,
            Err(e) => return LookupOutcome::TransportFailure(e.to_string()),
        };

        match response.status() {
            StatusCode::OK => match response.json::<AuthorityReply>().await {
                Ok(reply) => LookupOutcome::Known {
                    status: reply.status,
                    accrual: reply.accrual,
                },
                Err(e) => LookupOutcome::TransportFailure(format!("bad authority payload: {e}")),
            },
            StatusCode::NO_CONTENT => LookupOutcome::Unknown,
            StatusCode::TOO_MANY_REQUESTS => match parse_retry_after(response.headers()) {
                Some(retry_after) => LookupOutcome::RateLimited { retry_after },
                None => LookupOutcome::TransportFailure(
                    "429 without a usable Retry-After header".to_string(),
                ),
            },
            status => LookupOutcome::TransportFailure(format!("unexpected authority status {status}")),
        }
    }
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn retry_after_parses_integer_seconds() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("60"));
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(60)));
    }

    #[test]
    fn missing_retry_after_is_rejected() {
        let headers = HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);
    }

    #[test]
    fn http_date_retry_after_is_rejected() {
        // Only the integer-seconds form counts; anything else is a
        // transport failure upstream.
        let mut headers = HeaderMap::new();
        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(parse_retry_after(&headers), None);
    }

    #[test]
    fn authority_reply_parses_with_and_without_accrual() {
        let reply: AuthorityReply =
            serde_json::from_str(r#"{"order":"12345678903","status":"PROCESSED","accrual":42.5}"#)
                .unwrap();
        assert_eq!(reply.status, AccrualStatus::Processed);
        assert_eq!(reply.accrual, Some(Decimal::new(425, 1)));

        let reply: AuthorityReply =
            serde_json::from_str(r#"{"order":"12345678903","status":"PROCESSING"}"#).unwrap();
        assert_eq!(reply.status, AccrualStatus::Processing);
        assert_eq!(reply.accrual, None);
    }
}
