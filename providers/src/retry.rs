//! Retry policy for `generateContent` calls.
//!
//! Transient statuses (408, 409, 429, 5xx) and connection failures are retried
//! with capped exponential backoff. A 429 caused by a per-day quota is final;
//! nothing succeeds again until the quota window resets.
//!
//! Delay hints come from `Retry-After` or from the `google.rpc.RetryInfo`
//! detail Gemini attaches to `RESOURCE_EXHAUSTED` errors. Hints of a minute or
//! more are ignored in favour of normal backoff.

use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde_json::Value;
use tracing::debug;

use crate::read_capped_error_body;

const RETRY_INFO_TYPE: &str = "type.googleapis.com/google.rpc.RetryInfo";
const QUOTA_FAILURE_TYPE: &str = "type.googleapis.com/google.rpc.QuotaFailure";
const MAX_HINTED_DELAY: Duration = Duration::from_secs(60);

/// Backoff settings. Defaults: 2 retries, 500ms doubling to at most 8s, with
/// up to 25% down-jitter.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// 0.25 scales each delay by a random factor in [0.75, 1.0].
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            jitter_factor: 0.25,
        }
    }
}

/// A non-2xx answer, already drained so the body could inform the decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedResponse {
    pub status: StatusCode,
    pub body: String,
}

#[derive(Debug)]
pub enum RetryOutcome {
    /// 2xx status; body not yet read.
    Success(Response),
    /// Final non-2xx status.
    HttpError(FailedResponse),
    /// Transport failure after at least one retry.
    ConnectionError {
        attempts: u32,
        source: reqwest::Error,
    },
    /// Transport failure on the first attempt.
    NonRetryable(reqwest::Error),
}

impl RetryOutcome {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Server-provided delay: `Retry-After` seconds first, then the body's
/// `RetryInfo.retryDelay` (protobuf duration text such as `"37s"`).
pub(crate) fn parse_retry_after(headers: &HeaderMap, body: &str) -> Option<Duration> {
    let from_header = headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs);

    from_header
        .or_else(|| error_details(body).find_map(|detail| retry_info_delay(&detail)))
        .filter(|delay| !delay.is_zero() && *delay < MAX_HINTED_DELAY)
}

pub(crate) fn should_retry(status: StatusCode, body: &str) -> bool {
    match status.as_u16() {
        429 => !is_daily_quota(body),
        408 | 409 | 500..=599 => true,
        _ => false,
    }
}

/// `hint` wins when present; otherwise exponential backoff from
/// `backoff_step` (0 before the first retry), capped and down-jittered.
pub(crate) fn calculate_retry_delay(
    backoff_step: u32,
    config: &RetryConfig,
    hint: Option<Duration>,
) -> Duration {
    if let Some(delay) = hint {
        return delay;
    }

    let exponent = i32::try_from(backoff_step).unwrap_or(i32::MAX);
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(exponent);
    let capped = base.min(config.max_delay.as_secs_f64());
    let jitter = 1.0 - rand::random::<f64>() * config.jitter_factor;
    Duration::from_secs_f64(capped * jitter)
}

fn error_details(body: &str) -> impl Iterator<Item = Value> {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|mut value| value.pointer_mut("/error/details").map(Value::take))
        .and_then(|details| match details {
            Value::Array(items) => Some(items),
            _ => None,
        })
        .unwrap_or_default()
        .into_iter()
}

fn detail_type(detail: &Value) -> Option<&str> {
    detail.get("@type").and_then(Value::as_str)
}

fn retry_info_delay(detail: &Value) -> Option<Duration> {
    if detail_type(detail) != Some(RETRY_INFO_TYPE) {
        return None;
    }
    let text = detail.get("retryDelay")?.as_str()?;
    let secs = text.strip_suffix('s')?.parse::<f64>().ok()?;
    Duration::try_from_secs_f64(secs).ok()
}

/// A `QuotaFailure` naming a per-day quota id.
fn is_daily_quota(body: &str) -> bool {
    error_details(body)
        .filter(|detail| detail_type(detail) == Some(QUOTA_FAILURE_TYPE))
        .filter_map(|mut detail| match detail.get_mut("violations").map(Value::take) {
            Some(Value::Array(violations)) => Some(violations),
            _ => None,
        })
        .flatten()
        .any(|violation| {
            violation
                .get("quotaId")
                .and_then(Value::as_str)
                .is_some_and(|quota_id| quota_id.contains("PerDay"))
        })
}

fn is_retryable_error(error: &reqwest::Error) -> bool {
    error.is_connect() || error.is_timeout() || error.is_request()
}

/// Send with retries; `build_request` is called once per attempt.
pub async fn send_with_retry<F>(build_request: F, config: &RetryConfig) -> RetryOutcome
where
    F: Fn() -> RequestBuilder,
{
    let mut attempt = 0;
    loop {
        let retries_left = attempt < config.max_retries;
        match build_request().send().await {
            Ok(response) if response.status().is_success() => {
                return RetryOutcome::Success(response);
            }
            Ok(response) => {
                let status = response.status();
                let headers = response.headers().clone();
                let body = read_capped_error_body(response).await;

                if !(retries_left && should_retry(status, &body)) {
                    return RetryOutcome::HttpError(FailedResponse { status, body });
                }
                let delay =
                    calculate_retry_delay(attempt, config, parse_retry_after(&headers, &body));
                debug!(
                    %status,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis(),
                    "Retrying generateContent after error status"
                );
                tokio::time::sleep(delay).await;
            }
            Err(error) => {
                if !(retries_left && is_retryable_error(&error)) {
                    return if attempt == 0 {
                        RetryOutcome::NonRetryable(error)
                    } else {
                        RetryOutcome::ConnectionError {
                            attempts: attempt + 1,
                            source: error,
                        }
                    };
                }
                let delay = calculate_retry_delay(attempt, config, None);
                debug!(
                    %error,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis(),
                    "Retrying generateContent after connection error"
                );
                tokio::time::sleep(delay).await;
            }
        }
        attempt += 1;
    }
}
