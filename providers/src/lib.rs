//! Model gateway: sends a composed turn to the hosted model and normalizes
//! the outcome.
//!
//! # Architecture
//!
//! - [`ModelGateway`] - the seam the engine talks to; one request in, one
//!   complete text or one [`GatewayError`] out
//! - [`gemini`] - Google Gemini client (`generateContent`)
//! - [`retry`] - HTTP retry policy shared by clients
//!
//! # Error Handling
//!
//! Every failure mode (transport, auth, quota, API error, safety block,
//! undecodable body, empty answer) is converted into a [`GatewayError`] at this
//! boundary. Nothing here panics on a bad response.

pub mod gemini;
pub mod retry;
mod wire;

use std::future::Future;
use std::time::Duration;

use sylvia_types::RequestPayload;
use thiserror::Error;

pub use gemini::{GeminiGateway, GeminiSettings};
pub use sylvia_types;

/// Canonical Gemini API base URL.
pub const GEMINI_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Model used when the config file names none.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-flash-lite-latest";

const CONNECT_TIMEOUT_SECS: u64 = 30;
const REQUEST_TIMEOUT_SECS: u64 = 120;

// reqwest only exposes tcp_keepalive (idle time); interval/retries use platform defaults.
const TCP_KEEPALIVE_SECS: u64 = 60;

const POOL_MAX_IDLE_PER_HOST: usize = 16;
const POOL_IDLE_TIMEOUT_SECS: u64 = 90;

const MAX_ERROR_BODY_BYTES: usize = 32 * 1024;

/// Category of a gateway failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayErrorKind {
    /// Connect failure, timeout, or a body that could not be read.
    Transport,
    /// Credential rejected (401/403).
    Auth,
    /// Rate or quota limit (429, `RESOURCE_EXHAUSTED`).
    Quota,
    /// Any other error status or error object from the service.
    Api,
    /// Prompt or answer withheld by safety filtering.
    Blocked,
    /// Response body was not the expected JSON.
    Decode,
    /// Well-formed answer with no usable text.
    EmptyResponse,
}

impl GatewayErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            GatewayErrorKind::Transport => "transport",
            GatewayErrorKind::Auth => "auth",
            GatewayErrorKind::Quota => "quota",
            GatewayErrorKind::Api => "api",
            GatewayErrorKind::Blocked => "blocked",
            GatewayErrorKind::Decode => "decode",
            GatewayErrorKind::EmptyResponse => "empty response",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} error: {message}", .kind.as_str())]
pub struct GatewayError {
    kind: GatewayErrorKind,
    message: String,
}

impl GatewayError {
    #[must_use]
    pub fn new(kind: GatewayErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> GatewayErrorKind {
        self.kind
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// First line of the message, for display under a chat bubble.
    #[must_use]
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or_default().trim()
    }
}

/// Sends one composed turn and returns the model's text.
///
/// Implementations hold no per-conversation state; every call carries the full
/// history in the payload.
pub trait ModelGateway {
    fn send(
        &self,
        payload: &RequestPayload,
    ) -> impl Future<Output = Result<String, GatewayError>> + Send;
}

/// Hardened client builder. `https_only` is relaxed for plain `http://` base
/// URLs so local mock servers can be used.
fn client_builder(allow_http: bool) -> reqwest::ClientBuilder {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .redirect(reqwest::redirect::Policy::none())
        .https_only(!allow_http)
        .tcp_keepalive(Some(Duration::from_secs(TCP_KEEPALIVE_SECS)))
        .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
        .pool_idle_timeout(Some(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS)))
}

pub fn http_client_for(base_url: &str) -> Result<reqwest::Client, reqwest::Error> {
    client_builder(base_url.starts_with("http://")).build()
}

pub async fn read_capped_error_body(response: reqwest::Response) -> String {
    use futures_util::StreamExt;
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let Ok(chunk) = chunk else { break };
        body.extend_from_slice(&chunk);
        if body.len() > MAX_ERROR_BODY_BYTES {
            body.truncate(MAX_ERROR_BODY_BYTES);
            let text = String::from_utf8_lossy(&body);
            return format!("{text}...(truncated)");
        }
    }
    String::from_utf8_lossy(&body).into_owned()
}

/// `error.message` from a JSON error body, if there is one.
#[must_use]
pub fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .pointer("/error/message")
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|message| !message.is_empty())
        .map(str::to_string)
}
