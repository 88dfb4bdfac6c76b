//! Shared test utilities and fixtures
//!
//! Common infrastructure for integration tests.

#![allow(dead_code)]

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Value, json};
use sylvia_providers::retry::RetryConfig;
use sylvia_providers::{GeminiGateway, GeminiSettings};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TEST_MODEL: &str = "gemini-test";
pub const TEST_KEY: &str = "test-key";

/// Path the gateway posts to for [`TEST_MODEL`].
pub fn generate_path() -> String {
    format!("/models/{TEST_MODEL}:generateContent")
}

/// Retries without real backoff so failure tests stay fast.
pub fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_retries: 1,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        jitter_factor: 0.0,
    }
}

/// Start a mock server that simulates the Gemini API
pub async fn start_gemini_mock() -> MockServer {
    MockServer::start().await
}

pub fn gateway_for(server: &MockServer) -> GeminiGateway {
    gateway_at(&server.uri())
}

pub fn gateway_at(base_url: &str) -> GeminiGateway {
    GeminiGateway::new(
        GeminiSettings::new(TEST_KEY)
            .with_model(TEST_MODEL)
            .with_base_url(base_url)
            .with_retry(fast_retry()),
    )
    .expect("gateway for mock server")
}

/// `generateContent` response with a single text candidate.
pub fn text_reply(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": {
                "role": "model",
                "parts": [{ "text": text }]
            },
            "finishReason": "STOP"
        }],
        "usageMetadata": {
            "promptTokenCount": 10,
            "candidatesTokenCount": 5
        }
    })
}

/// Mount a successful text reply that also checks the API key header
pub async fn mount_text_reply(server: &MockServer, text: &str) {
    Mock::given(method("POST"))
        .and(path(generate_path()))
        .and(header("x-goog-api-key", TEST_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_reply(text)))
        .mount(server)
        .await;
}

/// Mount an error status with a Google-style error body
pub async fn mount_error(server: &MockServer, status: u16, api_status: &str, message: &str) {
    let body = json!({
        "error": {
            "code": status,
            "message": message,
            "status": api_status
        }
    });
    Mock::given(method("POST"))
        .and(path(generate_path()))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

/// JSON bodies of every request the server has seen, in order.
pub async fn request_bodies(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|request| serde_json::from_slice(&request.body).expect("request body is JSON"))
        .collect()
}

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 14, 9, 0, 0).unwrap()
}
