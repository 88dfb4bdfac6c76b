//! Google Gemini `generateContent` client.

use std::fmt;

use reqwest::StatusCode;
use serde_json::{Value, json};
use sylvia_types::{ContentRole, RequestPayload, Segment};
use tracing::{debug, warn};

use crate::retry::{FailedResponse, RetryConfig, RetryOutcome, send_with_retry};
use crate::{
    DEFAULT_GEMINI_MODEL, GEMINI_API_BASE_URL, GatewayError, GatewayErrorKind, ModelGateway,
    extract_error_message, http_client_for, wire,
};

/// Connection settings for [`GeminiGateway`].
#[derive(Clone)]
pub struct GeminiSettings {
    api_key: String,
    model: String,
    base_url: String,
    retry: RetryConfig,
}

impl GeminiSettings {
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: GEMINI_API_BASE_URL.to_string(),
            retry: RetryConfig::default(),
        }
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the API root, e.g. to point at a local mock server.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl fmt::Debug for GeminiSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiSettings")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("retry", &self.retry)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct GeminiGateway {
    client: reqwest::Client,
    settings: GeminiSettings,
}

impl GeminiGateway {
    pub fn new(settings: GeminiSettings) -> Result<Self, GatewayError> {
        let client = http_client_for(&settings.base_url).map_err(|e| {
            GatewayError::new(
                GatewayErrorKind::Transport,
                format!("failed to build HTTP client: {e}"),
            )
        })?;
        Ok(Self { client, settings })
    }

    #[must_use]
    pub fn settings(&self) -> &GeminiSettings {
        &self.settings
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.settings.base_url, self.settings.model
        )
    }
}

impl ModelGateway for GeminiGateway {
    async fn send(&self, payload: &RequestPayload) -> Result<String, GatewayError> {
        let url = self.endpoint();
        let body = build_request_body(payload);
        let api_key = self.settings.api_key.as_str();

        debug!(
            model = %self.settings.model,
            segments = payload.segments().len(),
            "Sending generateContent request"
        );

        let outcome = send_with_retry(
            || {
                self.client
                    .post(&url)
                    .header("x-goog-api-key", api_key)
                    .header("content-type", "application/json")
                    .json(&body)
            },
            &self.settings.retry,
        )
        .await;

        let response = match outcome {
            RetryOutcome::Success(response) => response,
            RetryOutcome::HttpError(FailedResponse { status, body }) => {
                let error = classify_status(status, &body);
                warn!(%status, kind = error.kind().as_str(), "Gemini request failed");
                return Err(error);
            }
            RetryOutcome::ConnectionError { attempts, source } => {
                warn!(attempts, error = %source, "Gemini request failed");
                return Err(GatewayError::new(
                    GatewayErrorKind::Transport,
                    format!("request failed after {attempts} attempts: {source}"),
                ));
            }
            RetryOutcome::NonRetryable(source) => {
                warn!(error = %source, "Gemini request failed");
                return Err(GatewayError::new(
                    GatewayErrorKind::Transport,
                    format!("request failed: {source}"),
                ));
            }
        };

        let text = response.text().await.map_err(|e| {
            GatewayError::new(
                GatewayErrorKind::Transport,
                format!("failed to read response body: {e}"),
            )
        })?;
        parse_response(&text)
    }
}

fn text_part(text: &str) -> Value {
    json!({ "text": text })
}

/// Build the request body for a composed turn.
///
/// Gemini mixes casing: `system_instruction` is snake_case while
/// `generationConfig` and its members are camelCase.
pub fn build_request_body(payload: &RequestPayload) -> Value {
    let mut contents: Vec<Value> = payload
        .history()
        .iter()
        .map(|segment| {
            json!({
                "role": segment.role().as_str(),
                "parts": [text_part(&segment.text())]
            })
        })
        .collect();

    let mut turn_parts = Vec::new();
    for segment in payload.turn() {
        turn_parts.push(text_part(&segment.text()));
        if let Segment::Attachment {
            mime_type,
            file_uri: Some(file_uri),
            ..
        } = segment
        {
            turn_parts.push(json!({
                "fileData": {
                    "mimeType": mime_type,
                    "fileUri": file_uri
                }
            }));
        }
    }
    if !turn_parts.is_empty() {
        contents.push(json!({
            "role": ContentRole::User.as_str(),
            "parts": turn_parts
        }));
    }

    let config = payload.configuration();
    let mut body = serde_json::Map::new();
    body.insert("contents".into(), Value::Array(contents));

    if !config.system_instruction().trim().is_empty() {
        body.insert(
            "system_instruction".into(),
            json!({ "parts": [text_part(config.system_instruction())] }),
        );
    }

    body.insert(
        "generationConfig".into(),
        json!({
            "temperature": config.temperature(),
            "maxOutputTokens": config.max_output_tokens(),
            "thinkingConfig": {
                "thinkingBudget": config.thinking_budget().wire_value()
            }
        }),
    );

    if !config.tools().is_empty() {
        let tools: Vec<Value> = config
            .tools()
            .iter()
            .map(|tool| {
                let mut entry = serde_json::Map::new();
                entry.insert(tool.wire_name().into(), json!({}));
                Value::Object(entry)
            })
            .collect();
        body.insert("tools".into(), Value::Array(tools));
    }

    Value::Object(body)
}

/// Turn a 2xx body into text or a typed failure.
fn parse_response(body: &str) -> Result<String, GatewayError> {
    let response: wire::Response = serde_json::from_str(body).map_err(|e| {
        GatewayError::new(
            GatewayErrorKind::Decode,
            format!("unexpected response body: {e}"),
        )
    })?;

    if let Some(error) = &response.error {
        return Err(classify_error_info(error));
    }

    if let Some(text) = response.primary_text() {
        return Ok(text);
    }

    if let Some(reason) = response.block_reason() {
        return Err(GatewayError::new(GatewayErrorKind::Blocked, reason));
    }

    Err(GatewayError::new(
        GatewayErrorKind::EmptyResponse,
        "no text response",
    ))
}

fn classify_error_info(error: &wire::ErrorInfo) -> GatewayError {
    let kind = match (error.code, error.status.as_deref()) {
        (Some(401 | 403), _) | (_, Some("UNAUTHENTICATED" | "PERMISSION_DENIED")) => {
            GatewayErrorKind::Auth
        }
        (Some(429), _) | (_, Some("RESOURCE_EXHAUSTED")) => GatewayErrorKind::Quota,
        _ => GatewayErrorKind::Api,
    };
    GatewayError::new(kind, error.message_or_default())
}

fn classify_status(status: StatusCode, body: &str) -> GatewayError {
    let kind = match status.as_u16() {
        401 | 403 => GatewayErrorKind::Auth,
        429 => GatewayErrorKind::Quota,
        _ if body.contains("RESOURCE_EXHAUSTED") => GatewayErrorKind::Quota,
        _ => GatewayErrorKind::Api,
    };
    let message = extract_error_message(body).unwrap_or_else(|| {
        let snippet: String = body.trim().chars().take(200).collect();
        if snippet.is_empty() {
            format!("HTTP {status}")
        } else {
            format!("HTTP {status}: {snippet}")
        }
    });
    GatewayError::new(kind, message)
}
