//! Gemini gateway against a mock `generateContent` endpoint

use std::net::TcpListener;

use serde_json::json;
use sylvia_providers::{GatewayErrorKind, ModelGateway};
use sylvia_types::{
    Configuration, ContentRole, NonEmptyString, RequestPayload, Segment, ThinkingBudget, ToolKind,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{
    gateway_at, gateway_for, generate_path, mount_error, mount_text_reply, request_bodies,
    start_gemini_mock,
};

fn simple_payload(text: &str) -> RequestPayload {
    RequestPayload::new(
        vec![Segment::UserText(NonEmptyString::new(text).unwrap())],
        Configuration::new(0.9, 2048, Vec::new()),
    )
}

#[tokio::test]
async fn returns_candidate_text() {
    let server = start_gemini_mock().await;
    mount_text_reply(&server, "Let's set a goal.").await;

    let reply = gateway_for(&server)
        .send(&simple_payload("hi"))
        .await
        .unwrap();

    assert_eq!(reply, "Let's set a goal.");
}

#[tokio::test]
async fn multi_part_answer_is_returned_in_full() {
    let server = start_gemini_mock().await;
    Mock::given(method("POST"))
        .and(path(generate_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [
                    { "text": "Block 1: read chapter 3. " },
                    { "text": "Block 2: summarise it." }
                ] },
                "finishReason": "STOP"
            }]
        })))
        .mount(&server)
        .await;

    let reply = gateway_for(&server)
        .send(&simple_payload("plan two blocks"))
        .await
        .unwrap();

    assert_eq!(reply, "Block 1: read chapter 3. Block 2: summarise it.");
}

#[tokio::test]
async fn request_body_carries_history_turn_and_configuration() {
    let server = start_gemini_mock().await;
    mount_text_reply(&server, "ok").await;

    let payload = RequestPayload::new(
        vec![
            Segment::History {
                role: ContentRole::User,
                text: "I want to learn Rust".to_string(),
            },
            Segment::History {
                role: ContentRole::Model,
                text: "What for?".to_string(),
            },
            Segment::Nudge {
                instruction: "SILENT_ACTION: ask about the goal".to_string(),
            },
            Segment::Attachment {
                display_name: "notes.pdf".to_string(),
                identifier: "files/abc".to_string(),
                mime_type: "application/pdf".to_string(),
                file_uri: Some("files/abc".to_string()),
            },
            Segment::UserText(NonEmptyString::new("CLI tools").unwrap()),
        ],
        Configuration::new(0.4, 512, vec![ToolKind::GoogleSearch])
            .with_system_instruction("You are Sylvia.")
            .with_thinking_budget(ThinkingBudget::Off),
    );

    gateway_for(&server).send(&payload).await.unwrap();

    let bodies = request_bodies(&server).await;
    assert_eq!(bodies.len(), 1);
    let body = &bodies[0];

    let contents = body["contents"].as_array().unwrap();
    assert_eq!(contents.len(), 3);
    assert_eq!(contents[0]["role"], "user");
    assert_eq!(contents[1]["role"], "model");
    assert_eq!(contents[1]["parts"][0]["text"], "What for?");

    let turn = contents[2]["parts"].as_array().unwrap();
    assert_eq!(contents[2]["role"], "user");
    assert_eq!(
        turn[0]["text"],
        "[INTERNAL_COACHING]\nSILENT_ACTION: ask about the goal"
    );
    assert_eq!(turn[1]["text"], "[FILE_REF name=notes.pdf id=files/abc]");
    assert_eq!(
        turn[2]["fileData"],
        json!({ "mimeType": "application/pdf", "fileUri": "files/abc" })
    );
    assert_eq!(turn[3]["text"], "CLI tools");

    assert_eq!(
        body["system_instruction"]["parts"][0]["text"],
        "You are Sylvia."
    );
    assert_eq!(body["generationConfig"]["temperature"], 0.4);
    assert_eq!(body["generationConfig"]["maxOutputTokens"], 512);
    assert_eq!(
        body["generationConfig"]["thinkingConfig"]["thinkingBudget"],
        0
    );
    assert_eq!(body["tools"], json!([{ "google_search": {} }]));
}

#[tokio::test]
async fn tools_are_omitted_when_disabled() {
    let server = start_gemini_mock().await;
    mount_text_reply(&server, "ok").await;

    gateway_for(&server)
        .send(&simple_payload("hi"))
        .await
        .unwrap();

    let body = &request_bodies(&server).await[0];
    assert!(body.get("tools").is_none());
    assert!(body.get("system_instruction").is_none());
}

#[tokio::test]
async fn unauthorized_maps_to_auth() {
    let server = start_gemini_mock().await;
    mount_error(&server, 403, "PERMISSION_DENIED", "API key not valid").await;

    let err = gateway_for(&server)
        .send(&simple_payload("hi"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), GatewayErrorKind::Auth);
    assert_eq!(err.message(), "API key not valid");
    // Auth failures are not retried.
    assert_eq!(request_bodies(&server).await.len(), 1);
}

#[tokio::test]
async fn rate_limit_maps_to_quota_after_retrying() {
    let server = start_gemini_mock().await;
    mount_error(&server, 429, "RESOURCE_EXHAUSTED", "Quota exceeded").await;

    let err = gateway_for(&server)
        .send(&simple_payload("hi"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), GatewayErrorKind::Quota);
    assert_eq!(request_bodies(&server).await.len(), 2);
}

#[tokio::test]
async fn exhausted_daily_quota_is_not_retried() {
    let server = start_gemini_mock().await;
    Mock::given(method("POST"))
        .and(path(generate_path()))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {
                "code": 429,
                "message": "You exceeded your current quota.",
                "status": "RESOURCE_EXHAUSTED",
                "details": [{
                    "@type": "type.googleapis.com/google.rpc.QuotaFailure",
                    "violations": [{ "quotaId": "GenerateRequestsPerDayPerProjectPerModel-FreeTier" }]
                }]
            }
        })))
        .mount(&server)
        .await;

    let err = gateway_for(&server)
        .send(&simple_payload("hi"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), GatewayErrorKind::Quota);
    assert_eq!(request_bodies(&server).await.len(), 1);
}

#[tokio::test]
async fn transient_server_error_is_retried() {
    let server = start_gemini_mock().await;
    Mock::given(method("POST"))
        .and(path(generate_path()))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_text_reply(&server, "recovered").await;

    let reply = gateway_for(&server)
        .send(&simple_payload("hi"))
        .await
        .unwrap();

    assert_eq!(reply, "recovered");
}

#[tokio::test]
async fn error_object_in_ok_body_is_classified() {
    let server = start_gemini_mock().await;
    Mock::given(method("POST"))
        .and(path(generate_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": { "code": 429, "message": "slow down", "status": "RESOURCE_EXHAUSTED" }
        })))
        .mount(&server)
        .await;

    let err = gateway_for(&server)
        .send(&simple_payload("hi"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), GatewayErrorKind::Quota);
    assert_eq!(err.message(), "slow down");
}

#[tokio::test]
async fn blocked_prompt_is_reported() {
    let server = start_gemini_mock().await;
    Mock::given(method("POST"))
        .and(path(generate_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        })))
        .mount(&server)
        .await;

    let err = gateway_for(&server)
        .send(&simple_payload("hi"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), GatewayErrorKind::Blocked);
}

#[tokio::test]
async fn candidate_without_text_is_empty() {
    let server = start_gemini_mock().await;
    Mock::given(method("POST"))
        .and(path(generate_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "role": "model", "parts": [] }, "finishReason": "STOP" }]
        })))
        .mount(&server)
        .await;

    let err = gateway_for(&server)
        .send(&simple_payload("hi"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), GatewayErrorKind::EmptyResponse);
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let server = start_gemini_mock().await;
    Mock::given(method("POST"))
        .and(path(generate_path()))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = gateway_for(&server)
        .send(&simple_payload("hi"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), GatewayErrorKind::Decode);
}

#[tokio::test]
async fn unreachable_host_is_a_transport_error() {
    // Grab a free port, then close it so nothing is listening.
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let base = format!("http://127.0.0.1:{port}");

    let err = gateway_at(&base)
        .send(&simple_payload("hi"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), GatewayErrorKind::Transport);
}
