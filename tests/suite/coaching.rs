//! End-to-end turns through the coach and a mocked Gemini endpoint

use std::sync::Arc;

use sylvia_engine::{
    AttachmentRef, CONFIGURATION_MISSING_REPLY, Coach, GATEWAY_FAILURE_REPLY, InvalidTurn,
    ManualClock, ModelAccess, NudgeKey, Role, SessionContext, SessionStore, ToolToggles,
    TurnRequest, TurnStatus,
};
use sylvia_providers::GeminiGateway;
use wiremock::MockServer;

use crate::common::{
    gateway_for, mount_error, mount_text_reply, request_bodies, start_gemini_mock, t0,
};

fn coach_for(server: &MockServer) -> (Coach<GeminiGateway>, SessionContext) {
    let clock = Arc::new(ManualClock::starting_at(t0()));
    let coach = Coach::new(
        ModelAccess::Available(gateway_for(server)),
        SessionStore::in_memory(),
        clock,
    )
    .with_system_instruction("You are Sylvia.");
    let ctx = coach.new_context(ToolToggles::default());
    (coach, ctx)
}

#[tokio::test]
async fn goal_nudge_turn_reaches_the_model_in_order() {
    let server = start_gemini_mock().await;
    mount_text_reply(&server, "What would you like to achieve?").await;
    let (coach, mut ctx) = coach_for(&server);
    ctx.set_url_context("foo\nhttp://a.com\n\nhttps://b.com/x\nbar");
    ctx.register_attachment(
        AttachmentRef::register("syllabus.pdf", "application/pdf", 4096)
            .with_external_id("files/syl"),
    );

    let goal = NudgeKey::new("goal");
    let outcome = coach
        .send_turn(
            &mut ctx,
            TurnRequest::nudge(&goal).with_text("Pass my exam"),
        )
        .await
        .unwrap();

    assert_eq!(outcome.status, TurnStatus::Answered);
    assert_eq!(outcome.reply, "What would you like to achieve?");

    let body = &request_bodies(&server).await[0];
    let parts = body["contents"][0]["parts"].as_array().unwrap();
    let texts: Vec<&str> = parts.iter().filter_map(|p| p["text"].as_str()).collect();
    assert!(texts[0].starts_with("[INTERNAL_COACHING]\nSILENT_ACTION:"));
    assert_eq!(texts[1], "URL_CONTEXT: http://a.com");
    assert_eq!(texts[2], "URL_CONTEXT: https://b.com/x");
    assert_eq!(texts[3], "[FILE_REF name=syllabus.pdf id=files/syl]");
    assert_eq!(texts[4], "Pass my exam");
    assert_eq!(
        body["system_instruction"]["parts"][0]["text"],
        "You are Sylvia."
    );

    let session = ctx.session();
    assert_eq!(session.goals_count(), 1);
    assert_eq!(session.progress_pct().value(), 20);
    let messages = session.messages().entries();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].content(), "Pass my exam");
    assert_eq!(messages[1].role(), Role::Assistant);
}

#[tokio::test]
async fn second_turn_replays_history_without_nudges() {
    let server = start_gemini_mock().await;
    mount_text_reply(&server, "Noted.").await;
    let (coach, mut ctx) = coach_for(&server);

    coach
        .send_turn(
            &mut ctx,
            TurnRequest::nudge(&NudgeKey::new("taskanalysis")).with_text("Chapter 3"),
        )
        .await
        .unwrap();
    coach
        .send_turn(&mut ctx, TurnRequest::text("What next?"))
        .await
        .unwrap();

    let bodies = request_bodies(&server).await;
    let contents = bodies[1]["contents"].as_array().unwrap();
    assert_eq!(contents.len(), 3);
    assert_eq!(contents[0]["parts"][0]["text"], "Chapter 3");
    assert_eq!(contents[1]["role"], "model");
    assert_eq!(contents[1]["parts"][0]["text"], "Noted.");
    assert_eq!(contents[2]["parts"][0]["text"], "What next?");
}

#[tokio::test]
async fn empty_turn_never_reaches_the_model() {
    let server = start_gemini_mock().await;
    mount_text_reply(&server, "unused").await;
    let (coach, mut ctx) = coach_for(&server);

    let result = coach.send_turn(&mut ctx, TurnRequest::text("  \n ")).await;

    assert_eq!(result, Err(InvalidTurn));
    assert!(request_bodies(&server).await.is_empty());
    assert!(ctx.session().messages().is_empty());
}

#[tokio::test]
async fn quota_failure_becomes_an_assistant_message() {
    let server = start_gemini_mock().await;
    mount_error(&server, 429, "RESOURCE_EXHAUSTED", "Quota exceeded for today").await;
    let (coach, mut ctx) = coach_for(&server);

    let outcome = coach
        .send_turn(&mut ctx, TurnRequest::text("hello"))
        .await
        .unwrap();

    assert!(matches!(outcome.status, TurnStatus::GatewayFailed(_)));
    assert_eq!(
        outcome.reply,
        format!("{GATEWAY_FAILURE_REPLY}\nQuota exceeded for today")
    );
    let messages = ctx.session().messages().entries();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].content(), outcome.reply);

    // The conversation carries on after a failure.
    server.reset().await;
    mount_text_reply(&server, "Back online.").await;
    let outcome = coach
        .send_turn(&mut ctx, TurnRequest::text("retry"))
        .await
        .unwrap();
    assert_eq!(outcome.reply, "Back online.");
}

#[tokio::test]
async fn missing_key_answers_locally() {
    let clock = Arc::new(ManualClock::starting_at(t0()));
    let coach: Coach<GeminiGateway> =
        Coach::new(ModelAccess::unconfigured(), SessionStore::in_memory(), clock);
    let mut ctx = coach.new_context(ToolToggles::default());

    let outcome = coach
        .send_turn(&mut ctx, TurnRequest::text("hello"))
        .await
        .unwrap();

    assert_eq!(outcome.reply, CONFIGURATION_MISSING_REPLY);
    assert_eq!(ctx.session().messages().len(), 2);
}

#[tokio::test]
async fn enabled_tools_are_sent() {
    let server = start_gemini_mock().await;
    mount_text_reply(&server, "ok").await;
    let (coach, mut ctx) = coach_for(&server);
    ctx.set_search_enabled(true);
    ctx.set_code_exec_enabled(true);

    coach
        .send_turn(&mut ctx, TurnRequest::text("plot x^2"))
        .await
        .unwrap();

    let body = &request_bodies(&server).await[0];
    assert_eq!(
        body["tools"],
        serde_json::json!([{ "google_search": {} }, { "code_execution": {} }])
    );
}
