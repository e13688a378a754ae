mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde_json::json;
use synthia_db::users::Tier;
use tokio::task::JoinSet;

use common::*;

const EMAIL: &str = "fan@example.com";

#[tokio::test]
async fn test_chat_requires_session() {
    let app = TestApp::new(base_config());
    let (status, body) = app
        .json(post_json("/api/chat", None, &json!({ "message": "hi" })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized");

    let (status, _) = app
        .json(post_json("/api/chat", Some("not-a-jwt"), &json!({ "message": "hi" })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_chat_validates_body() {
    let app = TestApp::new(base_config());
    let token = session_token(EMAIL);

    let (status, body) = app
        .json(post_json("/api/chat", Some(&token), &json!({ "message": "   " })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Message is required");

    let (status, _) = app
        .json(post_json(
            "/api/chat",
            Some(&token),
            &json!({ "message": "hi", "mode": "roast" }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_chat_reply_counts_against_quota() {
    let gemini = gemini_replying("Bold of you to open with that.").await;
    let app = TestApp::new(with_gemini(base_config(), &gemini));
    let token = session_token(EMAIL);

    let (status, body) = app
        .json(post_json("/api/chat", Some(&token), &json!({ "message": "hello" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text"], "Bold of you to open with that.");
    assert_eq!(body["usage"]["tier"], "observer");
    assert_eq!(body["usage"]["used"], 1);
    assert_eq!(body["usage"]["remaining"], 4);

    let calls = gemini.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].path.ends_with(":generateContent"));
    let sent: serde_json::Value = serde_json::from_str(&calls[0].body).unwrap();
    assert!(sent["systemInstruction"]["parts"][0]["text"].is_string());
    assert_eq!(sent["contents"][0]["role"], "model");
    assert_eq!(sent["contents"][1]["parts"][0]["text"], "hello");
}

#[tokio::test]
async fn test_chat_limit_reached_skips_llm() {
    let gemini = gemini_replying("unused").await;
    let app = TestApp::new(with_gemini(base_config(), &gemini));
    let token = session_token(EMAIL);

    let now = Utc::now();
    let user = app.db().get_or_create_user(EMAIL, None, now).unwrap();
    for _ in 0..5 {
        app.db().increment_message_count(&user.id, now).unwrap();
    }

    let (status, body) = app
        .json(post_json("/api/chat", Some(&token), &json!({ "message": "one more?" })))
        .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "Daily message limit reached");
    assert_eq!(body["remaining"], 0);
    assert_eq!(body["limit"], 5);
    assert_eq!(body["upgradeUrl"], format!("{PUBLIC_URL}/pricing"));
    assert!(gemini.calls().is_empty());

    let (status, usage) = app.json(get("/api/usage", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(usage["used"], 5);
    assert_eq!(usage["remaining"], 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_chats_never_exceed_daily_cap() {
    let gemini = MockUpstream::start_with_delay(std::time::Duration::from_millis(300), |_| {
        (200, gemini_text("One at a time."))
    })
    .await;
    let app = Arc::new(TestApp::new(with_gemini(base_config(), &gemini)));
    let token = session_token(EMAIL);
    app.json(get("/api/usage", Some(&token))).await;

    let mut tasks = JoinSet::new();
    for i in 0..10 {
        let app = app.clone();
        let token = token.clone();
        tasks.spawn(async move {
            app.json(post_json(
                "/api/chat",
                Some(&token),
                &json!({ "message": format!("message {i}") }),
            ))
            .await
            .0
        });
    }
    let mut ok = 0;
    let mut limited = 0;
    while let Some(status) = tasks.join_next().await {
        match status.unwrap() {
            StatusCode::OK => ok += 1,
            StatusCode::TOO_MANY_REQUESTS => limited += 1,
            other => panic!("unexpected status {other}"),
        }
    }
    assert_eq!(ok, 5);
    assert_eq!(limited, 5);
    assert_eq!(gemini.calls().len(), 5);

    let (_, usage) = app.json(get("/api/usage", Some(&token))).await;
    assert_eq!(usage["used"], 5);
}

#[tokio::test]
async fn test_failed_generation_does_not_consume_quota() {
    let gemini = MockUpstream::start(|_| (500, json!({ "error": { "message": "boom" } }))).await;
    let app = TestApp::new(with_gemini(base_config(), &gemini));
    let token = session_token(EMAIL);

    let (status, body) = app
        .json(post_json("/api/chat", Some(&token), &json!({ "message": "hello" })))
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["upstreamStatus"], 500);

    let (status, usage) = app.json(get("/api/usage", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(usage["used"], 0);
    assert_eq!(usage["remaining"], 5);
}

#[tokio::test]
async fn test_chat_without_llm_key_is_unavailable() {
    let app = TestApp::new(base_config());
    let token = session_token(EMAIL);
    let (status, _) = app
        .json(post_json("/api/chat", Some(&token), &json!({ "message": "hello" })))
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_evaluate_extracts_embedded_json() {
    let gemini = gemini_replying(
        "Sure:\n```json\n{\"score\": 8, \"tier\": \"Integrated\", \"analysis\": \"clear\", \
         \"identifiedKSA\": \"Self-awareness\", \"revivaInsight\": \"Keep going.\"}\n```",
    )
    .await;
    let app = TestApp::new(with_gemini(base_config(), &gemini));
    let token = session_token(EMAIL);

    let (status, body) = app
        .json(post_json(
            "/api/chat",
            Some(&token),
            &json!({ "message": "I own my mistakes", "mode": "evaluate" }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["score"], 8);
    assert_eq!(body["identifiedKSA"], "Self-awareness");

    let sent: serde_json::Value = serde_json::from_str(&gemini.calls()[0].body).unwrap();
    assert_eq!(
        sent["contents"][0]["parts"][0]["text"],
        "User message to evaluate: \"I own my mistakes\""
    );

    // Evaluations are not metered.
    let (_, usage) = app.json(get("/api/usage", Some(&token))).await;
    assert_eq!(usage["used"], 0);
}

#[tokio::test]
async fn test_evaluate_falls_back_on_prose() {
    let gemini = gemini_replying("I couldn't decide, honestly.").await;
    let app = TestApp::new(with_gemini(base_config(), &gemini));
    let token = session_token(EMAIL);

    let (status, body) = app
        .json(post_json(
            "/api/chat",
            Some(&token),
            &json!({ "message": "hmm", "mode": "evaluate" }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["score"], 5);
    assert_eq!(body["tier"], "Growing");
    assert_eq!(body["analysis"], "I couldn't decide, honestly.");
}

#[tokio::test]
async fn test_usage_reflects_paid_tier() {
    let app = TestApp::new(base_config());
    let token = session_token(EMAIL);
    let now = Utc::now();
    let user = app.db().get_or_create_user(EMAIL, None, now).unwrap();
    app.db()
        .apply_subscription(&user.id, Tier::Builder, Some("cus_1"), "sub_1", Some(now + Duration::days(30)))
        .unwrap();

    let (status, body) = app.json(get("/api/usage", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tier"], "builder");
    assert_eq!(body["limit"], -1);
    assert_eq!(body["remaining"], -1);
}

#[tokio::test]
async fn test_tiers_are_public() {
    let app = TestApp::new(base_config());
    let (status, body) = app.json(get("/api/tiers", None)).await;
    assert_eq!(status, StatusCode::OK);
    let tiers = body["tiers"].as_array().unwrap();
    assert_eq!(tiers.len(), 4);
    assert_eq!(tiers[0]["tier"], "observer");
    assert_eq!(tiers[0]["limits"]["messagesPerDay"], 5);
    assert_eq!(tiers[0]["purchasable"], false);
}

#[tokio::test]
async fn test_status_route() {
    let app = TestApp::new(base_config());
    let (status, body) = app.json(get("/status", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
