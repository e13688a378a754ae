mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde_json::json;
use synthia_db::content_queue::{ContentStatus, NewContent, Platform};
use synthia_lib::config::AppConfig;

use common::*;

async fn posts_mock() -> MockUpstream {
    MockUpstream::start(|req| match req.path.as_str() {
        "/posts" => (200, json!({ "uuid": "post-9" })),
        _ => (404, json!({ "message": "not found" })),
    })
    .await
}

fn queue_config(mock: &MockUpstream) -> AppConfig {
    AppConfig {
        cron_secret: CRON_SECRET.into(),
        ..with_fanvue(base_config(), mock)
    }
}

fn connected(app: &TestApp) {
    app.db()
        .save_provider_tokens("live", Some("r1"), Some(3600), Utc::now())
        .unwrap();
}

#[tokio::test]
async fn test_enqueue_and_list() {
    let mock = posts_mock().await;
    let app = TestApp::new(queue_config(&mock));

    let (status, body) = app
        .json(post_json(
            "/api/content/queue",
            Some(CRON_SECRET),
            &json!({ "text": "Morning truth", "mediaUrls": ["https://cdn.test/a.jpg"] }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["item"]["status"], "queued");
    assert_eq!(body["item"]["platform"], "fanvue");
    assert_eq!(body["message"], "Added to queue (will post on next cron run)");

    let later = (Utc::now() + Duration::hours(2)).to_rfc3339();
    let (status, body) = app
        .json(post_json(
            "/api/content/queue",
            Some(CRON_SECRET),
            &json!({ "text": "Evening", "scheduledFor": later, "platform": "both" }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().starts_with("Scheduled for "));

    let (status, body) = app.json(get("/api/content/queue", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stats"]["queued"], 2);
    assert_eq!(body["queue"].as_array().unwrap().len(), 2);
    assert!(body["stats"]["nextScheduled"].is_string());
}

#[tokio::test]
async fn test_enqueue_validation_and_guard() {
    let mock = posts_mock().await;
    let app = TestApp::new(queue_config(&mock));

    let (status, _) = app
        .json(post_json("/api/content/queue", None, &json!({ "text": "x" })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .json(post_json("/api/content/queue", Some(CRON_SECRET), &json!({ "text": " " })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "text is required");

    let (status, _) = app
        .json(post_json(
            "/api/content/queue",
            Some(CRON_SECRET),
            &json!({ "text": "x", "platform": "onlyfans" }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .json(post_json(
            "/api/content/queue",
            Some(CRON_SECRET),
            &json!({ "text": "x", "price": -3 }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_remove_and_clear() {
    let mock = posts_mock().await;
    let app = TestApp::new(queue_config(&mock));
    let now = Utc::now();
    let first = app
        .db()
        .enqueue_content(&NewContent { text: "a".into(), ..Default::default() }, now)
        .unwrap();
    app.db()
        .enqueue_content(&NewContent { text: "b".into(), ..Default::default() }, now)
        .unwrap();

    let (status, body) = app
        .json(delete("/api/content/queue", Some(CRON_SECRET)))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Provide id or clear=true");

    let uri = format!("/api/content/queue?id={}", first.id);
    let (_, body) = app.json(delete(&uri, Some(CRON_SECRET))).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Item removed");
    let (_, body) = app.json(delete(&uri, Some(CRON_SECRET))).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Item not found");

    let (_, body) = app
        .json(delete("/api/content/queue?clear=true", Some(CRON_SECRET)))
        .await;
    assert_eq!(body["message"], "Queue cleared");
    assert_eq!(body["removed"], 1);
    assert!(app.db().list_content().unwrap().is_empty());
}

#[tokio::test]
async fn test_process_posts_due_item_then_idles() {
    let mock = posts_mock().await;
    let app = TestApp::new(queue_config(&mock));
    connected(&app);
    let now = Utc::now();
    let item = app
        .db()
        .enqueue_content(
            &NewContent {
                text: "A caption long enough that the preview has to cut it off somewhere".into(),
                is_ppv: true,
                price: Some(9.99),
                ..Default::default()
            },
            now,
        )
        .unwrap();
    app.db()
        .enqueue_content(
            &NewContent {
                text: "future".into(),
                scheduled_for: Some(now + Duration::hours(3)),
                ..Default::default()
            },
            now,
        )
        .unwrap();

    let (status, body) = app
        .json(get("/api/content/process", Some(CRON_SECRET)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["processed"], true);
    assert_eq!(body["item"]["id"], item.id);
    assert!(body["item"]["text"].as_str().unwrap().ends_with("..."));
    assert_eq!(body["post"]["uuid"], "post-9");

    let sent: serde_json::Value = serde_json::from_str(&mock.calls_to("/posts")[0].body).unwrap();
    assert_eq!(sent["isPPV"], true);
    assert_eq!(sent["price"], 9.99);

    let stored = app.db().get_content(&item.id).unwrap().unwrap();
    assert_eq!(stored.status, ContentStatus::Posted);
    assert!(stored.posted_at.is_some());

    let (status, body) = app
        .json(get("/api/content/process", Some(CRON_SECRET)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["processed"], false);
    assert_eq!(body["message"], "No items ready to post");
    assert_eq!(mock.calls_to("/posts").len(), 1);

    let (_, body) = app.json(get("/api/content/queue", None)).await;
    assert_eq!(body["stats"]["posted"], 1);
    assert_eq!(body["recentlyPosted"][0]["id"], item.id);
    assert_eq!(body["queue"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_process_marks_unsupported_platform_failed() {
    let mock = posts_mock().await;
    let app = TestApp::new(queue_config(&mock));
    connected(&app);
    let item = app
        .db()
        .enqueue_content(
            &NewContent {
                text: "dfans only".into(),
                platform: Platform::Dfans,
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap();

    let (status, body) = app
        .json(get("/api/content/process", Some(CRON_SECRET)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "unsupported platform: dfans");
    assert!(mock.calls().is_empty());

    let stored = app.db().get_content(&item.id).unwrap().unwrap();
    assert_eq!(stored.status, ContentStatus::Failed);

    let (_, body) = app.json(get("/api/content/queue", None)).await;
    assert_eq!(body["failed"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_process_records_upstream_failure() {
    let mock = MockUpstream::start(|_| (422, json!({ "message": "bad media" }))).await;
    let app = TestApp::new(queue_config(&mock));
    connected(&app);
    let item = app
        .db()
        .enqueue_content(&NewContent { text: "x".into(), ..Default::default() }, Utc::now())
        .unwrap();

    let (_, body) = app
        .json(get("/api/content/process", Some(CRON_SECRET)))
        .await;
    assert_eq!(body["success"], false);
    assert_eq!(body["processed"], true);

    let stored = app.db().get_content(&item.id).unwrap().unwrap();
    assert_eq!(stored.status, ContentStatus::Failed);
    assert!(stored.error.is_some());
}

#[tokio::test]
async fn test_generate_caption() {
    let gemini = gemini_replying("  Truth hurts. Then it heals.  ").await;
    let app = TestApp::new(with_gemini(base_config(), &gemini));

    let (status, body) = app
        .json(post_json(
            "/api/content/generate",
            None,
            &json!({ "topic": "honesty", "style": "short", "includeHashtags": false }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    let caption = body["caption"].as_str().unwrap();
    assert!(caption.starts_with("Truth hurts. Then it heals."));
    assert!(caption.ends_with(&format!("{PUBLIC_URL}/chat")));
    assert!(!caption.contains('#'));
    assert_eq!(body["style"], "short");
    assert_eq!(body["characterCount"], caption.chars().count());

    let (status, _) = app
        .json(post_json("/api/content/generate", None, &json!({ "style": "short" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app
        .json(post_json(
            "/api/content/generate",
            None,
            &json!({ "topic": "x", "style": "epic" }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_generate_usage() {
    let app = TestApp::new(base_config());
    let (status, body) = app.json(get("/api/content/generate", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["styles"], json!(["short", "medium", "long"]));
    assert_eq!(body["sampleTopics"].as_array().unwrap().len(), 6);
}
