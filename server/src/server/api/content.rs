//! Content queue management, the cron-driven processor, and captions.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use synthia_db::content_queue::{ContentStatus, NewContent, Platform};

use crate::app::SharedState;
use crate::services::captions::{self, CaptionOptions, CaptionStyle};
use crate::services::content_processor::{self, ProcessOutcome};
use crate::services::providers;

use super::fanvue::purge_expired;
use super::{
    ApiResult, err_json, map_gemini_error, map_service_error, require_cron_secret, storage_error,
};

// ---------------------------------------------------------------------------
// Queue
// ---------------------------------------------------------------------------

/// Posted items echoed by the queue listing, newest first.
const RECENT_POSTED: usize = 10;

/// GET /api/content/queue – Stats, queued items and failed items
pub async fn list_queue(State(state): State<SharedState>) -> ApiResult {
    let db = state.db();
    let stats = db.queue_stats(Utc::now()).map_err(storage_error)?;
    let items = db.list_content().map_err(storage_error)?;
    let (queued, failed): (Vec<_>, Vec<_>) = items
        .into_iter()
        .filter(|i| i.status != ContentStatus::Posted)
        .partition(|i| i.status == ContentStatus::Queued);
    let history = db.posted_history().map_err(storage_error)?;
    let recently_posted: Vec<_> = history.iter().rev().take(RECENT_POSTED).collect();
    Ok(Json(json!({
        "success": true,
        "stats": stats,
        "queue": queued,
        "failed": failed,
        "recentlyPosted": recently_posted,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueRequest {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    media_urls: Vec<String>,
    #[serde(default, rename = "isPPV")]
    is_ppv: bool,
    #[serde(default)]
    price: Option<f64>,
    #[serde(default)]
    scheduled_for: Option<DateTime<Utc>>,
    #[serde(default)]
    platform: Option<String>,
}

/// POST /api/content/queue – Add an item
pub async fn enqueue(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Result<Json<EnqueueRequest>, JsonRejection>,
) -> ApiResult {
    require_cron_secret(&headers, &*state.config().await)?;
    let Json(req) = body.map_err(|e| err_json(400, &format!("Invalid request body: {e}")))?;

    let text = req
        .text
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| err_json(400, "text is required"))?;
    let platform: Platform = match req.platform.as_deref() {
        None => Platform::default(),
        Some(p) => p
            .parse()
            .map_err(|_| err_json(400, "platform must be fanvue, dfans or both"))?,
    };
    if req.price.is_some_and(|p| !p.is_finite() || p < 0.0) {
        return Err(err_json(400, "price must be a non-negative number"));
    }

    let new = NewContent {
        text,
        media_urls: req.media_urls,
        is_ppv: req.is_ppv,
        price: req.price,
        scheduled_for: req.scheduled_for,
        platform,
    };
    let item = state
        .db()
        .enqueue_content(&new, Utc::now())
        .map_err(storage_error)?;
    tracing::info!(item_id = %item.id, platform = %item.platform, "Queued content");

    let message = match item.scheduled_for {
        Some(at) => format!("Scheduled for {}", at.to_rfc3339()),
        None => "Added to queue (will post on next cron run)".to_string(),
    };
    Ok(Json(json!({ "success": true, "item": item, "message": message })))
}

#[derive(Debug, Deserialize)]
pub struct RemoveQuery {
    pub id: Option<String>,
    pub clear: Option<bool>,
}

/// DELETE /api/content/queue?id=… | ?clear=true – Remove one item or clear queued items
pub async fn remove(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Query(q): Query<RemoveQuery>,
) -> ApiResult {
    require_cron_secret(&headers, &*state.config().await)?;
    let db = state.db();

    if q.clear == Some(true) {
        let removed = db.clear_queued_content().map_err(storage_error)?;
        tracing::info!(removed, "Cleared content queue");
        return Ok(Json(json!({
            "success": true,
            "removed": removed,
            "message": "Queue cleared",
        })));
    }

    let id = q
        .id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| err_json(400, "Provide id or clear=true"))?;
    let removed = db.remove_content(&id).map_err(storage_error)?;
    Ok(Json(json!({
        "success": removed,
        "message": if removed { "Item removed" } else { "Item not found" },
    })))
}

// ---------------------------------------------------------------------------
// Processor
// ---------------------------------------------------------------------------

/// GET /api/content/process – Cron: post the next due item
pub async fn process(State(state): State<SharedState>, headers: HeaderMap) -> ApiResult {
    require_cron_secret(&headers, &*state.config().await)?;
    purge_expired(&state);

    let outcome = content_processor::process_next(&state, Utc::now())
        .await
        .map_err(map_service_error)?;

    Ok(Json(match outcome {
        ProcessOutcome::Idle => json!({
            "success": true,
            "processed": false,
            "message": "No items ready to post",
        }),
        ProcessOutcome::Posted { item, response } => json!({
            "success": true,
            "processed": true,
            "item": {
                "id": item.id,
                "text": preview(&item.text),
                "platform": item.platform,
            },
            "post": response,
        }),
        ProcessOutcome::Failed { item, error } => json!({
            "success": false,
            "processed": true,
            "error": error,
            "item": { "id": item.id },
        }),
    }))
}

fn preview(text: &str) -> String {
    const PREVIEW_CHARS: usize = 50;
    if text.chars().count() <= PREVIEW_CHARS {
        text.to_string()
    } else {
        let head: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{head}...")
    }
}

// ---------------------------------------------------------------------------
// Captions
// ---------------------------------------------------------------------------

/// GET /api/content/generate – Usage and sample topics
pub async fn generate_usage() -> Json<Value> {
    Json(json!({
        "description": "Generate Synthia-style captions",
        "usage": "POST with { topic, style?, includeHashtags?, includeCTA? }",
        "styles": CaptionStyle::ALL.map(CaptionStyle::as_str),
        "sampleTopics": captions::SAMPLE_TOPICS,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(default)]
    topic: Option<String>,
    #[serde(default)]
    style: Option<String>,
    #[serde(default)]
    include_hashtags: Option<bool>,
    #[serde(default, rename = "includeCTA")]
    include_cta: Option<bool>,
}

/// POST /api/content/generate – Write a caption for a topic
pub async fn generate(
    State(state): State<SharedState>,
    body: Result<Json<GenerateRequest>, JsonRejection>,
) -> ApiResult {
    let Json(req) = body.map_err(|e| err_json(400, &format!("Invalid request body: {e}")))?;
    let topic = req
        .topic
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| err_json(400, "topic is required"))?;
    let style: CaptionStyle = match req.style.as_deref() {
        None => CaptionStyle::default(),
        Some(s) => s.parse().map_err(|e: String| err_json(400, &e))?,
    };
    let options = CaptionOptions {
        style,
        include_hashtags: req.include_hashtags.unwrap_or(true),
        include_cta: req.include_cta.unwrap_or(true),
    };

    let config = state.config_snapshot().await;
    let gemini = providers::gemini(&config).map_err(map_service_error)?;
    let caption = captions::generate_caption(&gemini, topic, &options, &config.public_url)
        .await
        .map_err(map_gemini_error)?;

    Ok(Json(json!({
        "success": true,
        "characterCount": caption.chars().count(),
        "caption": caption,
        "topic": topic,
        "style": style,
    })))
}
