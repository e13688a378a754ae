//! Inbound Fanvue webhooks: signature check and in-character auto-reply.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use chrono::Utc;
use fanvue_client::webhook::{self, WebhookEvent};
use gemini_client::GenerateRequest;
use serde_json::{Value, json};

use crate::app::SharedState;
use crate::config::AppConfig;
use crate::services::persona::{FALLBACK_REPLY, PERSONA_PROMPT};
use crate::services::{posting, providers};

use super::{ApiResult, err_json};

const REPLY_TEMPERATURE: f32 = 0.9;
const REPLY_MAX_TOKENS: u32 = 500;

/// GET /api/webhooks/fanvue – Liveness probe for Fanvue's endpoint check
pub async fn probe() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "Synthia Fanvue Webhook",
        "timestamp": Utc::now(),
    }))
}

/// POST /api/webhooks/fanvue – Verify and handle an event
pub async fn receive(State(state): State<SharedState>, headers: HeaderMap, body: Bytes) -> ApiResult {
    let config = state.config_snapshot().await;
    if config.fanvue_webhook_secret.is_empty() {
        tracing::error!("FANVUE_WEBHOOK_SECRET is not set, rejecting webhook");
        return Err(err_json(401, "Invalid signature"));
    }
    let signature = headers
        .get(webhook::SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| err_json(401, "Invalid signature"))?;
    webhook::verify_signature(
        &config.fanvue_webhook_secret,
        signature,
        &body,
        Utc::now().timestamp(),
    )
    .map_err(|e| {
        tracing::warn!("Fanvue webhook rejected: {e:?}");
        err_json(401, "Invalid signature")
    })?;

    let event = WebhookEvent::parse(&body).map_err(|e| {
        tracing::warn!("Malformed Fanvue webhook payload: {e}");
        err_json(400, "Malformed event")
    })?;

    match event {
        WebhookEvent::MessageReceived { message, sender } => {
            if sender.is_account(&config.fanvue_account_handle) {
                return Ok(Json(json!({ "ok": true, "skipped": "own message" })));
            }
            let text = message.text.trim();
            if text.is_empty() {
                return Ok(Json(json!({ "ok": true, "skipped": "empty message" })));
            }
            tracing::info!(sender = %sender.name(), len = text.len(), "Fanvue message received");

            let reply = generate_reply(&config, text).await;
            let reply_sent = match posting::send_reply(&state, &sender.uuid, &reply).await {
                Ok(_) => true,
                Err(e) => {
                    tracing::error!(sender = %sender.uuid, "Failed to send Fanvue reply: {e}");
                    false
                }
            };
            Ok(Json(json!({ "ok": true, "processed": true, "replySent": reply_sent })))
        }
        WebhookEvent::NewFollower(fan) => {
            tracing::info!(handle = ?fan.handle, "New Fanvue follower");
            Ok(Json(json!({ "ok": true })))
        }
        WebhookEvent::NewSubscriber(fan) => {
            tracing::info!(handle = ?fan.handle, "New Fanvue subscriber");
            Ok(Json(json!({ "ok": true })))
        }
        WebhookEvent::Other => {
            tracing::debug!("Ignoring Fanvue webhook without a known payload");
            Ok(Json(json!({ "ok": true })))
        }
    }
}

/// In-character reply. Any LLM failure yields [`FALLBACK_REPLY`].
async fn generate_reply(config: &AppConfig, text: &str) -> String {
    let gemini = match providers::gemini(config) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("Cannot generate reply: {e}");
            return FALLBACK_REPLY.to_string();
        }
    };
    let request = GenerateRequest::new(REPLY_TEMPERATURE, REPLY_MAX_TOKENS)
        .system(PERSONA_PROMPT)
        .user(format!("User message: {text}"));
    match gemini.generate(&request).await {
        Ok(reply) if !reply.trim().is_empty() => reply.trim().to_string(),
        Ok(_) => FALLBACK_REPLY.to_string(),
        Err(e) => {
            tracing::error!("Reply generation failed: {e}");
            FALLBACK_REPLY.to_string()
        }
    }
}
