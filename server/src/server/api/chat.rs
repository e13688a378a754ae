//! Chat, usage and tier table.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use chrono::Utc;
use gemini_client::GenerateRequest;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::app::SharedState;
use crate::auth::AuthUser;
use crate::services::persona::{EVALUATION_PROMPT, PERSONA_PROMPT, PRIMING_REPLY};
use crate::services::{evaluation, providers, quota, tiers};

use super::{ApiResult, err_json, err_json_with, map_gemini_error, map_service_error, storage_error};

const MAX_MESSAGE_CHARS: usize = 4000;

const CHAT_TEMPERATURE: f32 = 0.9;
const CHAT_MAX_TOKENS: u32 = 1024;
const EVALUATE_TEMPERATURE: f32 = 0.2;
const EVALUATE_MAX_TOKENS: u32 = 512;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    mode: Option<String>,
}

enum Mode {
    Chat,
    Evaluate,
}

/// POST /api/chat – in-character reply (quota metered) or maturity evaluation
pub async fn chat(
    State(state): State<SharedState>,
    user: AuthUser,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult {
    let Json(req) = body.map_err(|e| err_json(400, &format!("Invalid request body: {e}")))?;

    let message = req
        .message
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .ok_or_else(|| err_json(400, "Message is required"))?;
    if message.chars().count() > MAX_MESSAGE_CHARS {
        return Err(err_json(
            400,
            &format!("Message must be at most {MAX_MESSAGE_CHARS} characters"),
        ));
    }
    let mode = match req.mode.as_deref().unwrap_or("chat") {
        "chat" => Mode::Chat,
        "evaluate" => Mode::Evaluate,
        _ => return Err(err_json(400, "mode must be 'chat' or 'evaluate'")),
    };

    let config = state.config_snapshot().await;
    match mode {
        Mode::Evaluate => {
            let gemini = providers::gemini(&config).map_err(map_service_error)?;
            let request = GenerateRequest::new(EVALUATE_TEMPERATURE, EVALUATE_MAX_TOKENS)
                .system(EVALUATION_PROMPT)
                .user(format!("User message to evaluate: \"{message}\""));
            let raw = gemini.generate(&request).await.map_err(map_gemini_error)?;
            Ok(Json(evaluation::parse_evaluation(&raw)))
        }
        Mode::Chat => {
            let now = Utc::now();
            let db = state.db();
            let account = user.resolve_or_create(db, now).map_err(storage_error)?;
            let gemini = providers::gemini(&config).map_err(map_service_error)?;
            let usage = match quota::reserve_message(db, &account, now).map_err(storage_error)? {
                Ok(usage) => usage,
                Err(usage) => {
                    tracing::info!(user_id = %account.id, tier = %usage.tier, used = usage.used, "Daily message limit reached");
                    return Err(err_json_with(
                        429,
                        "Daily message limit reached",
                        json!({
                            "tier": usage.tier,
                            "used": usage.used,
                            "limit": usage.limit,
                            "remaining": 0,
                            "upgradeUrl": format!("{}/pricing", config.public_url),
                        }),
                    ));
                }
            };

            let request = GenerateRequest::new(CHAT_TEMPERATURE, CHAT_MAX_TOKENS)
                .system(PERSONA_PROMPT)
                .model(PRIMING_REPLY)
                .user(message);
            let text = match gemini.generate(&request).await {
                Ok(text) => text,
                Err(e) => {
                    if let Err(release_err) = quota::release_message(db, &account, now) {
                        tracing::error!("Failed to release message slot: {release_err}");
                    }
                    return Err(map_gemini_error(e));
                }
            };

            Ok(Json(json!({ "text": text, "usage": usage })))
        }
    }
}

/// GET /api/usage – today's usage for the signed-in user
pub async fn usage(State(state): State<SharedState>, user: AuthUser) -> ApiResult {
    let now = Utc::now();
    let db = state.db();
    let account = user.resolve_or_create(db, now).map_err(storage_error)?;
    let usage = quota::usage_for(db, &account, now).map_err(storage_error)?;
    let info = tiers::tier_info(usage.tier);
    Ok(Json(json!({
        "tier": usage.tier,
        "tierName": info.name,
        "used": usage.used,
        "limit": usage.limit,
        "remaining": usage.remaining,
        "limits": info.limits,
        "subscriptionEndsAt": account.subscription_ends_at,
    })))
}

/// GET /api/tiers – public tier table
pub async fn list_tiers(State(state): State<SharedState>) -> Json<Value> {
    let config = state.config().await;
    Json(tiers::tiers_json(&config))
}
