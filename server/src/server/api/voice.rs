//! Speech synthesis for tiers with voice access.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::app::SharedState;
use crate::auth::AuthUser;
use crate::services::{ServiceError, providers, tiers};

use super::{ApiError, err_json, err_json_with, map_service_error, storage_error};

const MAX_SPEECH_CHARS: usize = 2500;

#[derive(Debug, Deserialize)]
pub struct VoiceRequest {
    #[serde(default)]
    text: Option<String>,
}

/// POST /api/voice – render text as `audio/mpeg`
pub async fn synthesize(
    State(state): State<SharedState>,
    user: AuthUser,
    body: Result<Json<VoiceRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = body.map_err(|e| err_json(400, &format!("Invalid request body: {e}")))?;
    let text = req
        .text
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| err_json(400, "text is required"))?;
    if text.chars().count() > MAX_SPEECH_CHARS {
        return Err(err_json(
            400,
            &format!("text must be at most {MAX_SPEECH_CHARS} characters"),
        ));
    }

    let now = Utc::now();
    let account = user
        .resolve_or_create(state.db(), now)
        .map_err(storage_error)?;
    let tier = account.effective_tier(now);
    if !tiers::tier_info(tier).limits.voice_enabled {
        return Err(err_json_with(
            403,
            "Voice is not included in your tier",
            json!({ "tier": tier }),
        ));
    }

    let config = state.config_snapshot().await;
    let client = providers::speech(&config).map_err(map_service_error)?;
    let audio = client
        .synthesize(text)
        .await
        .map_err(|e| map_service_error(ServiceError::from(e)))?;
    tracing::debug!(user_id = %account.id, bytes = audio.len(), "Synthesized speech");

    Ok(([(header::CONTENT_TYPE, "audio/mpeg")], audio).into_response())
}
