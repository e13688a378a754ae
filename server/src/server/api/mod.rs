//! REST API handlers grouped by domain.

pub mod billing;
pub mod chat;
pub mod content;
pub mod fanvue;
pub mod settings;
pub mod voice;
pub mod webhooks;

use axum::Json;
use axum::http::{HeaderMap, StatusCode};
use fanvue_client::FanvueError;
use gemini_client::GeminiError;
use serde_json::{Value, json};
use stripe_client::StripeError;
use subtle::ConstantTimeEq;
use synthia_db::DbError;

use crate::auth::bearer_token;
use crate::config::AppConfig;
use crate::services::ServiceError;
use crate::services::speech::SpeechError;

pub type ApiError = (StatusCode, Json<Value>);
pub type ApiResult = Result<Json<Value>, ApiError>;

/// Standard error response.
pub fn err_json(status: u16, message: &str) -> ApiError {
    err_json_with(status, message, Value::Null)
}

/// Error response with extra top-level fields merged in.
pub fn err_json_with(status: u16, message: &str, extra: Value) -> ApiError {
    let mut body = json!({ "status": "error", "error": message });
    if let (Value::Object(body), Value::Object(extra)) = (&mut body, extra) {
        body.extend(extra);
    }
    (
        StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(body),
    )
}

/// Storage failures are logged and reported without detail.
pub fn storage_error(err: DbError) -> ApiError {
    tracing::error!("Storage error: {err}");
    err_json(500, "Internal storage error")
}

fn upstream_error(provider: &str, status: u16, message: &str) -> ApiError {
    tracing::warn!(provider, status, "Upstream API error");
    err_json_with(
        502,
        &format!("{provider} API error (status {status})"),
        json!({ "upstreamStatus": status, "upstreamBody": message }),
    )
}

fn timeout_error(provider: &str) -> ApiError {
    tracing::warn!(provider, "Upstream request timed out");
    err_json_with(
        504,
        &format!("{provider} request timed out"),
        json!({ "retryable": true }),
    )
}

pub fn needs_reauth(message: &str) -> ApiError {
    err_json_with(401, message, json!({ "needsReauth": true }))
}

pub fn map_fanvue_error(err: FanvueError) -> ApiError {
    match err {
        FanvueError::TokenRejected { message, .. } => {
            needs_reauth(&format!("Fanvue rejected the token: {message}"))
        }
        FanvueError::Api { status: 401, .. } => needs_reauth("Fanvue access token rejected"),
        FanvueError::Api { status, message } => upstream_error("Fanvue", status, &message),
        FanvueError::Timeout => timeout_error("Fanvue"),
        other => {
            tracing::error!("Fanvue request failed: {other}");
            err_json(502, "Fanvue request failed")
        }
    }
}

pub fn map_gemini_error(err: GeminiError) -> ApiError {
    match err {
        GeminiError::Api { status, message } => upstream_error("Gemini", status, &message),
        GeminiError::Timeout => timeout_error("Gemini"),
        GeminiError::EmptyResponse => err_json(502, "Gemini returned an empty response"),
        other => {
            tracing::error!("Gemini request failed: {other}");
            err_json(502, "Gemini request failed")
        }
    }
}

pub fn map_stripe_error(err: StripeError) -> ApiError {
    match err {
        StripeError::Api { status, message } => upstream_error("Stripe", status, &message),
        StripeError::Timeout => timeout_error("Stripe"),
        StripeError::InvalidSignature(_) => err_json(400, "Invalid signature"),
        other => {
            tracing::error!("Stripe request failed: {other}");
            err_json(502, "Stripe request failed")
        }
    }
}

fn map_speech_error(err: SpeechError) -> ApiError {
    match err {
        SpeechError::Api { status, message } => upstream_error("ElevenLabs", status, &message),
        SpeechError::Timeout => timeout_error("ElevenLabs"),
        SpeechError::Http(e) => {
            tracing::error!("ElevenLabs request failed: {e}");
            err_json(502, "ElevenLabs request failed")
        }
    }
}

pub fn map_service_error(err: ServiceError) -> ApiError {
    match err {
        ServiceError::NotConfigured(what) => {
            tracing::warn!("{what} is not configured");
            err_json(503, &format!("{what} is not configured"))
        }
        ServiceError::NeedsReauth(message) => needs_reauth(&message),
        ServiceError::Fanvue(e) => map_fanvue_error(e),
        ServiceError::Gemini(e) => map_gemini_error(e),
        ServiceError::Stripe(e) => map_stripe_error(e),
        ServiceError::Speech(e) => map_speech_error(e),
        ServiceError::Storage(e) => storage_error(e),
    }
}

/// Cron and admin endpoints require `Bearer <CRON_SECRET>` when it is set.
pub fn require_cron_secret(headers: &HeaderMap, config: &AppConfig) -> Result<(), ApiError> {
    if config.cron_secret.is_empty() {
        return Ok(());
    }
    let presented = bearer_token(headers).unwrap_or_default();
    if bool::from(presented.as_bytes().ct_eq(config.cron_secret.as_bytes())) {
        Ok(())
    } else {
        Err(err_json(401, "Unauthorized"))
    }
}
