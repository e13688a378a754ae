//! Fanvue OAuth (PKCE), token refresh, connection status and direct posting.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, Redirect};
use chrono::Utc;
use fanvue_client::api::CreatePost;
use fanvue_client::pkce::{PkcePair, generate_state};
use serde::Deserialize;
use serde_json::json;

use crate::app::SharedState;
use crate::services::{posting, providers, token_manager};

use super::{
    ApiError, ApiResult, err_json, map_fanvue_error, map_service_error, require_cron_secret,
    storage_error,
};

// ---------------------------------------------------------------------------
// OAuth flow
// ---------------------------------------------------------------------------

/// GET /api/fanvue/authorize – Redirect to the Fanvue consent screen
pub async fn authorize(State(state): State<SharedState>) -> Result<Redirect, ApiError> {
    let config = state.config_snapshot().await;
    let auth = providers::fanvue_auth(&config).map_err(map_service_error)?;

    let pkce = PkcePair::generate();
    let oauth_state = generate_state();
    state
        .db()
        .save_oauth_state(&oauth_state, &pkce.verifier, Utc::now())
        .map_err(storage_error)?;

    let url = auth
        .authorize_url(&oauth_state, &pkce.challenge)
        .map_err(map_fanvue_error)?;
    tracing::info!("Starting Fanvue authorization");
    Ok(Redirect::temporary(&url))
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// GET /api/fanvue/callback – Verify state, exchange the code, store tokens
pub async fn callback(
    State(state): State<SharedState>,
    Query(q): Query<CallbackQuery>,
) -> Result<Redirect, ApiError> {
    if let Some(error) = q.error {
        let desc = q.error_description.unwrap_or_default();
        tracing::warn!(error = %error, "Fanvue authorization denied");
        let message = format!("OAuth error: {error} {desc}");
        return Err(err_json(400, message.trim_end()));
    }
    let code = q
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| err_json(400, "OAuth code missing"))?;
    let callback_state = q
        .state
        .filter(|s| !s.is_empty())
        .ok_or_else(|| err_json(400, "OAuth state missing"))?;

    // Single use: a replayed state finds nothing.
    let record = state
        .db()
        .take_oauth_state(&callback_state)
        .map_err(storage_error)?
        .ok_or_else(|| {
            tracing::warn!("OAuth callback with unknown or expired state");
            err_json(400, "OAuth state mismatch or expired")
        })?;

    let config = state.config_snapshot().await;
    let auth = providers::fanvue_auth(&config).map_err(map_service_error)?;
    let grant = auth
        .exchange_code(&code, &record.code_verifier)
        .await
        .map_err(|e| match e {
            fanvue_client::FanvueError::TokenRejected { message, .. } => {
                err_json(400, &format!("Authorization code rejected: {message}"))
            }
            other => map_fanvue_error(other),
        })?;

    state
        .db()
        .save_provider_tokens(
            &grant.access_token,
            grant.refresh_token.as_deref(),
            grant.expires_in,
            Utc::now(),
        )
        .map_err(storage_error)?;
    tracing::info!(
        expires_in = ?grant.expires_in,
        has_refresh_token = grant.refresh_token.is_some(),
        "Fanvue tokens saved"
    );

    Ok(Redirect::to("/api/fanvue/success"))
}

/// GET /api/fanvue/success – Confirmation page after the OAuth round trip
pub async fn success(State(state): State<SharedState>) -> (StatusCode, Html<String>) {
    let connected = state
        .db()
        .get_stored_tokens()
        .map(|t| t.has_access_token())
        .unwrap_or(false);
    if connected {
        (
            StatusCode::OK,
            Html(
                r#"<!DOCTYPE html><html><head><meta charset="utf-8"><title>Fanvue connected</title></head>
<body><h2>Fanvue connected</h2><p>Synthia can now post and reply on your account. You can close this window.</p>
<script>setTimeout(()=>window.close(),3000)</script></body></html>"#
                    .to_string(),
            ),
        )
    } else {
        (
            StatusCode::BAD_REQUEST,
            Html(
                r#"<!DOCTYPE html><html><head><meta charset="utf-8"><title>Fanvue not connected</title></head>
<body><h2>No Fanvue token found</h2><p><a href="/api/fanvue/authorize">Try connecting again</a>.</p></body></html>"#
                    .to_string(),
            ),
        )
    }
}

// ---------------------------------------------------------------------------
// Token refresh
// ---------------------------------------------------------------------------

/// GET /api/fanvue/refresh – Cron: exchange the refresh token for a new pair
pub async fn refresh(State(state): State<SharedState>, headers: HeaderMap) -> ApiResult {
    require_cron_secret(&headers, &*state.config().await)?;
    purge_expired(&state);

    let refreshed = token_manager::refresh_access_token(&state, None)
        .await
        .map_err(map_service_error)?;
    Ok(Json(json!({
        "success": true,
        "expiresIn": refreshed.expires_in,
        "refreshedAt": refreshed.refreshed_at,
        "message": "Token refreshed successfully",
    })))
}

/// Drop expired kv rows. Failures are logged only.
pub(super) fn purge_expired(state: &SharedState) {
    match state.db().kv_purge_expired() {
        Ok(0) => {}
        Ok(n) => tracing::debug!(purged = n, "Purged expired kv entries"),
        Err(e) => tracing::warn!("Failed to purge expired kv entries: {e}"),
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// GET /api/fanvue/status – Configuration, stored tokens and a live API probe
pub async fn status(State(state): State<SharedState>) -> ApiResult {
    let config = state.config_snapshot().await;
    let tokens = state.db().get_stored_tokens().map_err(storage_error)?;

    let api = match tokens.access_token.as_deref() {
        None => json!({ "status": "not_authenticated", "error": null }),
        Some(token) => {
            let client = providers::fanvue_api(&config).map_err(map_service_error)?;
            match client.creator_self(token).await {
                Ok(creator) => json!({
                    "status": "connected",
                    "error": null,
                    "creator": creator.get("handle").or_else(|| creator.get("displayName")),
                }),
                Err(e) => {
                    tracing::warn!("Fanvue probe failed: {e}");
                    let status = if e.is_unauthorized() { "unauthorized" } else { "error" };
                    json!({ "status": status, "error": e.to_string() })
                }
            }
        }
    };

    Ok(Json(json!({
        "configuration": {
            "clientId": !config.fanvue_client_id.is_empty(),
            "clientSecret": !config.fanvue_client_secret.is_empty(),
            "webhookSecret": !config.fanvue_webhook_secret.is_empty(),
            "configured": config.fanvue_configured(),
        },
        "tokens": {
            "accessToken": tokens.has_access_token(),
            "refreshToken": tokens.has_refresh_token(),
            "expiresAt": tokens.expires_at,
            "lastRefresh": tokens.last_refresh,
        },
        "api": api,
        "actions": {
            "authorize": format!("{}/api/fanvue/authorize", config.public_url),
            "refresh": format!("{}/api/fanvue/refresh", config.public_url),
        },
    })))
}

// ---------------------------------------------------------------------------
// Posting
// ---------------------------------------------------------------------------

/// GET /api/fanvue/post – Posting readiness
pub async fn post_status(State(state): State<SharedState>) -> ApiResult {
    let config = state.config().await;
    let tokens = state.db().get_stored_tokens().map_err(storage_error)?;
    let ready = tokens.has_access_token() || tokens.has_refresh_token();
    Ok(Json(json!({
        "status": if ready { "ready" } else { "needs_auth" },
        "hasAccessToken": tokens.has_access_token(),
        "lastRefresh": tokens.last_refresh,
        "authUrl": format!("{}/api/fanvue/authorize", config.public_url),
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRequest {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    media_urls: Vec<String>,
    #[serde(default, rename = "isPPV")]
    is_ppv: bool,
    #[serde(default)]
    price: Option<f64>,
}

/// POST /api/fanvue/post – Publish immediately (one refresh-and-retry on 401)
pub async fn create_post(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Result<Json<PostRequest>, JsonRejection>,
) -> ApiResult {
    require_cron_secret(&headers, &*state.config().await)?;
    let Json(req) = body.map_err(|e| err_json(400, &format!("Invalid request body: {e}")))?;
    let text = req
        .text
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| err_json(400, "text is required"))?;

    let post = CreatePost::new(text, &req.media_urls, req.is_ppv, req.price);
    let response = posting::publish_post(&state, &post)
        .await
        .map_err(map_service_error)?;
    tracing::info!("Published Fanvue post");

    Ok(Json(json!({
        "success": true,
        "post": response,
        "postedAt": Utc::now(),
    })))
}
