//! Runtime settings administration:
//!   GET /api/settings        – all settings (secrets masked) + feature status
//!   PUT /api/settings        – update settings and reload the runtime config
//!   GET /api/settings/status – feature status only
//!
//! Every route requires `Bearer <CRON_SECRET>`; with no secret configured
//! they are closed.

use std::collections::HashMap;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::HeaderMap;
use serde_json::{Value, json};

use crate::app::SharedState;
use crate::config::{SettingInfo, SettingType, SettingsManager};

use super::{ApiError, ApiResult, err_json, require_cron_secret};

const MASK: &str = "********";

async fn require_admin(state: &SharedState, headers: &HeaderMap) -> Result<(), ApiError> {
    let config = state.config().await;
    if config.cron_secret.is_empty() {
        tracing::warn!("Settings API called but CRON_SECRET is not set");
        return Err(err_json(401, "Unauthorized"));
    }
    require_cron_secret(headers, &config)
}

fn settings_json(all: HashMap<String, SettingInfo>) -> HashMap<String, Value> {
    all.into_iter()
        .map(|(key, info)| {
            let value = match info.setting_type {
                SettingType::Secret if info.has_value => MASK.to_string(),
                _ => info.value,
            };
            let val = json!({
                "key": info.key,
                "value": value,
                "type": info.setting_type,
                "required": info.required,
                "description": info.description,
                "has_value": info.has_value,
            });
            (key, val)
        })
        .collect()
}

/// GET /api/settings
pub async fn get_settings(State(state): State<SharedState>, headers: HeaderMap) -> ApiResult {
    require_admin(&state, &headers).await?;
    let sm = SettingsManager::new(state.db().clone());

    let all = sm
        .get_all_settings()
        .map_err(|e| err_json(500, &format!("Failed to get settings: {e}")))?;
    let status = sm
        .check_feature_status()
        .map_err(|e| err_json(500, &format!("Failed to check status: {e}")))?;

    Ok(Json(json!({
        "settings": settings_json(all),
        "status": status,
        "dataDir": state.data_dir().display().to_string(),
    })))
}

/// PUT /api/settings
pub async fn update_settings(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Result<Json<HashMap<String, String>>, JsonRejection>,
) -> ApiResult {
    require_admin(&state, &headers).await?;
    let Json(body) = body.map_err(|e| err_json(400, &format!("Invalid request body: {e}")))?;
    let sm = SettingsManager::new(state.db().clone());

    // All-or-nothing: check every pair before writing any.
    for (key, value) in &body {
        sm.check_setting(key, value)
            .map_err(|e| err_json(400, &e.to_string()))?;
    }
    for (key, value) in &body {
        sm.set_setting(key, value)
            .map_err(|e| err_json(400, &e.to_string()))?;
    }

    state
        .reload_config()
        .await
        .map_err(|e| err_json(500, &format!("Failed to reload config: {e}")))?;
    tracing::info!(updated = body.len(), "Settings updated");

    let status = sm
        .check_feature_status()
        .map_err(|e| err_json(500, &format!("Failed to check status: {e}")))?;

    Ok(Json(json!({
        "success": true,
        "status": status,
        "message": format!("Updated {} setting(s) successfully", body.len()),
    })))
}

/// GET /api/settings/status
pub async fn get_settings_status(State(state): State<SharedState>, headers: HeaderMap) -> ApiResult {
    require_admin(&state, &headers).await?;
    let sm = SettingsManager::new(state.db().clone());
    let status = sm
        .check_feature_status()
        .map_err(|e| err_json(500, &format!("Failed to check status: {e}")))?;
    Ok(Json(json!(status)))
}
