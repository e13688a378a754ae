//! Fanvue access token lifecycle: lookup and serialized refresh.

use chrono::{DateTime, Utc};
use fanvue_client::FanvueError;
use synthia_db::tokens::DEFAULT_ACCESS_TOKEN_TTL_SECS;

use super::{ServiceError, providers};
use crate::app::SharedState;

#[derive(Debug, Clone)]
pub struct RefreshedToken {
    pub access_token: String,
    /// Lifetime of `access_token` in seconds.
    pub expires_in: i64,
    pub refreshed_at: DateTime<Utc>,
}

/// The stored access token, if one is live.
pub fn current_access_token(state: &SharedState) -> Result<Option<String>, ServiceError> {
    Ok(state.db().get_access_token()?)
}

/// Exchange the stored refresh token for a new grant and persist it.
///
/// `stale` is the access token the caller just saw rejected. When another
/// task has already replaced it, the newer token is returned and no second
/// refresh is made. Refreshes are serialized on the shared refresh lock.
pub async fn refresh_access_token(
    state: &SharedState,
    stale: Option<&str>,
) -> Result<RefreshedToken, ServiceError> {
    let _guard = state.refresh_lock().lock().await;
    let db = state.db();

    if let Some(stale) = stale {
        if let Some(current) = db.get_access_token()? {
            if current != stale {
                tracing::debug!("Access token already rotated by another request");
                let tokens = db.get_stored_tokens()?;
                let now = Utc::now();
                return Ok(RefreshedToken {
                    access_token: current,
                    expires_in: tokens
                        .expires_at
                        .map(|at| (at - now.timestamp()).max(0))
                        .unwrap_or(DEFAULT_ACCESS_TOKEN_TTL_SECS),
                    refreshed_at: now,
                });
            }
        }
    }

    let refresh_token = db
        .get_refresh_token()?
        .ok_or_else(|| ServiceError::NeedsReauth("No refresh token available".into()))?;

    let config = state.config_snapshot().await;
    let auth = providers::fanvue_auth(&config)?;
    let grant = match auth.refresh_token(&refresh_token).await {
        Ok(grant) => grant,
        Err(FanvueError::TokenRejected { status, message }) => {
            tracing::warn!(status, "Fanvue rejected the refresh token, clearing stored tokens");
            db.delete_provider_tokens()?;
            return Err(ServiceError::NeedsReauth(message));
        }
        Err(e) => return Err(e.into()),
    };

    let now = Utc::now();
    db.save_provider_tokens(
        &grant.access_token,
        grant.refresh_token.as_deref(),
        grant.expires_in,
        now,
    )?;
    let expires_in = grant
        .expires_in
        .filter(|s| *s > 0)
        .unwrap_or(DEFAULT_ACCESS_TOKEN_TTL_SECS);
    tracing::info!(
        expires_in,
        rotated = grant.refresh_token.is_some(),
        "Fanvue token refreshed"
    );

    Ok(RefreshedToken {
        access_token: grant.access_token,
        expires_in,
        refreshed_at: now,
    })
}
