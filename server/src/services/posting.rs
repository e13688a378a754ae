//! Authenticated Fanvue calls with a bounded refresh-and-retry.

use std::future::Future;

use fanvue_client::FanvueError;
use fanvue_client::api::CreatePost;
use serde_json::Value;

use super::token_manager::{current_access_token, refresh_access_token};
use super::{ServiceError, providers};
use crate::app::SharedState;

/// Run `call` with the stored access token.
///
/// A 401 triggers one token refresh and one retry; a second 401 means the
/// grant is unusable and is reported as [`ServiceError::NeedsReauth`]. When
/// no access token is stored, the refresh happens up front and counts as
/// the one allowed refresh.
pub async fn call_with_token<T, F, Fut>(state: &SharedState, mut call: F) -> Result<T, ServiceError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<T, FanvueError>>,
{
    let (mut token, mut refreshed) = match current_access_token(state)? {
        Some(token) => (token, false),
        None => {
            tracing::info!("No stored Fanvue access token, refreshing before call");
            (refresh_access_token(state, None).await?.access_token, true)
        }
    };

    loop {
        match call(token.clone()).await {
            Err(e) if e.is_unauthorized() && !refreshed => {
                tracing::warn!("Fanvue returned 401, refreshing token and retrying once");
                token = refresh_access_token(state, Some(&token)).await?.access_token;
                refreshed = true;
            }
            Err(e) if e.is_unauthorized() => {
                return Err(ServiceError::NeedsReauth(
                    "Access token rejected after refresh".into(),
                ));
            }
            other => return other.map_err(ServiceError::from),
        }
    }
}

/// Publish a post on the creator account.
pub async fn publish_post(state: &SharedState, post: &CreatePost) -> Result<Value, ServiceError> {
    let config = state.config_snapshot().await;
    let api = providers::fanvue_api(&config)?;
    let api = &api;
    call_with_token(state, |token| async move { api.create_post(&token, post).await }).await
}

/// Send a chat message to a fan.
pub async fn send_reply(state: &SharedState, user_uuid: &str, text: &str) -> Result<Value, ServiceError> {
    let config = state.config_snapshot().await;
    let api = providers::fanvue_api(&config)?;
    let api = &api;
    call_with_token(state, |token| async move {
        api.send_chat_message(&token, user_uuid, text).await
    })
    .await
}
