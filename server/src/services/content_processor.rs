//! Posts the next due content item.

use chrono::{DateTime, Utc};
use fanvue_client::api::CreatePost;
use serde_json::Value;
use synthia_db::content_queue::ContentItem;

use super::{ServiceError, posting};
use crate::app::SharedState;

#[derive(Debug)]
pub enum ProcessOutcome {
    /// Nothing queued is due.
    Idle,
    Posted { item: ContentItem, response: Value },
    Failed { item: ContentItem, error: String },
}

/// Take the next due item and post it.
///
/// Any failure marks the item failed, except an upstream timeout: the post
/// may or may not have landed, so the item stays queued and the timeout is
/// returned for the caller to retry.
pub async fn process_next(
    state: &SharedState,
    now: DateTime<Utc>,
) -> Result<ProcessOutcome, ServiceError> {
    let Some(item) = state.db().next_due_content(now)? else {
        return Ok(ProcessOutcome::Idle);
    };

    if !item.platform.includes_fanvue() {
        let error = format!("unsupported platform: {}", item.platform);
        tracing::warn!(item_id = %item.id, platform = %item.platform, "Skipping queue item");
        state.db().mark_content_failed(&item.id, &error)?;
        return Ok(ProcessOutcome::Failed { item, error });
    }

    let post = CreatePost::new(item.text.clone(), &item.media_urls, item.is_ppv, item.price);
    match posting::publish_post(state, &post).await {
        Ok(response) => {
            if !state.db().mark_content_posted(&item.id, Utc::now())? {
                tracing::warn!(item_id = %item.id, "Queue item was already finalized");
            }
            tracing::info!(item_id = %item.id, "Posted queue item to Fanvue");
            Ok(ProcessOutcome::Posted { item, response })
        }
        Err(e) if e.is_timeout() => {
            tracing::warn!(item_id = %item.id, "Fanvue post timed out, leaving item queued");
            Err(e)
        }
        Err(e) => {
            let error = e.to_string();
            tracing::error!(item_id = %item.id, error = %error, "Failed to post queue item");
            state.db().mark_content_failed(&item.id, &error)?;
            Ok(ProcessOutcome::Failed { item, error })
        }
    }
}

