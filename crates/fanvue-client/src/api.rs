//! Fanvue REST API client.
//!
//! Every call carries the bearer access token and the pinned API version
//! header. A 401 comes back as `FanvueError::Api { status: 401, .. }`; the
//! caller decides whether to refresh and retry.

mod request;

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::{DEFAULT_API_BASE, FanvueError, build_http};

/// Fanvue REST client with automatic auth and version header injection.
pub struct FanvueApiClient {
    pub(super) http: reqwest::Client,
    pub(super) api_base: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaRef {
    pub url: String,
}

/// Body of `POST /posts`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatePost {
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub media: Vec<MediaRef>,
    #[serde(rename = "isPPV", skip_serializing_if = "Option::is_none")]
    pub is_ppv: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

impl CreatePost {
    /// Pay-per-view is only requested when both the flag and a price are
    /// present.
    pub fn new(text: impl Into<String>, media_urls: &[String], is_ppv: bool, price: Option<f64>) -> Self {
        let ppv_price = price.filter(|p| is_ppv && *p > 0.0);
        Self {
            text: text.into(),
            media: media_urls
                .iter()
                .map(|url| MediaRef { url: url.clone() })
                .collect(),
            is_ppv: ppv_price.map(|_| true),
            price: ppv_price,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    text: &'a str,
}

impl FanvueApiClient {
    pub fn new(timeout: Duration) -> Result<Self, FanvueError> {
        Ok(Self {
            http: build_http(timeout)?,
            api_base: DEFAULT_API_BASE.to_string(),
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// POST /posts
    pub async fn create_post(
        &self,
        access_token: &str,
        post: &CreatePost,
    ) -> Result<Value, FanvueError> {
        let url = format!("{}/posts", self.api_base);
        let body = self.authenticated_post(&url, access_token, post).await?;
        parse_body(&body)
    }

    /// POST /chats/{user_uuid}/message
    pub async fn send_chat_message(
        &self,
        access_token: &str,
        user_uuid: &str,
        text: &str,
    ) -> Result<Value, FanvueError> {
        let url = format!("{}/chats/{}/message", self.api_base, user_uuid);
        let body = self
            .authenticated_post(&url, access_token, &ChatMessage { text })
            .await?;
        parse_body(&body)
    }

    /// GET /creator/self, used as a connectivity probe.
    pub async fn creator_self(&self, access_token: &str) -> Result<Value, FanvueError> {
        let url = format!("{}/creator/self", self.api_base);
        let body = self.authenticated_get(&url, access_token).await?;
        parse_body(&body)
    }
}

/// Empty 2xx bodies are reported as `null`.
fn parse_body(body: &str) -> Result<Value, FanvueError> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(body)?)
}
