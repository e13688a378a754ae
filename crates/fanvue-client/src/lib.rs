//! Fanvue creator-platform client library.
//!
//! Provides the OAuth authorization-code flow with PKCE, the REST calls the
//! service needs (posts, chat replies, creator self), and verification and
//! parsing of inbound webhooks.

pub mod api;
pub mod auth;
pub mod pkce;
pub mod webhook;

use serde::Deserialize;

pub const DEFAULT_AUTH_BASE: &str = "https://auth.fanvue.com";
pub const DEFAULT_API_BASE: &str = "https://api.fanvue.com";

/// Sent as `X-Fanvue-API-Version` on every REST call.
pub const API_VERSION: &str = "2025-06-26";

/// OAuth scopes requested at authorization time.
pub const SCOPES: &[&str] = &[
    "openid",
    "offline_access",
    "offline",
    "read:chat",
    "write:chat",
    "read:creator",
    "read:fan",
    "read:self",
];

/// Token endpoint response.
///
/// The caller is responsible for persisting this (e.g. via synthia-db).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Unified error type for the fanvue-client crate.
#[derive(Debug, thiserror::Error)]
pub enum FanvueError {
    #[error("HTTP request failed: {0}")]
    Http(reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// The token endpoint refused the code or refresh token (400/401).
    #[error("Token rejected (status {status}): {message}")]
    TokenRejected { status: u16, message: String },

    #[error("Fanvue API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Request to Fanvue timed out")]
    Timeout,
}

impl FanvueError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, FanvueError::Api { status: 401, .. })
    }
}

impl From<reqwest::Error> for FanvueError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FanvueError::Timeout
        } else {
            FanvueError::Http(e)
        }
    }
}

pub(crate) fn build_http(timeout: std::time::Duration) -> Result<reqwest::Client, FanvueError> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}
