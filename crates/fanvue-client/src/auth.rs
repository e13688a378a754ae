//! OAuth authorization-code flow for Fanvue.
//!
//! The client authenticates to the token endpoint with HTTP Basic
//! credentials (`client_secret_basic`); the PKCE verifier travels in the
//! form body.

use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::{DEFAULT_AUTH_BASE, FanvueError, SCOPES, TokenGrant, build_http};

/// OAuth error response from the token endpoint.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<String>,
    error_description: Option<String>,
}

/// Manages Fanvue OAuth.
///
/// Stateless: the caller stores the PKCE verifier between `authorize_url`
/// and `exchange_code`, and persists the returned grants.
pub struct FanvueAuth {
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    auth_base: String,
    http: reqwest::Client,
}

impl FanvueAuth {
    pub fn new(
        client_id: String,
        client_secret: String,
        redirect_uri: String,
        timeout: Duration,
    ) -> Result<Self, FanvueError> {
        Ok(Self {
            client_id,
            client_secret,
            redirect_uri,
            auth_base: DEFAULT_AUTH_BASE.to_string(),
            http: build_http(timeout)?,
        })
    }

    /// Point the client at a different authorization server.
    pub fn with_auth_base(mut self, auth_base: impl Into<String>) -> Self {
        self.auth_base = auth_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Build the authorization URL for the given state and S256 challenge.
    pub fn authorize_url(&self, state: &str, code_challenge: &str) -> Result<String, FanvueError> {
        let mut url = Url::parse(&format!("{}/oauth2/auth", self.auth_base))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &SCOPES.join(" "))
            .append_pair("state", state)
            .append_pair("code_challenge", code_challenge)
            .append_pair("code_challenge_method", "S256");
        Ok(url.to_string())
    }

    /// Exchange an authorization code for a token grant.
    pub async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<TokenGrant, FanvueError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("code_verifier", code_verifier),
        ];
        self.token_request(&params).await
    }

    /// Exchange a refresh token for a new grant.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenGrant, FanvueError> {
        tracing::info!("Refreshing Fanvue OAuth token");
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];
        self.token_request(&params).await
    }

    async fn token_request(&self, params: &[(&str, &str)]) -> Result<TokenGrant, FanvueError> {
        let resp = self
            .http
            .post(format!("{}/oauth2/token", self.auth_base))
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(params)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            let message = match serde_json::from_str::<ErrorResponse>(&body) {
                Ok(ErrorResponse {
                    error: Some(error),
                    error_description,
                }) => format!("{error}: {}", error_description.unwrap_or_default()),
                _ => body,
            };
            tracing::warn!(status = status.as_u16(), "Fanvue token endpoint returned error");
            let status = status.as_u16();
            return Err(if status == 400 || status == 401 {
                FanvueError::TokenRejected { status, message }
            } else {
                FanvueError::Api { status, message }
            });
        }

        let grant: TokenGrant = serde_json::from_str(&body)?;
        tracing::debug!(
            expires_in = ?grant.expires_in,
            rotated_refresh = grant.refresh_token.is_some(),
            "Received Fanvue token grant"
        );
        Ok(grant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth() -> FanvueAuth {
        FanvueAuth::new(
            "client-123".into(),
            "secret".into(),
            "https://synthia.example/api/fanvue/callback".into(),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_authorize_url_generation() {
        let url = auth().authorize_url("st4te", "ch4llenge").unwrap();
        let parsed = Url::parse(&url).unwrap();
        assert_eq!(parsed.host_str(), Some("auth.fanvue.com"));
        assert_eq!(parsed.path(), "/oauth2/auth");

        let q: std::collections::HashMap<_, _> = parsed.query_pairs().into_owned().collect();
        assert_eq!(q["client_id"], "client-123");
        assert_eq!(q["response_type"], "code");
        assert_eq!(q["state"], "st4te");
        assert_eq!(q["code_challenge"], "ch4llenge");
        assert_eq!(q["code_challenge_method"], "S256");
        assert_eq!(
            q["redirect_uri"],
            "https://synthia.example/api/fanvue/callback"
        );
        assert!(q["scope"].split(' ').any(|s| s == "offline_access"));
        assert!(q["scope"].split(' ').any(|s| s == "write:chat"));
    }

    #[test]
    fn test_custom_auth_base() {
        let url = auth()
            .with_auth_base("http://127.0.0.1:9999/")
            .authorize_url("s", "c")
            .unwrap();
        assert!(url.starts_with("http://127.0.0.1:9999/oauth2/auth?"));
    }

    #[test]
    fn test_grant_without_refresh_token() {
        let grant: TokenGrant =
            serde_json::from_str(r#"{"access_token":"a","token_type":"bearer"}"#).unwrap();
        assert_eq!(grant.access_token, "a");
        assert!(grant.refresh_token.is_none());
        assert!(grant.expires_in.is_none());
    }
}
