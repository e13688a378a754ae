use reqwest::header::{HeaderMap, HeaderValue};
use serde::Serialize;

use super::*;
use crate::API_VERSION;

impl FanvueApiClient {
    fn version_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("X-Fanvue-API-Version", HeaderValue::from_static(API_VERSION));
        headers
    }

    /// Execute a GET request with auth headers.
    pub(super) async fn authenticated_get(
        &self,
        url: &str,
        access_token: &str,
    ) -> Result<String, FanvueError> {
        let resp = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .headers(Self::version_headers())
            .send()
            .await?;
        read_response(url, resp).await
    }

    /// Execute a POST request with auth headers and JSON body.
    pub(super) async fn authenticated_post(
        &self,
        url: &str,
        access_token: &str,
        body: &impl Serialize,
    ) -> Result<String, FanvueError> {
        let resp = self
            .http
            .post(url)
            .bearer_auth(access_token)
            .headers(Self::version_headers())
            .json(body)
            .send()
            .await?;
        read_response(url, resp).await
    }
}

async fn read_response(url: &str, resp: reqwest::Response) -> Result<String, FanvueError> {
    let status = resp.status();
    let body = resp.text().await?;

    if status == reqwest::StatusCode::UNAUTHORIZED {
        tracing::warn!(url, "Got 401, caller should refresh token and retry");
    }

    if !status.is_success() {
        return Err(FanvueError::Api {
            status: status.as_u16(),
            message: body,
        });
    }

    Ok(body)
}
