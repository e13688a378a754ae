//! Minimal Stripe REST client: customers, subscription checkout sessions,
//! subscription retrieval, and webhook verification.

pub mod models;
pub mod webhook;

use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;

pub use models::{CheckoutParams, CheckoutSession, Customer, Invoice, Subscription};

pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";

#[derive(Debug, thiserror::Error)]
pub enum StripeError {
    #[error("HTTP request failed: {0}")]
    Http(reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Stripe API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid webhook signature: {0}")]
    InvalidSignature(&'static str),

    #[error("Request to Stripe timed out")]
    Timeout,
}

impl From<reqwest::Error> for StripeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            StripeError::Timeout
        } else {
            StripeError::Http(e)
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
    api_base: String,
}

impl StripeClient {
    pub fn new(secret_key: String, timeout: Duration) -> Result<Self, StripeError> {
        Ok(Self {
            http: reqwest::Client::builder().timeout(timeout).build()?,
            secret_key,
            api_base: DEFAULT_API_BASE.to_string(),
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// POST /v1/customers
    pub async fn create_customer(
        &self,
        email: &str,
        name: Option<&str>,
        user_id: &str,
    ) -> Result<Customer, StripeError> {
        let mut form = vec![
            ("email".to_string(), email.to_string()),
            ("metadata[userId]".to_string(), user_id.to_string()),
        ];
        if let Some(name) = name {
            form.push(("name".to_string(), name.to_string()));
        }
        self.post_form("/v1/customers", &form).await
    }

    /// POST /v1/checkout/sessions
    pub async fn create_checkout_session(
        &self,
        params: &CheckoutParams,
    ) -> Result<CheckoutSession, StripeError> {
        self.post_form("/v1/checkout/sessions", &params.to_form())
            .await
    }

    /// GET /v1/subscriptions/{id}
    pub async fn retrieve_subscription(&self, id: &str) -> Result<Subscription, StripeError> {
        let resp = self
            .http
            .get(format!("{}/v1/subscriptions/{id}", self.api_base))
            .bearer_auth(&self.secret_key)
            .send()
            .await?;
        read_json(resp).await
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &[(String, String)],
    ) -> Result<T, StripeError> {
        let resp = self
            .http
            .post(format!("{}{path}", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(form)
            .send()
            .await?;
        read_json(resp).await
    }
}

async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, StripeError> {
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        let message = serde_json::from_str::<ErrorEnvelope>(&body)
            .ok()
            .and_then(|e| e.error.message)
            .unwrap_or(body);
        tracing::warn!(status = status.as_u16(), "Stripe request failed");
        return Err(StripeError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(serde_json::from_str(&body)?)
}
