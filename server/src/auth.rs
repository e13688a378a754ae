//! End-user sessions.
//!
//! Users arrive with an HS256 bearer token minted by the identity provider
//! using the shared `SESSION_SECRET`. The service only verifies it.

use axum::Json;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode, header};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use synthia_db::users::User;
use synthia_db::{Database, DbError};

use crate::app::SharedState;
use crate::server::api::err_json;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User email.
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub exp: i64,
}

pub fn issue_session_token(
    secret: &str,
    email: &str,
    name: Option<&str>,
    ttl: Duration,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = SessionClaims {
        sub: email.to_string(),
        name: name.map(str::to_string),
        exp: (Utc::now() + ttl).timestamp(),
    };
    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn verify_session_token(
    secret: &str,
    token: &str,
) -> Result<SessionClaims, jsonwebtoken::errors::Error> {
    let data = jsonwebtoken::decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

/// `Authorization: Bearer <token>` value, if present.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// An authenticated end user. Extracting it rejects the request with 401
/// when the session token is missing or invalid.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub email: String,
    pub name: Option<String>,
}

impl AuthUser {
    /// The user record for this session, created on first sight.
    pub fn resolve_or_create(&self, db: &Database, now: DateTime<Utc>) -> Result<User, DbError> {
        db.get_or_create_user(&self.email, self.name.as_deref(), now)
    }
}

impl FromRequestParts<SharedState> for AuthUser {
    type Rejection = (StatusCode, Json<Value>);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let secret = state.config().await.session_secret.clone();
        if secret.is_empty() {
            tracing::warn!("SESSION_SECRET is not set, rejecting authenticated request");
            return Err(err_json(401, "Unauthorized"));
        }
        let token = bearer_token(&parts.headers).ok_or_else(|| err_json(401, "Unauthorized"))?;
        let claims = verify_session_token(&secret, token).map_err(|e| {
            tracing::debug!("Session token rejected: {e}");
            err_json(401, "Unauthorized")
        })?;
        if claims.sub.trim().is_empty() {
            return Err(err_json(401, "Unauthorized"));
        }
        Ok(AuthUser {
            email: claims.sub,
            name: claims.name,
        })
    }
}
