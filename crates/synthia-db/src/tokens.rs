//! Fanvue OAuth token storage.
//!
//! The access token expires with the provider-reported lifetime; the refresh
//! token is kept for thirty days. All four keys are written together.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::kv::{put, read_live};
use crate::{Database, DbError};

pub const ACCESS_TOKEN_KEY: &str = "fanvue:access_token";
pub const REFRESH_TOKEN_KEY: &str = "fanvue:refresh_token";
pub const TOKEN_EXPIRES_AT_KEY: &str = "fanvue:token_expires_at";
pub const LAST_REFRESH_KEY: &str = "fanvue:last_refresh";

/// Used when the token endpoint omits `expires_in`.
pub const DEFAULT_ACCESS_TOKEN_TTL_SECS: i64 = 3600;
pub const REFRESH_TOKEN_TTL_SECS: i64 = 30 * 24 * 3600;

/// Snapshot of what is currently stored, for status reporting.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredTokens {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    /// Unix seconds.
    pub expires_at: Option<i64>,
    /// RFC 3339 timestamp of the last successful refresh.
    pub last_refresh: Option<String>,
}

impl StoredTokens {
    pub fn has_access_token(&self) -> bool {
        self.access_token.is_some()
    }

    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token.is_some()
    }
}

impl Database {
    /// Persist a token grant.
    ///
    /// A missing `refresh_token` keeps the previously stored one, since
    /// providers are not required to rotate it on every refresh.
    pub fn save_provider_tokens(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
        expires_in: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let now_secs = now.timestamp();
        let ttl = expires_in
            .filter(|s| *s > 0)
            .unwrap_or(DEFAULT_ACCESS_TOKEN_TTL_SECS);

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            put(&tx, ACCESS_TOKEN_KEY, access_token, Some(now_secs + ttl))?;
            if let Some(refresh) = refresh_token {
                put(
                    &tx,
                    REFRESH_TOKEN_KEY,
                    refresh,
                    Some(now_secs + REFRESH_TOKEN_TTL_SECS),
                )?;
            }
            put(
                &tx,
                TOKEN_EXPIRES_AT_KEY,
                &(now_secs + ttl).to_string(),
                Some(now_secs + ttl),
            )?;
            put(
                &tx,
                LAST_REFRESH_KEY,
                &now.to_rfc3339(),
                Some(now_secs + REFRESH_TOKEN_TTL_SECS),
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    pub fn get_access_token(&self) -> Result<Option<String>, DbError> {
        self.kv_get(ACCESS_TOKEN_KEY)
    }

    pub fn get_refresh_token(&self) -> Result<Option<String>, DbError> {
        self.kv_get(REFRESH_TOKEN_KEY)
    }

    pub fn get_stored_tokens(&self) -> Result<StoredTokens, DbError> {
        self.get_stored_tokens_at(Utc::now().timestamp())
    }

    pub fn get_stored_tokens_at(&self, now: i64) -> Result<StoredTokens, DbError> {
        self.with_conn(|conn| {
            Ok(StoredTokens {
                access_token: read_live(conn, ACCESS_TOKEN_KEY, now)?,
                refresh_token: read_live(conn, REFRESH_TOKEN_KEY, now)?,
                expires_at: read_live(conn, TOKEN_EXPIRES_AT_KEY, now)?
                    .and_then(|v| v.parse().ok()),
                last_refresh: read_live(conn, LAST_REFRESH_KEY, now)?,
            })
        })
    }

    pub fn delete_provider_tokens(&self) -> Result<(), DbError> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM kv WHERE key IN (?1, ?2, ?3, ?4)",
                [
                    ACCESS_TOKEN_KEY,
                    REFRESH_TOKEN_KEY,
                    TOKEN_EXPIRES_AT_KEY,
                    LAST_REFRESH_KEY,
                ],
            )?;
            Ok(())
        })
    }
}
