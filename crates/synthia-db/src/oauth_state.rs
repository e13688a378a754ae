//! Server-side PKCE records keyed by the OAuth `state` parameter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::kv::put;
use crate::{Database, DbError};

pub const OAUTH_STATE_TTL_SECS: i64 = 600;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PkceRecord {
    pub code_verifier: String,
    /// Unix milliseconds.
    pub created_at: i64,
}

fn state_key(state: &str) -> String {
    format!("oauth:{state}")
}

impl Database {
    pub fn save_oauth_state(
        &self,
        state: &str,
        code_verifier: &str,
        now: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let record = PkceRecord {
            code_verifier: code_verifier.to_string(),
            created_at: now.timestamp_millis(),
        };
        let json = serde_json::to_string(&record)?;
        let expires_at = now.timestamp() + OAUTH_STATE_TTL_SECS;
        self.with_conn(|conn| {
            put(conn, &state_key(state), &json, Some(expires_at))?;
            Ok(())
        })
    }

    /// Consume the record for `state`. A second call returns `None`.
    pub fn take_oauth_state(&self, state: &str) -> Result<Option<PkceRecord>, DbError> {
        self.take_oauth_state_at(state, Utc::now().timestamp())
    }

    pub fn take_oauth_state_at(
        &self,
        state: &str,
        now: i64,
    ) -> Result<Option<PkceRecord>, DbError> {
        match self.kv_take_at(&state_key(state), now)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}
