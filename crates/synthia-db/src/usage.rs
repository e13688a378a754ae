//! Per-user daily message counters.
//!
//! One counter per user per UTC calendar day, kept for 48 hours so that the
//! previous day is still readable around midnight.

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::{Database, DbError};

pub const MESSAGE_COUNTER_TTL_HOURS: i64 = 48;

pub fn message_counter_key(user_id: &str, day: NaiveDate) -> String {
    format!("messages:{user_id}:{}", day.format("%Y-%m-%d"))
}

impl Database {
    pub fn message_count_on(&self, user_id: &str, now: DateTime<Utc>) -> Result<i64, DbError> {
        let key = message_counter_key(user_id, now.date_naive());
        let value = self.kv_get_at(&key, now.timestamp())?;
        Ok(value.and_then(|v| v.parse().ok()).unwrap_or(0))
    }

    /// Count one message against today's quota and return the new total.
    pub fn increment_message_count(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<i64, DbError> {
        let key = message_counter_key(user_id, now.date_naive());
        let now_secs = now.timestamp();
        let expires_at = now_secs + Duration::hours(MESSAGE_COUNTER_TTL_HOURS).num_seconds();
        self.with_conn(|conn| Ok(crate::kv::incr(conn, &key, now_secs, expires_at)?))
    }

    /// Take one of today's `limit` message slots and return the new total,
    /// or `None` when the day's quota is already used up.
    pub fn reserve_message_slot(
        &self,
        user_id: &str,
        limit: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<i64>, DbError> {
        let key = message_counter_key(user_id, now.date_naive());
        let now_secs = now.timestamp();
        let expires_at = now_secs + Duration::hours(MESSAGE_COUNTER_TTL_HOURS).num_seconds();
        self.with_conn(|conn| Ok(crate::kv::incr_below(conn, &key, now_secs, expires_at, limit)?))
    }

    /// Give back a slot taken by [`Database::reserve_message_slot`].
    pub fn release_message_slot(&self, user_id: &str, now: DateTime<Utc>) -> Result<(), DbError> {
        let key = message_counter_key(user_id, now.date_naive());
        self.with_conn(|conn| Ok(crate::kv::decr(conn, &key, now.timestamp())?))
    }
}
