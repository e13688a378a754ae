//! Key-value entries with optional expiry.
//!
//! Expired rows are invisible to every read and are physically removed by
//! [`Database::kv_purge_expired`] or when overwritten.

use chrono::{Duration, Utc};
use rusqlite::Connection;

use crate::{Database, DbError, OptionalExt};

impl Database {
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, DbError> {
        self.kv_get_at(key, Utc::now().timestamp())
    }

    /// Read `key` as seen at unix time `now`.
    pub fn kv_get_at(&self, key: &str, now: i64) -> Result<Option<String>, DbError> {
        self.with_conn(|conn| Ok(read_live(conn, key, now)?))
    }

    /// Store a value that never expires.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), DbError> {
        self.with_conn(|conn| {
            put(conn, key, value, None)?;
            Ok(())
        })
    }

    pub fn kv_set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DbError> {
        let expires_at = Utc::now().timestamp() + ttl.num_seconds();
        self.with_conn(|conn| {
            put(conn, key, value, Some(expires_at))?;
            Ok(())
        })
    }

    /// Read and delete `key` in one transaction. A key can be taken once.
    pub fn kv_take(&self, key: &str) -> Result<Option<String>, DbError> {
        self.kv_take_at(key, Utc::now().timestamp())
    }

    pub fn kv_take_at(&self, key: &str, now: i64) -> Result<Option<String>, DbError> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let value = read_live(&tx, key, now)?;
            tx.execute("DELETE FROM kv WHERE key = ?1", [key])?;
            tx.commit()?;
            Ok(value)
        })
    }

    pub fn kv_delete(&self, key: &str) -> Result<bool, DbError> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM kv WHERE key = ?1", [key])?;
            Ok(n > 0)
        })
    }

    /// Atomically increment an integer counter and push its expiry to
    /// `now + ttl`. An expired counter restarts at 1.
    pub fn kv_incr_with_ttl(&self, key: &str, ttl: Duration) -> Result<i64, DbError> {
        let now = Utc::now().timestamp();
        self.with_conn(|conn| Ok(incr(conn, key, now, now + ttl.num_seconds())?))
    }

    /// Delete every expired row. Returns how many were removed.
    pub fn kv_purge_expired(&self) -> Result<usize, DbError> {
        let now = Utc::now().timestamp();
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM kv WHERE expires_at IS NOT NULL AND expires_at <= ?1",
                [now],
            )?;
            if removed > 0 {
                tracing::debug!(removed, "Purged expired kv entries");
            }
            Ok(removed)
        })
    }
}

pub(crate) fn read_live(
    conn: &Connection,
    key: &str,
    now: i64,
) -> Result<Option<String>, rusqlite::Error> {
    conn.query_row(
        "SELECT value FROM kv WHERE key = ?1 AND (expires_at IS NULL OR expires_at > ?2)",
        rusqlite::params![key, now],
        |row| row.get(0),
    )
    .optional()
}

pub(crate) fn put(
    conn: &Connection,
    key: &str,
    value: &str,
    expires_at: Option<i64>,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO kv (key, value, expires_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET value = ?2, expires_at = ?3",
        rusqlite::params![key, value, expires_at],
    )?;
    Ok(())
}

pub(crate) fn incr(
    conn: &Connection,
    key: &str,
    now: i64,
    expires_at: i64,
) -> Result<i64, rusqlite::Error> {
    conn.query_row(
        "INSERT INTO kv (key, value, expires_at) VALUES (?1, '1', ?3)
         ON CONFLICT(key) DO UPDATE SET
             value = CASE
                 WHEN kv.expires_at IS NOT NULL AND kv.expires_at <= ?2 THEN '1'
                 ELSE CAST(CAST(kv.value AS INTEGER) + 1 AS TEXT)
             END,
             expires_at = ?3
         RETURNING CAST(value AS INTEGER)",
        rusqlite::params![key, now, expires_at],
        |row| row.get(0),
    )
}

/// Increment the counter only while it is below `limit`. Returns `None`
/// when the counter is already at the limit. An expired counter restarts at 1.
pub(crate) fn incr_below(
    conn: &Connection,
    key: &str,
    now: i64,
    expires_at: i64,
    limit: i64,
) -> Result<Option<i64>, rusqlite::Error> {
    if limit <= 0 {
        return Ok(None);
    }
    conn.query_row(
        "INSERT INTO kv (key, value, expires_at) VALUES (?1, '1', ?3)
         ON CONFLICT(key) DO UPDATE SET
             value = CASE
                 WHEN kv.expires_at IS NOT NULL AND kv.expires_at <= ?2 THEN '1'
                 ELSE CAST(CAST(kv.value AS INTEGER) + 1 AS TEXT)
             END,
             expires_at = ?3
         WHERE (kv.expires_at IS NOT NULL AND kv.expires_at <= ?2)
            OR CAST(kv.value AS INTEGER) < ?4
         RETURNING CAST(value AS INTEGER)",
        rusqlite::params![key, now, expires_at, limit],
        |row| row.get(0),
    )
    .optional()
}

/// Decrement a live counter, never below zero.
pub(crate) fn decr(conn: &Connection, key: &str, now: i64) -> Result<(), rusqlite::Error> {
    conn.execute(
        "UPDATE kv SET value = CAST(MAX(CAST(value AS INTEGER) - 1, 0) AS TEXT)
         WHERE key = ?1 AND (expires_at IS NULL OR expires_at > ?2)",
        rusqlite::params![key, now],
    )?;
    Ok(())
}
