//! Persistent runtime settings.
//!
//! Rows carry a `setting_type` of `secret` or `normal` so that listings can
//! mask credentials without consulting the defaults table.

use std::collections::HashMap;

use crate::{Database, DbError, OptionalExt};

pub const SETTING_TYPE_SECRET: &str = "secret";
pub const SETTING_TYPE_NORMAL: &str = "normal";

impl Database {
    pub fn get_setting(&self, key: &str) -> Result<Option<String>, DbError> {
        self.with_conn(|conn| {
            let value = conn
                .query_row("SELECT value FROM settings WHERE key = ?1", [key], |row| {
                    row.get::<_, String>(0)
                })
                .optional()?;
            Ok(value)
        })
    }

    pub fn set_setting(&self, key: &str, value: &str, secret: bool) -> Result<(), DbError> {
        let setting_type = if secret {
            SETTING_TYPE_SECRET
        } else {
            SETTING_TYPE_NORMAL
        };
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO settings (key, value, setting_type, updated_at) VALUES (?1, ?2, ?3, CURRENT_TIMESTAMP)
                 ON CONFLICT(key) DO UPDATE SET value = ?2, setting_type = ?3, updated_at = CURRENT_TIMESTAMP",
                rusqlite::params![key, value, setting_type],
            )?;
            Ok(())
        })
    }

    /// Insert only when the key is absent. Returns whether a row was written.
    pub fn insert_setting_if_missing(
        &self,
        key: &str,
        value: &str,
        secret: bool,
    ) -> Result<bool, DbError> {
        let setting_type = if secret {
            SETTING_TYPE_SECRET
        } else {
            SETTING_TYPE_NORMAL
        };
        self.with_conn(|conn| {
            let n = conn.execute(
                "INSERT OR IGNORE INTO settings (key, value, setting_type) VALUES (?1, ?2, ?3)",
                rusqlite::params![key, value, setting_type],
            )?;
            Ok(n > 0)
        })
    }

    pub fn get_all_settings(&self) -> Result<HashMap<String, String>, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT key, value FROM settings")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;
            let mut map = HashMap::new();
            for row in rows {
                let (k, v) = row?;
                map.insert(k, v);
            }
            Ok(map)
        })
    }

    pub fn delete_setting(&self, key: &str) -> Result<bool, DbError> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM settings WHERE key = ?1", [key])?;
            Ok(n > 0)
        })
    }
}
