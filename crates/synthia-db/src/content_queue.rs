//! Scheduled content posting queue.
//!
//! Items keep their insertion order through the `seq` column. Status moves
//! only out of `queued`, and each transition is a conditional update, so two
//! concurrent processors can never both post the same item. Posted items are
//! also copied into a bounded history.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{Database, DbError, OptionalExt};

/// Most recent posted items retained in history.
pub const POSTED_HISTORY_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentStatus {
    Queued,
    Posted,
    Failed,
}

impl ContentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentStatus::Queued => "queued",
            ContentStatus::Posted => "posted",
            ContentStatus::Failed => "failed",
        }
    }
}

impl FromStr for ContentStatus {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(ContentStatus::Queued),
            "posted" => Ok(ContentStatus::Posted),
            "failed" => Ok(ContentStatus::Failed),
            other => Err(DbError::InvalidData(format!("unknown content status: {other}"))),
        }
    }
}

/// Where an item should be published.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Fanvue,
    Dfans,
    Both,
}

impl Platform {
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Fanvue => "fanvue",
            Platform::Dfans => "dfans",
            Platform::Both => "both",
        }
    }

    pub fn includes_fanvue(self) -> bool {
        matches!(self, Platform::Fanvue | Platform::Both)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fanvue" => Ok(Platform::Fanvue),
            "dfans" => Ok(Platform::Dfans),
            "both" => Ok(Platform::Both),
            other => Err(DbError::InvalidData(format!("unknown platform: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub media_urls: Vec<String>,
    #[serde(rename = "isPPV", default)]
    pub is_ppv: bool,
    pub price: Option<f64>,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub platform: Platform,
    pub status: ContentStatus,
    pub created_at: DateTime<Utc>,
    pub posted_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

/// Fields supplied by the caller when enqueueing.
#[derive(Debug, Clone, Default)]
pub struct NewContent {
    pub text: String,
    pub media_urls: Vec<String>,
    pub is_ppv: bool,
    pub price: Option<f64>,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub platform: Platform,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    pub queued: usize,
    /// Size of the posted history.
    pub posted: usize,
    pub failed: usize,
    /// Earliest future schedule among queued items.
    pub next_scheduled: Option<DateTime<Utc>>,
}

/// `content_<unix millis>_<9 random chars>`
pub fn new_content_id(now: DateTime<Utc>) -> String {
    format!(
        "content_{}_{}",
        now.timestamp_millis(),
        nanoid::nanoid!(9, &nanoid::alphabet::SAFE)
    )
}

const ITEM_COLUMNS: &str =
    "id, text, media_urls, is_ppv, price, scheduled_for, platform, status, created_at, posted_at, error";

fn conversion_err(idx: usize, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, msg.into())
}

fn millis_to_datetime(idx: usize, ms: i64) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::from_timestamp_millis(ms).ok_or_else(|| conversion_err(idx, format!("bad timestamp {ms}")))
}

fn row_to_item(row: &Row<'_>) -> Result<ContentItem, rusqlite::Error> {
    let media: String = row.get(2)?;
    let media_urls =
        serde_json::from_str(&media).map_err(|e| conversion_err(2, e.to_string()))?;
    let platform: String = row.get(6)?;
    let status: String = row.get(7)?;
    Ok(ContentItem {
        id: row.get(0)?,
        text: row.get(1)?,
        media_urls,
        is_ppv: row.get(3)?,
        price: row.get(4)?,
        scheduled_for: row
            .get::<_, Option<i64>>(5)?
            .map(|ms| millis_to_datetime(5, ms))
            .transpose()?,
        platform: platform.parse().map_err(|e: DbError| conversion_err(6, e.to_string()))?,
        status: status.parse().map_err(|e: DbError| conversion_err(7, e.to_string()))?,
        created_at: millis_to_datetime(8, row.get(8)?)?,
        posted_at: row
            .get::<_, Option<i64>>(9)?
            .map(|ms| millis_to_datetime(9, ms))
            .transpose()?,
        error: row.get(10)?,
    })
}

fn load_item(conn: &Connection, id: &str) -> Result<Option<ContentItem>, rusqlite::Error> {
    let sql = format!("SELECT {ITEM_COLUMNS} FROM content_items WHERE id = ?1");
    conn.query_row(&sql, [id], row_to_item).optional()
}

impl Database {
    pub fn enqueue_content(
        &self,
        new: &NewContent,
        now: DateTime<Utc>,
    ) -> Result<ContentItem, DbError> {
        if new.text.trim().is_empty() {
            return Err(DbError::InvalidData("content text must not be empty".into()));
        }
        let item = ContentItem {
            id: new_content_id(now),
            text: new.text.clone(),
            media_urls: new.media_urls.clone(),
            is_ppv: new.is_ppv,
            price: new.price,
            scheduled_for: new.scheduled_for,
            platform: new.platform,
            status: ContentStatus::Queued,
            created_at: now,
            posted_at: None,
            error: None,
        };
        let media = serde_json::to_string(&item.media_urls)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO content_items
                     (id, text, media_urls, is_ppv, price, scheduled_for, platform, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'queued', ?8)",
                rusqlite::params![
                    item.id,
                    item.text,
                    media,
                    item.is_ppv,
                    item.price,
                    item.scheduled_for.map(|t| t.timestamp_millis()),
                    item.platform.as_str(),
                    item.created_at.timestamp_millis(),
                ],
            )?;
            Ok(())
        })?;
        tracing::debug!(id = %item.id, platform = %item.platform, "Enqueued content");
        Ok(item)
    }

    pub fn get_content(&self, id: &str) -> Result<Option<ContentItem>, DbError> {
        self.with_conn(|conn| Ok(load_item(conn, id)?))
    }

    /// All items in insertion order.
    pub fn list_content(&self) -> Result<Vec<ContentItem>, DbError> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {ITEM_COLUMNS} FROM content_items ORDER BY seq");
            let mut stmt = conn.prepare(&sql)?;
            let items = stmt
                .query_map([], row_to_item)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(items)
        })
    }

    /// The oldest queued item that is due at `now`.
    pub fn next_due_content(&self, now: DateTime<Utc>) -> Result<Option<ContentItem>, DbError> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {ITEM_COLUMNS} FROM content_items
                 WHERE status = 'queued' AND (scheduled_for IS NULL OR scheduled_for <= ?1)
                 ORDER BY seq LIMIT 1"
            );
            let item = conn
                .query_row(&sql, [now.timestamp_millis()], row_to_item)
                .optional()?;
            Ok(item)
        })
    }

    /// Transition a queued item to posted and append it to the history.
    ///
    /// Returns `false` when the item is not (or no longer) queued, in which
    /// case nothing is written.
    pub fn mark_content_posted(&self, id: &str, now: DateTime<Utc>) -> Result<bool, DbError> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let changed = tx.execute(
                "UPDATE content_items SET status = 'posted', posted_at = ?2, error = NULL
                 WHERE id = ?1 AND status = 'queued'",
                rusqlite::params![id, now.timestamp_millis()],
            )?;
            if changed == 0 {
                return Ok(false);
            }
            let item = load_item(&tx, id)?
                .ok_or_else(|| DbError::NotFound(format!("content item {id}")))?;
            tx.execute(
                "INSERT INTO content_posted (item_id, item_json, posted_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![id, serde_json::to_string(&item)?, now.timestamp_millis()],
            )?;
            tx.execute(
                "DELETE FROM content_posted WHERE seq NOT IN
                     (SELECT seq FROM content_posted ORDER BY seq DESC LIMIT ?1)",
                [POSTED_HISTORY_LIMIT as i64],
            )?;
            tx.commit()?;
            Ok(true)
        })
    }

    /// Transition a queued item to failed with the given reason.
    pub fn mark_content_failed(&self, id: &str, reason: &str) -> Result<bool, DbError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE content_items SET status = 'failed', error = ?2
                 WHERE id = ?1 AND status = 'queued'",
                rusqlite::params![id, reason],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn remove_content(&self, id: &str) -> Result<bool, DbError> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM content_items WHERE id = ?1", [id])?;
            Ok(n > 0)
        })
    }

    /// Delete every queued item. Posted and failed rows are kept.
    pub fn clear_queued_content(&self) -> Result<usize, DbError> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM content_items WHERE status = 'queued'", [])?;
            Ok(n)
        })
    }

    /// Posted history, oldest first.
    pub fn posted_history(&self) -> Result<Vec<ContentItem>, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT item_json FROM content_posted ORDER BY seq")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            let mut items = Vec::new();
            for json in rows {
                items.push(serde_json::from_str(&json?)?);
            }
            Ok(items)
        })
    }

    pub fn queue_stats(&self, now: DateTime<Utc>) -> Result<QueueStats, DbError> {
        self.with_conn(|conn| {
            let count_status = |status: ContentStatus| -> Result<usize, rusqlite::Error> {
                conn.query_row(
                    "SELECT COUNT(*) FROM content_items WHERE status = ?1",
                    [status.as_str()],
                    |row| row.get::<_, i64>(0),
                )
                .map(|n| n as usize)
            };
            let posted: i64 =
                conn.query_row("SELECT COUNT(*) FROM content_posted", [], |row| row.get(0))?;
            let next: Option<i64> = conn.query_row(
                "SELECT MIN(scheduled_for) FROM content_items
                 WHERE status = 'queued' AND scheduled_for > ?1",
                [now.timestamp_millis()],
                |row| row.get(0),
            )?;
            Ok(QueueStats {
                queued: count_status(ContentStatus::Queued)?,
                posted: posted as usize,
                failed: count_status(ContentStatus::Failed)?,
                next_scheduled: next.and_then(DateTime::from_timestamp_millis),
            })
        })
    }
}
