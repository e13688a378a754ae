//! Database schema definitions and migrations.

use rusqlite::Connection;

use crate::DbError;

pub fn run_migrations(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(SCHEMA)?;
    migrate_legacy_tier_names(conn)?;
    Ok(())
}

/// Tier names from the first pricing revision, mapped to the canonical set.
const LEGACY_TIER_NAMES: &[(&str, &str)] = &[
    ("free", "observer"),
    ("essentials", "participant"),
    ("premium", "builder"),
    ("vip", "sovereign"),
];

/// users.tier: rewrite legacy names in place so only canonical names remain.
fn migrate_legacy_tier_names(conn: &Connection) -> Result<(), DbError> {
    let mut migrated = 0usize;
    for (legacy, canonical) in LEGACY_TIER_NAMES {
        migrated += conn.execute(
            "UPDATE users SET tier = ?2 WHERE tier = ?1",
            rusqlite::params![legacy, canonical],
        )?;
    }
    if migrated > 0 {
        tracing::info!(migrated, "Migrated users from legacy tier names");
    }
    Ok(())
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    expires_at INTEGER
);

CREATE INDEX IF NOT EXISTS idx_kv_expires_at ON kv(expires_at);

CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    setting_type TEXT NOT NULL DEFAULT 'normal',
    updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    name TEXT,
    tier TEXT NOT NULL DEFAULT 'observer',
    stripe_customer_id TEXT,
    stripe_subscription_id TEXT,
    subscription_ends_at INTEGER,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS content_items (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    text TEXT NOT NULL,
    media_urls TEXT NOT NULL DEFAULT '[]',
    is_ppv BOOLEAN NOT NULL DEFAULT false,
    price REAL,
    scheduled_for INTEGER,
    platform TEXT NOT NULL DEFAULT 'fanvue',
    status TEXT NOT NULL DEFAULT 'queued',
    created_at INTEGER NOT NULL,
    posted_at INTEGER,
    error TEXT
);

CREATE INDEX IF NOT EXISTS idx_content_items_status_seq ON content_items(status, seq);

CREATE TABLE IF NOT EXISTS content_posted (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    item_id TEXT NOT NULL,
    item_json TEXT NOT NULL,
    posted_at INTEGER NOT NULL
);
"#;
