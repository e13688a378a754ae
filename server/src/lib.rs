//! Synthia service: an axum HTTP server fronting the chat, billing, voice
//! and Fanvue automation features.

pub mod app;
pub mod auth;
pub mod config;
pub mod server;
pub mod services;

use std::path::PathBuf;

use synthia_db::Database;

use config::{AppConfig, SettingsManager};

/// Determine the data directory for the application.
/// Priority: SYNTHIA_DATA_DIR env var > ~/.synthia
pub fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("SYNTHIA_DATA_DIR") {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".synthia")
}

/// Load .env from multiple candidate paths.
pub fn load_dotenv() {
    let candidates = [".env", "../.env", "../../.env"];
    for path in &candidates {
        if dotenvy::from_filename(path).is_ok() {
            tracing::info!("Loaded .env from: {path}");
            return;
        }
    }
    tracing::info!("No .env file found, using system environment variables");
}

/// Open the database, migrate settings and load the runtime config.
pub fn init_foundation() -> Result<(Database, AppConfig, PathBuf), anyhow::Error> {
    load_dotenv();

    let dir = data_dir();
    std::fs::create_dir_all(&dir)?;
    let db_path = dir.join("synthia.db");

    tracing::info!("Opening database at {}", db_path.display());
    let db = Database::open(&db_path)?;

    let sm = SettingsManager::new(db.clone());

    if let Err(e) = sm.migrate_from_env() {
        tracing::error!("Failed to migrate from env: {e}");
    }

    sm.initialize_defaults()?;

    let config = AppConfig::load(&sm)?;

    if let Ok(status) = sm.check_feature_status() {
        if !status.missing_settings.is_empty() || !status.warnings.is_empty() {
            tracing::warn!(
                "Missing settings: {:?}, warnings: {:?}",
                status.missing_settings,
                status.warnings
            );
        }
    }

    match db.kv_purge_expired() {
        Ok(n) if n > 0 => tracing::info!(purged = n, "Purged expired kv entries"),
        Ok(_) => {}
        Err(e) => tracing::error!("Failed to purge expired kv entries: {e}"),
    }

    tracing::info!("Settings loaded (port={})", config.server_port);
    Ok((db, config, dir))
}
