use std::path::PathBuf;
use std::sync::Arc;

use synthia_db::Database;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use crate::config::{AppConfig, SettingsManager};

/// Application shared state handed to every axum handler.
#[derive(Clone)]
pub struct SharedState {
    inner: Arc<SharedStateInner>,
}

struct SharedStateInner {
    /// Application configuration (reloadable)
    config: RwLock<AppConfig>,
    /// Database handle
    db: Database,
    /// Data directory path
    data_dir: PathBuf,
    /// Serializes Fanvue token refreshes so concurrent 401s refresh once.
    refresh_lock: Mutex<()>,
    /// Cancelled on process shutdown.
    shutdown_token: CancellationToken,
}

impl SharedState {
    /// Create shared state from an already-opened database and loaded config.
    pub fn new(db: Database, config: AppConfig, data_dir: PathBuf) -> Self {
        Self {
            inner: Arc::new(SharedStateInner {
                config: RwLock::new(config),
                db,
                data_dir,
                refresh_lock: Mutex::new(()),
                shutdown_token: CancellationToken::new(),
            }),
        }
    }

    pub fn server_port(&self) -> u16 {
        self.inner
            .config
            .try_read()
            .map(|c| c.server_port)
            .unwrap_or(3000)
    }

    pub fn db(&self) -> &Database {
        &self.inner.db
    }

    pub fn data_dir(&self) -> &PathBuf {
        &self.inner.data_dir
    }

    pub fn refresh_lock(&self) -> &Mutex<()> {
        &self.inner.refresh_lock
    }

    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.inner.shutdown_token
    }

    /// Get a read lock on the current config.
    pub async fn config(&self) -> tokio::sync::RwLockReadGuard<'_, AppConfig> {
        self.inner.config.read().await
    }

    /// Clone of the current config, for handlers that hold it across awaits.
    pub async fn config_snapshot(&self) -> AppConfig {
        self.inner.config.read().await.clone()
    }

    /// Reload config from the database.
    pub async fn reload_config(&self) -> Result<(), anyhow::Error> {
        let sm = SettingsManager::new(self.inner.db.clone());
        let mut config = self.inner.config.write().await;
        config.reload(&sm)?;
        Ok(())
    }
}
