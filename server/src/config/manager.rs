//! SettingsManager: DB-backed settings with defaults, migration, and feature status.

use std::collections::HashMap;

use synthia_db::Database;

use super::defaults::DEFAULT_SETTINGS;
use super::validation::validate_setting;
use super::{FeatureStatus, SettingInfo, SettingType};

/// Wraps [`Database`] to provide high-level settings operations.
pub struct SettingsManager {
    db: Database,
}

impl SettingsManager {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Get a setting value. Falls back to default if not in DB.
    pub fn get_setting(&self, key: &str) -> Result<String, anyhow::Error> {
        if let Some(val) = self.db.get_setting(key)? {
            return Ok(val);
        }
        if let Some(def) = DEFAULT_SETTINGS.get(key) {
            return Ok(def.default.to_string());
        }
        anyhow::bail!("setting not found: {key}");
    }

    /// Check that `key` is known and `value` passes its validation.
    pub fn check_setting(&self, key: &str, value: &str) -> Result<(), anyhow::Error> {
        if !DEFAULT_SETTINGS.contains_key(key) {
            anyhow::bail!("unknown setting key: {key}");
        }
        validate_setting(key, value)
            .map_err(|e| anyhow::anyhow!("validation error for {key}: {e}"))
    }

    /// Set a setting value with validation.
    pub fn set_setting(&self, key: &str, value: &str) -> Result<(), anyhow::Error> {
        self.check_setting(key, value)?;
        let secret = DEFAULT_SETTINGS.get(key).is_some_and(|def| def.secret);
        self.db.set_setting(key, value, secret)?;
        Ok(())
    }

    /// Get all settings, filling in defaults for missing keys. Unknown keys
    /// stored in the DB are ignored.
    pub fn get_all_settings(&self) -> Result<HashMap<String, SettingInfo>, anyhow::Error> {
        let stored = self.db.get_all_settings()?;
        let result = DEFAULT_SETTINGS
            .values()
            .map(|def| {
                let value = stored
                    .get(def.key)
                    .cloned()
                    .unwrap_or_else(|| def.default.to_string());
                let info = SettingInfo {
                    key: def.key.to_string(),
                    has_value: !value.is_empty(),
                    value,
                    setting_type: if def.secret {
                        SettingType::Secret
                    } else {
                        SettingType::Normal
                    },
                    required: def.required,
                    description: def.description.to_string(),
                };
                (def.key.to_string(), info)
            })
            .collect();
        Ok(result)
    }

    /// Initialize default settings in DB (skip existing).
    pub fn initialize_defaults(&self) -> Result<(), anyhow::Error> {
        for def in DEFAULT_SETTINGS.values() {
            self.db
                .insert_setting_if_missing(def.key, def.default, def.secret)?;
        }
        Ok(())
    }

    /// Migrate settings from environment variables to DB (one-time).
    ///
    /// Values that fail validation are skipped with a warning rather than
    /// aborting startup.
    pub fn migrate_from_env(&self) -> Result<u32, anyhow::Error> {
        let mut migrated = 0u32;
        for def in DEFAULT_SETTINGS.values() {
            if self.db.get_setting(def.key)?.is_some() {
                continue;
            }
            let Ok(env_val) = std::env::var(def.key) else {
                continue;
            };
            if env_val.is_empty() {
                continue;
            }
            if let Err(e) = validate_setting(def.key, &env_val) {
                tracing::warn!("Ignoring env value for {}: {e}", def.key);
                continue;
            }
            self.db.set_setting(def.key, &env_val, def.secret)?;
            tracing::info!("Migrated setting from env: {}", def.key);
            migrated += 1;
        }
        if migrated > 0 {
            tracing::info!("Migration completed: {migrated} settings migrated");
            if has_secret_in_env() {
                tracing::warn!(
                    "SECURITY WARNING: Sensitive data in env vars. \
                     Remove from .env after confirming migration."
                );
            }
        }
        Ok(migrated)
    }

    /// Check which features are properly configured.
    pub fn check_feature_status(&self) -> Result<FeatureStatus, anyhow::Error> {
        let mut status = FeatureStatus::default();
        let mut group = |keys: &[&str]| -> bool {
            let mut ok = true;
            for key in keys {
                if self.get_setting(key).unwrap_or_default().is_empty() {
                    status.missing_settings.push(key.to_string());
                    ok = false;
                }
            }
            ok
        };

        let session = group(&["SESSION_SECRET"]);
        let gemini = group(&["GEMINI_API_KEY"]);
        let fanvue = group(&["FANVUE_CLIENT_ID", "FANVUE_CLIENT_SECRET"]);
        let stripe = group(&["STRIPE_SECRET_KEY", "STRIPE_WEBHOOK_SECRET"]);
        let voice = group(&["ELEVENLABS_API_KEY", "ELEVENLABS_VOICE_ID"]);

        status.session_configured = session;
        status.gemini_configured = gemini;
        status.fanvue_configured = fanvue;
        status.stripe_configured = stripe;
        status.voice_configured = voice;

        if fanvue && self.get_setting("FANVUE_WEBHOOK_SECRET")?.is_empty() {
            status
                .warnings
                .push("FANVUE_WEBHOOK_SECRET is empty - inbound webhooks will be rejected".into());
        }
        if self.get_setting("CRON_SECRET")?.is_empty() {
            status
                .warnings
                .push("CRON_SECRET is empty - cron endpoints are unauthenticated".into());
        }
        if stripe {
            let priced = [
                "STRIPE_PARTICIPANT_PRICE_ID",
                "STRIPE_BUILDER_PRICE_ID",
                "STRIPE_SOVEREIGN_PRICE_ID",
            ]
            .iter()
            .filter(|k| !self.get_setting(k).unwrap_or_default().is_empty())
            .count();
            if priced == 0 {
                status
                    .warnings
                    .push("No Stripe price ids configured - checkout is unavailable".into());
            }
        }

        Ok(status)
    }

    pub fn db(&self) -> &Database {
        &self.db
    }
}

fn has_secret_in_env() -> bool {
    DEFAULT_SETTINGS
        .values()
        .filter(|def| def.secret)
        .any(|def| std::env::var(def.key).is_ok_and(|v| !v.is_empty()))
}
