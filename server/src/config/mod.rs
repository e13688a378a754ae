//! Configuration management: defaults, validation, loading from DB + environment.

pub mod app_config;
pub mod defaults;
pub mod manager;
pub mod validation;

pub use app_config::AppConfig;
pub use manager::SettingsManager;

use serde::{Deserialize, Serialize};

/// Setting type: normal or secret (masked in logs and status output).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingType {
    Normal,
    Secret,
}

/// A setting together with its definition metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingInfo {
    pub key: String,
    pub value: String,
    #[serde(rename = "type")]
    pub setting_type: SettingType,
    pub required: bool,
    pub description: String,
    pub has_value: bool,
}

/// Feature availability status.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureStatus {
    pub session_configured: bool,
    pub gemini_configured: bool,
    pub fanvue_configured: bool,
    pub stripe_configured: bool,
    pub voice_configured: bool,
    pub missing_settings: Vec<String>,
    pub warnings: Vec<String>,
}
