//! Runtime application configuration loaded from DB + environment overrides.

use std::time::Duration;

use synthia_db::users::Tier;

use super::manager::SettingsManager;

/// Runtime configuration populated from the settings DB.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server_port: u16,
    pub public_url: String,
    pub session_secret: String,
    pub http_timeout: Duration,
    pub cron_secret: String,

    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_api_base: String,

    pub fanvue_client_id: String,
    pub fanvue_client_secret: String,
    pub fanvue_webhook_secret: String,
    pub fanvue_account_handle: String,
    pub fanvue_auth_base: String,
    pub fanvue_api_base: String,

    pub stripe_secret_key: String,
    pub stripe_webhook_secret: String,
    pub stripe_api_base: String,
    pub stripe_participant_price_id: String,
    pub stripe_builder_price_id: String,
    pub stripe_sovereign_price_id: String,

    pub elevenlabs_api_key: String,
    pub elevenlabs_voice_id: String,
    pub elevenlabs_api_base: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_port: 3000,
            public_url: "http://localhost:3000".into(),
            session_secret: String::new(),
            http_timeout: Duration::from_secs(20),
            cron_secret: String::new(),
            gemini_api_key: String::new(),
            gemini_model: gemini_client::DEFAULT_MODEL.into(),
            gemini_api_base: gemini_client::DEFAULT_API_BASE.into(),
            fanvue_client_id: String::new(),
            fanvue_client_secret: String::new(),
            fanvue_webhook_secret: String::new(),
            fanvue_account_handle: "synthia_1synthia".into(),
            fanvue_auth_base: fanvue_client::DEFAULT_AUTH_BASE.into(),
            fanvue_api_base: fanvue_client::DEFAULT_API_BASE.into(),
            stripe_secret_key: String::new(),
            stripe_webhook_secret: String::new(),
            stripe_api_base: stripe_client::DEFAULT_API_BASE.into(),
            stripe_participant_price_id: String::new(),
            stripe_builder_price_id: String::new(),
            stripe_sovereign_price_id: String::new(),
            elevenlabs_api_key: String::new(),
            elevenlabs_voice_id: String::new(),
            elevenlabs_api_base: "https://api.elevenlabs.io".into(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the settings manager (DB-first, env overrides).
    pub fn load(sm: &SettingsManager) -> Result<Self, anyhow::Error> {
        let g = |key: &str| -> String { sm.get_setting(key).unwrap_or_default() };
        let defaults = Self::default();
        let or_default = |value: String, default: &str| -> String {
            if value.is_empty() { default.to_string() } else { value }
        };

        let mut server_port = parse_u16(&g("SERVER_PORT"), defaults.server_port);

        // Environment variable override (container platforms inject PORT-style vars)
        if let Ok(v) = std::env::var("SERVER_PORT") {
            if let Ok(p) = v.parse::<u16>() {
                server_port = p;
            }
        }

        let timeout_secs = parse_u64(&g("HTTP_TIMEOUT_SECS"), 20).max(1);

        Ok(Self {
            server_port,
            public_url: or_default(g("PUBLIC_URL"), &defaults.public_url)
                .trim_end_matches('/')
                .to_string(),
            session_secret: g("SESSION_SECRET"),
            http_timeout: Duration::from_secs(timeout_secs),
            cron_secret: g("CRON_SECRET"),
            gemini_api_key: g("GEMINI_API_KEY"),
            gemini_model: or_default(g("GEMINI_MODEL"), &defaults.gemini_model),
            gemini_api_base: or_default(g("GEMINI_API_BASE"), &defaults.gemini_api_base),
            fanvue_client_id: g("FANVUE_CLIENT_ID"),
            fanvue_client_secret: g("FANVUE_CLIENT_SECRET"),
            fanvue_webhook_secret: g("FANVUE_WEBHOOK_SECRET"),
            fanvue_account_handle: or_default(
                g("FANVUE_ACCOUNT_HANDLE"),
                &defaults.fanvue_account_handle,
            ),
            fanvue_auth_base: or_default(g("FANVUE_AUTH_BASE"), &defaults.fanvue_auth_base),
            fanvue_api_base: or_default(g("FANVUE_API_BASE"), &defaults.fanvue_api_base),
            stripe_secret_key: g("STRIPE_SECRET_KEY"),
            stripe_webhook_secret: g("STRIPE_WEBHOOK_SECRET"),
            stripe_api_base: or_default(g("STRIPE_API_BASE"), &defaults.stripe_api_base),
            stripe_participant_price_id: g("STRIPE_PARTICIPANT_PRICE_ID"),
            stripe_builder_price_id: g("STRIPE_BUILDER_PRICE_ID"),
            stripe_sovereign_price_id: g("STRIPE_SOVEREIGN_PRICE_ID"),
            elevenlabs_api_key: g("ELEVENLABS_API_KEY"),
            elevenlabs_voice_id: g("ELEVENLABS_VOICE_ID"),
            elevenlabs_api_base: or_default(
                g("ELEVENLABS_API_BASE"),
                &defaults.elevenlabs_api_base,
            ),
        })
    }

    /// Reload config from the settings manager.
    pub fn reload(&mut self, sm: &SettingsManager) -> Result<(), anyhow::Error> {
        *self = Self::load(sm)?;
        Ok(())
    }

    /// OAuth redirect registered with Fanvue.
    pub fn fanvue_redirect_uri(&self) -> String {
        format!("{}/api/fanvue/callback", self.public_url)
    }

    pub fn fanvue_configured(&self) -> bool {
        !self.fanvue_client_id.is_empty() && !self.fanvue_client_secret.is_empty()
    }

    /// Stripe price id for a paid tier, if configured.
    pub fn stripe_price_id(&self, tier: Tier) -> Option<&str> {
        let id = match tier {
            Tier::Observer => return None,
            Tier::Participant => &self.stripe_participant_price_id,
            Tier::Builder => &self.stripe_builder_price_id,
            Tier::Sovereign => &self.stripe_sovereign_price_id,
        };
        if id.is_empty() { None } else { Some(id) }
    }
}

fn parse_u16(s: &str, default: u16) -> u16 {
    if s.is_empty() {
        return default;
    }
    s.parse().unwrap_or(default)
}

fn parse_u64(s: &str, default: u64) -> u64 {
    if s.is_empty() {
        return default;
    }
    s.parse().unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use synthia_db::Database;

    #[test]
    fn test_load_defaults() {
        let sm = SettingsManager::new(Database::open_in_memory().unwrap());
        sm.initialize_defaults().unwrap();
        let config = AppConfig::load(&sm).unwrap();
        assert_eq!(config.http_timeout, Duration::from_secs(20));
        assert_eq!(config.fanvue_account_handle, "synthia_1synthia");
        assert_eq!(config.gemini_model, "gemini-2.0-flash");
        assert_eq!(
            config.fanvue_redirect_uri(),
            "http://localhost:3000/api/fanvue/callback"
        );
        assert!(!config.fanvue_configured());
    }

    #[test]
    fn test_public_url_trailing_slash_trimmed() {
        let sm = SettingsManager::new(Database::open_in_memory().unwrap());
        sm.set_setting("PUBLIC_URL", "https://synthia.example.com/").unwrap();
        let config = AppConfig::load(&sm).unwrap();
        assert_eq!(config.public_url, "https://synthia.example.com");
    }

    #[test]
    fn test_stripe_price_ids() {
        let sm = SettingsManager::new(Database::open_in_memory().unwrap());
        sm.set_setting("STRIPE_BUILDER_PRICE_ID", "price_builder").unwrap();
        let config = AppConfig::load(&sm).unwrap();
        assert_eq!(config.stripe_price_id(Tier::Builder), Some("price_builder"));
        assert_eq!(config.stripe_price_id(Tier::Participant), None);
        assert_eq!(config.stripe_price_id(Tier::Observer), None);
    }

    #[test]
    fn test_bad_numbers_fall_back() {
        assert_eq!(parse_u16("", 3000), 3000);
        assert_eq!(parse_u16("abc", 3000), 3000);
        assert_eq!(parse_u64("45", 20), 45);
    }
}
