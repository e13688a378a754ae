//! All setting definitions with their default values.

use std::collections::HashMap;
use std::sync::LazyLock;

/// (key, default, secret, required, description)
type DefTuple = (&'static str, &'static str, bool, bool, &'static str);

const DEFS: &[DefTuple] = &[
    ("SERVER_PORT", "3000", false, false, "HTTP listen port"),
    ("PUBLIC_URL", "http://localhost:3000", false, true, "Externally reachable base URL, used for OAuth and checkout redirects"),
    ("SESSION_SECRET", "", true, true, "HS256 key used to verify user session tokens"),
    ("HTTP_TIMEOUT_SECS", "20", false, false, "Timeout for every outbound provider request"),
    ("CRON_SECRET", "", true, false, "Bearer token required by the cron endpoints when set"),
    // LLM
    ("GEMINI_API_KEY", "", true, true, "Gemini API key"),
    ("GEMINI_MODEL", "gemini-2.0-flash", false, false, "Gemini model name"),
    ("GEMINI_API_BASE", "https://generativelanguage.googleapis.com", false, false, "Gemini API base URL"),
    // Fanvue
    ("FANVUE_CLIENT_ID", "", false, false, "Fanvue OAuth client id"),
    ("FANVUE_CLIENT_SECRET", "", true, false, "Fanvue OAuth client secret"),
    ("FANVUE_WEBHOOK_SECRET", "", true, false, "Shared secret for Fanvue webhook signatures"),
    ("FANVUE_ACCOUNT_HANDLE", "synthia_1synthia", false, false, "Creator handle; messages from it are never answered"),
    ("FANVUE_AUTH_BASE", "https://auth.fanvue.com", false, false, "Fanvue authorization server base URL"),
    ("FANVUE_API_BASE", "https://api.fanvue.com", false, false, "Fanvue REST API base URL"),
    // Stripe
    ("STRIPE_SECRET_KEY", "", true, false, "Stripe secret API key"),
    ("STRIPE_WEBHOOK_SECRET", "", true, false, "Stripe webhook signing secret"),
    ("STRIPE_API_BASE", "https://api.stripe.com", false, false, "Stripe API base URL"),
    ("STRIPE_PARTICIPANT_PRICE_ID", "", false, false, "Stripe price id of the participant tier"),
    ("STRIPE_BUILDER_PRICE_ID", "", false, false, "Stripe price id of the builder tier"),
    ("STRIPE_SOVEREIGN_PRICE_ID", "", false, false, "Stripe price id of the sovereign tier"),
    // Voice
    ("ELEVENLABS_API_KEY", "", true, false, "ElevenLabs API key"),
    ("ELEVENLABS_VOICE_ID", "", false, false, "ElevenLabs voice id"),
    ("ELEVENLABS_API_BASE", "https://api.elevenlabs.io", false, false, "ElevenLabs API base URL"),
];

/// A single setting definition.
#[derive(Debug, Clone)]
pub struct SettingDef {
    pub key: &'static str,
    pub default: &'static str,
    pub secret: bool,
    pub required: bool,
    pub description: &'static str,
}

/// Global setting definitions indexed by key.
pub static DEFAULT_SETTINGS: LazyLock<HashMap<&'static str, SettingDef>> = LazyLock::new(|| {
    DEFS.iter()
        .map(|&(key, default, secret, required, description)| {
            (
                key,
                SettingDef {
                    key,
                    default,
                    secret,
                    required,
                    description,
                },
            )
        })
        .collect()
});

/// Get the default value for a setting key, or `None` if not defined.
pub fn get_default(key: &str) -> Option<&'static str> {
    DEFAULT_SETTINGS.get(key).map(|d| d.default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_unique() {
        assert_eq!(DEFAULT_SETTINGS.len(), DEFS.len());
    }

    #[test]
    fn test_defaults_pass_validation() {
        for def in DEFAULT_SETTINGS.values() {
            assert!(
                super::super::validation::validate_setting(def.key, def.default).is_ok(),
                "default for {} is invalid",
                def.key
            );
        }
    }

    #[test]
    fn test_get_default() {
        assert_eq!(get_default("SERVER_PORT"), Some("3000"));
        assert_eq!(get_default("GEMINI_MODEL"), Some("gemini-2.0-flash"));
        assert_eq!(get_default("NOPE"), None);
    }
}
