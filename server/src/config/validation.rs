//! Setting value validation.

use regex::Regex;
use std::sync::LazyLock;

static RE_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://[^\s/?#]+(/[^\s]*)?$").unwrap());
static RE_PRICE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^price_[A-Za-z0-9]+$").unwrap());
static RE_HANDLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.\-]{1,64}$").unwrap());
static RE_MODEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9.\-]*$").unwrap());

/// Validate a setting value. Returns `Ok(())` if valid, or an error message.
pub fn validate_setting(key: &str, value: &str) -> Result<(), String> {
    match key {
        "SERVER_PORT" => validate_int_range(value, 1, 65535)?,
        "HTTP_TIMEOUT_SECS" => validate_int_range(value, 1, 300)?,
        "PUBLIC_URL" | "GEMINI_API_BASE" | "FANVUE_AUTH_BASE" | "FANVUE_API_BASE"
        | "STRIPE_API_BASE" | "ELEVENLABS_API_BASE" => {
            if !RE_URL.is_match(value) {
                return Err("must be an http(s) URL".into());
            }
        }
        "STRIPE_PARTICIPANT_PRICE_ID" | "STRIPE_BUILDER_PRICE_ID" | "STRIPE_SOVEREIGN_PRICE_ID" => {
            if !value.is_empty() && !RE_PRICE_ID.is_match(value) {
                return Err("must look like price_xxx".into());
            }
        }
        "FANVUE_ACCOUNT_HANDLE" => {
            if !RE_HANDLE.is_match(value) {
                return Err("handle must be 1-64 letters, digits, '_', '.' or '-'".into());
            }
        }
        "GEMINI_MODEL" => {
            if !RE_MODEL.is_match(value) {
                return Err("invalid model name".into());
            }
        }
        "SESSION_SECRET" => {
            if !value.is_empty() && value.len() < 16 {
                return Err("must be at least 16 characters".into());
            }
        }
        _ => {}
    }
    Ok(())
}

fn validate_int_range(value: &str, min: i64, max: i64) -> Result<(), String> {
    let v: i64 = value.parse().map_err(|_| "must be an integer")?;
    if v < min || v > max {
        return Err(format!("must be between {min} and {max}"));
    }
    Ok(())
}
