//! Parsing of `evaluate` mode LLM output.
//!
//! The model is asked for bare JSON but often wraps it in prose or code
//! fences. Parsing never fails: anything unusable becomes a fixed record.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value, json};

/// Widest `{ ... }` span, across newlines.
static RE_JSON_OBJECT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\{.*\}").unwrap());

pub const FALLBACK_TIER: &str = "Growing";
pub const FALLBACK_SCORE: i64 = 5;

/// Parse the model output into an evaluation object.
pub fn parse_evaluation(raw: &str) -> Value {
    if let Some(obj) = parse_object(raw.trim()) {
        return Value::Object(obj);
    }
    if let Some(obj) = RE_JSON_OBJECT
        .find(raw)
        .and_then(|m| parse_object(m.as_str()))
    {
        return Value::Object(obj);
    }
    tracing::debug!(len = raw.len(), "Evaluation output was not JSON, using fallback");
    fallback_evaluation(raw)
}

fn parse_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(obj)) => Some(obj),
        _ => None,
    }
}

/// The record returned when the output cannot be parsed. The raw text is
/// kept as the analysis.
pub fn fallback_evaluation(raw: &str) -> Value {
    json!({
        "score": FALLBACK_SCORE,
        "tier": FALLBACK_TIER,
        "analysis": raw,
        "identifiedKSA": "Unable to parse",
        "revivaInsight": "Growth is a process, not a destination.",
    })
}
