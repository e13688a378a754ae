//! Subscription tier table.

use serde::Serialize;
use serde_json::{Value, json};
use synthia_db::users::Tier;

use crate::config::AppConfig;

/// Sentinel for "no limit".
pub const UNLIMITED: i64 = -1;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierLimits {
    pub messages_per_day: i64,
    pub voice_enabled: bool,
    pub voice_minutes_per_month: i64,
    pub selfies_per_day: i64,
    pub coaching_mode: bool,
    pub exclusive_content: bool,
    pub community_access: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierInfo {
    pub tier: Tier,
    pub name: &'static str,
    /// Monthly price in cents.
    pub price: u32,
    pub features: &'static [&'static str],
    pub limits: TierLimits,
}

static OBSERVER: TierInfo = TierInfo {
    tier: Tier::Observer,
    name: "Observer",
    price: 0,
    features: &[
        "5 messages per day",
        "Core Synthia personality",
        "Daily truth drop",
    ],
    limits: TierLimits {
        messages_per_day: 5,
        voice_enabled: false,
        voice_minutes_per_month: 0,
        selfies_per_day: 0,
        coaching_mode: false,
        exclusive_content: false,
        community_access: false,
    },
};

static PARTICIPANT: TierInfo = TierInfo {
    tier: Tier::Participant,
    name: "Participant",
    price: 999,
    features: &[
        "100 messages per day",
        "Voice messages from Synthia",
        "Full personality unlocked",
        "Relationship advice mode",
    ],
    limits: TierLimits {
        messages_per_day: 100,
        voice_enabled: true,
        voice_minutes_per_month: 30,
        selfies_per_day: 3,
        coaching_mode: false,
        exclusive_content: false,
        community_access: false,
    },
};

static BUILDER: TierInfo = TierInfo {
    tier: Tier::Builder,
    name: "Builder",
    price: 1999,
    features: &[
        "Unlimited messages",
        "Voice with Synthia",
        "Coaching mode",
        "Exclusive content drops",
    ],
    limits: TierLimits {
        messages_per_day: UNLIMITED,
        voice_enabled: true,
        voice_minutes_per_month: 120,
        selfies_per_day: UNLIMITED,
        coaching_mode: true,
        exclusive_content: true,
        community_access: false,
    },
};

static SOVEREIGN: TierInfo = TierInfo {
    tier: Tier::Sovereign,
    name: "Sovereign",
    price: 2999,
    features: &[
        "Everything in Builder",
        "Guided 1:1 sessions",
        "Structural cosmology frameworks",
        "Early access to new features",
        "Private community",
    ],
    limits: TierLimits {
        messages_per_day: UNLIMITED,
        voice_enabled: true,
        voice_minutes_per_month: UNLIMITED,
        selfies_per_day: UNLIMITED,
        coaching_mode: true,
        exclusive_content: true,
        community_access: true,
    },
};

pub fn tier_info(tier: Tier) -> &'static TierInfo {
    match tier {
        Tier::Observer => &OBSERVER,
        Tier::Participant => &PARTICIPANT,
        Tier::Builder => &BUILDER,
        Tier::Sovereign => &SOVEREIGN,
    }
}

/// The paid tier sold under `price_id`, if any.
pub fn tier_for_price_id(config: &AppConfig, price_id: &str) -> Option<Tier> {
    Tier::ALL
        .into_iter()
        .find(|tier| config.stripe_price_id(*tier) == Some(price_id))
}

/// Public tier table. Price ids are reported only as available/unavailable.
pub fn tiers_json(config: &AppConfig) -> Value {
    let tiers: Vec<Value> = Tier::ALL
        .into_iter()
        .map(|tier| {
            let info = tier_info(tier);
            json!({
                "tier": info.tier,
                "name": info.name,
                "price": info.price,
                "features": info.features,
                "limits": info.limits,
                "purchasable": config.stripe_price_id(tier).is_some(),
            })
        })
        .collect();
    json!({ "tiers": tiers })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_daily_caps() {
        assert_eq!(tier_info(Tier::Observer).limits.messages_per_day, 5);
        assert_eq!(tier_info(Tier::Participant).limits.messages_per_day, 100);
        assert_eq!(tier_info(Tier::Builder).limits.messages_per_day, UNLIMITED);
        assert_eq!(tier_info(Tier::Sovereign).limits.messages_per_day, UNLIMITED);
    }

    #[test]
    fn test_flags() {
        assert!(!tier_info(Tier::Observer).limits.voice_enabled);
        assert!(tier_info(Tier::Participant).limits.voice_enabled);
        assert!(tier_info(Tier::Builder).limits.coaching_mode);
        assert!(!tier_info(Tier::Builder).limits.community_access);
        assert!(tier_info(Tier::Sovereign).limits.community_access);
    }

    #[test]
    fn test_tier_for_price_id() {
        let config = AppConfig {
            stripe_participant_price_id: "price_part".into(),
            stripe_builder_price_id: "price_build".into(),
            ..AppConfig::default()
        };
        assert_eq!(tier_for_price_id(&config, "price_part"), Some(Tier::Participant));
        assert_eq!(tier_for_price_id(&config, "price_build"), Some(Tier::Builder));
        assert_eq!(tier_for_price_id(&config, "price_other"), None);
        // An unset price id never matches the empty string.
        assert_eq!(tier_for_price_id(&config, ""), None);
    }

    #[test]
    fn test_tiers_json_shape() {
        let config = AppConfig {
            stripe_sovereign_price_id: "price_sov".into(),
            ..AppConfig::default()
        };
        let v = tiers_json(&config);
        let tiers = v["tiers"].as_array().unwrap();
        assert_eq!(tiers.len(), 4);
        assert_eq!(tiers[0]["tier"], "observer");
        assert_eq!(tiers[0]["limits"]["messagesPerDay"], 5);
        assert_eq!(tiers[3]["purchasable"], true);
        assert_eq!(tiers[1]["purchasable"], false);
    }
}
