//! Stripe objects, trimmed to the fields the service reads.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer};

/// Stripe returns related objects either as an id or, when expanded, as the
/// full object. Only the id is kept.
fn id_or_object<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Expandable {
        Id(String),
        Object { id: String },
    }
    Ok(Option::<Expandable>::deserialize(deserializer)?.map(|e| match e {
        Expandable::Id(id) | Expandable::Object { id } => id,
    }))
}

#[derive(Debug, Clone, Deserialize)]
pub struct Customer {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "id_or_object")]
    pub customer: Option<String>,
    #[serde(default, deserialize_with = "id_or_object")]
    pub subscription: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Price {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionItem {
    pub price: Price,
    #[serde(default)]
    pub current_period_end: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct List<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

impl<T> Default for List<T> {
    fn default() -> Self {
        Self { data: Vec::new() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Subscription {
    pub id: String,
    #[serde(default, deserialize_with = "id_or_object")]
    pub customer: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub current_period_end: Option<i64>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub items: List<SubscriptionItem>,
}

impl Subscription {
    /// Price of the first subscription item.
    pub fn price_id(&self) -> Option<&str> {
        self.items.data.first().map(|item| item.price.id.as_str())
    }

    /// Period end in unix seconds. Newer API versions report it per item.
    pub fn period_end(&self) -> Option<i64> {
        self.current_period_end
            .or_else(|| self.items.data.first()?.current_period_end)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Invoice {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "id_or_object")]
    pub customer: Option<String>,
}

/// Parameters for a subscription-mode hosted checkout session.
#[derive(Debug, Clone)]
pub struct CheckoutParams {
    pub customer_id: String,
    pub price_id: String,
    pub success_url: String,
    pub cancel_url: String,
    /// Attached to both the session and the resulting subscription.
    pub metadata: Vec<(String, String)>,
}

impl CheckoutParams {
    pub(crate) fn to_form(&self) -> Vec<(String, String)> {
        let mut form = vec![
            ("customer".to_string(), self.customer_id.clone()),
            ("mode".to_string(), "subscription".to_string()),
            ("payment_method_types[0]".to_string(), "card".to_string()),
            ("line_items[0][price]".to_string(), self.price_id.clone()),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            ("success_url".to_string(), self.success_url.clone()),
            ("cancel_url".to_string(), self.cancel_url.clone()),
        ];
        for (k, v) in &self.metadata {
            form.push((format!("metadata[{k}]"), v.clone()));
            form.push((format!("subscription_data[metadata][{k}]"), v.clone()));
        }
        form
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_expandable_fields() {
        let session: CheckoutSession = serde_json::from_value(json!({
            "id": "cs_1",
            "customer": {"id": "cus_9", "object": "customer"},
            "subscription": "sub_3",
            "metadata": {"userId": "u1", "tier": "builder"}
        }))
        .unwrap();
        assert_eq!(session.customer.as_deref(), Some("cus_9"));
        assert_eq!(session.subscription.as_deref(), Some("sub_3"));
        assert_eq!(session.metadata["tier"], "builder");

        let bare: CheckoutSession =
            serde_json::from_value(json!({"id": "cs_2", "customer": null})).unwrap();
        assert!(bare.customer.is_none());
        assert!(bare.subscription.is_none());
    }

    #[test]
    fn test_subscription_period_end_fallback() {
        let sub: Subscription = serde_json::from_value(json!({
            "id": "sub_1",
            "customer": "cus_1",
            "items": {"data": [{"price": {"id": "price_b"}, "current_period_end": 1800000000}]}
        }))
        .unwrap();
        assert_eq!(sub.price_id(), Some("price_b"));
        assert_eq!(sub.period_end(), Some(1_800_000_000));

        let top: Subscription = serde_json::from_value(json!({
            "id": "sub_2", "current_period_end": 1700000000
        }))
        .unwrap();
        assert_eq!(top.period_end(), Some(1_700_000_000));
        assert!(top.price_id().is_none());
    }

    #[test]
    fn test_checkout_form_encoding() {
        let form = CheckoutParams {
            customer_id: "cus_1".into(),
            price_id: "price_1".into(),
            success_url: "https://s/chat?upgraded=true".into(),
            cancel_url: "https://s/pricing?canceled=true".into(),
            metadata: vec![("userId".into(), "u1".into())],
        }
        .to_form();
        let has = |k: &str, v: &str| form.iter().any(|(fk, fv)| fk == k && fv == v);
        assert!(has("mode", "subscription"));
        assert!(has("line_items[0][price]", "price_1"));
        assert!(has("metadata[userId]", "u1"));
        assert!(has("subscription_data[metadata][userId]", "u1"));
    }
}
