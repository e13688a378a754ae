//! Stripe webhook signature verification and event decoding.
//!
//! `Stripe-Signature: t=<unix>,v1=<hex>[,v1=<hex>...]`, each `v1` an
//! HMAC-SHA256 over `"{t}.{raw body}"` keyed by the endpoint secret.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::StripeError;
use crate::models::{CheckoutSession, Invoice, Subscription};

pub const SIGNATURE_HEADER: &str = "stripe-signature";
pub const TOLERANCE_SECS: i64 = 300;

/// Raw event envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: Value,
}

/// Events the service acts on.
#[derive(Debug, Clone)]
pub enum WebhookEvent {
    CheckoutCompleted(CheckoutSession),
    SubscriptionUpdated(Subscription),
    SubscriptionDeleted(Subscription),
    PaymentFailed(Invoice),
    Other(String),
}

impl Event {
    pub fn into_typed(self) -> Result<WebhookEvent, StripeError> {
        let object = self.data.object;
        Ok(match self.event_type.as_str() {
            "checkout.session.completed" => {
                WebhookEvent::CheckoutCompleted(serde_json::from_value(object)?)
            }
            "customer.subscription.updated" => {
                WebhookEvent::SubscriptionUpdated(serde_json::from_value(object)?)
            }
            "customer.subscription.deleted" => {
                WebhookEvent::SubscriptionDeleted(serde_json::from_value(object)?)
            }
            "invoice.payment_failed" => WebhookEvent::PaymentFailed(serde_json::from_value(object)?),
            _ => WebhookEvent::Other(self.event_type),
        })
    }
}

fn sign(secret: &str, timestamp: i64, payload: &[u8]) -> Result<String, StripeError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|_| StripeError::InvalidSignature("invalid webhook secret"))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Build a `Stripe-Signature` header value for `payload`.
pub fn signature_header(secret: &str, timestamp: i64, payload: &[u8]) -> Result<String, StripeError> {
    Ok(format!("t={timestamp},v1={}", sign(secret, timestamp, payload)?))
}

/// Verify the signature header and decode the event at unix time `now`.
pub fn construct_event(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
) -> Result<Event, StripeError> {
    let mut timestamp = None;
    let mut candidates = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", v)) => timestamp = v.parse::<i64>().ok(),
            Some(("v1", v)) => candidates.push(v),
            _ => {}
        }
    }
    let timestamp = timestamp.ok_or(StripeError::InvalidSignature("missing timestamp"))?;
    if candidates.is_empty() {
        return Err(StripeError::InvalidSignature("no v1 signature"));
    }
    if (now - timestamp).abs() > TOLERANCE_SECS {
        return Err(StripeError::InvalidSignature("timestamp outside tolerance"));
    }

    let expected = sign(secret, timestamp, payload)?;
    let matched = candidates
        .iter()
        .any(|c| bool::from(expected.as_bytes().ct_eq(c.as_bytes())));
    if !matched {
        return Err(StripeError::InvalidSignature("signature mismatch"));
    }

    Ok(serde_json::from_slice(payload)?)
}
