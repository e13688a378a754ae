//! Inbound webhook verification and event parsing.
//!
//! Fanvue signs each delivery with `x-fanvue-signature: t=<unix>,v0=<hex>`
//! where the hex digest is HMAC-SHA256 over `"{t}.{raw body}"`.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;

pub const SIGNATURE_HEADER: &str = "x-fanvue-signature";

/// Maximum clock skew accepted between the signature timestamp and now.
pub const TOLERANCE_SECS: i64 = 300;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("signature header is malformed")]
    Malformed,
    #[error("signature timestamp outside tolerance")]
    Stale,
    #[error("signature mismatch")]
    Mismatch,
    #[error("webhook secret is not a valid HMAC key")]
    InvalidKey,
}

fn parse_header(header: &str) -> Option<(i64, &str)> {
    let mut timestamp = None;
    let mut signature = None;
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", v)) => timestamp = v.parse::<i64>().ok(),
            Some(("v0", v)) => signature = Some(v),
            _ => {}
        }
    }
    Some((timestamp?, signature?))
}

fn sign(secret: &str, timestamp: i64, payload: &[u8]) -> Result<String, SignatureError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|_| SignatureError::InvalidKey)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Build a header value for `payload` signed at `timestamp`.
pub fn signature_header(
    secret: &str,
    timestamp: i64,
    payload: &[u8],
) -> Result<String, SignatureError> {
    Ok(format!("t={timestamp},v0={}", sign(secret, timestamp, payload)?))
}

/// Verify a signature header against the raw request body at unix time `now`.
pub fn verify_signature(
    secret: &str,
    header: &str,
    payload: &[u8],
    now: i64,
) -> Result<(), SignatureError> {
    let (timestamp, signature) = parse_header(header).ok_or(SignatureError::Malformed)?;
    if (now - timestamp).abs() > TOLERANCE_SECS {
        return Err(SignatureError::Stale);
    }
    let expected = sign(secret, timestamp, payload)?;
    if bool::from(expected.as_bytes().ct_eq(signature.as_bytes())) {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sender {
    pub uuid: String,
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl Sender {
    pub fn name(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.handle.as_deref())
            .unwrap_or("unknown")
    }

    /// Whether this sender is the connected creator account itself.
    pub fn is_account(&self, account_handle: &str) -> bool {
        self.handle
            .as_deref()
            .is_some_and(|h| h.eq_ignore_ascii_case(account_handle))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessage {
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FanProfile {
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    message: Option<IncomingMessage>,
    sender: Option<Sender>,
    follower: Option<FanProfile>,
    subscriber: Option<FanProfile>,
}

/// A webhook delivery, classified by the objects it carries.
#[derive(Debug, Clone)]
pub enum WebhookEvent {
    MessageReceived {
        message: IncomingMessage,
        sender: Sender,
    },
    NewFollower(FanProfile),
    NewSubscriber(FanProfile),
    Other,
}

impl WebhookEvent {
    pub fn parse(payload: &[u8]) -> Result<Self, serde_json::Error> {
        let raw: RawEvent = serde_json::from_slice(payload)?;
        Ok(match raw {
            RawEvent {
                message: Some(message),
                sender: Some(sender),
                ..
            } => WebhookEvent::MessageReceived { message, sender },
            RawEvent {
                follower: Some(f), ..
            } => WebhookEvent::NewFollower(f),
            RawEvent {
                subscriber: Some(s),
                ..
            } => WebhookEvent::NewSubscriber(s),
            _ => WebhookEvent::Other,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";
    const BODY: &[u8] = br#"{"message":{"text":"hi"},"sender":{"uuid":"u1","handle":"fan"}}"#;

    #[test]
    fn test_valid_signature() {
        let now = 1_700_000_000;
        let header = signature_header(SECRET, now, BODY).unwrap();
        assert_eq!(verify_signature(SECRET, &header, BODY, now), Ok(()));
        assert_eq!(verify_signature(SECRET, &header, BODY, now + 299), Ok(()));
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let now = 1_700_000_000;
        let header = signature_header(SECRET, now - 301, BODY).unwrap();
        assert_eq!(
            verify_signature(SECRET, &header, BODY, now),
            Err(SignatureError::Stale)
        );
        let header = signature_header(SECRET, now + 301, BODY).unwrap();
        assert_eq!(
            verify_signature(SECRET, &header, BODY, now),
            Err(SignatureError::Stale)
        );
    }

    #[test]
    fn test_altered_signature_rejected() {
        let now = 1_700_000_000;
        let header = signature_header(SECRET, now, BODY).unwrap();
        let mut bytes = header.into_bytes();
        let last = bytes.len() - 1;
        bytes[last] = if bytes[last] == b'0' { b'1' } else { b'0' };
        let tampered = String::from_utf8(bytes).unwrap();
        assert_eq!(
            verify_signature(SECRET, &tampered, BODY, now),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_wrong_secret_or_body_rejected() {
        let now = 1_700_000_000;
        let header = signature_header(SECRET, now, BODY).unwrap();
        assert_eq!(
            verify_signature("other", &header, BODY, now),
            Err(SignatureError::Mismatch)
        );
        assert_eq!(
            verify_signature(SECRET, &header, b"{}", now),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_malformed_header() {
        assert_eq!(
            verify_signature(SECRET, "garbage", BODY, 0),
            Err(SignatureError::Malformed)
        );
        assert_eq!(
            verify_signature(SECRET, "t=abc,v0=00", BODY, 0),
            Err(SignatureError::Malformed)
        );
        assert_eq!(
            verify_signature(SECRET, "t=5", BODY, 5),
            Err(SignatureError::Malformed)
        );
    }

    #[test]
    fn test_parse_message_event() {
        let event = WebhookEvent::parse(
            br#"{"message":{"text":"hey there"},"sender":{"uuid":"u-1","handle":"Synthia_1synthia","displayName":"S"}}"#,
        )
        .unwrap();
        match event {
            WebhookEvent::MessageReceived { message, sender } => {
                assert_eq!(message.text, "hey there");
                assert_eq!(sender.uuid, "u-1");
                assert_eq!(sender.name(), "S");
                assert!(sender.is_account("synthia_1synthia"));
                assert!(!sender.is_account("someone_else"));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_parse_other_events() {
        assert!(matches!(
            WebhookEvent::parse(br#"{"follower":{"displayName":"F"}}"#).unwrap(),
            WebhookEvent::NewFollower(f) if f.display_name.as_deref() == Some("F")
        ));
        assert!(matches!(
            WebhookEvent::parse(br#"{"subscriber":{"handle":"s"}}"#).unwrap(),
            WebhookEvent::NewSubscriber(_)
        ));
        assert!(matches!(
            WebhookEvent::parse(br#"{"type":"ping"}"#).unwrap(),
            WebhookEvent::Other
        ));
        assert!(WebhookEvent::parse(b"not json").is_err());
    }
}
