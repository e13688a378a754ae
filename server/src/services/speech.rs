//! ElevenLabs text-to-speech.

use std::time::Duration;

use serde::Serialize;

pub const DEFAULT_API_BASE: &str = "https://api.elevenlabs.io";
const MODEL_ID: &str = "eleven_monolingual_v1";

#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    #[error("HTTP request failed: {0}")]
    Http(reqwest::Error),

    #[error("ElevenLabs API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Request to ElevenLabs timed out")]
    Timeout,
}

impl From<reqwest::Error> for SpeechError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SpeechError::Timeout
        } else {
            SpeechError::Http(e)
        }
    }
}

#[derive(Debug, Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

pub struct SpeechClient {
    http: reqwest::Client,
    api_key: String,
    voice_id: String,
    api_base: String,
}

impl SpeechClient {
    pub fn new(api_key: String, voice_id: String, timeout: Duration) -> Result<Self, SpeechError> {
        Ok(Self {
            http: reqwest::Client::builder().timeout(timeout).build()?,
            api_key,
            voice_id,
            api_base: DEFAULT_API_BASE.to_string(),
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Render `text` in the configured voice. Returns MPEG audio bytes.
    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>, SpeechError> {
        let body = SpeechRequest {
            text,
            model_id: MODEL_ID,
            voice_settings: VoiceSettings {
                stability: 0.5,
                similarity_boost: 0.75,
            },
        };
        let resp = self
            .http
            .post(format!("{}/v1/text-to-speech/{}", self.api_base, self.voice_id))
            .header("xi-api-key", &self.api_key)
            .header(reqwest::header::ACCEPT, "audio/mpeg")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(SpeechError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(resp.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body() {
        let body = SpeechRequest {
            text: "hello",
            model_id: MODEL_ID,
            voice_settings: VoiceSettings {
                stability: 0.5,
                similarity_boost: 0.75,
            },
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["text"], "hello");
        assert_eq!(v["model_id"], "eleven_monolingual_v1");
        assert_eq!(v["voice_settings"]["stability"], 0.5);
        assert_eq!(v["voice_settings"]["similarity_boost"], 0.75);
    }
}
