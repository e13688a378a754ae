//! Provider clients built from the current configuration.
//!
//! Clients are cheap to build and are created per request so that settings
//! changes apply without a restart.

use fanvue_client::api::FanvueApiClient;
use fanvue_client::auth::FanvueAuth;
use gemini_client::GeminiClient;
use stripe_client::StripeClient;

use super::ServiceError;
use super::speech::SpeechClient;
use crate::config::AppConfig;

pub fn fanvue_auth(config: &AppConfig) -> Result<FanvueAuth, ServiceError> {
    if !config.fanvue_configured() {
        return Err(ServiceError::NotConfigured("Fanvue OAuth"));
    }
    let auth = FanvueAuth::new(
        config.fanvue_client_id.clone(),
        config.fanvue_client_secret.clone(),
        config.fanvue_redirect_uri(),
        config.http_timeout,
    )?;
    Ok(auth.with_auth_base(&config.fanvue_auth_base))
}

pub fn fanvue_api(config: &AppConfig) -> Result<FanvueApiClient, ServiceError> {
    Ok(FanvueApiClient::new(config.http_timeout)?.with_api_base(&config.fanvue_api_base))
}

pub fn gemini(config: &AppConfig) -> Result<GeminiClient, ServiceError> {
    if config.gemini_api_key.is_empty() {
        return Err(ServiceError::NotConfigured("Gemini"));
    }
    Ok(
        GeminiClient::new(config.gemini_api_key.clone(), config.http_timeout)?
            .with_model(&config.gemini_model)
            .with_api_base(&config.gemini_api_base),
    )
}

pub fn stripe(config: &AppConfig) -> Result<StripeClient, ServiceError> {
    if config.stripe_secret_key.is_empty() {
        return Err(ServiceError::NotConfigured("Stripe"));
    }
    Ok(
        StripeClient::new(config.stripe_secret_key.clone(), config.http_timeout)?
            .with_api_base(&config.stripe_api_base),
    )
}

pub fn speech(config: &AppConfig) -> Result<SpeechClient, ServiceError> {
    if config.elevenlabs_api_key.is_empty() || config.elevenlabs_voice_id.is_empty() {
        return Err(ServiceError::NotConfigured("ElevenLabs"));
    }
    Ok(SpeechClient::new(
        config.elevenlabs_api_key.clone(),
        config.elevenlabs_voice_id.clone(),
        config.http_timeout,
    )?
    .with_api_base(&config.elevenlabs_api_base))
}
