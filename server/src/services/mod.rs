//! Domain services shared by the HTTP handlers.

pub mod captions;
pub mod content_processor;
pub mod evaluation;
pub mod persona;
pub mod posting;
pub mod providers;
pub mod quota;
pub mod speech;
pub mod tiers;
pub mod token_manager;

use fanvue_client::FanvueError;
use gemini_client::GeminiError;
use stripe_client::StripeError;
use synthia_db::DbError;

use speech::SpeechError;

/// Failure of a service call, classified for HTTP mapping.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    /// The Fanvue connection must be re-authorized through the OAuth flow.
    #[error("Fanvue re-authorization required: {0}")]
    NeedsReauth(String),

    #[error(transparent)]
    Fanvue(#[from] FanvueError),

    #[error(transparent)]
    Gemini(#[from] GeminiError),

    #[error(transparent)]
    Stripe(#[from] StripeError),

    #[error(transparent)]
    Speech(#[from] SpeechError),

    #[error(transparent)]
    Storage(#[from] DbError),
}

impl ServiceError {
    /// Upstream timed out; the same request may succeed later.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            ServiceError::Fanvue(FanvueError::Timeout)
                | ServiceError::Gemini(GeminiError::Timeout)
                | ServiceError::Stripe(StripeError::Timeout)
                | ServiceError::Speech(SpeechError::Timeout)
        )
    }
}
