//! Caption generation for queued posts.

use std::str::FromStr;

use gemini_client::{GeminiClient, GeminiError, GenerateRequest};
use serde::Serialize;

use super::persona::PERSONA_PROMPT;

pub const HASHTAGS: &str = "#SynthiaSays #TruthDrop #RealTalk #HardTruths";

const CAPTION_TEMPERATURE: f32 = 0.9;
const CAPTION_MAX_TOKENS: u32 = 300;

pub const SAMPLE_TOPICS: [&str; 6] = [
    "the difference between confidence and arrogance",
    "why people stay in situationships",
    "the problem with participation trophies",
    "why most relationship advice is garbage",
    "the real reason people fear commitment",
    "accountability in modern dating",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptionStyle {
    Short,
    #[default]
    Medium,
    Long,
}

impl CaptionStyle {
    pub const ALL: [CaptionStyle; 3] = [CaptionStyle::Short, CaptionStyle::Medium, CaptionStyle::Long];

    pub fn as_str(self) -> &'static str {
        match self {
            CaptionStyle::Short => "short",
            CaptionStyle::Medium => "medium",
            CaptionStyle::Long => "long",
        }
    }

    fn instruction(self) -> &'static str {
        match self {
            CaptionStyle::Short => "Keep it to 1-2 sentences. Punchy and provocative.",
            CaptionStyle::Medium => "Write 2-4 sentences. Make it thoughtful but engaging.",
            CaptionStyle::Long => "Write a mini-essay, 4-6 sentences. Dive deep but stay accessible.",
        }
    }
}

impl FromStr for CaptionStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "short" => Ok(CaptionStyle::Short),
            "medium" => Ok(CaptionStyle::Medium),
            "long" => Ok(CaptionStyle::Long),
            other => Err(format!("unknown style: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CaptionOptions {
    pub style: CaptionStyle,
    pub include_hashtags: bool,
    pub include_cta: bool,
}

impl Default for CaptionOptions {
    fn default() -> Self {
        Self {
            style: CaptionStyle::Medium,
            include_hashtags: true,
            include_cta: true,
        }
    }
}

pub fn caption_prompt(topic: &str, style: CaptionStyle) -> String {
    format!(
        "{PERSONA_PROMPT}\n\n\
         Write a social media caption for Synthia about this topic: \"{topic}\"\n\n\
         Style: {}\n\n\
         Rules:\n\
         - Be provocative and make people think\n\
         - Keep Synthia's direct, no-nonsense voice\n\
         - Use emojis sparingly\n\
         - Make it quotable and easy to share\n\
         - Be real, not preachy\n\n\
         Output only the caption text.",
        style.instruction()
    )
}

/// Call-to-action footer pointing at the public chat page.
pub fn call_to_action(public_url: &str) -> String {
    format!("\n\n💬 Chat: {}/chat", public_url.trim_end_matches('/'))
}

/// Trim the model output and append the optional hashtag line and CTA.
pub fn finish_caption(raw: &str, options: &CaptionOptions, public_url: &str) -> String {
    let mut caption = raw.trim().to_string();
    if options.include_hashtags {
        caption.push_str("\n\n");
        caption.push_str(HASHTAGS);
    }
    if options.include_cta {
        caption.push_str(&call_to_action(public_url));
    }
    caption
}

pub async fn generate_caption(
    gemini: &GeminiClient,
    topic: &str,
    options: &CaptionOptions,
    public_url: &str,
) -> Result<String, GeminiError> {
    let request = GenerateRequest::new(CAPTION_TEMPERATURE, CAPTION_MAX_TOKENS)
        .user(caption_prompt(topic, options.style));
    let raw = gemini.generate(&request).await?;
    Ok(finish_caption(&raw, options, public_url))
}
