pub mod openai;
pub mod speech;

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::audio::AudioAsset;
use crate::error::truncate_chars;

const MAX_UPSTREAM_REASON_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{provider} returned {status}: {reason}")]
    Upstream {
        provider: &'static str,
        status: u16,
        reason: String,
    },
    #[error("unexpected response from {provider}: {detail}")]
    MalformedResponse {
        provider: &'static str,
        detail: &'static str,
    },
    #[error("local file error: {0}")]
    Io(#[from] std::io::Error),
}

impl InferenceError {
    /// Build an `Upstream` error from a non-success response, preferring the
    /// provider's own `error.message` (or `detail`) over the raw body.
    pub(crate) async fn from_response(provider: &'static str, resp: reqwest::Response) -> Self {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        let reason = upstream_reason(&body)
            .or_else(|| status.canonical_reason().map(str::to_string))
            .unwrap_or_else(|| "no reason given".to_string());

        Self::Upstream {
            provider,
            status: status.as_u16(),
            reason: truncate_chars(&reason, MAX_UPSTREAM_REASON_CHARS),
        }
    }
}

fn upstream_reason(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    let Ok(json) = serde_json::from_str::<serde_json::Value>(trimmed) else {
        return Some(trimmed.to_string());
    };
    let message = json
        .pointer("/error/message")
        .or_else(|| json.pointer("/detail/message"))
        .or_else(|| json.get("detail"))
        .and_then(|v| v.as_str());
    Some(message.map(str::to_string).unwrap_or_else(|| trimmed.to_string()))
}

/// Outcome of a moderation check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModerationVerdict {
    Clean,
    /// Names of the flagged categories, alphabetical.
    Flagged(Vec<String>),
}

impl ModerationVerdict {
    pub const CLEAN_MESSAGE: &'static str = "All good with this message :)";
}

impl fmt::Display for ModerationVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clean => f.write_str(Self::CLEAN_MESSAGE),
            Self::Flagged(categories) if categories.is_empty() => f.write_str("flagged"),
            Self::Flagged(categories) => f.write_str(&categories.join(",")),
        }
    }
}

/// The external AI capabilities the bot relays to. Every call is a single
/// stateless request: no history, no retries.
#[async_trait]
pub trait InferenceGateway: Send + Sync {
    async fn completion(&self, prompt: &str) -> Result<String, InferenceError>;

    /// Returns the URL of the generated image.
    async fn image_from_text(&self, description: &str) -> Result<String, InferenceError>;

    async fn transcribe(&self, audio: AudioAsset) -> Result<String, InferenceError>;

    async fn translate_to_english(&self, audio: AudioAsset) -> Result<String, InferenceError>;

    async fn moderate(&self, text: &str) -> Result<ModerationVerdict, InferenceError>;

    async fn fix_spelling(&self, text: &str) -> Result<String, InferenceError>;
}
