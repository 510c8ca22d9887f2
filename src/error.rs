use std::error::Error as StdError;

use thiserror::Error;

use crate::ai::InferenceError;
use crate::audio::ConversionError;
use crate::bot::transport::TransportError;
use crate::config::ConfigError;

/// Everything a handler can fail with. All of it ends up as an error reply.
#[derive(Debug, Error)]
pub enum BotError {
    #[error("configuration error")]
    Configuration(#[from] ConfigError),
    #[error("chat transport failed")]
    Transport(#[from] TransportError),
    #[error("audio conversion failed")]
    Conversion(#[from] ConversionError),
    #[error("inference request failed")]
    Inference(#[from] InferenceError),
    #[error("{0}")]
    Unhandled(String),
}

const USER_MESSAGE_PREFIX: &str = "Wooops, it looks like there was an error:";
const MAX_REASON_CHARS: usize = 300;

/// Text shown in the chat for a failed handler: the last line of the
/// innermost cause.
pub fn user_message(err: &(dyn StdError + 'static)) -> String {
    let mut innermost = err;
    while let Some(source) = innermost.source() {
        innermost = source;
    }

    let rendered = innermost.to_string();
    let reason = rendered
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("unknown error");

    format!("{USER_MESSAGE_PREFIX} {}", truncate_chars(reason, MAX_REASON_CHARS))
}

pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max).collect();
        format!("{head}...")
    }
}
