use std::fmt;
use std::path::PathBuf;

use teloxide::types::{ChatId, Message};

/// Opaque platform handle for a downloadable file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef(pub String);

impl fmt::Display for FileRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One incoming update, classified once by the transport layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Text(String),
    Command { name: String, args: Vec<String> },
    Voice(FileRef),
    Photo(FileRef),
    Unknown,
}

impl InboundEvent {
    pub fn from_message(msg: &Message) -> Self {
        if let Some(text) = msg.text() {
            return parse_text(text);
        }
        if let Some(voice) = msg.voice() {
            return Self::Voice(FileRef(voice.file.id.0.clone()));
        }
        // Telegram lists photo sizes smallest first.
        if let Some(largest) = msg.photo().and_then(|sizes| sizes.last()) {
            return Self::Photo(FileRef(largest.file.id.0.clone()));
        }
        Self::Unknown
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Command { .. } => "command",
            Self::Voice(_) => "voice",
            Self::Photo(_) => "photo",
            Self::Unknown => "unknown",
        }
    }

    /// Command arguments joined back into one string.
    pub fn joined_args(&self) -> Option<String> {
        match self {
            Self::Command { args, .. } => Some(args.join(" ")),
            _ => None,
        }
    }
}

/// Classify message text as a command (`/name[@bot] args...`) or plain text.
pub fn parse_text(text: &str) -> InboundEvent {
    if !text.starts_with('/') {
        return InboundEvent::Text(text.to_string());
    }

    // The name is the first token minus the slash, so "/ hello" has none.
    let mut tokens = text.split_whitespace();
    let head = tokens.next().and_then(|t| t.strip_prefix('/')).unwrap_or("");
    let name = head.split('@').next().unwrap_or("").to_lowercase();
    let args = tokens.map(str::to_string).collect();

    InboundEvent::Command { name, args }
}

/// What a handler wants delivered back to the chat.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundResponse {
    Text(String),
    /// Remote image URL.
    Photo(String),
    Error(String),
    /// Transcript text followed by a local audio file.
    Voice { audio: PathBuf, transcript: String },
}

/// An event together with the chat it came from.
#[derive(Debug, Clone)]
pub struct Request {
    pub chat_id: ChatId,
    /// First name of the sender, when known.
    pub sender: Option<String>,
    pub event: InboundEvent,
}

impl Request {
    pub fn from_message(msg: &Message) -> Self {
        Self {
            chat_id: msg.chat.id,
            sender: msg.from.as_ref().map(|u| u.first_name.clone()),
            event: InboundEvent::from_message(msg),
        }
    }
}
