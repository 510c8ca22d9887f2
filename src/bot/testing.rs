//! In-memory doubles for the transport and the inference gateway.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use teloxide::types::ChatId;

use super::events::FileRef;
use super::transport::{ChatTransport, StatusKind, TransportError};
use super::AppState;
use crate::ai::speech::SpeechClient;
use crate::ai::{InferenceError, InferenceGateway, ModerationVerdict};
use crate::audio::{AudioAsset, AudioBridge};
use crate::config::AppConfig;

#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Text(ChatId, String),
    Photo(ChatId, String),
    Voice(ChatId, PathBuf),
    Status(ChatId, StatusKind),
}

#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<Sent>>,
    files: HashMap<String, Vec<u8>>,
    fail_status: bool,
    fail_voice: bool,
}

impl RecordingTransport {
    pub fn failing_status() -> Self {
        Self {
            fail_status: true,
            ..Self::default()
        }
    }

    pub fn failing_voice() -> Self {
        Self {
            fail_voice: true,
            ..Self::default()
        }
    }

    pub fn with_file(mut self, id: &str, bytes: Vec<u8>) -> Self {
        self.files.insert(id.to_string(), bytes);
        self
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    fn push(&self, item: Sent) {
        self.sent.lock().unwrap().push(item);
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<(), TransportError> {
        self.push(Sent::Text(chat_id, text.to_string()));
        Ok(())
    }

    async fn send_photo(&self, chat_id: ChatId, url: &str) -> Result<(), TransportError> {
        if !url.starts_with("http") {
            return Err(TransportError::InvalidUrl(url.to_string()));
        }
        self.push(Sent::Photo(chat_id, url.to_string()));
        Ok(())
    }

    async fn send_voice(&self, chat_id: ChatId, audio: &Path) -> Result<(), TransportError> {
        if self.fail_voice {
            return Err(TransportError::Io(std::io::Error::other("voice rejected")));
        }
        self.push(Sent::Voice(chat_id, audio.to_path_buf()));
        Ok(())
    }

    async fn send_status(&self, chat_id: ChatId, kind: StatusKind) -> Result<(), TransportError> {
        if self.fail_status {
            return Err(TransportError::Io(std::io::Error::other("status rejected")));
        }
        self.push(Sent::Status(chat_id, kind));
        Ok(())
    }

    async fn fetch_file(&self, file: &FileRef) -> Result<Vec<u8>, TransportError> {
        self.files.get(&file.0).cloned().ok_or_else(|| {
            TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("file {file} not found"),
            ))
        })
    }
}

/// Gateway that echoes its inputs back and records every call.
#[derive(Default)]
pub struct ScriptedGateway {
    calls: Mutex<Vec<String>>,
    fail_with: Option<(u16, &'static str)>,
    flagged: Vec<String>,
    heard: Option<&'static str>,
}

impl ScriptedGateway {
    pub fn failing(status: u16, reason: &'static str) -> Self {
        Self {
            fail_with: Some((status, reason)),
            ..Self::default()
        }
    }

    pub fn flagging(categories: &[&str]) -> Self {
        Self {
            flagged: categories.iter().map(|c| c.to_string()).collect(),
            ..Self::default()
        }
    }

    /// Transcription and translation return `heard` instead of "what is rust".
    pub fn hearing(heard: &'static str) -> Self {
        Self {
            heard: Some(heard),
            ..Self::default()
        }
    }

    fn heard(&self) -> String {
        self.heard.unwrap_or("what is rust").to_string()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) -> Result<(), InferenceError> {
        self.calls.lock().unwrap().push(call);
        match self.fail_with {
            Some((status, reason)) => Err(InferenceError::Upstream {
                provider: "OpenAI",
                status,
                reason: reason.to_string(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl InferenceGateway for ScriptedGateway {
    async fn completion(&self, prompt: &str) -> Result<String, InferenceError> {
        self.record(format!("completion:{prompt}"))?;
        Ok(format!("reply to {prompt}"))
    }

    async fn image_from_text(&self, description: &str) -> Result<String, InferenceError> {
        self.record(format!("image:{description}"))?;
        Ok(format!("https://images.example/{}.png", description.replace(' ', "-")))
    }

    async fn transcribe(&self, audio: AudioAsset) -> Result<String, InferenceError> {
        self.record(format!("transcribe:{}", audio.format()))?;
        Ok(self.heard())
    }

    async fn translate_to_english(&self, audio: AudioAsset) -> Result<String, InferenceError> {
        self.record(format!("translate:{}", audio.format()))?;
        Ok(self.heard())
    }

    async fn moderate(&self, text: &str) -> Result<ModerationVerdict, InferenceError> {
        self.record(format!("moderate:{text}"))?;
        if self.flagged.is_empty() {
            Ok(ModerationVerdict::Clean)
        } else {
            Ok(ModerationVerdict::Flagged(self.flagged.clone()))
        }
    }

    async fn fix_spelling(&self, text: &str) -> Result<String, InferenceError> {
        self.record(format!("fix_spelling:{text}"))?;
        Ok(text.replace("teh", "the"))
    }
}

/// Application state wired to test doubles, with the audio working
/// directory under `tmp`.
pub fn app_state(
    gateway: Arc<dyn InferenceGateway>,
    transport: Arc<dyn ChatTransport>,
    tmp: &Path,
) -> Arc<AppState> {
    app_state_with(gateway, transport, tmp, &[])
}

/// Like [`app_state`], with extra environment entries layered on top.
pub fn app_state_with(
    gateway: Arc<dyn InferenceGateway>,
    transport: Arc<dyn ChatTransport>,
    tmp: &Path,
    env: &[(&str, &str)],
) -> Arc<AppState> {
    let config = AppConfig::from_lookup(|key| {
        if let Some((_, value)) = env.iter().find(|(k, _)| *k == key) {
            return Some(value.to_string());
        }
        match key {
            "TELEGRAM_TOKEN" => Some("test-token".to_string()),
            "OPENAI_KEY" => Some("test-key".to_string()),
            "TMP_DIR" => Some(tmp.to_string_lossy().into_owned()),
            _ => None,
        }
    })
    .expect("test config");

    Arc::new(AppState {
        audio: AudioBridge::new(&config.tmp_dir),
        speech: config
            .elevenlabs
            .as_ref()
            .map(|eleven| SpeechClient::new(eleven, &config.tmp_dir)),
        gateway,
        transport,
        config,
    })
}

pub fn tool_available(name: &str) -> bool {
    Command::new(name)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Encode a two-second OGG/Opus tone at `path`, the container Telegram uses
/// for voice notes. False when ffmpeg is missing or lacks libopus.
pub fn write_opus_fixture(path: &Path) -> bool {
    tool_available("ffmpeg")
        && Command::new("ffmpeg")
            .args(["-hide_banner", "-loglevel", "error", "-y"])
            .args(["-f", "lavfi", "-i", "sine=frequency=440:duration=2"])
            .args(["-c:a", "libopus"])
            .arg(path)
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
}
