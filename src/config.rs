use std::path::PathBuf;

use thiserror::Error;

use crate::audio::AudioFormat;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// What the voice-note handler does with the decoded audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceMode {
    /// Source-language transcription.
    Transcribe,
    /// Any language to English.
    Translate,
}

impl VoiceMode {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "transcribe" | "stt" => Some(Self::Transcribe),
            "translate" => Some(Self::Translate),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    /// Sent as `OpenAI-Organization` when present.
    pub organization: Option<String>,
    pub base_url: String,
    pub chat_model: String,
    pub temperature: f32,
    pub image_size: String,
    pub transcription_model: String,
    pub moderation_model: String,
    pub edit_model: String,
}

#[derive(Debug, Clone)]
pub struct ElevenLabsConfig {
    pub api_key: String,
    pub voice_id: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub telegram_token: String,
    pub openai: OpenAiConfig,
    /// Spoken replies are disabled when no ElevenLabs key is configured.
    pub elevenlabs: Option<ElevenLabsConfig>,
    pub voice_mode: VoiceMode,
    /// Container voice notes are converted to before upload.
    pub voice_format: AudioFormat,
    /// Working directory for voice conversion and synthesized speech.
    pub tmp_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));
        let or_default = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let temperature = match get("OPENAI_TEMPERATURE") {
            Some(raw) => raw.trim().parse::<f32>().map_err(|e| ConfigError::Invalid {
                key: "OPENAI_TEMPERATURE",
                reason: e.to_string(),
            })?,
            None => 0.7,
        };

        let voice_mode = match get("VOICE_MODE") {
            Some(raw) => VoiceMode::parse(&raw).ok_or_else(|| ConfigError::Invalid {
                key: "VOICE_MODE",
                reason: format!("expected 'transcribe' or 'translate', got '{raw}'"),
            })?,
            None => VoiceMode::Transcribe,
        };

        let voice_format = match get("VOICE_FORMAT") {
            Some(raw) => raw.parse::<AudioFormat>().map_err(|e| ConfigError::Invalid {
                key: "VOICE_FORMAT",
                reason: e.to_string(),
            })?,
            None => AudioFormat::Mp3,
        };

        let openai = OpenAiConfig {
            api_key: require("OPENAI_KEY")?,
            organization: get("OPENAI_ORG"),
            base_url: or_default("OPENAI_BASE_URL", "https://api.openai.com/v1"),
            chat_model: or_default("OPENAI_MODEL", "gpt-4"),
            temperature,
            image_size: or_default("OPENAI_IMAGE_SIZE", "512x512"),
            transcription_model: or_default("OPENAI_TRANSCRIPTION_MODEL", "whisper-1"),
            moderation_model: or_default("OPENAI_MODERATION_MODEL", "text-moderation-latest"),
            edit_model: or_default("OPENAI_EDIT_MODEL", "gpt-4"),
        };

        let elevenlabs = get("ELEVENLABS_KEY").map(|api_key| ElevenLabsConfig {
            api_key,
            voice_id: or_default("ELEVENLABS_VOICE_ID", "21m00Tcm4TlvDq8ikWAM"),
            base_url: or_default("ELEVENLABS_BASE_URL", "https://api.elevenlabs.io/v1"),
        });

        Ok(Self {
            telegram_token: require("TELEGRAM_TOKEN")?,
            openai,
            elevenlabs,
            voice_mode,
            voice_format,
            tmp_dir: PathBuf::from(or_default("TMP_DIR", "./tmp")),
        })
    }
}
