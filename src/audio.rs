//! Voice-note conversion.
//!
//! Telegram voice notes arrive as OGG/Opus, which the transcription endpoint
//! does not accept, so they are re-encoded with ffmpeg first. Every
//! conversion uses its own uniquely named files inside the working directory.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::str::FromStr;

use thiserror::Error;
use tokio::process::Command;
use uuid::Uuid;

use crate::bot::events::FileRef;
use crate::bot::transport::ChatTransport;
use crate::error::BotError;

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("unsupported audio format '{0}'")]
    UnsupportedFormat(String),
    #[error("the voice note is empty")]
    EmptySource,
    #[error("audio working directory error: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not start ffmpeg: {0}")]
    Spawn(std::io::Error),
    #[error("ffmpeg could not convert the voice note: {0}")]
    Codec(String),
}

/// Target containers ffmpeg can produce and the transcription endpoint accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3,
    Wav,
    Flac,
    M4a,
}

impl AudioFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
            Self::Flac => "flac",
            Self::M4a => "m4a",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Mp3 => "audio/mpeg",
            Self::Wav => "audio/wav",
            Self::Flac => "audio/flac",
            Self::M4a => "audio/mp4",
        }
    }
}

impl FromStr for AudioFormat {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches('.').to_lowercase().as_str() {
            "mp3" => Ok(Self::Mp3),
            "wav" => Ok(Self::Wav),
            "flac" => Ok(Self::Flac),
            "m4a" => Ok(Self::M4a),
            other => Err(ConversionError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Create `path` (and parents). Succeeds when it already exists.
pub async fn ensure_dir(path: &Path) -> std::io::Result<()> {
    tokio::fs::create_dir_all(path).await
}

/// A converted voice note on disk. Read it once with [`AudioAsset::into_bytes`];
/// both the downloaded source and the converted file are deleted on drop.
#[derive(Debug)]
pub struct AudioAsset {
    source: PathBuf,
    path: PathBuf,
    format: AudioFormat,
}

impl AudioAsset {
    pub fn format(&self) -> AudioFormat {
        self.format
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("voice_message.{}", self.format))
    }

    pub async fn into_bytes(self) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(&self.path).await
    }
}

impl Drop for AudioAsset {
    fn drop(&mut self) {
        for path in [&self.source, &self.path] {
            match std::fs::remove_file(path) {
                Ok(()) => tracing::debug!("Removed {:?}", path),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!("Failed to remove {:?}: {}", path, e),
            }
        }
    }
}

pub struct AudioBridge {
    work_dir: PathBuf,
}

impl AudioBridge {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Download `file` through the transport and re-encode it as `target`.
    pub async fn convert(
        &self,
        transport: &dyn ChatTransport,
        file: &FileRef,
        target: AudioFormat,
    ) -> Result<AudioAsset, BotError> {
        let source = transport.fetch_file(file).await?;
        tracing::debug!("Fetched voice note {} ({} bytes)", file, source.len());
        Ok(self.transcode(&source, target).await?)
    }

    /// Re-encode an in-memory OGG voice note as `target`.
    pub async fn transcode(
        &self,
        source: &[u8],
        target: AudioFormat,
    ) -> Result<AudioAsset, ConversionError> {
        if source.is_empty() {
            return Err(ConversionError::EmptySource);
        }
        ensure_dir(&self.work_dir).await?;

        let stem = format!("voice-{}", Uuid::new_v4());
        // Created before anything is written so every exit path cleans up.
        let asset = AudioAsset {
            source: self.work_dir.join(format!("{stem}.ogg")),
            path: self.work_dir.join(format!("{stem}.{}", target.extension())),
            format: target,
        };

        tokio::fs::write(&asset.source, source).await?;

        let output = Command::new("ffmpeg")
            .args(["-hide_banner", "-loglevel", "error", "-y", "-i"])
            .arg(&asset.source)
            .arg("-vn")
            .arg(&asset.path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(ConversionError::Spawn)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = stderr
                .lines()
                .rev()
                .find(|l| !l.trim().is_empty())
                .unwrap_or("unknown ffmpeg failure")
                .trim()
                .to_string();
            return Err(ConversionError::Codec(reason));
        }

        match tokio::fs::metadata(&asset.path).await {
            Ok(meta) if meta.len() > 0 => {}
            _ => return Err(ConversionError::Codec("ffmpeg produced no output".to_string())),
        }

        tracing::debug!("Converted voice note to {:?}", asset.path);
        Ok(asset)
    }
}
