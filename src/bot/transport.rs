use std::path::Path;

use async_trait::async_trait;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, FileId, InputFile};
use thiserror::Error;

use super::events::FileRef;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("telegram request failed: {0}")]
    Request(#[from] teloxide::RequestError),
    #[error("file download failed: {0}")]
    Download(#[from] teloxide::DownloadError),
    #[error("invalid photo url '{0}'")]
    InvalidUrl(String),
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

/// Transient status shown in the chat while a handler works.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Typing,
    UploadPhoto,
}

impl From<StatusKind> for ChatAction {
    fn from(kind: StatusKind) -> Self {
        match kind {
            StatusKind::Typing => ChatAction::Typing,
            StatusKind::UploadPhoto => ChatAction::UploadPhoto,
        }
    }
}

/// Outbound side of the chat platform.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<(), TransportError>;

    async fn send_photo(&self, chat_id: ChatId, url: &str) -> Result<(), TransportError>;

    async fn send_voice(&self, chat_id: ChatId, audio: &Path) -> Result<(), TransportError>;

    async fn send_status(&self, chat_id: ChatId, kind: StatusKind) -> Result<(), TransportError>;

    async fn fetch_file(&self, file: &FileRef) -> Result<Vec<u8>, TransportError>;
}

pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<(), TransportError> {
        self.bot.send_message(chat_id, text).await?;
        Ok(())
    }

    async fn send_photo(&self, chat_id: ChatId, url: &str) -> Result<(), TransportError> {
        let url = reqwest::Url::parse(url).map_err(|_| TransportError::InvalidUrl(url.to_string()))?;
        self.bot.send_photo(chat_id, InputFile::url(url)).await?;
        Ok(())
    }

    async fn send_voice(&self, chat_id: ChatId, audio: &Path) -> Result<(), TransportError> {
        // Read eagerly: the speech output path is reused by the next synthesis.
        let bytes = tokio::fs::read(audio).await?;
        let file_name = audio
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "reply.mp3".to_string());
        self.bot
            .send_audio(chat_id, InputFile::memory(bytes).file_name(file_name))
            .await?;
        Ok(())
    }

    async fn send_status(&self, chat_id: ChatId, kind: StatusKind) -> Result<(), TransportError> {
        self.bot.send_chat_action(chat_id, kind.into()).await?;
        Ok(())
    }

    async fn fetch_file(&self, file: &FileRef) -> Result<Vec<u8>, TransportError> {
        let meta = self.bot.get_file(FileId(file.0.clone())).await?;
        let mut buf = Vec::new();
        self.bot.download_file(&meta.path, &mut buf).await?;
        Ok(buf)
    }
}
