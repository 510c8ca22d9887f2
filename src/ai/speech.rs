use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use reqwest::Client;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::InferenceError;
use crate::audio::ensure_dir;
use crate::config::ElevenLabsConfig;

const PROVIDER: &str = "ElevenLabs";
const CHUNK_SIZE: usize = 1024;
const MODEL_ID: &str = "eleven_multilingual_v1";

/// ElevenLabs text-to-speech. Output always lands at the same path, so a
/// second call overwrites the first.
pub struct SpeechClient {
    client: Client,
    config: ElevenLabsConfig,
    output_path: PathBuf,
}

impl SpeechClient {
    pub fn new(config: &ElevenLabsConfig, tmp_dir: &Path) -> Self {
        Self {
            client: Client::new(),
            config: config.clone(),
            output_path: tmp_dir.join("elevenlabs").join("output.mp3"),
        }
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn default_voice(&self) -> &str {
        &self.config.voice_id
    }

    /// Synthesize `text` with `voice_id` and stream the MP3 body to
    /// [`Self::output_path`].
    pub async fn synthesize(&self, text: &str, voice_id: &str) -> Result<PathBuf, InferenceError> {
        let preview: String = text.chars().take(50).collect();
        tracing::info!("TTS ({}): \"{}\"", voice_id, preview);

        let url = format!(
            "{}/text-to-speech/{}",
            self.config.base_url.trim_end_matches('/'),
            voice_id
        );

        let resp = self
            .client
            .post(url)
            .header("Accept", "audio/mpeg")
            .header("xi-api-key", &self.config.api_key)
            .json(&serde_json::json!({
                "text": text,
                "model_id": MODEL_ID,
                "voice_settings": {
                    "stability": 0.8,
                    "similarity_boost": 0.8
                }
            }))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(InferenceError::from_response(PROVIDER, resp).await);
        }

        if let Some(dir) = self.output_path.parent() {
            ensure_dir(dir).await?;
        }

        let mut file = tokio::fs::File::create(&self.output_path).await?;
        let mut stream = resp.bytes_stream();
        let mut written = 0usize;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            written += write_chunked(&mut file, &chunk).await?;
        }
        file.flush().await?;

        tracing::debug!("Wrote {} bytes of speech to {:?}", written, self.output_path);
        Ok(self.output_path.clone())
    }
}

async fn write_chunked<W>(out: &mut W, data: &[u8]) -> std::io::Result<usize>
where
    W: AsyncWrite + Unpin,
{
    for piece in data.chunks(CHUNK_SIZE) {
        out.write_all(piece).await?;
    }
    Ok(data.len())
}
