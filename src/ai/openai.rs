use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{InferenceError, InferenceGateway, ModerationVerdict};
use crate::audio::AudioAsset;
use crate::config::OpenAiConfig;

const PROVIDER: &str = "OpenAI";
const SPELLING_INSTRUCTION: &str =
    "Fix the spelling mistakes. Reply with the corrected text only, without any commentary.";

#[derive(Debug, Clone, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageContent,
}

#[derive(Debug, Deserialize)]
struct ChatMessageContent {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AudioTextResponse {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ModerationResponse {
    results: Vec<ModerationResult>,
}

#[derive(Debug, Deserialize)]
struct ModerationResult {
    flagged: bool,
    #[serde(default)]
    categories: BTreeMap<String, serde_json::Value>,
}

impl ModerationResult {
    fn verdict(&self) -> ModerationVerdict {
        if !self.flagged {
            return ModerationVerdict::Clean;
        }
        let flagged = self
            .categories
            .iter()
            .filter(|(_, value)| is_truthy(value))
            .map(|(name, _)| name.clone())
            .collect();
        ModerationVerdict::Flagged(flagged)
    }
}

fn is_truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        _ => false,
    }
}

/// OpenAI-backed implementation of every gateway capability.
pub struct OpenAiClient {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiClient {
    pub fn new(config: &OpenAiConfig) -> Self {
        Self {
            client: Client::new(),
            config: config.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn post(&self, path: &str) -> RequestBuilder {
        let mut req = self
            .client
            .post(self.url(path))
            .header("Authorization", format!("Bearer {}", self.config.api_key));
        if let Some(org) = &self.config.organization {
            req = req.header("OpenAI-Organization", org);
        }
        req
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, InferenceError> {
        let resp = req.send().await?;
        if !resp.status().is_success() {
            return Err(InferenceError::from_response(PROVIDER, resp).await);
        }
        Ok(resp.json().await?)
    }

    async fn chat(
        &self,
        model: &str,
        temperature: f32,
        messages: &[ChatMessage<'_>],
    ) -> Result<String, InferenceError> {
        let body = serde_json::json!({
            "model": model,
            "temperature": temperature,
            "messages": messages,
        });

        let resp: ChatResponse = self.send(self.post("chat/completions").json(&body)).await?;

        resp.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(InferenceError::MalformedResponse {
                provider: PROVIDER,
                detail: "completion without content",
            })
    }

    async fn audio_to_text(&self, path: &str, audio: AudioAsset) -> Result<String, InferenceError> {
        let file_name = audio.file_name();
        let mime = audio.format().mime_type();
        let bytes = audio.into_bytes().await?;
        tracing::debug!("Uploading {} bytes of audio to {}", bytes.len(), path);

        let form = Form::new()
            .text("model", self.config.transcription_model.clone())
            .part("file", Part::bytes(bytes).file_name(file_name).mime_str(mime)?);

        let resp: AudioTextResponse = self.send(self.post(path).multipart(form)).await?;
        Ok(resp.text.trim().to_string())
    }
}

#[async_trait]
impl InferenceGateway for OpenAiClient {
    async fn completion(&self, prompt: &str) -> Result<String, InferenceError> {
        let messages = [ChatMessage {
            role: "user",
            content: prompt,
        }];
        self.chat(&self.config.chat_model, self.config.temperature, &messages)
            .await
    }

    async fn image_from_text(&self, description: &str) -> Result<String, InferenceError> {
        let body = serde_json::json!({
            "prompt": description,
            "n": 1,
            "size": self.config.image_size,
        });

        let resp: ImageResponse = self.send(self.post("images/generations").json(&body)).await?;

        resp.data
            .into_iter()
            .next()
            .and_then(|d| d.url)
            .ok_or(InferenceError::MalformedResponse {
                provider: PROVIDER,
                detail: "image response without url",
            })
    }

    async fn transcribe(&self, audio: AudioAsset) -> Result<String, InferenceError> {
        self.audio_to_text("audio/transcriptions", audio).await
    }

    async fn translate_to_english(&self, audio: AudioAsset) -> Result<String, InferenceError> {
        self.audio_to_text("audio/translations", audio).await
    }

    async fn moderate(&self, text: &str) -> Result<ModerationVerdict, InferenceError> {
        let body = serde_json::json!({
            "input": text,
            "model": self.config.moderation_model,
        });

        let resp: ModerationResponse = self.send(self.post("moderations").json(&body)).await?;

        resp.results
            .first()
            .map(ModerationResult::verdict)
            .ok_or(InferenceError::MalformedResponse {
                provider: PROVIDER,
                detail: "moderation without results",
            })
    }

    async fn fix_spelling(&self, text: &str) -> Result<String, InferenceError> {
        let messages = [
            ChatMessage {
                role: "system",
                content: SPELLING_INSTRUCTION,
            },
            ChatMessage {
                role: "user",
                content: text,
            },
        ];
        self.chat(&self.config.edit_model, 0.0, &messages).await
    }
}
