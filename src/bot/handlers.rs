use std::sync::Arc;

use super::events::{InboundEvent, OutboundResponse, Request};
use super::router::HandlerResult;
use super::AppState;
use crate::config::VoiceMode;
use crate::error::BotError;

pub const UNKNOWN_REPLY: &str = "Sorry, I didn't understand that command.";

fn unexpected(handler: &str, event: &InboundEvent) -> BotError {
    BotError::Unhandled(format!("{handler} handler received a {} event", event.kind()))
}

/// Plain text goes straight to a single-turn completion.
pub async fn chat(state: Arc<AppState>, req: Request) -> HandlerResult {
    let InboundEvent::Text(text) = &req.event else {
        return Err(unexpected("chat", &req.event));
    };
    let reply = state.gateway.completion(text).await?;
    Ok(OutboundResponse::Text(reply))
}

/// Voice note → transcript (or English translation) → completion. Answers
/// with speech when a synthesizer is configured, falling back to text.
pub async fn voice(state: Arc<AppState>, req: Request) -> HandlerResult {
    let InboundEvent::Voice(file) = &req.event else {
        return Err(unexpected("voice", &req.event));
    };

    let audio = state
        .audio
        .convert(state.transport.as_ref(), file, state.config.voice_format)
        .await?;

    let heard = match state.config.voice_mode {
        VoiceMode::Transcribe => state.gateway.transcribe(audio).await?,
        VoiceMode::Translate => state.gateway.translate_to_english(audio).await?,
    };
    tracing::info!("Voice note in chat {}: {}", req.chat_id.0, heard);

    if heard.trim().is_empty() {
        return Ok(OutboundResponse::Text(
            "I couldn't understand that voice message.".to_string(),
        ));
    }

    let answer = state.gateway.completion(&heard).await?;

    let Some(speech) = &state.speech else {
        return Ok(OutboundResponse::Text(answer));
    };
    match speech.synthesize(&answer, speech.default_voice()).await {
        Ok(audio) => Ok(OutboundResponse::Voice {
            audio,
            transcript: answer,
        }),
        Err(e) => {
            tracing::error!("TTS failed: {}", e);
            Ok(OutboundResponse::Text(answer))
        }
    }
}

pub async fn photo(_state: Arc<AppState>, req: Request) -> HandlerResult {
    let InboundEvent::Photo(file) = &req.event else {
        return Err(unexpected("photo", &req.event));
    };
    let name = req.sender.as_deref().unwrap_or("friend");
    tracing::info!("Photo from {} in chat {}: {}", name, req.chat_id.0, file);

    Ok(OutboundResponse::Text(format!(
        "Amazing picture {name}! I'd love to describe it, but this functionality is not yet supported... :("
    )))
}

/// Fallback for unknown commands and unsupported message types.
pub async fn unknown(_state: Arc<AppState>, req: Request) -> HandlerResult {
    tracing::debug!("No handler for {:?} in chat {}", req.event, req.chat_id.0);
    Ok(OutboundResponse::Text(UNKNOWN_REPLY.to_string()))
}
