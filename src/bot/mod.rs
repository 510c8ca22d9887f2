pub mod commands;
pub mod events;
pub mod handlers;
pub mod router;
pub mod transport;

#[cfg(test)]
pub mod testing;

use std::sync::Arc;

use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;

use crate::ai::speech::SpeechClient;
use crate::ai::InferenceGateway;
use crate::audio::AudioBridge;
use crate::config::AppConfig;
use commands::BotCommand;
use events::Request;
use router::{is_command, is_photo, is_text, is_voice, Router};
use transport::{ChatTransport, StatusKind};

/// Shared application state, accessible from all handlers.
pub struct AppState {
    pub config: AppConfig,
    pub gateway: Arc<dyn InferenceGateway>,
    pub audio: AudioBridge,
    /// Present when spoken replies are configured.
    pub speech: Option<SpeechClient>,
    pub transport: Arc<dyn ChatTransport>,
}

/// Bindings in precedence order. Unknown commands and other message shapes
/// end up in the fallback.
pub fn build_router() -> Router<AppState> {
    let mut router = Router::new(handlers::unknown, Some(StatusKind::Typing));
    router
        .register(is_command(BotCommand::Start.name()), commands::start, None)
        .register(
            is_command(BotCommand::GenerateImage.name()),
            commands::generate_image,
            Some(StatusKind::UploadPhoto),
        )
        .register(
            is_command(BotCommand::Moderation.name()),
            commands::moderation,
            Some(StatusKind::Typing),
        )
        .register(
            is_command(BotCommand::FixSpelling.name()),
            commands::fix_spelling,
            Some(StatusKind::Typing),
        )
        .register(is_text, handlers::chat, Some(StatusKind::Typing))
        .register(is_photo, handlers::photo, None)
        .register(is_voice, handlers::voice, Some(StatusKind::Typing));
    router
}

/// Build the teloxide update handler tree. Edited messages are routed the
/// same way as new ones.
pub fn build_handler() -> UpdateHandler<teloxide::RequestError> {
    dptree::entry()
        .branch(Update::filter_message().endpoint(dispatch))
        .branch(Update::filter_edited_message().endpoint(dispatch))
}

async fn dispatch(msg: Message, state: Arc<AppState>, router: Arc<Router<AppState>>) -> ResponseResult<()> {
    let request = Request::from_message(&msg);
    let transport = state.transport.clone();
    router.route(state, transport.as_ref(), request).await;
    Ok(())
}
