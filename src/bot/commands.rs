use std::sync::Arc;

use teloxide::utils::command::BotCommands;

use super::events::{OutboundResponse, Request};
use super::router::HandlerResult;
use super::AppState;

#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "snake_case", description = "Available commands:")]
pub enum BotCommand {
    #[command(description = "Start / restart the bot")]
    Start,
    #[command(description = "Generate an image from a description")]
    GenerateImage,
    #[command(description = "Check a text against the moderation categories")]
    Moderation,
    #[command(description = "Fix the spelling mistakes in a text")]
    FixSpelling,
}

impl BotCommand {
    /// Name as typed in the chat, without the slash.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::GenerateImage => "generate_image",
            Self::Moderation => "moderation",
            Self::FixSpelling => "fix_spelling",
        }
    }
}

/// Joined command arguments, or a usage reply when there are none.
fn argument_text(req: &Request, command: BotCommand, what: &str) -> Result<String, OutboundResponse> {
    match req.event.joined_args() {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(OutboundResponse::Text(format!(
            "Usage: /{} <{}>",
            command.name(),
            what
        ))),
    }
}

pub async fn start(_state: Arc<AppState>, req: Request) -> HandlerResult {
    let name = req.sender.as_deref().unwrap_or("there");
    Ok(OutboundResponse::Text(format!(
        "Hey {name}, this is Chat GPT!\n\n\
         I'm a bot powered with the most advanced artificial intelligence available.\n\n\
         How can I help you?\n\n{}",
        BotCommand::descriptions()
    )))
}

pub async fn generate_image(state: Arc<AppState>, req: Request) -> HandlerResult {
    let description = match argument_text(&req, BotCommand::GenerateImage, "description") {
        Ok(text) => text,
        Err(usage) => return Ok(usage),
    };
    let url = state.gateway.image_from_text(&description).await?;
    tracing::info!("Generated image for chat {}: {}", req.chat_id.0, url);
    Ok(OutboundResponse::Photo(url))
}

pub async fn moderation(state: Arc<AppState>, req: Request) -> HandlerResult {
    let text = match argument_text(&req, BotCommand::Moderation, "text") {
        Ok(text) => text,
        Err(usage) => return Ok(usage),
    };
    let verdict = state.gateway.moderate(&text).await?;
    Ok(OutboundResponse::Text(verdict.to_string()))
}

pub async fn fix_spelling(state: Arc<AppState>, req: Request) -> HandlerResult {
    let text = match argument_text(&req, BotCommand::FixSpelling, "text") {
        Ok(text) => text,
        Err(usage) => return Ok(usage),
    };
    let fixed = state.gateway.fix_spelling(&text).await?;
    Ok(OutboundResponse::Text(fixed.trim().to_string()))
}
