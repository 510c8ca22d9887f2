use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing_subscriber::EnvFilter;

mod ai;
mod audio;
mod bot;
mod config;
mod error;

use ai::openai::OpenAiClient;
use ai::speech::SpeechClient;
use audio::AudioBridge;
use bot::commands::BotCommand;
use bot::transport::TelegramTransport;
use config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("🤖 Starting GPT relay bot...");

    // Load config
    let config = AppConfig::from_env()?;
    tracing::info!(
        "Config loaded. Model: {}, voice mode: {:?}, spoken replies: {}",
        config.openai.chat_model,
        config.voice_mode,
        config.elevenlabs.is_some()
    );

    // Initialize AI modules
    let gateway = Arc::new(OpenAiClient::new(&config.openai));
    let speech = config
        .elevenlabs
        .as_ref()
        .map(|eleven| SpeechClient::new(eleven, &config.tmp_dir));
    let audio = AudioBridge::new(&config.tmp_dir);
    tracing::info!("Audio working directory: {:?}", audio.work_dir());
    if let Some(speech) = &speech {
        tracing::info!("Spoken replies are written to {:?}", speech.output_path());
    }

    // Create the Telegram bot
    let bot = Bot::new(&config.telegram_token);

    if let Err(e) = bot.set_my_commands(BotCommand::bot_commands()).await {
        tracing::warn!("Failed to publish the command menu: {}", e);
    }

    // Build shared application state
    let state = Arc::new(bot::AppState {
        config,
        gateway,
        audio,
        speech,
        transport: Arc::new(TelegramTransport::new(bot.clone())),
    });
    let router = Arc::new(bot::build_router());
    tracing::info!("Router ready with {} bindings", router.len());

    // Build the dispatcher
    let handler = bot::build_handler();

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state, router])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    tracing::info!("Bot stopped.");
    Ok(())
}
