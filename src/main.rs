mod commands;
mod config;
mod llm;
mod platform;
mod processor;
#[cfg(test)]
mod testing;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, TransportMode};
use crate::llm::LlmClient;
use crate::platform::{telegram, webhook};
use crate::processor::Processor;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,nutribot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = Config::from_env().context("Failed to load configuration")?;

    // First argument, when given, overrides BOT_MODE
    if let Some(mode) = std::env::args().nth(1) {
        config.mode = mode.parse().context("Invalid transport mode argument")?;
    }

    info!("Configuration loaded successfully");
    info!("  Mode: {}", config.mode);
    info!("  Model: {}", config.llm.model);
    info!(
        "  Commands: {}",
        commands::names()
            .map(|name| format!("/{name}"))
            .collect::<Vec<_>>()
            .join(", ")
    );

    let bot = telegram::build_bot(&config.telegram.bot_token, config.polling.timeout_secs)?;
    telegram::authorize(&bot).await?;

    let llm = LlmClient::new(config.llm.clone())?;
    let processor = Arc::new(Processor::new(Arc::new(llm), config.llm.model.clone()));

    match config.mode {
        TransportMode::Webhook => {
            if let Some(url) = config.telegram.webhook_url.clone() {
                telegram::register_webhook(&bot, url).await?;
            }
            let state = webhook::WebhookState {
                processor,
                sender: Arc::new(bot),
            };
            webhook::serve(state, config.server.port).await?;
        }
        TransportMode::Polling => {
            let shutdown = telegram::shutdown_on_ctrl_c();
            telegram::run_polling(bot, &processor, config.polling.timeout_secs, shutdown)
                .await?;
        }
    }

    Ok(())
}
