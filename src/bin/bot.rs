use anyhow::{Context as _, Result};
use dotenvy::dotenv;
use log::{error, info};
use serenity::async_trait;
use serenity::model::gateway::Ready;
use serenity::prelude::*;
use std::sync::Arc;

use grind_review::core::Config;
use grind_review::database::Database;
use grind_review::features::reminders::{DiscordNotifier, DiscordRecipients, ReminderScheduler};

struct Handler;

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("🎉 {} is connected and ready!", ready.user.name);
        info!("📡 Connected to {} guilds", ready.guilds.len());
        info!("🤖 Bot ID: {}", ready.user.id);

        if let Some(shard) = ready.shard {
            info!("⚡ Shard: {}/{}", shard[0] + 1, shard[1]);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let config = Config::from_env()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!("Starting Grind Review bot...");

    let database = Database::new(&config.database_path)
        .await
        .with_context(|| format!("Failed to open database at {}", config.database_path))?;

    let mut client = Client::builder(&config.discord_token, GatewayIntents::GUILDS)
        .event_handler(Handler)
        .await
        .map_err(|e| {
            error!("Failed to create Discord client: {e}");
            anyhow::anyhow!("Client creation failed: {}", e)
        })?;

    // Start the reminder scheduler
    let http = client.cache_and_http.http.clone();
    let scheduler = ReminderScheduler::new(
        Arc::new(database),
        Arc::new(DiscordNotifier::new(http)),
        Arc::new(DiscordRecipients::new(config.scheduler.review_channel_id)),
        &config.scheduler,
    );
    let scheduler = scheduler.start();
    match config.scheduler.review_channel_id {
        Some(channel_id) => info!("📬 Review reminders go to channel {channel_id}"),
        None => info!("📬 Review reminders go out as direct messages"),
    }

    // Ctrl-C: let the current owner finish, then close the gateway
    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {e}");
            return;
        }
        info!("Shutdown requested, stopping review reminder scheduler...");
        scheduler.stop().await;
        shard_manager.lock().await.shutdown_all().await;
    });

    info!("Establishing WebSocket connection to Discord gateway...");

    if let Err(why) = client.start().await {
        error!("Gateway connection failed: {why:?}");
        return Err(anyhow::anyhow!(
            "Failed to establish gateway connection: {}",
            why
        ));
    }

    info!("Bot shut down cleanly");
    Ok(())
}
