mod commands;
mod constants;
mod handlers;
mod models;
mod moderation;
mod schedule;
mod store;
mod utils;

use chrono_tz::Tz;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::{
    commands::{
        deafen, delete, disconnect, disconnect_bulk, disconnect_channel, help, move_bulk,
        move_channel, move_member, mute, resetlogchannel, setlogchannel, undeafen, unmute,
    },
    constants::{COMMAND_PREFIX, DEFAULT_CONFIG_PATH, LOG_DIRECTIVE},
    handlers::on_error,
    models::Data,
    schedule::start_retention_scheduler,
    store::GuildConfigStore,
    utils::timezone::parse_log_timezone,
};

#[tokio::main]
async fn main() {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    initialize_logging();

    let config = match load_configuration() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let store = match GuildConfigStore::load(&config.config_path).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!("Failed to load guild config: {}", e);
            std::process::exit(1);
        }
    };

    let data = Data::new(store, config.fallback_log_channel, config.log_timezone);

    if let Err(e) = start_bot(config.discord_token, data, config.dev_guild_id).await {
        error!("Bot error: {}", e);
        std::process::exit(1);
    }
}

/// Configuration loaded from environment variables
struct Config {
    discord_token: String,
    config_path: String,
    fallback_log_channel: Option<serenity::ChannelId>,
    log_timezone: Tz,
    dev_guild_id: Option<u64>,
}

/// Initialize the logging system
fn initialize_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(LOG_DIRECTIVE.parse().expect("valid log directive")),
        )
        .init();
}

/// Channel ID from an environment value; unset, `0` or garbage disables it
fn parse_channel_id(raw: Option<&str>) -> Option<serenity::ChannelId> {
    let raw = raw?.trim();
    match raw.parse::<u64>() {
        Ok(0) => None,
        Ok(id) => Some(serenity::ChannelId::new(id)),
        Err(_) => {
            warn!("Ignoring invalid LOG_CHANNEL_ID '{}'", raw);
            None
        }
    }
}

/// Load configuration from environment variables
fn load_configuration() -> Result<Config, Box<dyn std::error::Error>> {
    let discord_token = std::env::var("DISCORD_TOKEN")
        .or_else(|_| std::env::var("TOKEN"))
        .map_err(|_| "DISCORD_TOKEN environment variable not set. Set it with: export DISCORD_TOKEN=your_bot_token")?;

    let config_path =
        std::env::var("GUILD_CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let fallback_log_channel = parse_channel_id(std::env::var("LOG_CHANNEL_ID").ok().as_deref());
    if let Some(channel) = fallback_log_channel {
        info!("Fallback log channel: {}", channel);
    }

    let log_timezone = parse_log_timezone(std::env::var("LOG_TIMEZONE").ok().as_deref())?;

    // Optional: development guild ID for faster command registration
    let dev_guild_id = std::env::var("DEV_GUILD_ID")
        .ok()
        .and_then(|id| id.parse::<u64>().ok());

    if dev_guild_id.is_some() {
        info!("Development mode: Commands will be registered to guild only");
    }

    Ok(Config {
        discord_token,
        config_path,
        fallback_log_channel,
        log_timezone,
        dev_guild_id,
    })
}

/// Create and start the Discord bot
async fn start_bot(
    token: String,
    data: Data,
    dev_guild_id: Option<u64>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Flipped once the gateway is ready, the retention sweep waits for it
    let (ready_tx, ready_rx) = watch::channel(false);
    let store = Arc::clone(&data.config_store);

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                disconnect(),
                disconnect_bulk(),
                disconnect_channel(),
                move_member(),
                move_bulk(),
                move_channel(),
                mute(),
                unmute(),
                deafen(),
                undeafen(),
                setlogchannel(),
                resetlogchannel(),
                delete(),
                help(),
            ],
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some(COMMAND_PREFIX.into()),
                execute_self_messages: false,
                mention_as_prefix: false,
                ..Default::default()
            },
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                // Register commands based on dev_guild_id
                if let Some(guild_id) = dev_guild_id {
                    let guild = serenity::GuildId::new(guild_id);
                    info!("Registering commands in development guild: {}", guild_id);
                    poise::builtins::register_in_guild(ctx, &framework.options().commands, guild)
                        .await?;
                    info!(
                        "Commands registered in guild {} (instant updates)",
                        guild_id
                    );
                } else {
                    info!("Registering commands globally (may take up to 1 hour)");
                    poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                    info!("Commands registered globally");
                }

                if ready_tx.send(true).is_err() {
                    warn!("Retention scheduler is not running");
                }

                info!("Bot is ready as {}!", ready.user.name);

                Ok(data)
            })
        })
        .build();

    // Create client with required intents
    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::GUILD_VOICE_STATES
        | serenity::GatewayIntents::GUILD_MEMBERS
        | serenity::GatewayIntents::MESSAGE_CONTENT;

    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await?;

    start_retention_scheduler(client.http.clone(), store, ready_rx);
    info!("Log retention scheduler task started");

    // Start the bot
    info!("Starting bot...");
    client.start().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_channel_id() {
        assert_eq!(parse_channel_id(None), None);
        assert_eq!(parse_channel_id(Some("0")), None);
        assert_eq!(parse_channel_id(Some("abc")), None);
        assert_eq!(
            parse_channel_id(Some(" 123 ")),
            Some(serenity::ChannelId::new(123))
        );
    }
}
