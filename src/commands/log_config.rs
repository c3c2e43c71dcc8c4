use poise::serenity_prelude::{ChannelType, GuildChannel};
use tracing::{error, info, warn};

use super::reply_private;
use crate::{
    models::{Context, Error},
    moderation::audit::{HttpLogSender, LogSender},
    utils::{
        messages::{format_error, format_success},
        validation::require_guild,
    },
};

/// Send moderation logs of this server to a text channel
#[poise::command(
    slash_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    default_member_permissions = "ADMINISTRATOR"
)]
pub async fn setlogchannel(
    ctx: Context<'_>,
    #[description = "Text channel receiving moderation logs"]
    #[channel_types("Text")]
    channel: GuildChannel,
) -> Result<(), Error> {
    let guild_id = require_guild(ctx.guild_id())?;

    if channel.kind != ChannelType::Text || channel.guild_id != guild_id {
        reply_private(ctx, format_error("The log channel must be a text channel of this server.")).await?;
        return Ok(());
    }

    let previous = match ctx
        .data()
        .config_store
        .set_log_channel(guild_id, channel.id)
        .await
    {
        Ok(previous) => previous,
        Err(e) => {
            error!("Failed to save log channel for guild {}: {}", guild_id, e);
            reply_private(ctx, format_error("Could not save the log channel, try again later.")).await?;
            return Ok(());
        }
    };

    let sender = HttpLogSender::new(ctx.serenity_context().http.clone());
    if let Err(e) = sender
        .send_text(
            channel.id,
            format!("📋 Moderation logs of this server will be posted here (set by <@{}>).", ctx.author().id),
        )
        .await
    {
        warn!("Log channel {} is not writable: {}", channel.id, e);
    }

    let message = match previous {
        Some(old) if old != channel.id => format!(
            "{}\nPrevious log channel: <#{}>",
            format_success(&format!("Moderation logs will now be sent to <#{}>", channel.id)),
            old
        ),
        _ => format_success(&format!("Moderation logs will now be sent to <#{}>", channel.id)),
    };
    reply_private(ctx, message).await?;

    info!("Log channel of guild {} set to {}", guild_id, channel.id);
    Ok(())
}

/// Stop sending moderation logs of this server
#[poise::command(
    slash_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    default_member_permissions = "ADMINISTRATOR"
)]
pub async fn resetlogchannel(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = require_guild(ctx.guild_id())?;

    match ctx.data().config_store.reset_log_channel(guild_id).await {
        Ok(true) => {
            reply_private(ctx, format_success("The log channel has been reset.")).await?;
            info!("Log channel of guild {} reset", guild_id);
        }
        Ok(false) => {
            reply_private(ctx, format_error("No log channel is configured for this server.")).await?;
        }
        Err(e) => {
            error!("Failed to reset log channel for guild {}: {}", guild_id, e);
            reply_private(ctx, format_error("Could not reset the log channel, try again later.")).await?;
        }
    }

    Ok(())
}
