use std::sync::Arc;

use chrono::{DateTime, Utc};
use poise::serenity_prelude::{
    self as serenity, ChannelId, Colour, CreateEmbed, CreateMessage, HttpError, Message,
};
use tokio::time::{Duration, sleep};
use tracing::{info, warn};

use crate::{
    constants::TRANSIENT_MESSAGE_SECS,
    models::{Context, Error},
    moderation::audit::{self, DeletedMessage, HttpLogSender, reason_or_placeholder},
    utils::{
        messages::{format_error, format_success},
        string_utils::non_blank,
        validation::require_guild,
    },
};

/// Capture what is needed to log a message before it disappears
fn deleted_message(message: &Message) -> DeletedMessage {
    DeletedMessage {
        message_id: message.id,
        author: message.author.id,
        channel_id: message.channel_id,
        created_at: DateTime::<Utc>::from_timestamp(message.timestamp.unix_timestamp(), 0)
            .unwrap_or_default(),
        content: message.content.clone(),
        attachments: message.attachments.iter().map(|a| a.url.clone()).collect(),
    }
}

fn confirmation_text(author: serenity::UserId, reason: Option<&str>) -> String {
    format!(
        "{}\n**Author:** <@{}>\n**Reason:** {}",
        format_success("Message deleted"),
        author,
        reason_or_placeholder(reason)
    )
}

fn is_not_found(error: &serenity::Error) -> bool {
    matches!(
        error,
        serenity::Error::Http(HttpError::UnsuccessfulRequest(response))
            if response.status_code.as_u16() == 404
    )
}

fn fetch_error_text(not_found: bool, error: &dyn std::fmt::Display) -> String {
    if not_found {
        format_error("Message not found, it may already be deleted.")
    } else {
        format_error(&format!("Could not fetch the message: {}", error))
    }
}

/// The message the command replies to; the gateway does not always include it,
/// in which case it is fetched from the reference. `Err` is the text to show.
async fn replied_message(ctx: Context<'_>, command_message: &Message) -> Result<Message, String> {
    if let Some(target) = command_message.referenced_message.as_deref() {
        return Ok(target.clone());
    }
    let Some(message_id) = command_message
        .message_reference
        .as_ref()
        .and_then(|r| r.message_id)
    else {
        return Err(format_error("Reply to the message you want to delete."));
    };

    command_message
        .channel_id
        .message(ctx.http(), message_id)
        .await
        .map_err(|e| {
            warn!("Failed to fetch replied message {}: {}", message_id, e);
            fetch_error_text(is_not_found(&e), &e)
        })
}

/// Post an error that removes itself after a few seconds
async fn post_transient(http: Arc<serenity::Http>, channel_id: ChannelId, content: String) {
    let sent = match channel_id
        .send_message(&http, CreateMessage::new().content(content))
        .await
    {
        Ok(sent) => sent,
        Err(e) => {
            warn!("Failed to post error in channel {}: {}", channel_id, e);
            return;
        }
    };

    tokio::spawn(async move {
        sleep(Duration::from_secs(TRANSIENT_MESSAGE_SECS)).await;
        if let Err(e) = sent.delete(&http).await {
            warn!("Failed to remove transient message {}: {}", sent.id, e);
        }
    });
}

/// Delete the replied-to message and keep a copy in the moderation log
#[poise::command(
    prefix_command,
    guild_only,
    aliases("del"),
    required_permissions = "MANAGE_MESSAGES"
)]
pub async fn delete(
    ctx: Context<'_>,
    #[rest]
    #[description = "Reason for the moderation log"]
    reason: Option<String>,
) -> Result<(), Error> {
    let poise::Context::Prefix(prefix) = ctx else {
        return Ok(());
    };
    let guild_id = require_guild(ctx.guild_id())?;
    let command_message = prefix.msg;
    let http = ctx.serenity_context().http.clone();

    let target = match replied_message(ctx, command_message).await {
        Ok(target) => target,
        Err(text) => {
            post_transient(http, command_message.channel_id, text).await;
            return Ok(());
        }
    };

    let deleted = deleted_message(&target);
    let reason = non_blank(reason);
    let entries = [
        deleted.context_entry(&ctx.author().name, reason.as_deref()),
        deleted.copy_entry(),
    ];
    audit::emit(
        &HttpLogSender::new(http.clone()),
        ctx.data().log_channel_for(guild_id),
        &entries,
    )
    .await;

    if let Err(e) = target.delete(ctx.http()).await {
        warn!("Failed to delete message {}: {}", target.id, e);
        post_transient(
            http,
            command_message.channel_id,
            format_error(&format!("Could not delete the message: {}", e)),
        )
        .await;
        return Ok(());
    }
    if let Err(e) = command_message.delete(ctx.http()).await {
        warn!("Failed to delete command message {}: {}", command_message.id, e);
    }

    let confirmation = CreateEmbed::new()
        .description(confirmation_text(deleted.author, reason.as_deref()))
        .colour(Colour::DARK_GREEN);
    command_message
        .channel_id
        .send_message(ctx.http(), CreateMessage::new().embed(confirmation))
        .await?;

    info!(
        "{} deleted message {} by {} in guild {}",
        ctx.author().id,
        deleted.message_id,
        deleted.author,
        guild_id
    );

    Ok(())
}
