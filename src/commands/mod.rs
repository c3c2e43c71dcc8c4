// Command modules
mod autocomplete;
mod help;
mod log_config;
mod text;
mod voice;

// Re-export all commands
pub use help::help;
pub use log_config::{resetlogchannel, setlogchannel};
pub use text::delete;
pub use voice::{
    deafen, disconnect, disconnect_bulk, disconnect_channel, move_bulk, move_channel, move_member,
    mute, undeafen, unmute,
};

use crate::{
    models::{Context, Error},
    moderation::GuildSnapshot,
};

/// Snapshot of the invoking guild from the cache, taken once per interaction
fn guild_snapshot(ctx: Context<'_>) -> Option<GuildSnapshot> {
    ctx.guild().map(|guild| GuildSnapshot::from_guild(&guild))
}

/// Reply only the invoker can see
async fn reply_private(ctx: Context<'_>, content: impl Into<String>) -> Result<(), Error> {
    ctx.send(
        poise::CreateReply::default()
            .content(content)
            .ephemeral(true),
    )
    .await?;
    Ok(())
}
