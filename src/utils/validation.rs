use poise::serenity_prelude::{GuildId, UserId};
use thiserror::Error;

/// Reasons a moderation request is rejected before anything is changed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("This command must be used in a server")]
    NotInGuild,
    #[error("No valid member was given. Use a mention or a user ID.")]
    NoValidTargets,
    #[error("Too many members: at most {max} can be targeted at once, got {got}.")]
    TooManyTargets { max: usize, got: usize },
    #[error("Member <@{0}> was not found in this server.")]
    UnknownMember(UserId),
    #[error("`{0}` is not a voice channel of this server.")]
    InvalidChannel(String),
    #[error("A destination channel is required.")]
    MissingDestination,
    #[error("Channel **{0}** has no connected members.")]
    EmptySource(String),
    #[error("<@{member}> cannot view or join **{channel}**.")]
    DestinationInaccessible { member: UserId, channel: String },
    #[error("You cannot view or join **{0}** yourself.")]
    InvokerCannotAccess(String),
}

/// Extract guild ID from context, returning error if not in a guild
pub fn require_guild(guild_id: Option<GuildId>) -> Result<GuildId, ValidationError> {
    guild_id.ok_or(ValidationError::NotInGuild)
}
