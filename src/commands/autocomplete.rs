use poise::serenity_prelude::{self as serenity, ChannelId, CommandDataOptionValue, UserId};

use super::guild_snapshot;
use crate::{
    models::Context,
    moderation::{
        GuildSnapshot, OperationKind,
        suggest::{self, Suggestion, selected_in_siblings},
    },
};

/// Values of the options already filled in the invocation being typed.
/// The focused option is not included.
fn sibling_options(ctx: Context<'_>) -> Vec<(String, String)> {
    let poise::Context::Application(app) = ctx else {
        return Vec::new();
    };

    app.interaction
        .data
        .options
        .iter()
        .filter_map(|option| match &option.value {
            CommandDataOptionValue::String(value) => Some((option.name.clone(), value.clone())),
            _ => None,
        })
        .collect()
}

/// Voice channel picked in the sibling option `name`
fn sibling_channel(
    guild: &GuildSnapshot,
    siblings: &[(String, String)],
    name: &str,
) -> Option<ChannelId> {
    siblings
        .iter()
        .find(|(option, _)| option == name)
        .and_then(|(_, value)| guild.find_voice_channel(value).map(|c| c.id))
}

fn choices(suggestions: Vec<Suggestion>) -> impl Iterator<Item = serenity::AutocompleteChoice> {
    suggestions
        .into_iter()
        .map(|s| serenity::AutocompleteChoice::new(s.name, s.value))
}

fn members_for(ctx: Context<'_>, kind: Option<OperationKind>, partial: &str) -> Vec<Suggestion> {
    let Some(guild) = guild_snapshot(ctx) else {
        return Vec::new();
    };
    let selected = selected_in_siblings(&sibling_options(ctx));
    suggest::member_suggestions(&guild, ctx.author().id, kind, partial, &selected)
}

pub async fn autocomplete_member(
    ctx: Context<'_>,
    partial: &str,
) -> impl Iterator<Item = serenity::AutocompleteChoice> {
    choices(members_for(ctx, None, partial))
}

pub async fn autocomplete_unmuted(
    ctx: Context<'_>,
    partial: &str,
) -> impl Iterator<Item = serenity::AutocompleteChoice> {
    choices(members_for(ctx, Some(OperationKind::Mute), partial))
}

pub async fn autocomplete_muted(
    ctx: Context<'_>,
    partial: &str,
) -> impl Iterator<Item = serenity::AutocompleteChoice> {
    choices(members_for(ctx, Some(OperationKind::Unmute), partial))
}

pub async fn autocomplete_undeafened(
    ctx: Context<'_>,
    partial: &str,
) -> impl Iterator<Item = serenity::AutocompleteChoice> {
    choices(members_for(ctx, Some(OperationKind::Deafen), partial))
}

pub async fn autocomplete_deafened(
    ctx: Context<'_>,
    partial: &str,
) -> impl Iterator<Item = serenity::AutocompleteChoice> {
    choices(members_for(ctx, Some(OperationKind::Undeafen), partial))
}

pub async fn autocomplete_source(
    ctx: Context<'_>,
    partial: &str,
) -> impl Iterator<Item = serenity::AutocompleteChoice> {
    let suggestions = guild_snapshot(ctx)
        .map(|guild| suggest::source_channel_suggestions(&guild, partial))
        .unwrap_or_default();
    choices(suggestions)
}

/// Destinations for `move`, narrowed by the member in the `user` option
pub async fn autocomplete_destination_for_user(
    ctx: Context<'_>,
    partial: &str,
) -> impl Iterator<Item = serenity::AutocompleteChoice> {
    let target: Option<UserId> = selected_in_siblings(&sibling_options(ctx)).first().copied();
    let suggestions = guild_snapshot(ctx)
        .map(|guild| suggest::destination_for_target(&guild, ctx.author().id, target, partial))
        .unwrap_or_default();
    choices(suggestions)
}

/// Destinations for `move-bulk`, reachable by every member picked so far
pub async fn autocomplete_destination_for_members(
    ctx: Context<'_>,
    partial: &str,
) -> impl Iterator<Item = serenity::AutocompleteChoice> {
    let selected = selected_in_siblings(&sibling_options(ctx));
    let suggestions = guild_snapshot(ctx)
        .map(|guild| suggest::destination_for_members(&guild, ctx.author().id, &selected, partial))
        .unwrap_or_default();
    choices(suggestions)
}

/// Destinations for `move-channel`, reachable by everyone in the `source` option
pub async fn autocomplete_destination_for_source(
    ctx: Context<'_>,
    partial: &str,
) -> impl Iterator<Item = serenity::AutocompleteChoice> {
    let suggestions = guild_snapshot(ctx)
        .map(|guild| {
            let source = sibling_channel(&guild, &sibling_options(ctx), "source");
            suggest::destination_for_source(&guild, source, partial)
        })
        .unwrap_or_default();
    choices(suggestions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moderation::snapshot::test_support::{channel, guild};

    fn options(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn test_sibling_channel() {
        let mut g = guild();
        g.voice_channels = vec![channel(10, "General"), channel(11, "Music")];

        let siblings = options(&[("destination", "10"), ("source", "<#11>")]);
        assert_eq!(
            sibling_channel(&g, &siblings, "source"),
            Some(ChannelId::new(11))
        );
        assert_eq!(
            sibling_channel(&g, &siblings, "destination"),
            Some(ChannelId::new(10))
        );
        assert_eq!(sibling_channel(&g, &siblings, "user"), None);
        assert_eq!(
            sibling_channel(&g, &options(&[("source", "99")]), "source"),
            None
        );
    }
}
