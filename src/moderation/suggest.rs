//! Autocomplete candidates, computed from a guild snapshot only.
//!
//! Nothing in here talks to Discord, the command layer feeds in the snapshot, the
//! invoker, the partial input and whatever sibling options were already typed.

use poise::serenity_prelude::{ChannelId, UserId};

use super::access::{all_can_access, can_access};
use super::operation::OperationKind;
use super::snapshot::{GuildSnapshot, MemberState, VoiceChannel};
use crate::{
    constants::MAX_SUGGESTIONS,
    utils::{
        references::{mention, resolve_references},
        string_utils::contains_ignore_case,
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub name: String,
    pub value: String,
}

/// Keep candidates whose label contains `partial`, in order, capped at the Discord limit
fn finish<I>(candidates: I, partial: &str) -> Vec<Suggestion>
where
    I: IntoIterator<Item = Suggestion>,
{
    candidates
        .into_iter()
        .filter(|s| contains_ignore_case(&s.name, partial))
        .take(MAX_SUGGESTIONS)
        .collect()
}

/// Label shown for a voice channel, e.g. `General (3 users)`
pub fn channel_label(name: &str, occupants: usize) -> String {
    match occupants {
        0 => format!("{} (empty)", name),
        1 => format!("{} (1 user)", name),
        n => format!("{} ({} users)", name, n),
    }
}

fn channel_suggestion(guild: &GuildSnapshot, channel: &VoiceChannel) -> Suggestion {
    Suggestion {
        name: channel_label(&channel.name, guild.occupant_count(channel.id)),
        value: channel.id.to_string(),
    }
}

/// Whether a member's voice flags make sense for `kind` (no unmuting the unmuted)
fn state_matches(member: &MemberState, kind: Option<OperationKind>) -> bool {
    match kind {
        Some(OperationKind::Mute) => !member.is_muted(),
        Some(OperationKind::Unmute) => member.is_muted(),
        Some(OperationKind::Deafen) => !member.is_deafened(),
        Some(OperationKind::Undeafen) => member.is_deafened(),
        _ => true,
    }
}

/// User IDs already typed into other `userN` slots of the same invocation
pub fn selected_in_siblings(siblings: &[(String, String)]) -> Vec<UserId> {
    siblings
        .iter()
        .filter(|(name, _)| name.starts_with("user"))
        .flat_map(|(_, value)| resolve_references(value))
        .map(UserId::new)
        .collect()
}

/// Connected members the invoker can reach, filtered by the voice state `kind` needs
/// and without the ones already selected
pub fn member_suggestions(
    guild: &GuildSnapshot,
    invoker: UserId,
    kind: Option<OperationKind>,
    partial: &str,
    selected: &[UserId],
) -> Vec<Suggestion> {
    let Some(invoker) = guild.member(invoker) else {
        return Vec::new();
    };

    let candidates = guild.members.iter().filter_map(|m| {
        let channel = guild.voice_channel(m.voice_channel()?)?;
        if !can_access(guild, channel, invoker)
            || !state_matches(m, kind)
            || selected.contains(&m.id)
        {
            return None;
        }
        Some(Suggestion {
            name: m.label(),
            value: mention(m.id.get()),
        })
    });

    finish(candidates, partial)
}

/// Voice channels that currently have someone in them
pub fn source_channel_suggestions(guild: &GuildSnapshot, partial: &str) -> Vec<Suggestion> {
    let candidates = guild
        .voice_channels
        .iter()
        .filter(|c| guild.occupant_count(c.id) > 0)
        .map(|c| channel_suggestion(guild, c));

    finish(candidates, partial)
}

/// Destinations for moving one member: reachable by the member and the invoker,
/// without the member's current channel
pub fn destination_for_target(
    guild: &GuildSnapshot,
    invoker: UserId,
    target: Option<UserId>,
    partial: &str,
) -> Vec<Suggestion> {
    let (Some(target), Some(invoker)) = (target.and_then(|t| guild.member(t)), guild.member(invoker))
    else {
        return Vec::new();
    };

    let current = target.voice_channel();
    let candidates = guild
        .voice_channels
        .iter()
        .filter(|c| Some(c.id) != current)
        .filter(|c| can_access(guild, c, target) && can_access(guild, c, invoker))
        .map(|c| channel_suggestion(guild, c));

    finish(candidates, partial)
}

/// Destinations reachable by every selected member and the invoker
pub fn destination_for_members(
    guild: &GuildSnapshot,
    invoker: UserId,
    selected: &[UserId],
    partial: &str,
) -> Vec<Suggestion> {
    let members: Vec<&MemberState> = selected.iter().filter_map(|id| guild.member(*id)).collect();
    let Some(invoker) = guild.member(invoker) else {
        return Vec::new();
    };
    if members.is_empty() {
        return Vec::new();
    }

    let candidates = guild
        .voice_channels
        .iter()
        .filter(|c| can_access(guild, c, invoker))
        .filter(|c| all_can_access(guild, c, members.iter().copied()))
        .map(|c| channel_suggestion(guild, c));

    finish(candidates, partial)
}

/// Destinations for emptying `source`: every current occupant must be able to join
pub fn destination_for_source(
    guild: &GuildSnapshot,
    source: Option<ChannelId>,
    partial: &str,
) -> Vec<Suggestion> {
    let Some(source) = source.and_then(|s| guild.voice_channel(s)) else {
        return Vec::new();
    };
    let occupants = guild.occupants(source.id);

    let candidates = guild
        .voice_channels
        .iter()
        .filter(|c| c.id != source.id)
        .filter(|c| all_can_access(guild, c, occupants.iter().copied()))
        .map(|c| channel_suggestion(guild, c));

    finish(candidates, partial)
}

#[cfg(test)]
mod tests {
    use poise::serenity_prelude::{PermissionOverwrite, PermissionOverwriteType, Permissions};

    use super::*;
    use crate::moderation::snapshot::{VoicePresence, test_support::*};

    const INVOKER: u64 = 100;

    fn deny(channel: &mut VoiceChannel, user: u64) {
        channel.overwrites.push(PermissionOverwrite {
            allow: Permissions::empty(),
            deny: Permissions::VIEW_CHANNEL,
            kind: PermissionOverwriteType::Member(UserId::new(user)),
        });
    }

    fn sample_guild() -> GuildSnapshot {
        let mut g = guild();
        g.voice_channels = vec![
            channel(10, "General"),
            channel(11, "Music"),
            channel(12, "Staff"),
            channel(13, "AFK"),
        ];
        g.members = vec![
            connected(1, "Ann", 10),
            connected(2, "Bob", 10),
            connected(3, "Cid", 12),
            member(4, "Dee"),
            connected(5, "Eve", 11),
            member(INVOKER, "Mod"),
        ];
        // Only Cid and the invoker see Staff
        deny(&mut g.voice_channels[2], 1);
        deny(&mut g.voice_channels[2], 2);
        deny(&mut g.voice_channels[2], 5);
        g
    }

    fn values(s: &[Suggestion]) -> Vec<&str> {
        s.iter().map(|s| s.value.as_str()).collect()
    }

    #[test]
    fn test_member_suggestions_only_connected_and_reachable() {
        let mut g = sample_guild();
        deny(&mut g.voice_channels[1], INVOKER);

        let s = member_suggestions(&g, UserId::new(INVOKER), None, "", &[]);
        assert_eq!(values(&s), vec!["<@1>", "<@2>", "<@3>"]);
        assert_eq!(s[0].name, "Ann — ann");
    }

    #[test]
    fn test_member_suggestions_filter_by_state() {
        let mut g = sample_guild();
        g.members[1].voice = Some(VoicePresence {
            channel_id: ChannelId::new(10),
            muted: true,
            deafened: false,
        });
        let invoker = UserId::new(INVOKER);

        let mute = member_suggestions(&g, invoker, Some(OperationKind::Mute), "", &[]);
        assert!(!values(&mute).contains(&"<@2>"));

        let unmute = member_suggestions(&g, invoker, Some(OperationKind::Unmute), "", &[]);
        assert_eq!(values(&unmute), vec!["<@2>"]);

        let undeafen = member_suggestions(&g, invoker, Some(OperationKind::Undeafen), "", &[]);
        assert!(undeafen.is_empty());
    }

    #[test]
    fn test_member_suggestions_skip_selected_and_match_partial() {
        let g = sample_guild();
        let siblings = vec![
            ("user1".to_string(), "<@1>".to_string()),
            ("reason".to_string(), "<@2>".to_string()),
        ];
        let selected = selected_in_siblings(&siblings);
        assert_eq!(selected, vec![UserId::new(1)]);

        let s = member_suggestions(&g, UserId::new(INVOKER), None, "", &selected);
        assert_eq!(values(&s), vec!["<@2>", "<@3>", "<@5>"]);

        let s = member_suggestions(&g, UserId::new(INVOKER), None, "EV", &selected);
        assert_eq!(values(&s), vec!["<@5>"]);
    }

    #[test]
    fn test_suggestions_are_capped() {
        let mut g = guild();
        g.voice_channels = vec![channel(10, "General")];
        g.members = (1..=40).map(|i| connected(i, &format!("User{:02}", i), 10)).collect();
        g.members.push(member(INVOKER, "Mod"));

        let s = member_suggestions(&g, UserId::new(INVOKER), None, "", &[]);
        assert_eq!(s.len(), MAX_SUGGESTIONS);
        assert_eq!(s[0].value, "<@1>");
    }

    #[test]
    fn test_source_channels_exclude_empty() {
        let g = sample_guild();
        let s = source_channel_suggestions(&g, "");
        assert_eq!(values(&s), vec!["10", "11", "12"]);
        assert_eq!(s[0].name, "General (2 users)");
        assert_eq!(s[1].name, "Music (1 user)");

        assert_eq!(values(&source_channel_suggestions(&g, "mus")), vec!["11"]);
    }

    #[test]
    fn test_destination_for_target() {
        let g = sample_guild();
        let invoker = UserId::new(INVOKER);

        // Ann is in General and cannot see Staff
        let s = destination_for_target(&g, invoker, Some(UserId::new(1)), "");
        assert_eq!(values(&s), vec!["11", "13"]);
        assert_eq!(s[1].name, "AFK (empty)");

        assert!(destination_for_target(&g, invoker, None, "").is_empty());
        assert!(destination_for_target(&g, invoker, Some(UserId::new(77)), "").is_empty());
    }

    #[test]
    fn test_destination_for_target_requires_invoker_access() {
        let mut g = sample_guild();
        deny(&mut g.voice_channels[3], INVOKER);

        let s = destination_for_target(&g, UserId::new(INVOKER), Some(UserId::new(1)), "");
        assert_eq!(values(&s), vec!["11"]);
    }

    #[test]
    fn test_destination_for_members_needs_everyone() {
        let g = sample_guild();
        let invoker = UserId::new(INVOKER);

        let s = destination_for_members(&g, invoker, &[UserId::new(3)], "");
        assert_eq!(values(&s), vec!["10", "11", "12", "13"]);

        let s = destination_for_members(&g, invoker, &[UserId::new(3), UserId::new(1)], "");
        assert_eq!(values(&s), vec!["10", "11", "13"]);

        assert!(destination_for_members(&g, invoker, &[], "").is_empty());
    }

    #[test]
    fn test_destination_for_source() {
        let g = sample_guild();

        let s = destination_for_source(&g, Some(ChannelId::new(10)), "");
        assert_eq!(values(&s), vec!["11", "13"]);

        let s = destination_for_source(&g, Some(ChannelId::new(12)), "");
        assert_eq!(values(&s), vec!["10", "11", "13"]);

        assert!(destination_for_source(&g, None, "").is_empty());
        assert!(destination_for_source(&g, Some(ChannelId::new(99)), "").is_empty());
    }

    #[test]
    fn test_channel_label() {
        assert_eq!(channel_label("A", 0), "A (empty)");
        assert_eq!(channel_label("A", 1), "A (1 user)");
        assert_eq!(channel_label("A", 4), "A (4 users)");
    }
}
