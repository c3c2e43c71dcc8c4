use poise::serenity_prelude::UserId;

use super::access::can_access;
use super::operation::{Operation, OperationKind, TargetScope};
use super::snapshot::GuildSnapshot;
use crate::{
    constants::MAX_BULK_TARGETS,
    utils::{
        references::{resolve_all, resolve_references},
        string_utils::non_blank,
        validation::ValidationError,
    },
};

/// How the invoker named the targets, as raw option values
#[derive(Debug, Clone)]
pub enum Addressing {
    Single(String),
    /// Every filled `userN` slot, in slot order
    Bulk(Vec<String>),
    /// Source channel option value
    Channel(String),
}

/// Raw slash-command input before validation
#[derive(Debug, Clone)]
pub struct CommandInput {
    pub kind: OperationKind,
    pub addressing: Addressing,
    pub destination: Option<String>,
    pub reason: Option<String>,
}

/// Turn raw command input into an [`Operation`], or reject it before anything is changed.
///
/// Moves are only accepted when every target that is a guild member can access the
/// destination; member-addressed moves also require the invoker to access it.
pub fn validate(
    guild: &GuildSnapshot,
    invoker: UserId,
    input: CommandInput,
) -> Result<Operation, ValidationError> {
    let (scope, targets) = resolve_targets(guild, &input.addressing)?;

    let destination = if input.kind.needs_destination() {
        let raw = input
            .destination
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .ok_or(ValidationError::MissingDestination)?;
        let channel = guild
            .find_voice_channel(raw)
            .ok_or_else(|| ValidationError::InvalidChannel(raw.to_string()))?;

        for target in &targets {
            if let Some(member) = guild.member(*target)
                && !can_access(guild, channel, member)
            {
                return Err(ValidationError::DestinationInaccessible {
                    member: member.id,
                    channel: channel.name.clone(),
                });
            }
        }

        if !matches!(scope, TargetScope::Channel(_)) {
            let invoker_ok = guild
                .member(invoker)
                .is_some_and(|m| can_access(guild, channel, m));
            if !invoker_ok {
                return Err(ValidationError::InvokerCannotAccess(channel.name.clone()));
            }
        }

        Some(channel.id)
    } else {
        None
    };

    Ok(Operation {
        kind: input.kind,
        scope,
        invoker,
        targets,
        destination,
        reason: non_blank(input.reason),
    })
}

fn resolve_targets(
    guild: &GuildSnapshot,
    addressing: &Addressing,
) -> Result<(TargetScope, Vec<UserId>), ValidationError> {
    match addressing {
        Addressing::Single(raw) => {
            let id = resolve_references(raw)
                .into_iter()
                .next()
                .map(UserId::new)
                .ok_or(ValidationError::NoValidTargets)?;
            if guild.member(id).is_none() {
                return Err(ValidationError::UnknownMember(id));
            }
            Ok((TargetScope::Single, vec![id]))
        }
        Addressing::Bulk(raws) => {
            let ids: Vec<UserId> = resolve_all(raws).into_iter().map(UserId::new).collect();
            if ids.len() > MAX_BULK_TARGETS {
                return Err(ValidationError::TooManyTargets {
                    max: MAX_BULK_TARGETS,
                    got: ids.len(),
                });
            }
            // Unknown members stay in the list and get their own error outcome,
            // but at least one must be real
            if !ids.iter().any(|id| guild.member(*id).is_some()) {
                return Err(ValidationError::NoValidTargets);
            }
            Ok((TargetScope::Bulk, ids))
        }
        Addressing::Channel(raw) => {
            let source = guild
                .find_voice_channel(raw)
                .ok_or_else(|| ValidationError::InvalidChannel(raw.clone()))?;
            let targets: Vec<UserId> = guild.occupants(source.id).iter().map(|m| m.id).collect();
            if targets.is_empty() {
                return Err(ValidationError::EmptySource(source.name.clone()));
            }
            Ok((TargetScope::Channel(source.id), targets))
        }
    }
}

#[cfg(test)]
mod tests {
    use poise::serenity_prelude::{
        ChannelId, PermissionOverwrite, PermissionOverwriteType, Permissions,
    };

    use super::*;
    use crate::moderation::snapshot::test_support::*;

    const INVOKER: u64 = 100;

    fn sample_guild() -> GuildSnapshot {
        let mut g = guild();
        g.voice_channels = vec![channel(10, "General"), channel(11, "Music"), channel(12, "Empty")];
        g.members = vec![
            connected(1, "Ann", 10),
            connected(2, "Bob", 10),
            member(3, "Cid"),
            connected(INVOKER, "Mod", 11),
        ];
        g
    }

    fn deny_member(channel: &mut crate::moderation::snapshot::VoiceChannel, user: u64) {
        channel.overwrites.push(PermissionOverwrite {
            allow: Permissions::empty(),
            deny: Permissions::CONNECT,
            kind: PermissionOverwriteType::Member(UserId::new(user)),
        });
    }

    fn input(kind: OperationKind, addressing: Addressing) -> CommandInput {
        CommandInput {
            kind,
            addressing,
            destination: None,
            reason: None,
        }
    }

    #[test]
    fn test_single_target_takes_first_reference() {
        let g = sample_guild();
        let op = validate(
            &g,
            UserId::new(INVOKER),
            input(OperationKind::Mute, Addressing::Single("<@2>, <@1>".into())),
        )
        .unwrap();

        assert_eq!(op.scope, TargetScope::Single);
        assert_eq!(op.targets, vec![UserId::new(2)]);
        assert_eq!(op.destination, None);
    }

    #[test]
    fn test_single_target_rejects_garbage_and_strangers() {
        let g = sample_guild();
        let invoker = UserId::new(INVOKER);

        assert_eq!(
            validate(&g, invoker, input(OperationKind::Mute, Addressing::Single("bob".into()))),
            Err(ValidationError::NoValidTargets)
        );
        assert_eq!(
            validate(&g, invoker, input(OperationKind::Mute, Addressing::Single("77".into()))),
            Err(ValidationError::UnknownMember(UserId::new(77)))
        );
    }

    #[test]
    fn test_bulk_combines_slots_and_keeps_duplicates() {
        let g = sample_guild();
        let op = validate(
            &g,
            UserId::new(INVOKER),
            input(
                OperationKind::Disconnect,
                Addressing::Bulk(vec!["<@1>".into(), "2, 1".into(), "junk".into(), "77".into()]),
            ),
        )
        .unwrap();

        assert_eq!(op.scope, TargetScope::Bulk);
        let ids: Vec<u64> = op.targets.iter().map(|id| id.get()).collect();
        assert_eq!(ids, vec![1, 2, 1, 77]);
    }

    #[test]
    fn test_bulk_is_bounded() {
        let g = sample_guild();
        let result = validate(
            &g,
            UserId::new(INVOKER),
            input(
                OperationKind::Disconnect,
                Addressing::Bulk(vec!["1, 2, 3".into(), "1, 2, 3".into()]),
            ),
        );
        assert_eq!(
            result,
            Err(ValidationError::TooManyTargets { max: 5, got: 6 })
        );
    }

    #[test]
    fn test_bulk_needs_one_real_member() {
        let g = sample_guild();
        let result = validate(
            &g,
            UserId::new(INVOKER),
            input(OperationKind::Disconnect, Addressing::Bulk(vec!["77, 78".into()])),
        );
        assert_eq!(result, Err(ValidationError::NoValidTargets));
    }

    #[test]
    fn test_channel_scope_snapshots_occupants() {
        let g = sample_guild();
        let op = validate(
            &g,
            UserId::new(INVOKER),
            input(OperationKind::Disconnect, Addressing::Channel("10".into())),
        )
        .unwrap();

        assert_eq!(op.scope, TargetScope::Channel(ChannelId::new(10)));
        assert_eq!(op.targets, vec![UserId::new(1), UserId::new(2)]);
    }

    #[test]
    fn test_channel_scope_rejects_empty_and_unknown() {
        let g = sample_guild();
        let invoker = UserId::new(INVOKER);

        assert_eq!(
            validate(&g, invoker, input(OperationKind::Disconnect, Addressing::Channel("12".into()))),
            Err(ValidationError::EmptySource("Empty".into()))
        );
        assert_eq!(
            validate(&g, invoker, input(OperationKind::Disconnect, Addressing::Channel("99".into()))),
            Err(ValidationError::InvalidChannel("99".into()))
        );
    }

    #[test]
    fn test_move_requires_destination() {
        let g = sample_guild();
        let result = validate(
            &g,
            UserId::new(INVOKER),
            input(OperationKind::Move, Addressing::Single("1".into())),
        );
        assert_eq!(result, Err(ValidationError::MissingDestination));
    }

    #[test]
    fn test_move_rejects_destination_a_target_cannot_join() {
        let mut g = sample_guild();
        deny_member(&mut g.voice_channels[1], 2);

        let mut req = input(
            OperationKind::Move,
            Addressing::Bulk(vec!["1".into(), "2".into()]),
        );
        req.destination = Some("11".into());

        assert_eq!(
            validate(&g, UserId::new(INVOKER), req),
            Err(ValidationError::DestinationInaccessible {
                member: UserId::new(2),
                channel: "Music".into()
            })
        );
    }

    #[test]
    fn test_member_move_requires_invoker_access_but_channel_move_does_not() {
        let mut g = sample_guild();
        deny_member(&mut g.voice_channels[2], INVOKER);

        let mut single = input(OperationKind::Move, Addressing::Single("1".into()));
        single.destination = Some("12".into());
        assert_eq!(
            validate(&g, UserId::new(INVOKER), single),
            Err(ValidationError::InvokerCannotAccess("Empty".into()))
        );

        let mut whole = input(OperationKind::Move, Addressing::Channel("10".into()));
        whole.destination = Some("12".into());
        let op = validate(&g, UserId::new(INVOKER), whole).unwrap();
        assert_eq!(op.destination, Some(ChannelId::new(12)));
    }

    #[test]
    fn test_reason_is_normalized_and_destination_ignored_for_non_moves() {
        let g = sample_guild();
        let mut req = input(OperationKind::Deafen, Addressing::Single("1".into()));
        req.destination = Some("11".into());
        req.reason = Some("   ".into());

        let op = validate(&g, UserId::new(INVOKER), req).unwrap();
        assert_eq!(op.destination, None);
        assert_eq!(op.reason, None);
    }
}
