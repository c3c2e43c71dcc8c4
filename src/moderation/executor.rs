use std::collections::HashMap;

use poise::serenity_prelude::UserId;
use tracing::{info, warn};

use super::access::can_access;
use super::gateway::{VoiceAction, VoiceGateway};
use super::operation::{Operation, OperationKind, OperationReport, TargetOutcome};
use super::snapshot::{GuildSnapshot, MemberState, VoicePresence};

/// Voice presence of the targets already changed by earlier calls of the same batch
#[derive(Debug, Default)]
pub struct BatchState {
    changed: HashMap<UserId, Option<VoicePresence>>,
}

impl BatchState {
    /// Presence of `member` with every successful call of the batch applied
    pub fn voice_of(&self, member: &MemberState) -> Option<VoicePresence> {
        self.changed
            .get(&member.id)
            .copied()
            .unwrap_or(member.voice)
    }

    /// Record the effect of a successful call on `before`
    pub fn record(&mut self, target: UserId, before: VoicePresence, action: VoiceAction) {
        let after = match action {
            VoiceAction::Disconnect => None,
            VoiceAction::MoveTo(channel_id) => Some(VoicePresence {
                channel_id,
                ..before
            }),
            VoiceAction::SetMute(muted) => Some(VoicePresence { muted, ..before }),
            VoiceAction::SetDeafen(deafened) => Some(VoicePresence { deafened, ..before }),
        };
        self.changed.insert(target, after);
    }
}

/// Decide what to do with one target from the snapshot state and the calls
/// already made in this batch. `Err` carries the finished outcome when no call
/// must be made; `Ok` also returns the presence the action starts from.
pub fn plan_target(
    guild: &GuildSnapshot,
    operation: &Operation,
    target: UserId,
    batch: &BatchState,
) -> Result<(VoiceAction, VoicePresence), TargetOutcome> {
    let member = guild
        .member(target)
        .ok_or_else(|| TargetOutcome::failed(target, "not a member of this server"))?;
    let voice = batch
        .voice_of(member)
        .ok_or_else(|| TargetOutcome::failed(target, "not connected to voice"))?;
    plan_action(guild, operation, target, member, voice).map(|action| (action, voice))
}

fn plan_action(
    guild: &GuildSnapshot,
    operation: &Operation,
    target: UserId,
    member: &MemberState,
    voice: VoicePresence,
) -> Result<VoiceAction, TargetOutcome> {
    match operation.kind {
        OperationKind::Disconnect => Ok(VoiceAction::Disconnect),
        OperationKind::Move => {
            let destination = operation
                .destination
                .ok_or_else(|| TargetOutcome::failed(target, "no destination given"))?;
            if voice.channel_id == destination {
                return Err(TargetOutcome::skipped(
                    target,
                    format!("already in {}", guild.channel_name(destination)),
                ));
            }
            match guild.voice_channel(destination) {
                Some(channel) if can_access(guild, channel, member) => {
                    Ok(VoiceAction::MoveTo(destination))
                }
                Some(channel) => Err(TargetOutcome::failed(
                    target,
                    format!("cannot access {}", channel.name),
                )),
                None => Err(TargetOutcome::failed(target, "destination no longer exists")),
            }
        }
        OperationKind::Mute if voice.muted => Err(TargetOutcome::failed(target, "already muted")),
        OperationKind::Mute => Ok(VoiceAction::SetMute(true)),
        OperationKind::Unmute if !voice.muted => Err(TargetOutcome::failed(target, "not muted")),
        OperationKind::Unmute => Ok(VoiceAction::SetMute(false)),
        OperationKind::Deafen if voice.deafened => {
            Err(TargetOutcome::failed(target, "already deafened"))
        }
        OperationKind::Deafen => Ok(VoiceAction::SetDeafen(true)),
        OperationKind::Undeafen if !voice.deafened => {
            Err(TargetOutcome::failed(target, "not deafened"))
        }
        OperationKind::Undeafen => Ok(VoiceAction::SetDeafen(false)),
    }
}

/// Apply `operation` to every target, one call at a time.
///
/// A failing target never stops the batch and nothing is rolled back; the report
/// holds exactly one outcome per target, in request order. A target named twice
/// is checked against the state left by its first call.
pub async fn execute<G>(gateway: &G, guild: &GuildSnapshot, operation: Operation) -> OperationReport
where
    G: VoiceGateway + ?Sized,
{
    let mut outcomes = Vec::with_capacity(operation.targets.len());
    let mut batch = BatchState::default();

    for &target in &operation.targets {
        let outcome = match plan_target(guild, &operation, target, &batch) {
            Ok((action, before)) => {
                match gateway
                    .apply(guild.guild_id, target, action, operation.reason.as_deref())
                    .await
                {
                    Ok(()) => {
                        batch.record(target, before, action);
                        TargetOutcome::success(target)
                    }
                    Err(e) => {
                        warn!(
                            "Failed to {} user {} in guild {}: {}",
                            operation.kind, target, guild.guild_id, e
                        );
                        TargetOutcome::failed(target, e.to_string())
                    }
                }
            }
            Err(outcome) => outcome,
        };
        outcomes.push(outcome);
    }

    let report = OperationReport {
        destination_name: operation.destination.map(|d| guild.channel_name(d)),
        operation,
        outcomes,
    };

    info!(
        "Executed {} for {} target(s) in guild {}: {}",
        report.operation.kind,
        report.outcomes.len(),
        guild.guild_id,
        report.tally()
    );

    report
}
