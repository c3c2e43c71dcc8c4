use chrono::Utc;
use tracing::info;

use super::autocomplete::{
    autocomplete_deafened, autocomplete_destination_for_members, autocomplete_destination_for_source,
    autocomplete_destination_for_user, autocomplete_member, autocomplete_muted,
    autocomplete_source, autocomplete_undeafened, autocomplete_unmuted,
};
use super::{guild_snapshot, reply_private};
use crate::{
    models::{Context, Error},
    moderation::{
        Addressing, CommandInput, HttpVoiceGateway, OperationKind, OperationReport, TargetScope,
        operation::TargetOutcome,
        audit::{self, AuditEntry, HttpLogSender, log_footer},
        executor, validate,
    },
    utils::{
        messages::{format_error, format_success, format_warning, truncate_message},
        validation::require_guild,
    },
};

/// Discord's message content limit
const MESSAGE_LIMIT: usize = 2000;

/// Public summary of an executed operation
fn report_message(report: &OperationReport) -> String {
    let header = format!("{}: {}", report.operation.kind.title(), report.tally());
    let header = if report.outcomes.iter().all(TargetOutcome::is_success) {
        format_success(&header)
    } else {
        format_warning(&header)
    };

    let mut lines = vec![header];
    if let Some(reason) = &report.operation.reason {
        lines.push(format!("**Reason:** {}", reason));
    }
    lines.extend(report.lines());
    truncate_message(&lines.join("\n"), MESSAGE_LIMIT)
}

/// Validate, execute, report and log one voice moderation command
async fn run_voice_command(ctx: Context<'_>, input: CommandInput) -> Result<(), Error> {
    let guild_id = require_guild(ctx.guild_id())?;
    let Some(guild) = guild_snapshot(ctx) else {
        reply_private(ctx, format_error("This server is not available yet, try again shortly.")).await?;
        return Ok(());
    };

    let operation = match validate(&guild, ctx.author().id, input) {
        Ok(operation) => operation,
        Err(e) => {
            info!(
                "Rejected {} from {} in guild {}: {}",
                ctx.command().name,
                ctx.author().id,
                guild_id,
                e
            );
            reply_private(ctx, format_error(&e.to_string())).await?;
            return Ok(());
        }
    };

    if operation.should_defer() {
        ctx.defer().await?;
    }

    let source_name = match operation.scope {
        TargetScope::Channel(source) => Some(guild.channel_name(source)),
        _ => None,
    };
    let http = ctx.serenity_context().http.clone();
    let gateway = HttpVoiceGateway::new(http.clone());
    let report = executor::execute(&gateway, &guild, operation).await;

    ctx.say(report_message(&report)).await?;

    let entry = AuditEntry::from_report(&report, source_name.as_deref()).with_footer(log_footer(
        guild_id,
        Utc::now(),
        ctx.data().log_timezone,
    ));
    audit::emit(
        &HttpLogSender::new(http),
        ctx.data().log_channel_for(guild_id),
        &[entry],
    )
    .await;

    Ok(())
}

fn single(kind: OperationKind, user: String, reason: Option<String>) -> CommandInput {
    CommandInput {
        kind,
        addressing: Addressing::Single(user),
        destination: None,
        reason,
    }
}

/// Filled `userN` slots in slot order
fn bulk_slots(slots: [Option<String>; 5]) -> Addressing {
    Addressing::Bulk(slots.into_iter().flatten().collect())
}

/// Disconnect a member from voice
#[poise::command(
    slash_command,
    guild_only,
    rename = "disconnect",
    required_permissions = "MOVE_MEMBERS"
)]
pub async fn disconnect(
    ctx: Context<'_>,
    #[description = "Member to disconnect"]
    #[autocomplete = "autocomplete_member"]
    user: String,
    #[description = "Reason for the moderation log"] reason: Option<String>,
) -> Result<(), Error> {
    run_voice_command(ctx, single(OperationKind::Disconnect, user, reason)).await
}

/// Disconnect up to five members from voice
#[poise::command(
    slash_command,
    guild_only,
    rename = "disconnect-bulk",
    required_permissions = "MOVE_MEMBERS"
)]
#[allow(clippy::too_many_arguments)]
pub async fn disconnect_bulk(
    ctx: Context<'_>,
    #[description = "Member (or comma-separated members)"]
    #[autocomplete = "autocomplete_member"]
    user1: String,
    #[description = "Member"]
    #[autocomplete = "autocomplete_member"]
    user2: Option<String>,
    #[description = "Member"]
    #[autocomplete = "autocomplete_member"]
    user3: Option<String>,
    #[description = "Member"]
    #[autocomplete = "autocomplete_member"]
    user4: Option<String>,
    #[description = "Member"]
    #[autocomplete = "autocomplete_member"]
    user5: Option<String>,
    #[description = "Reason for the moderation log"] reason: Option<String>,
) -> Result<(), Error> {
    let input = CommandInput {
        kind: OperationKind::Disconnect,
        addressing: bulk_slots([Some(user1), user2, user3, user4, user5]),
        destination: None,
        reason,
    };
    run_voice_command(ctx, input).await
}

/// Disconnect everyone in a voice channel
#[poise::command(
    slash_command,
    guild_only,
    rename = "disconnect-channel",
    required_permissions = "MOVE_MEMBERS"
)]
pub async fn disconnect_channel(
    ctx: Context<'_>,
    #[description = "Voice channel to empty"]
    #[autocomplete = "autocomplete_source"]
    channel: String,
    #[description = "Reason for the moderation log"] reason: Option<String>,
) -> Result<(), Error> {
    let input = CommandInput {
        kind: OperationKind::Disconnect,
        addressing: Addressing::Channel(channel),
        destination: None,
        reason,
    };
    run_voice_command(ctx, input).await
}

/// Move a member to another voice channel
#[poise::command(
    slash_command,
    guild_only,
    rename = "move",
    required_permissions = "MOVE_MEMBERS"
)]
pub async fn move_member(
    ctx: Context<'_>,
    #[description = "Member to move"]
    #[autocomplete = "autocomplete_member"]
    user: String,
    #[description = "Destination voice channel"]
    #[autocomplete = "autocomplete_destination_for_user"]
    destination: String,
    #[description = "Reason for the moderation log"] reason: Option<String>,
) -> Result<(), Error> {
    let input = CommandInput {
        destination: Some(destination),
        ..single(OperationKind::Move, user, reason)
    };
    run_voice_command(ctx, input).await
}

/// Move up to five members to another voice channel
#[poise::command(
    slash_command,
    guild_only,
    rename = "move-bulk",
    required_permissions = "MOVE_MEMBERS"
)]
#[allow(clippy::too_many_arguments)]
pub async fn move_bulk(
    ctx: Context<'_>,
    #[description = "Destination voice channel"]
    #[autocomplete = "autocomplete_destination_for_members"]
    destination: String,
    #[description = "Member (or comma-separated members)"]
    #[autocomplete = "autocomplete_member"]
    user1: String,
    #[description = "Member"]
    #[autocomplete = "autocomplete_member"]
    user2: Option<String>,
    #[description = "Member"]
    #[autocomplete = "autocomplete_member"]
    user3: Option<String>,
    #[description = "Member"]
    #[autocomplete = "autocomplete_member"]
    user4: Option<String>,
    #[description = "Member"]
    #[autocomplete = "autocomplete_member"]
    user5: Option<String>,
    #[description = "Reason for the moderation log"] reason: Option<String>,
) -> Result<(), Error> {
    let input = CommandInput {
        kind: OperationKind::Move,
        addressing: bulk_slots([Some(user1), user2, user3, user4, user5]),
        destination: Some(destination),
        reason,
    };
    run_voice_command(ctx, input).await
}

/// Move everyone in a voice channel to another one
#[poise::command(
    slash_command,
    guild_only,
    rename = "move-channel",
    required_permissions = "MOVE_MEMBERS"
)]
pub async fn move_channel(
    ctx: Context<'_>,
    #[description = "Voice channel to empty"]
    #[autocomplete = "autocomplete_source"]
    source: String,
    #[description = "Destination voice channel"]
    #[autocomplete = "autocomplete_destination_for_source"]
    destination: String,
    #[description = "Reason for the moderation log"] reason: Option<String>,
) -> Result<(), Error> {
    let input = CommandInput {
        kind: OperationKind::Move,
        addressing: Addressing::Channel(source),
        destination: Some(destination),
        reason,
    };
    run_voice_command(ctx, input).await
}

/// Server-mute a member
#[poise::command(
    slash_command,
    guild_only,
    rename = "mute",
    required_permissions = "MUTE_MEMBERS"
)]
pub async fn mute(
    ctx: Context<'_>,
    #[description = "Member to mute"]
    #[autocomplete = "autocomplete_unmuted"]
    user: String,
    #[description = "Reason for the moderation log"] reason: Option<String>,
) -> Result<(), Error> {
    run_voice_command(ctx, single(OperationKind::Mute, user, reason)).await
}

/// Remove a member's server mute
#[poise::command(
    slash_command,
    guild_only,
    rename = "unmute",
    required_permissions = "MUTE_MEMBERS"
)]
pub async fn unmute(
    ctx: Context<'_>,
    #[description = "Member to unmute"]
    #[autocomplete = "autocomplete_muted"]
    user: String,
    #[description = "Reason for the moderation log"] reason: Option<String>,
) -> Result<(), Error> {
    run_voice_command(ctx, single(OperationKind::Unmute, user, reason)).await
}

/// Server-deafen a member
#[poise::command(
    slash_command,
    guild_only,
    rename = "deafen",
    required_permissions = "DEAFEN_MEMBERS"
)]
pub async fn deafen(
    ctx: Context<'_>,
    #[description = "Member to deafen"]
    #[autocomplete = "autocomplete_undeafened"]
    user: String,
    #[description = "Reason for the moderation log"] reason: Option<String>,
) -> Result<(), Error> {
    run_voice_command(ctx, single(OperationKind::Deafen, user, reason)).await
}

/// Remove a member's server deafen
#[poise::command(
    slash_command,
    guild_only,
    rename = "undeafen",
    required_permissions = "DEAFEN_MEMBERS"
)]
pub async fn undeafen(
    ctx: Context<'_>,
    #[description = "Member to undeafen"]
    #[autocomplete = "autocomplete_deafened"]
    user: String,
    #[description = "Reason for the moderation log"] reason: Option<String>,
) -> Result<(), Error> {
    run_voice_command(ctx, single(OperationKind::Undeafen, user, reason)).await
}

#[cfg(test)]
mod tests {
    use poise::serenity_prelude::{ChannelId, UserId};

    use super::*;
    use crate::moderation::operation::Operation;

    fn report(outcomes: Vec<TargetOutcome>, reason: Option<&str>) -> OperationReport {
        OperationReport {
            operation: Operation {
                kind: OperationKind::Move,
                scope: TargetScope::Bulk,
                invoker: UserId::new(100),
                targets: outcomes.iter().map(|o| o.target).collect(),
                destination: Some(ChannelId::new(11)),
                reason: reason.map(str::to_string),
            },
            outcomes,
            destination_name: Some("Music".to_string()),
        }
    }

    #[test]
    fn test_report_message_all_succeeded() {
        let r = report(vec![TargetOutcome::success(UserId::new(1))], Some("afk"));
        assert_eq!(
            report_message(&r),
            "✅ Voice Move: 1 succeeded, 0 skipped, 0 failed\n**Reason:** afk\n<@1> -> moved to Music"
        );
    }

    #[test]
    fn test_report_message_warns_on_partial_failure() {
        let r = report(
            vec![
                TargetOutcome::success(UserId::new(1)),
                TargetOutcome::failed(UserId::new(2), "Missing Permissions"),
            ],
            None,
        );
        let message = report_message(&r);
        assert!(message.starts_with("⚠️ Voice Move: 1 succeeded, 0 skipped, 1 failed"));
        assert!(message.ends_with("<@2> -> error: Missing Permissions"));
        assert!(!message.contains("Reason"));
    }

    #[test]
    fn test_bulk_slots_keep_slot_order() {
        let Addressing::Bulk(raws) = bulk_slots([
            Some("<@1>".into()),
            None,
            Some("3, 4".into()),
            None,
            Some("5".into()),
        ]) else {
            panic!("expected bulk addressing");
        };
        assert_eq!(raws, vec!["<@1>", "3, 4", "5"]);
    }
}
