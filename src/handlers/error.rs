use poise::FrameworkError;
use tracing::{error, warn};

use crate::{
    models::{Context, Data, Error},
    utils::{
        messages::{build_permission_error, format_error},
        validation::ValidationError,
    },
};

/// Text shown to the invoker when a command returns an error
fn command_error_message(error: &Error) -> String {
    match error.downcast_ref::<ValidationError>() {
        Some(validation) => format_error(&validation.to_string()),
        None => format_error("Something went wrong while running this command."),
    }
}

async fn reply_private(ctx: Context<'_>, content: String) {
    let reply = poise::CreateReply::default().content(content).ephemeral(true);
    if let Err(e) = ctx.send(reply).await {
        warn!("Failed to send error reply for '{}': {}", ctx.command().name, e);
    }
}

/// Answer the invoker privately for the errors they can act on, defer the rest to poise
pub async fn on_error(error: FrameworkError<'_, Data, Error>) {
    match error {
        FrameworkError::Command { error, ctx, .. } => {
            if error.downcast_ref::<ValidationError>().is_none() {
                error!(
                    "Command '{}' failed for {}: {}",
                    ctx.command().name,
                    ctx.author().id,
                    error
                );
            }
            reply_private(ctx, command_error_message(&error)).await;
        }
        FrameworkError::MissingUserPermissions {
            missing_permissions,
            ctx,
            ..
        } => {
            let required = missing_permissions
                .map(|p| p.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            reply_private(ctx, build_permission_error(&required)).await;
        }
        FrameworkError::MissingBotPermissions {
            missing_permissions,
            ctx,
            ..
        } => {
            warn!(
                "Missing bot permissions for '{}': {}",
                ctx.command().name,
                missing_permissions
            );
            reply_private(
                ctx,
                format_error(&format!("I am missing permissions: {}", missing_permissions)),
            )
            .await;
        }
        FrameworkError::CooldownHit {
            remaining_cooldown,
            ctx,
            ..
        } => {
            reply_private(
                ctx,
                format_error(&format!(
                    "Slow down, try again in {} seconds.",
                    remaining_cooldown.as_secs().max(1)
                )),
            )
            .await;
        }
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                error!("Error while handling error: {}", e);
            }
        }
    }
}
