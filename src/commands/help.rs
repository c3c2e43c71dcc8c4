use crate::models::{Context, Error};

/// Show the available commands
#[poise::command(slash_command, prefix_command)]
pub async fn help(
    ctx: Context<'_>,
    #[description = "Command to show help about"]
    #[autocomplete = "poise::builtins::autocomplete_command"]
    command: Option<String>,
) -> Result<(), Error> {
    poise::builtins::help(
        ctx,
        command.as_deref(),
        poise::builtins::HelpConfiguration {
            extra_text_at_bottom: "Voice commands take a mention or a user ID; bulk slots also accept comma-separated lists.",
            ephemeral: true,
            ..Default::default()
        },
    )
    .await?;
    Ok(())
}
