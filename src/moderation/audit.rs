use std::sync::Arc;

use ::serenity::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use poise::serenity_prelude::{
    self as serenity, ChannelId, Colour, CreateEmbed, CreateEmbedFooter, CreateMessage, MessageId,
    Timestamp, UserId,
};
use tracing::{debug, info, warn};

use super::operation::{OperationKind, OperationReport, TargetScope};
use crate::{
    constants::NO_REASON_PLACEHOLDER,
    models::Error,
    utils::messages::truncate_message,
};

/// Discord's embed description limit
const EMBED_DESCRIPTION_LIMIT: usize = 4096;

/// A moderation log entry, rendered as one embed
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub title: String,
    pub colour: Colour,
    pub lines: Vec<String>,
    pub footer: Option<String>,
}

impl AuditEntry {
    /// Summary of an executed voice operation: who, what, on whom, why, and how it went
    pub fn from_report(report: &OperationReport, source_name: Option<&str>) -> Self {
        let op = &report.operation;
        let title = match op.scope {
            TargetScope::Single => op.kind.title().to_string(),
            TargetScope::Bulk => format!("{} (bulk)", op.kind.title()),
            TargetScope::Channel(_) => format!("{} (channel)", op.kind.title()),
        };

        let mut lines = vec![
            format!("**By:** <@{}>", op.invoker),
            format!("**Action:** {}", op.kind),
        ];
        if let Some(source) = source_name {
            lines.push(format!("**Source:** {}", source));
        }
        if let Some(destination) = &report.destination_name {
            lines.push(format!("**Destination:** {}", destination));
        }
        let targets: Vec<String> = op.targets.iter().map(|t| format!("<@{}>", t)).collect();
        lines.push(format!("**Targets:** {}", targets.join(", ")));
        lines.push(format!("**Reason:** {}", reason_or_placeholder(op.reason.as_deref())));
        lines.push(format!("**Results:** {}", report.tally()));
        lines.extend(report.lines());

        Self {
            title,
            colour: kind_colour(op.kind),
            lines,
            footer: None,
        }
    }

    pub fn with_footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    pub fn description(&self) -> String {
        truncate_message(&self.lines.join("\n"), EMBED_DESCRIPTION_LIMIT)
    }

    pub fn to_embed(&self) -> CreateEmbed {
        let mut embed = CreateEmbed::new()
            .title(&self.title)
            .description(self.description())
            .colour(self.colour)
            .timestamp(Timestamp::now());
        if let Some(footer) = &self.footer {
            embed = embed.footer(CreateEmbedFooter::new(footer));
        }
        embed
    }
}

pub fn reason_or_placeholder(reason: Option<&str>) -> &str {
    reason.unwrap_or(NO_REASON_PLACEHOLDER)
}

fn kind_colour(kind: OperationKind) -> Colour {
    match kind {
        OperationKind::Disconnect => Colour::RED,
        OperationKind::Move => Colour::BLUE,
        OperationKind::Mute | OperationKind::Deafen => Colour::ORANGE,
        OperationKind::Unmute | OperationKind::Undeafen => Colour::DARK_GREEN,
    }
}

/// A message removed with the `delete` text command
#[derive(Debug, Clone)]
pub struct DeletedMessage {
    pub message_id: MessageId,
    pub author: UserId,
    pub channel_id: ChannelId,
    pub created_at: DateTime<Utc>,
    pub content: String,
    pub attachments: Vec<String>,
}

impl DeletedMessage {
    /// Context embed: who removed what, where, when it was written and why
    pub fn context_entry(&self, moderator: &str, reason: Option<&str>) -> AuditEntry {
        let unix = self.created_at.timestamp();
        AuditEntry {
            title: format!("🗑️ Message deleted by {}", moderator),
            colour: Colour::DARK_RED,
            lines: vec![
                format!("**Author:** <@{}>", self.author),
                format!("**Channel:** <#{}>", self.channel_id),
                format!("**Sent:** <t:{}:F> (<t:{}:R>)", unix, unix),
                format!("**Reason:** {}", reason_or_placeholder(reason)),
            ],
            footer: Some(format!("Message ID: {}", self.message_id)),
        }
    }

    /// Copy of the original content and attachment links
    pub fn copy_entry(&self) -> AuditEntry {
        let mut lines = Vec::new();
        if self.content.trim().is_empty() {
            lines.push("*(no text content)*".to_string());
        } else {
            lines.push(self.content.clone());
        }
        lines.extend(self.attachments.iter().map(|url| format!("📎 {}", url)));

        AuditEntry {
            title: "Original message".to_string(),
            colour: Colour::LIGHT_GREY,
            lines,
            footer: Some(format!("Author ID: {}", self.author)),
        }
    }
}

/// Footer naming the guild and the local time of the log
pub fn log_footer(guild_id: impl std::fmt::Display, now: DateTime<Utc>, timezone: Tz) -> String {
    format!(
        "Guild: {} • {}",
        guild_id,
        now.with_timezone(&timezone).format("%Y-%m-%d %H:%M:%S %Z")
    )
}

/// Delivery of log messages
#[async_trait]
pub trait LogSender: Send + Sync {
    async fn send_embed(&self, channel_id: ChannelId, embed: CreateEmbed) -> Result<(), Error>;

    async fn send_text(&self, channel_id: ChannelId, content: String) -> Result<(), Error>;
}

/// [`LogSender`] backed by the Discord HTTP API
pub struct HttpLogSender {
    http: Arc<serenity::Http>,
}

impl HttpLogSender {
    pub fn new(http: Arc<serenity::Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl LogSender for HttpLogSender {
    async fn send_embed(&self, channel_id: ChannelId, embed: CreateEmbed) -> Result<(), Error> {
        channel_id
            .send_message(&self.http, CreateMessage::new().embed(embed))
            .await?;
        Ok(())
    }

    async fn send_text(&self, channel_id: ChannelId, content: String) -> Result<(), Error> {
        channel_id
            .send_message(&self.http, CreateMessage::new().content(content))
            .await?;
        Ok(())
    }
}

/// Best-effort delivery of `entries` to the log channel.
///
/// Returns whether everything was delivered; failures are only traced so the
/// invoker's response never depends on the log channel.
pub async fn emit<S>(sender: &S, log_channel: Option<ChannelId>, entries: &[AuditEntry]) -> bool
where
    S: LogSender + ?Sized,
{
    let Some(channel_id) = log_channel else {
        debug!("No log channel configured, skipping {} log entries", entries.len());
        return false;
    };

    for entry in entries {
        if let Err(e) = sender.send_embed(channel_id, entry.to_embed()).await {
            warn!(
                "Failed to deliver '{}' to log channel {}: {}",
                entry.title, channel_id, e
            );
            return false;
        }
    }

    info!("Logged {} entries to channel {}", entries.len(), channel_id);
    true
}
