use std::sync::Arc;

use poise::serenity_prelude::{self as serenity, ChannelId, EditMember, GuildId, UserId};
use ::serenity::async_trait;

use crate::models::Error;

/// A single voice-state mutation sent to Discord
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceAction {
    Disconnect,
    MoveTo(ChannelId),
    SetMute(bool),
    SetDeafen(bool),
}

/// Platform calls the bulk executor needs
#[async_trait]
pub trait VoiceGateway: Send + Sync {
    async fn apply(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        action: VoiceAction,
        reason: Option<&str>,
    ) -> Result<(), Error>;
}

/// [`VoiceGateway`] backed by the Discord HTTP API
pub struct HttpVoiceGateway {
    http: Arc<serenity::Http>,
}

impl HttpVoiceGateway {
    pub fn new(http: Arc<serenity::Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl VoiceGateway for HttpVoiceGateway {
    async fn apply(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        action: VoiceAction,
        reason: Option<&str>,
    ) -> Result<(), Error> {
        let mut edit = match action {
            VoiceAction::Disconnect => EditMember::new().disconnect_member(),
            VoiceAction::MoveTo(channel_id) => EditMember::new().voice_channel(channel_id),
            VoiceAction::SetMute(muted) => EditMember::new().mute(muted),
            VoiceAction::SetDeafen(deafened) => EditMember::new().deafen(deafened),
        };
        if let Some(reason) = reason {
            edit = edit.audit_log_reason(reason);
        }

        guild_id.edit_member(&self.http, user_id, edit).await?;
        Ok(())
    }
}
