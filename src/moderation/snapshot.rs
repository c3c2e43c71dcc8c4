use std::collections::HashMap;

use poise::serenity_prelude::{
    ChannelId, ChannelType, Guild, GuildId, Member, PermissionOverwrite, Permissions, RoleId,
    UserId,
};

/// Voice presence of a connected member
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoicePresence {
    pub channel_id: ChannelId,
    pub muted: bool,
    pub deafened: bool,
}

/// A guild member as seen by the moderation engine
#[derive(Debug, Clone)]
pub struct MemberState {
    pub id: UserId,
    pub display_name: String,
    pub username: String,
    pub roles: Vec<RoleId>,
    /// `None` when the member is not connected to voice
    pub voice: Option<VoicePresence>,
}

impl MemberState {
    pub fn from_member(member: &Member, voice: Option<VoicePresence>) -> Self {
        let username = match member.user.discriminator {
            Some(disc) => format!("{}#{:04}", member.user.name, disc),
            None => member.user.name.clone(),
        };

        Self {
            id: member.user.id,
            display_name: member.display_name().to_string(),
            username,
            roles: member.roles.clone(),
            voice,
        }
    }

    /// Label shown in member suggestions
    pub fn label(&self) -> String {
        if self.display_name == self.username {
            self.username.clone()
        } else {
            format!("{} — {}", self.display_name, self.username)
        }
    }

    pub fn voice_channel(&self) -> Option<ChannelId> {
        self.voice.map(|v| v.channel_id)
    }

    pub fn is_muted(&self) -> bool {
        self.voice.is_some_and(|v| v.muted)
    }

    pub fn is_deafened(&self) -> bool {
        self.voice.is_some_and(|v| v.deafened)
    }
}

/// A voice channel with the overwrite table used for access checks
#[derive(Debug, Clone)]
pub struct VoiceChannel {
    pub id: ChannelId,
    pub name: String,
    pub overwrites: Vec<PermissionOverwrite>,
}

/// Point-in-time copy of the guild state an interaction works on.
///
/// Taken from the gateway cache once per interaction and never reused, so role or
/// overwrite changes are always visible to the next command.
#[derive(Debug, Clone)]
pub struct GuildSnapshot {
    pub guild_id: GuildId,
    pub owner_id: UserId,
    pub role_permissions: HashMap<RoleId, Permissions>,
    /// Ordered by display name
    pub members: Vec<MemberState>,
    /// Ordered by channel position
    pub voice_channels: Vec<VoiceChannel>,
}

impl GuildSnapshot {
    pub fn from_guild(guild: &Guild) -> Self {
        let mut members: Vec<MemberState> = guild
            .members
            .values()
            .map(|member| {
                let voice = guild
                    .voice_states
                    .get(&member.user.id)
                    .and_then(|state| {
                        state.channel_id.map(|channel_id| VoicePresence {
                            channel_id,
                            muted: state.mute,
                            deafened: state.deaf,
                        })
                    });
                MemberState::from_member(member, voice)
            })
            .collect();
        members.sort_by(|a, b| {
            a.display_name
                .to_lowercase()
                .cmp(&b.display_name.to_lowercase())
                .then(a.id.cmp(&b.id))
        });

        let mut channels: Vec<_> = guild
            .channels
            .values()
            .filter(|c| c.kind == ChannelType::Voice)
            .collect();
        channels.sort_by_key(|c| (c.position, c.id));
        let voice_channels = channels
            .into_iter()
            .map(|c| VoiceChannel {
                id: c.id,
                name: c.name.clone(),
                overwrites: c.permission_overwrites.clone(),
            })
            .collect();

        let role_permissions = guild
            .roles
            .iter()
            .map(|(id, role)| (*id, role.permissions))
            .collect();

        Self {
            guild_id: guild.id,
            owner_id: guild.owner_id,
            role_permissions,
            members,
            voice_channels,
        }
    }

    /// The @everyone role shares the guild's ID
    pub fn everyone_role(&self) -> RoleId {
        RoleId::new(self.guild_id.get())
    }

    pub fn member(&self, id: UserId) -> Option<&MemberState> {
        self.members.iter().find(|m| m.id == id)
    }

    pub fn voice_channel(&self, id: ChannelId) -> Option<&VoiceChannel> {
        self.voice_channels.iter().find(|c| c.id == id)
    }

    /// Look up a voice channel from an option value (`123` or `<#123>`)
    pub fn find_voice_channel(&self, raw: &str) -> Option<&VoiceChannel> {
        let raw = raw.trim();
        let digits = raw
            .strip_prefix("<#")
            .and_then(|r| r.strip_suffix('>'))
            .unwrap_or(raw);
        let id = digits.parse::<u64>().ok().filter(|id| *id != 0)?;
        self.voice_channel(ChannelId::new(id))
    }

    /// Members currently connected to `channel_id`, in snapshot order
    pub fn occupants(&self, channel_id: ChannelId) -> Vec<&MemberState> {
        self.members
            .iter()
            .filter(|m| m.voice_channel() == Some(channel_id))
            .collect()
    }

    pub fn occupant_count(&self, channel_id: ChannelId) -> usize {
        self.members
            .iter()
            .filter(|m| m.voice_channel() == Some(channel_id))
            .count()
    }

    /// Display name of a channel, falling back to its mention
    pub fn channel_name(&self, channel_id: ChannelId) -> String {
        self.voice_channel(channel_id)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| format!("<#{}>", channel_id))
    }
}
