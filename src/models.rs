use std::sync::Arc;

use chrono_tz::Tz;
use poise::serenity_prelude::{ChannelId, GuildId};

use crate::store::GuildConfigStore;

/// Bot state shared across all handlers
#[derive(Clone)]
pub struct Data {
    /// Per-guild log channels, also read by the retention sweep
    pub config_store: Arc<GuildConfigStore>,
    /// Log channel used for guilds without their own entry
    pub fallback_log_channel: Option<ChannelId>,
    /// Zone used to render local times in log embeds
    pub log_timezone: Tz,
}

impl Data {
    pub fn new(
        config_store: Arc<GuildConfigStore>,
        fallback_log_channel: Option<ChannelId>,
        log_timezone: Tz,
    ) -> Self {
        Self {
            config_store,
            fallback_log_channel,
            log_timezone,
        }
    }

    /// Where moderation logs of `guild_id` go, if anywhere
    pub fn log_channel_for(&self, guild_id: GuildId) -> Option<ChannelId> {
        self.config_store
            .log_channel(guild_id)
            .or(self.fallback_log_channel)
    }
}

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_channel_falls_back_to_environment_channel() {
        let store = Arc::new(GuildConfigStore::in_memory("unused.json"));
        let data = Data::new(store, Some(ChannelId::new(99)), Tz::UTC);
        assert_eq!(data.log_channel_for(GuildId::new(1)), Some(ChannelId::new(99)));

        let data = Data::new(data.config_store.clone(), None, Tz::UTC);
        assert_eq!(data.log_channel_for(GuildId::new(1)), None);
    }
}
