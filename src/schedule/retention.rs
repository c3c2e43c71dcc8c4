use std::sync::Arc;

use ::serenity::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use poise::serenity_prelude::{self as serenity, ChannelId, GetMessages, GuildId, MessageId};
use tracing::{error, info, warn};

use crate::{
    constants::{BULK_DELETE_MAX_AGE_DAYS, LOG_RETENTION_DAYS, MESSAGE_BATCH_SIZE},
    models::Error,
};

/// Milliseconds between the Unix epoch and the first Discord snowflake
const DISCORD_EPOCH_MS: i64 = 1_420_070_400_000;

/// Margin kept below the bulk-delete age limit so a slow sweep does not cross it
const BULK_DELETE_SAFETY_MINUTES: i64 = 60;

/// Creation time encoded in a snowflake
pub fn snowflake_created_at(id: u64) -> DateTime<Utc> {
    let ms = (id >> 22) as i64 + DISCORD_EPOCH_MS;
    Utc.timestamp_millis_opt(ms)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Smallest snowflake that can be created at `time`; `None` before the Discord epoch
pub fn snowflake_at(time: DateTime<Utc>) -> Option<MessageId> {
    let offset = time.timestamp_millis() - DISCORD_EPOCH_MS;
    if offset <= 0 {
        return None;
    }
    Some(MessageId::new((offset as u64) << 22))
}

/// Messages created strictly before this instant are expired
pub fn retention_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::days(LOG_RETENTION_DAYS)
}

pub fn is_expired(created_at: DateTime<Utc>, cutoff: DateTime<Utc>) -> bool {
    created_at < cutoff
}

/// Split expired messages into (bulk-deletable, one-by-one) by the bulk-delete age limit
pub fn partition_for_deletion(
    ids: &[MessageId],
    now: DateTime<Utc>,
) -> (Vec<MessageId>, Vec<MessageId>) {
    let bulk_limit = now - Duration::days(BULK_DELETE_MAX_AGE_DAYS)
        + Duration::minutes(BULK_DELETE_SAFETY_MINUTES);
    ids.iter()
        .partition(|id| snowflake_created_at(id.get()) > bulk_limit)
}

/// Message history access needed by the retention sweep
#[async_trait]
pub trait LogChannelApi: Send + Sync {
    /// Up to `limit` message IDs older than `before`, newest first
    async fn messages_before(
        &self,
        channel_id: ChannelId,
        before: MessageId,
        limit: u8,
    ) -> Result<Vec<MessageId>, Error>;

    /// Bulk delete of 2 to 100 messages younger than 14 days
    async fn delete_many(&self, channel_id: ChannelId, ids: &[MessageId]) -> Result<(), Error>;

    async fn delete_one(&self, channel_id: ChannelId, id: MessageId) -> Result<(), Error>;
}

/// [`LogChannelApi`] backed by the Discord HTTP API
pub struct HttpLogChannelApi {
    http: Arc<serenity::Http>,
}

impl HttpLogChannelApi {
    pub fn new(http: Arc<serenity::Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl LogChannelApi for HttpLogChannelApi {
    async fn messages_before(
        &self,
        channel_id: ChannelId,
        before: MessageId,
        limit: u8,
    ) -> Result<Vec<MessageId>, Error> {
        let messages = channel_id
            .messages(&self.http, GetMessages::new().before(before).limit(limit))
            .await?;
        Ok(messages.into_iter().map(|m| m.id).collect())
    }

    async fn delete_many(&self, channel_id: ChannelId, ids: &[MessageId]) -> Result<(), Error> {
        channel_id.delete_messages(&self.http, ids).await?;
        Ok(())
    }

    async fn delete_one(&self, channel_id: ChannelId, id: MessageId) -> Result<(), Error> {
        channel_id.delete_message(&self.http, id).await?;
        Ok(())
    }
}

/// Result of one sweep over every configured log channel
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepSummary {
    pub guilds_swept: usize,
    pub guilds_failed: usize,
    pub messages_deleted: usize,
}

/// Collect every expired message ID of a channel, paging backwards from the cutoff
async fn collect_expired<A>(
    api: &A,
    channel_id: ChannelId,
    cutoff: DateTime<Utc>,
) -> Result<Vec<MessageId>, Error>
where
    A: LogChannelApi + ?Sized,
{
    let Some(mut before) = snowflake_at(cutoff) else {
        return Ok(Vec::new());
    };

    let mut expired = Vec::new();
    loop {
        let page = api
            .messages_before(channel_id, before, MESSAGE_BATCH_SIZE)
            .await?;
        let Some(oldest) = page.iter().min().copied() else {
            break;
        };

        expired.extend(
            page.iter()
                .copied()
                .filter(|id| is_expired(snowflake_created_at(id.get()), cutoff)),
        );

        if page.len() < MESSAGE_BATCH_SIZE as usize {
            break;
        }
        before = oldest;
    }

    Ok(expired)
}

/// Delete every message of `channel_id` older than the retention window.
/// Returns the number of deleted messages.
pub async fn sweep_channel<A>(
    api: &A,
    channel_id: ChannelId,
    now: DateTime<Utc>,
) -> Result<usize, Error>
where
    A: LogChannelApi + ?Sized,
{
    let cutoff = retention_cutoff(now);
    let expired = collect_expired(api, channel_id, cutoff).await?;
    let (bulk, mut single) = partition_for_deletion(&expired, now);
    let mut deleted = 0;

    for chunk in bulk.chunks(MESSAGE_BATCH_SIZE as usize) {
        if chunk.len() < 2 {
            single.extend_from_slice(chunk);
            continue;
        }
        match api.delete_many(channel_id, chunk).await {
            Ok(()) => deleted += chunk.len(),
            Err(e) => {
                warn!(
                    "Bulk delete of {} messages in {} failed, deleting one by one: {}",
                    chunk.len(),
                    channel_id,
                    e
                );
                single.extend_from_slice(chunk);
            }
        }
    }

    for id in single {
        match api.delete_one(channel_id, id).await {
            Ok(()) => deleted += 1,
            Err(e) => warn!("Failed to delete message {} in {}: {}", id, channel_id, e),
        }
    }

    Ok(deleted)
}

/// Sweep every (guild, log channel) pair in turn; a failing guild never stops the rest
pub async fn sweep<A>(
    api: &A,
    entries: &[(GuildId, ChannelId)],
    now: DateTime<Utc>,
) -> SweepSummary
where
    A: LogChannelApi + ?Sized,
{
    let mut summary = SweepSummary::default();

    for &(guild_id, channel_id) in entries {
        match sweep_channel(api, channel_id, now).await {
            Ok(deleted) => {
                summary.guilds_swept += 1;
                summary.messages_deleted += deleted;
                if deleted > 0 {
                    info!(
                        "Removed {} expired log message(s) from {} in guild {}",
                        deleted, channel_id, guild_id
                    );
                }
            }
            Err(e) => {
                summary.guilds_failed += 1;
                error!(
                    "Retention sweep failed for guild {} (channel {}): {}",
                    guild_id, channel_id, e
                );
            }
        }
    }

    summary
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use ::serenity::async_trait;
    use poise::serenity_prelude::{ChannelId, MessageId};

    use super::LogChannelApi;
    use crate::models::Error;

    /// In-memory channels; channels in `broken` fail every history request
    #[derive(Default)]
    pub struct FakeChannels {
        pub messages: Mutex<Vec<(ChannelId, MessageId)>>,
        pub broken: HashSet<ChannelId>,
        pub bulk_calls: Mutex<Vec<usize>>,
        pub fail_bulk: bool,
    }

    impl FakeChannels {
        pub fn with(messages: &[(u64, MessageId)]) -> Self {
            Self {
                messages: Mutex::new(
                    messages
                        .iter()
                        .map(|(c, m)| (ChannelId::new(*c), *m))
                        .collect(),
                ),
                ..Default::default()
            }
        }

        pub fn remaining(&self, channel_id: u64) -> Vec<MessageId> {
            let channel_id = ChannelId::new(channel_id);
            let mut ids: Vec<MessageId> = self
                .messages
                .lock()
                .unwrap()
                .iter()
                .filter(|(c, _)| *c == channel_id)
                .map(|(_, m)| *m)
                .collect();
            ids.sort();
            ids
        }

        fn remove(&self, channel_id: ChannelId, ids: &[MessageId]) {
            self.messages
                .lock()
                .unwrap()
                .retain(|(c, m)| !(*c == channel_id && ids.contains(m)));
        }
    }

    #[async_trait]
    impl LogChannelApi for FakeChannels {
        async fn messages_before(
            &self,
            channel_id: ChannelId,
            before: MessageId,
            limit: u8,
        ) -> Result<Vec<MessageId>, Error> {
            if self.broken.contains(&channel_id) {
                return Err("Missing Access".into());
            }
            let mut ids: Vec<MessageId> = self
                .messages
                .lock()
                .unwrap()
                .iter()
                .filter(|(c, m)| *c == channel_id && *m < before)
                .map(|(_, m)| *m)
                .collect();
            ids.sort_by(|a, b| b.cmp(a));
            ids.truncate(limit as usize);
            Ok(ids)
        }

        async fn delete_many(&self, channel_id: ChannelId, ids: &[MessageId]) -> Result<(), Error> {
            self.bulk_calls.lock().unwrap().push(ids.len());
            if self.fail_bulk {
                return Err("Bulk delete rejected".into());
            }
            self.remove(channel_id, ids);
            Ok(())
        }

        async fn delete_one(&self, channel_id: ChannelId, id: MessageId) -> Result<(), Error> {
            self.remove(channel_id, &[id]);
            Ok(())
        }
    }
}
