use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use dashmap::DashMap;
use poise::serenity_prelude::{ChannelId, GuildId};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Errors raised while loading or saving the guild config document
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to read guild config '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write guild config '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid guild config '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize guild config '{path}': {source}")]
    Serialize {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Per-guild log channel configuration, kept in memory and mirrored to a JSON file.
///
/// The file is a single object `{ "<guild id>": <channel id> }` rewritten in full on
/// every change. Reads never block; writes go through one lock so two admins saving
/// at the same time cannot lose each other's update.
pub struct GuildConfigStore {
    path: PathBuf,
    entries: DashMap<GuildId, ChannelId>,
    write_lock: Mutex<()>,
}

impl GuildConfigStore {
    /// Load the document at `path`; a missing file is an empty configuration
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let entries = DashMap::new();

        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => {
                let document: BTreeMap<String, u64> =
                    serde_json::from_str(&raw).map_err(|source| StoreError::Parse {
                        path: path.display().to_string(),
                        source,
                    })?;
                for (guild, channel) in document {
                    match (guild.parse::<u64>(), channel) {
                        (Ok(guild_id), channel_id) if guild_id != 0 && channel_id != 0 => {
                            entries.insert(GuildId::new(guild_id), ChannelId::new(channel_id));
                        }
                        _ => warn!("Ignoring invalid guild config entry '{}': {}", guild, channel),
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No guild config at {}, starting empty", path.display());
            }
            Err(source) => {
                return Err(StoreError::Read {
                    path: path.display().to_string(),
                    source,
                });
            }
        }

        info!("Loaded {} guild log channel(s)", entries.len());
        Ok(Self {
            path,
            entries,
            write_lock: Mutex::new(()),
        })
    }

    /// In-memory store that is never written (tests and dry runs)
    #[cfg(test)]
    pub fn in_memory(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            entries: DashMap::new(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn log_channel(&self, guild_id: GuildId) -> Option<ChannelId> {
        self.entries.get(&guild_id).map(|entry| *entry)
    }

    /// Every configured (guild, log channel) pair, ordered by guild
    pub fn entries(&self) -> Vec<(GuildId, ChannelId)> {
        let mut entries: Vec<_> = self.entries.iter().map(|e| (*e.key(), *e.value())).collect();
        entries.sort();
        entries
    }

    /// Set the log channel of a guild, returning the previous one
    pub async fn set_log_channel(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<Option<ChannelId>, StoreError> {
        let _guard = self.write_lock.lock().await;

        let previous = self.entries.insert(guild_id, channel_id);
        if let Err(e) = self.persist().await {
            match previous {
                Some(prev) => self.entries.insert(guild_id, prev),
                None => self.entries.remove(&guild_id).map(|(_, c)| c),
            };
            return Err(e);
        }

        info!("Set log channel for guild {} to {}", guild_id, channel_id);
        Ok(previous)
    }

    /// Remove the log channel of a guild; `false` if none was set
    pub async fn reset_log_channel(&self, guild_id: GuildId) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().await;

        let Some((_, previous)) = self.entries.remove(&guild_id) else {
            return Ok(false);
        };
        if let Err(e) = self.persist().await {
            self.entries.insert(guild_id, previous);
            return Err(e);
        }

        info!("Reset log channel for guild {}", guild_id);
        Ok(true)
    }

    /// Serialize the whole mapping
    fn render(&self) -> Result<String, StoreError> {
        let document: BTreeMap<String, u64> = self
            .entries
            .iter()
            .map(|e| (e.key().to_string(), e.value().get()))
            .collect();
        serde_json::to_string_pretty(&document).map_err(|source| StoreError::Serialize {
            path: self.path.display().to_string(),
            source,
        })
    }

    /// Rewrite the document through a temporary file. Caller holds `write_lock`.
    async fn persist(&self) -> Result<(), StoreError> {
        let body = self.render()?;
        let tmp = self.path.with_extension("json.tmp");
        let write_err = |source| StoreError::Write {
            path: self.path.display().to_string(),
            source,
        };

        tokio::fs::write(&tmp, body).await.map_err(write_err)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(write_err)?;
        Ok(())
    }
}
