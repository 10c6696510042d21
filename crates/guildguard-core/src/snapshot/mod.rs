//! Periodic structural snapshots of guild topology.
//!
//! The snapshotter captures channel/category layout, ordering, and
//! permission overwrites so the restore path has something to rebuild from.
//! It runs on its own timer, independent of the detection path: capture on
//! first contact with a guild, then on a fixed interval. A per-entry read
//! failure degrades that one record only; a partial snapshot is preferable
//! to none.

pub mod store;

pub use store::{FileSnapshotStore, MemorySnapshotStore, SnapshotStore};

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::platform::{ChannelId, ChannelKind, GuildId, PermissionOverwrite, PlatformClient};
use crate::rate_limit::lock_recovering;

/// Captured description of one channel or category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelRecord {
    pub id: ChannelId,
    pub name: String,
    pub kind: ChannelKind,
    pub parent_id: Option<ChannelId>,
    pub position: i64,
    pub topic: Option<String>,
    pub nsfw: bool,
    pub rate_limit_per_user: u32,
    pub overwrites: Vec<PermissionOverwrite>,
}

/// The most recent structural capture for a guild. Exactly one is retained
/// per guild; each capture overwrites the previous one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub guild_id: GuildId,
    pub saved_at: DateTime<Utc>,
    pub channels: Vec<ChannelRecord>,
}

/// Captures and schedules snapshots, one timer per attached guild.
pub struct SnapshotManager {
    platform: Arc<dyn PlatformClient>,
    store: Arc<dyn SnapshotStore>,
    interval: Duration,
    timers: Mutex<HashMap<GuildId, JoinHandle<()>>>,
}

impl SnapshotManager {
    pub fn new(
        platform: Arc<dyn PlatformClient>,
        store: Arc<dyn SnapshotStore>,
        interval: Duration,
    ) -> Self {
        Self {
            platform,
            store,
            interval,
            timers: Mutex::new(HashMap::new()),
        }
    }

    /// Walk the live channel collection and persist a snapshot.
    ///
    /// Per-entry read failures are skipped with a debug log. Concurrent
    /// captures for the same guild are tolerated; last write wins.
    pub async fn capture(&self, guild: &GuildId) -> Result<Snapshot> {
        capture_guild(self.platform.as_ref(), self.store.as_ref(), guild).await
    }

    /// Latest stored snapshot for a guild, if any.
    pub async fn get(&self, guild: &GuildId) -> Result<Option<Snapshot>> {
        self.store.read(guild).await
    }

    /// Begin protecting a guild: capture immediately, then on the fixed
    /// interval until [`detach`](Self::detach).
    pub async fn attach(&self, guild: GuildId) {
        if let Err(e) = self.capture(&guild).await {
            warn!(guild = %guild, error = %e, "initial snapshot capture failed");
        }

        let platform = Arc::clone(&self.platform);
        let store = Arc::clone(&self.store);
        let interval = self.interval;
        let task_guild = guild.clone();
        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                if let Err(e) =
                    capture_guild(platform.as_ref(), store.as_ref(), &task_guild).await
                {
                    warn!(guild = %task_guild, error = %e, "periodic snapshot capture failed");
                }
            }
        });

        // Re-attach replaces the previous timer.
        if let Some(old) = lock_recovering(&self.timers).insert(guild.clone(), handle) {
            old.abort();
        }
        info!(guild = %guild, interval_secs = self.interval.as_secs(), "snapshot timer attached");
    }

    /// Stop the guild's snapshot timer. Stored data is kept.
    pub fn detach(&self, guild: &GuildId) {
        if let Some(handle) = lock_recovering(&self.timers).remove(guild) {
            handle.abort();
            info!(guild = %guild, "snapshot timer detached");
        }
    }

    pub fn attached_count(&self) -> usize {
        lock_recovering(&self.timers).len()
    }
}

impl Drop for SnapshotManager {
    fn drop(&mut self) {
        for (_, handle) in lock_recovering(&self.timers).drain() {
            handle.abort();
        }
    }
}

/// Capture one guild's topology and overwrite its snapshot slot.
async fn capture_guild(
    platform: &dyn PlatformClient,
    store: &dyn SnapshotStore,
    guild: &GuildId,
) -> Result<Snapshot> {
    let ids = platform.channel_ids(guild).await?;
    let mut channels = Vec::with_capacity(ids.len());
    for id in ids {
        match platform.channel_info(guild, &id).await {
            Ok(info) => channels.push(ChannelRecord {
                id: info.id,
                name: info.name,
                kind: info.kind,
                parent_id: info.parent_id,
                position: info.position,
                topic: info.topic,
                nsfw: info.nsfw,
                rate_limit_per_user: info.rate_limit_per_user,
                overwrites: info.overwrites,
            }),
            Err(e) => {
                debug!(guild = %guild, channel = %id, error = %e, "skipping unreadable channel");
            }
        }
    }

    let snapshot = Snapshot {
        guild_id: guild.clone(),
        saved_at: Utc::now(),
        channels,
    };
    store.write(&snapshot).await?;
    debug!(guild = %guild, channels = snapshot.channels.len(), "snapshot captured");
    Ok(snapshot)
}
