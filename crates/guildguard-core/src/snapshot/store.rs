//! Snapshot persistence: one slot per guild, atomic replace-on-write.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use async_trait::async_trait;

use super::Snapshot;
use crate::platform::GuildId;
use crate::rate_limit::lock_recovering;

/// Keyed single-slot snapshot storage.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Overwrite the guild's slot with this snapshot.
    async fn write(&self, snapshot: &Snapshot) -> Result<()>;

    /// Read the guild's slot, `None` if never written.
    async fn read(&self, guild: &GuildId) -> Result<Option<Snapshot>>;
}

/// File-per-guild JSON store. Writes go to a temp file in the same
/// directory and are renamed over the slot, so readers never observe a
/// half-written snapshot.
pub struct FileSnapshotStore {
    dir: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn slot_path(&self, guild: &GuildId) -> PathBuf {
        // Guild IDs are opaque; keep only filename-safe characters.
        let safe: String = guild
            .as_str()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn write(&self, snapshot: &Snapshot) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("creating snapshot dir {}", self.dir.display()))?;

        let path = self.slot_path(&snapshot.guild_id);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_vec_pretty(snapshot)?;
        tokio::fs::write(&tmp, &json)
            .await
            .with_context(|| format!("writing snapshot temp file {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("replacing snapshot slot {}", path.display()))?;
        Ok(())
    }

    async fn read(&self, guild: &GuildId) -> Result<Option<Snapshot>> {
        let path = self.slot_path(guild);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("reading snapshot {}", path.display()))
            }
        };
        let snapshot = serde_json::from_slice(&bytes)
            .with_context(|| format!("parsing snapshot {}", path.display()))?;
        Ok(Some(snapshot))
    }
}

/// In-memory store for tests.
#[derive(Default)]
pub struct MemorySnapshotStore {
    slots: Mutex<HashMap<GuildId, Snapshot>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn write(&self, snapshot: &Snapshot) -> Result<()> {
        lock_recovering(&self.slots).insert(snapshot.guild_id.clone(), snapshot.clone());
        Ok(())
    }

    async fn read(&self, guild: &GuildId) -> Result<Option<Snapshot>> {
        Ok(lock_recovering(&self.slots).get(guild).cloned())
    }
}
