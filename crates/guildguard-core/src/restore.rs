//! Best-effort topology restorer.
//!
//! Given a snapshot, recreates missing structure against the live guild in
//! dependency order: categories first, then text channels, then voice
//! channels, each re-parented to its recreated category; then relative
//! ordering is re-applied, then permission overwrites. Every external call
//! is isolated so one failure degrades a single entity's fidelity without
//! aborting the remaining recreation. A guild half-restored is strictly
//! better than one left destroyed because one call failed.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::platform::{ChannelId, ChannelKind, ChannelSpec, GuildId, PlatformClient};
use crate::snapshot::{ChannelRecord, Snapshot};

/// One isolated failure during a restore run.
#[derive(Debug, Clone, Serialize)]
pub struct RestoreFailure {
    /// Original (snapshot) channel ID the failure concerns.
    pub channel_id: ChannelId,
    /// Stage that failed: `"create"`, `"parent"`, `"position"`, `"overwrite"`.
    pub stage: &'static str,
    pub error: String,
}

/// Outcome of a restore run: which entities were recreated, and which
/// steps degraded.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RestoreReport {
    /// Map from original channel ID to the newly created channel ID.
    pub id_map: HashMap<ChannelId, ChannelId>,
    pub failures: Vec<RestoreFailure>,
}

impl RestoreReport {
    pub fn created_count(&self) -> usize {
        self.id_map.len()
    }

    /// True when every entity and every step succeeded.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    fn fail(&mut self, channel_id: &ChannelId, stage: &'static str, error: impl ToString) {
        self.failures.push(RestoreFailure {
            channel_id: channel_id.clone(),
            stage,
            error: error.to_string(),
        });
    }
}

/// Recreates guild structure from a snapshot.
pub struct RestoreManager {
    platform: Arc<dyn PlatformClient>,
}

impl RestoreManager {
    pub fn new(platform: Arc<dyn PlatformClient>) -> Self {
        Self { platform }
    }

    /// Recreate the snapshot's structure against the live guild.
    pub async fn restore(&self, guild: &GuildId, snapshot: &Snapshot) -> RestoreReport {
        let mut report = RestoreReport::default();

        // Categories carry no parent dependency and must exist before the
        // channels that reference them.
        for record in channels_of_kind(snapshot, ChannelKind::Category) {
            self.recreate(guild, record, &mut report).await;
        }
        for record in channels_of_kind(snapshot, ChannelKind::Text) {
            self.recreate(guild, record, &mut report).await;
        }
        for record in channels_of_kind(snapshot, ChannelKind::Voice) {
            self.recreate(guild, record, &mut report).await;
        }

        self.apply_ordering(guild, snapshot, &mut report).await;
        self.apply_overwrites(guild, snapshot, &mut report).await;

        info!(
            guild = %guild,
            created = report.created_count(),
            failures = report.failures.len(),
            "restore run finished"
        );
        report
    }

    /// Create one channel and, when captured, re-parent it to the recreated
    /// analogue of its original category.
    async fn recreate(&self, guild: &GuildId, record: &ChannelRecord, report: &mut RestoreReport) {
        let spec = ChannelSpec {
            name: record.name.clone(),
            kind: record.kind,
            topic: record.topic.clone(),
            nsfw: record.nsfw,
            rate_limit_per_user: record.rate_limit_per_user,
        };

        let new_id = match self.platform.create_channel(guild, &spec).await {
            Ok(id) => id,
            Err(e) => {
                warn!(guild = %guild, channel = %record.id, error = %e, "channel recreation failed");
                report.fail(&record.id, "create", e);
                return;
            }
        };
        debug!(guild = %guild, old = %record.id, new = %new_id, "channel recreated");
        report.id_map.insert(record.id.clone(), new_id.clone());

        if let Some(old_parent) = &record.parent_id {
            // Parent only if the category itself was captured and recreated.
            if let Some(new_parent) = report.id_map.get(old_parent).cloned() {
                if let Err(e) = self
                    .platform
                    .set_channel_parent(guild, &new_id, &new_parent)
                    .await
                {
                    report.fail(&record.id, "parent", e);
                }
            }
        }
    }

    /// Reassign positions 0..n-1 over the recreated entities, in the order
    /// of their original positions.
    async fn apply_ordering(
        &self,
        guild: &GuildId,
        snapshot: &Snapshot,
        report: &mut RestoreReport,
    ) {
        let mut created: Vec<&ChannelRecord> = snapshot
            .channels
            .iter()
            .filter(|r| report.id_map.contains_key(&r.id))
            .collect();
        created.sort_by_key(|r| (r.position, r.id.clone()));

        for (position, record) in created.iter().enumerate() {
            let Some(new_id) = report.id_map.get(&record.id).cloned() else {
                continue;
            };
            if let Err(e) = self
                .platform
                .set_channel_position(guild, &new_id, position as i64)
                .await
            {
                report.fail(&record.id, "position", e);
            }
        }
    }

    /// Re-apply permission overwrites one entity and one entry at a time.
    async fn apply_overwrites(
        &self,
        guild: &GuildId,
        snapshot: &Snapshot,
        report: &mut RestoreReport,
    ) {
        for record in &snapshot.channels {
            let Some(new_id) = report.id_map.get(&record.id).cloned() else {
                continue;
            };
            for overwrite in &record.overwrites {
                if let Err(e) = self
                    .platform
                    .create_permission_overwrite(guild, &new_id, overwrite)
                    .await
                {
                    report.fail(&record.id, "overwrite", e);
                }
            }
        }
    }
}

fn channels_of_kind(snapshot: &Snapshot, kind: ChannelKind) -> impl Iterator<Item = &ChannelRecord> {
    snapshot.channels.iter().filter(move |r| r.kind == kind)
}
