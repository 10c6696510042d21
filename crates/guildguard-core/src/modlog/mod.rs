//! Moderation log sink.
//!
//! Every detection, mitigation, skip, and restore outcome is recorded as a
//! [`ModerationRecord`]. The engine treats the sink as fire-and-forget: a
//! write failure is logged and never propagated back into detection.

pub mod logger;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::platform::{ActorId, GuildId};
use crate::rate_limit::lock_recovering;

/// A single structured moderation log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationRecord {
    /// Unique record ID.
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub guild_id: GuildId,
    /// The actor the record concerns, when there is one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<ActorId>,
    /// Event kind: `"nuke_mitigated"`, `"mitigation_skipped"`,
    /// `"escalation_detected"`, `"restore_completed"`, ...
    pub event: String,
    /// Outcome summary: `"banned"`, `"roles_stripped"`, a skip reason, ...
    pub outcome: String,
    /// Structured event data for deep inspection.
    pub details: serde_json::Value,
}

impl ModerationRecord {
    pub fn new(
        guild_id: GuildId,
        actor_id: Option<ActorId>,
        event: impl Into<String>,
        outcome: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            guild_id,
            actor_id,
            event: event.into(),
            outcome: outcome.into(),
            details,
        }
    }
}

/// Trait for moderation log backends.
pub trait ModerationLogger: Send + Sync {
    /// Write a single record.
    fn log(&self, record: &ModerationRecord) -> anyhow::Result<()>;
}

/// In-memory sink, used by tests.
#[derive(Default)]
pub struct MemoryModerationLogger {
    records: std::sync::Mutex<Vec<ModerationRecord>>,
}

impl MemoryModerationLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<ModerationRecord> {
        lock_recovering(&self.records).clone()
    }

    /// Records matching an event kind, in insertion order.
    pub fn records_for_event(&self, event: &str) -> Vec<ModerationRecord> {
        lock_recovering(&self.records)
            .iter()
            .filter(|r| r.event == event)
            .cloned()
            .collect()
    }
}

impl ModerationLogger for MemoryModerationLogger {
    fn log(&self, record: &ModerationRecord) -> anyhow::Result<()> {
        lock_recovering(&self.records).push(record.clone());
        Ok(())
    }
}
