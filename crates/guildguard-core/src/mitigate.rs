//! Mitigation engine: safety gates, graduated response, lockdown, restore.
//!
//! The engine consumes signals from the activity tracker, the sliding-window
//! limiter, and the escalation watchdog, and runs the containment pipeline
//! against a confirmed-hostile actor. It is deliberately conservative: when
//! any safety gate fails or the actor cannot be verified, it does nothing
//! beyond emitting a skip record. Mitigation is an autonomous background
//! process; outcomes surface only through the moderation log sink.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::GuardConfig;
use crate::detect::{ActivityTracker, DangerSink};
use crate::event::{EventHandler, GuildEvent, GuildEventKind};
use crate::modlog::{ModerationLogger, ModerationRecord};
use crate::platform::{ActorId, AuditAction, ChannelId, GuildId, PlatformClient};
use crate::rate_limit::SlidingWindowLimiter;
use crate::restore::RestoreManager;
use crate::snapshot::SnapshotManager;
use crate::state::{ActionKind, GuildArena};

/// Why a mitigation attempt was deliberately not taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Whitelisted,
    GuildOwner,
    SelfIdentity,
    /// The actor's highest role outranks or equals the engine's.
    Hierarchy,
    /// The gate itself could not be evaluated; acting would be a guess.
    Unverifiable,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            SkipReason::Whitelisted => "whitelisted",
            SkipReason::GuildOwner => "guild_owner",
            SkipReason::SelfIdentity => "self_identity",
            SkipReason::Hierarchy => "insufficient_hierarchy",
            SkipReason::Unverifiable => "unverifiable",
        }
    }
}

/// Outcome of one mitigation invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MitigationOutcome {
    /// The ban command succeeded.
    Banned,
    /// The ban failed; non-managed roles were stripped instead.
    RolesStripped { stripped: usize, failed: usize },
    /// Neither the ban nor any role strip succeeded.
    CannotAct,
    /// A safety gate rejected the attempt; nothing was issued.
    Skipped(SkipReason),
}

/// Outcome of the ban/role-strip step alone; gates are handled before it
/// runs, so a skip cannot occur here.
#[derive(Debug, Clone, Copy)]
enum ResponseOutcome {
    Banned,
    RolesStripped { stripped: usize, failed: usize },
    CannotAct,
}

/// The detection-containment-recovery orchestrator.
pub struct MitigationEngine {
    platform: Arc<dyn PlatformClient>,
    arena: Arc<GuildArena>,
    tracker: ActivityTracker,
    snapshots: Arc<SnapshotManager>,
    restorer: RestoreManager,
    modlog: Arc<dyn ModerationLogger>,
    whitelist: HashSet<ActorId>,
    lockdown: Duration,
}

impl MitigationEngine {
    pub fn new(
        config: &GuardConfig,
        platform: Arc<dyn PlatformClient>,
        arena: Arc<GuildArena>,
        snapshots: Arc<SnapshotManager>,
        modlog: Arc<dyn ModerationLogger>,
    ) -> Self {
        let whitelist: HashSet<ActorId> = config.whitelist.iter().cloned().collect();
        let tracker = ActivityTracker::new(
            Arc::clone(&arena),
            SlidingWindowLimiter::new(config.limiter_threshold, config.limiter_window()),
            config.window(),
            config.create_threshold,
            config.delete_threshold,
            whitelist.clone(),
        );
        let restorer = RestoreManager::new(Arc::clone(&platform));
        Self {
            platform,
            arena,
            tracker,
            snapshots,
            restorer,
            modlog,
            whitelist,
            lockdown: config.lockdown(),
        }
    }

    /// Run the full mitigation procedure against a confirmed-hostile actor.
    pub async fn mitigate(
        &self,
        guild: &GuildId,
        actor: &ActorId,
        trigger: &str,
    ) -> MitigationOutcome {
        if let Some(reason) = self.safety_gate(guild, actor).await {
            info!(guild = %guild, actor = %actor, reason = reason.as_str(), "mitigation skipped");
            self.emit(ModerationRecord::new(
                guild.clone(),
                Some(actor.clone()),
                "mitigation_skipped",
                reason.as_str(),
                json!({ "trigger": trigger }),
            ));
            return MitigationOutcome::Skipped(reason);
        }

        let response = self.graduated_response(guild, actor).await;

        self.arena.flag(guild, actor);
        self.arena.set_lockdown(guild, self.lockdown);

        let restore_summary = self.try_restore(guild).await;

        let (event, outcome_str) = match response {
            ResponseOutcome::Banned => ("nuke_mitigated", "banned".to_string()),
            ResponseOutcome::RolesStripped { stripped, failed } => (
                "nuke_mitigated",
                format!("roles_stripped:{stripped}/{}", stripped + failed),
            ),
            ResponseOutcome::CannotAct => {
                ("nuke_detected_but_cannot_act", "no_command_succeeded".to_string())
            }
        };
        self.emit(ModerationRecord::new(
            guild.clone(),
            Some(actor.clone()),
            event,
            outcome_str,
            json!({ "trigger": trigger, "restore": restore_summary }),
        ));

        match response {
            ResponseOutcome::Banned => MitigationOutcome::Banned,
            ResponseOutcome::RolesStripped { stripped, failed } => {
                MitigationOutcome::RolesStripped { stripped, failed }
            }
            ResponseOutcome::CannotAct => MitigationOutcome::CannotAct,
        }
    }

    /// All gates must pass before any command is issued. Returns the first
    /// failing gate, or `None` when acting is safe.
    async fn safety_gate(&self, guild: &GuildId, actor: &ActorId) -> Option<SkipReason> {
        if self.whitelist.contains(actor) {
            return Some(SkipReason::Whitelisted);
        }
        if *actor == self.platform.self_id() {
            return Some(SkipReason::SelfIdentity);
        }

        let owner = match self.platform.guild_owner(guild).await {
            Ok(owner) => owner,
            Err(e) => {
                warn!(guild = %guild, error = %e, "cannot resolve guild owner; refusing to act");
                return Some(SkipReason::Unverifiable);
            }
        };
        if *actor == owner {
            return Some(SkipReason::GuildOwner);
        }

        let self_id = self.platform.self_id();
        let self_pos = self.platform.highest_role_position(guild, &self_id).await;
        let actor_pos = self.platform.highest_role_position(guild, actor).await;
        match (self_pos, actor_pos) {
            (Ok(own), Ok(theirs)) if own > theirs => None,
            (Ok(_), Ok(_)) => Some(SkipReason::Hierarchy),
            (Err(e), _) | (_, Err(e)) => {
                warn!(guild = %guild, actor = %actor, error = %e, "cannot compare hierarchy; refusing to act");
                Some(SkipReason::Unverifiable)
            }
        }
    }

    /// Attempt a ban; on command failure fall back to stripping every
    /// non-managed role. Exactly one of the two is attempted.
    async fn graduated_response(&self, guild: &GuildId, actor: &ActorId) -> ResponseOutcome {
        match self
            .platform
            .ban(guild, actor, "guildguard: nuke attempt detected")
            .await
        {
            Ok(()) => {
                info!(guild = %guild, actor = %actor, "hostile actor banned");
                return ResponseOutcome::Banned;
            }
            Err(e) => {
                warn!(guild = %guild, actor = %actor, error = %e, "ban failed, falling back to role strip");
            }
        }

        let roles = match self.platform.member_roles(guild, actor).await {
            Ok(roles) => roles,
            Err(e) => {
                warn!(guild = %guild, actor = %actor, error = %e, "cannot list roles for strip");
                return ResponseOutcome::CannotAct;
            }
        };

        let mut stripped = 0usize;
        let mut failed = 0usize;
        for role in roles.iter().filter(|r| !r.managed) {
            match self
                .platform
                .remove_role(guild, actor, &role.id, "guildguard: nuke attempt detected")
                .await
            {
                Ok(()) => stripped += 1,
                Err(e) => {
                    failed += 1;
                    debug!(guild = %guild, actor = %actor, role = %role.id, error = %e, "role strip failed");
                }
            }
        }

        if stripped == 0 {
            ResponseOutcome::CannotAct
        } else {
            info!(guild = %guild, actor = %actor, stripped, failed, "hostile actor stripped of roles");
            ResponseOutcome::RolesStripped { stripped, failed }
        }
    }

    /// Restore from the latest snapshot, best-effort. Failures are logged
    /// and recorded, never raised.
    async fn try_restore(&self, guild: &GuildId) -> serde_json::Value {
        let snapshot = match self.snapshots.get(guild).await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                warn!(guild = %guild, "no snapshot available for restore");
                self.emit(ModerationRecord::new(
                    guild.clone(),
                    None,
                    "restore_skipped",
                    "no_snapshot",
                    serde_json::Value::Null,
                ));
                return json!({ "skipped": "no_snapshot" });
            }
            Err(e) => {
                warn!(guild = %guild, error = %e, "snapshot read failed");
                self.emit(ModerationRecord::new(
                    guild.clone(),
                    None,
                    "restore_skipped",
                    "snapshot_read_failed",
                    json!({ "error": e.to_string() }),
                ));
                return json!({ "skipped": "snapshot_read_failed" });
            }
        };

        let report = self.restorer.restore(guild, &snapshot).await;
        let outcome = if report.is_complete() { "complete" } else { "partial" };
        let summary = json!({
            "created": report.created_count(),
            "failures": report.failures.len(),
        });
        self.emit(ModerationRecord::new(
            guild.clone(),
            None,
            "restore_completed",
            outcome,
            json!({
                "created": report.created_count(),
                "failures": report.failures,
            }),
        ));
        summary
    }

    /// Operator-driven unflag of a previously flagged actor.
    pub fn unflag(&self, guild: &GuildId, actor: &ActorId) -> bool {
        let removed = self.arena.unflag(guild, actor);
        if removed {
            self.emit(ModerationRecord::new(
                guild.clone(),
                Some(actor.clone()),
                "actor_unflagged",
                "operator",
                serde_json::Value::Null,
            ));
        }
        removed
    }

    async fn on_channel_created(
        &self,
        guild: &GuildId,
        channel: &ChannelId,
        actor: Option<&ActorId>,
    ) -> Result<()> {
        let Some(actor) = actor else {
            return Ok(());
        };
        if *actor == self.platform.self_id() {
            // Channels the restorer recreates must not feed detection.
            return Ok(());
        }

        // Containment: anything a flagged actor creates is reversed
        // immediately, best-effort.
        if self.arena.is_flagged(guild, actor) {
            match self
                .platform
                .delete_channel(guild, channel, "guildguard: created by flagged actor")
                .await
            {
                Ok(()) => {
                    self.emit(ModerationRecord::new(
                        guild.clone(),
                        Some(actor.clone()),
                        "containment_channel_deleted",
                        "deleted",
                        json!({ "channel_id": channel }),
                    ));
                }
                Err(e) => {
                    warn!(guild = %guild, channel = %channel, error = %e, "containment delete failed");
                }
            }
        }

        let report = self.tracker.track(guild, actor, ActionKind::ChannelCreate);
        if report.triggered {
            self.mitigate(guild, actor, "channel_create_burst").await;
        }
        Ok(())
    }

    async fn on_channel_deleted(&self, guild: &GuildId, actor: Option<&ActorId>) -> Result<()> {
        // While locked down a deletion is not ignored: it triggers a
        // restore attempt from the last snapshot.
        if self.arena.is_locked_down(guild) {
            debug!(guild = %guild, "channel deleted during lockdown, attempting restore");
            self.try_restore(guild).await;
        }

        let actor = match actor {
            Some(actor) => Some(actor.clone()),
            None => self
                .platform
                .fetch_audit_log_executor(guild, AuditAction::ChannelDelete)
                .await
                .unwrap_or_default(),
        };
        let Some(actor) = actor else {
            return Ok(());
        };
        if actor == self.platform.self_id() {
            // The engine's own containment deletes must not feed detection.
            return Ok(());
        }

        let report = self.tracker.track(guild, &actor, ActionKind::ChannelDelete);
        if report.triggered {
            self.mitigate(guild, &actor, "channel_delete_burst").await;
        }
        Ok(())
    }

    async fn on_member_banned(&self, guild: &GuildId, actor: Option<&ActorId>) -> Result<()> {
        let actor = match actor {
            Some(actor) => Some(actor.clone()),
            None => self
                .platform
                .fetch_audit_log_executor(guild, AuditAction::MemberBan)
                .await
                .unwrap_or_default(),
        };
        let Some(actor) = actor else {
            return Ok(());
        };
        if actor == self.platform.self_id() {
            return Ok(());
        }

        let report = self.tracker.track(guild, &actor, ActionKind::MemberBan);
        if report.triggered {
            self.mitigate(guild, &actor, "mass_ban_burst").await;
        }
        Ok(())
    }

    /// Fire-and-forget write to the moderation log sink.
    fn emit(&self, record: ModerationRecord) {
        if let Err(e) = self.modlog.log(&record) {
            warn!(event = %record.event, error = %e, "moderation log write failed");
        }
    }
}

#[async_trait]
impl EventHandler for MitigationEngine {
    fn name(&self) -> &'static str {
        "mitigation-engine"
    }

    async fn handle(&self, event: &GuildEvent) -> Result<()> {
        match &event.kind {
            GuildEventKind::ChannelCreated {
                channel_id,
                actor_id,
            } => {
                self.on_channel_created(&event.guild_id, channel_id, actor_id.as_ref())
                    .await
            }
            GuildEventKind::ChannelDeleted { actor_id, .. } => {
                self.on_channel_deleted(&event.guild_id, actor_id.as_ref())
                    .await
            }
            GuildEventKind::ReportedDeletion { actor_id } => {
                let report = self
                    .tracker
                    .track(&event.guild_id, actor_id, ActionKind::ReportedDelete);
                if report.triggered {
                    self.mitigate(&event.guild_id, actor_id, "reported_deletion_burst")
                        .await;
                }
                Ok(())
            }
            GuildEventKind::MemberBanned { actor_id, .. } => {
                self.on_member_banned(&event.guild_id, actor_id.as_ref())
                    .await
            }
            // Role events belong to the escalation watchdog.
            GuildEventKind::MemberRolesUpdated { .. } | GuildEventKind::RoleUpdated { .. } => {
                Ok(())
            }
        }
    }
}

#[async_trait]
impl DangerSink for MitigationEngine {
    /// Escalation confirmed by the watchdog: lock down immediately and run
    /// the full mitigation procedure.
    async fn on_danger(&self, guild: &GuildId, actor: &ActorId, trigger: &str) {
        self.arena.set_lockdown(guild, self.lockdown);
        self.emit(ModerationRecord::new(
            guild.clone(),
            Some(actor.clone()),
            "escalation_detected",
            trigger,
            serde_json::Value::Null,
        ));
        self.mitigate(guild, actor, trigger).await;
    }
}
