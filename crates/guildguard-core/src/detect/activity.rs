//! Burst detection over recent create/delete actions.
//!
//! The tracker keeps a per-(guild, actor) window of recent actions in the
//! guild arena and evaluates the nuke thresholds on every action. It is
//! deliberately sensitive to either creation floods (used to bury malicious
//! channels) or deletion floods (direct destruction): the trigger is an OR
//! over both counts plus the generic sliding-window limiter.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::platform::{ActorId, GuildId};
use crate::rate_limit::SlidingWindowLimiter;
use crate::state::{ActionKind, GuildArena};

/// Result of tracking one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityReport {
    /// True when the action confirmed a nuke.
    pub triggered: bool,
    pub recent_creates: usize,
    pub recent_deletes: usize,
}

impl ActivityReport {
    const QUIET: ActivityReport = ActivityReport {
        triggered: false,
        recent_creates: 0,
        recent_deletes: 0,
    };
}

/// Threshold evaluator over per-actor activity windows.
pub struct ActivityTracker {
    arena: Arc<GuildArena>,
    limiter: SlidingWindowLimiter,
    window: Duration,
    create_threshold: usize,
    delete_threshold: usize,
    whitelist: HashSet<ActorId>,
}

impl ActivityTracker {
    pub fn new(
        arena: Arc<GuildArena>,
        limiter: SlidingWindowLimiter,
        window: Duration,
        create_threshold: usize,
        delete_threshold: usize,
        whitelist: HashSet<ActorId>,
    ) -> Self {
        Self {
            arena,
            limiter,
            window,
            create_threshold,
            delete_threshold,
            whitelist,
        }
    }

    /// Record one action and evaluate the nuke thresholds.
    ///
    /// Whitelisted actors are skipped entirely and never accumulate
    /// window entries.
    pub fn track(&self, guild: &GuildId, actor: &ActorId, kind: ActionKind) -> ActivityReport {
        if self.whitelist.contains(actor) {
            return ActivityReport::QUIET;
        }

        let (recent_creates, recent_deletes) = self
            .arena
            .with_state(guild, |s| s.record_action(actor, kind, self.window));
        let limiter_hit = self.limiter.record(guild, actor);

        let triggered = recent_creates >= self.create_threshold
            || recent_deletes >= self.delete_threshold
            || (limiter_hit && recent_deletes >= 1);

        if triggered {
            debug!(
                guild = %guild,
                actor = %actor,
                creates = recent_creates,
                deletes = recent_deletes,
                limiter_hit,
                "activity threshold triggered"
            );
        }

        ActivityReport {
            triggered,
            recent_creates,
            recent_deletes,
        }
    }
}
