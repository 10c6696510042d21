//! Per-guild mutable engine state behind a single arena.
//!
//! Activity windows, the flagged-actor set, and the lockdown expiry for a
//! guild all live in one [`GuildState`] record, owned by a [`GuildArena`]
//! keyed by guild ID. State is created lazily on first contact and evicted
//! explicitly when the engine detaches from a guild. The arena's mutex is
//! never held across an await point; callers take short, closure-scoped
//! accesses through [`GuildArena::with_state`].

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::platform::{ActorId, GuildId};
use crate::rate_limit::lock_recovering;

/// Classification of a tracked action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    ChannelCreate,
    ChannelDelete,
    /// A deletion reported out-of-band when the platform event carries no
    /// actor attribution.
    ReportedDelete,
    /// A member ban; counted with the destructive actions.
    MemberBan,
}

impl ActionKind {
    pub fn is_create(self) -> bool {
        matches!(self, ActionKind::ChannelCreate)
    }

    pub fn is_delete(self) -> bool {
        matches!(
            self,
            ActionKind::ChannelDelete | ActionKind::ReportedDelete | ActionKind::MemberBan
        )
    }
}

/// One entry in an actor's activity window.
#[derive(Debug, Clone, Copy)]
pub struct ActionEntry {
    pub kind: ActionKind,
    pub at: Instant,
}

/// All mutable engine state for one guild.
#[derive(Debug, Default)]
pub struct GuildState {
    /// Recent actions per actor, pruned to the activity window on access.
    pub windows: HashMap<ActorId, Vec<ActionEntry>>,
    /// Actors currently considered hostile. Membership is permanent until
    /// an operator unflags or the process restarts.
    pub flagged: HashSet<ActorId>,
    /// Lockdown expiry; evaluated lazily on read, overwritten on re-set.
    pub lockdown_until: Option<Instant>,
}

impl GuildState {
    /// Append an action to the actor's window, prune entries older than
    /// `window`, and return the in-window (creates, deletes) counts.
    pub fn record_action(
        &mut self,
        actor: &ActorId,
        kind: ActionKind,
        window: Duration,
    ) -> (usize, usize) {
        let now = Instant::now();
        let entries = self.windows.entry(actor.clone()).or_default();
        entries.push(ActionEntry { kind, at: now });
        entries.retain(|e| now.duration_since(e.at) <= window);
        let creates = entries.iter().filter(|e| e.kind.is_create()).count();
        let deletes = entries.iter().filter(|e| e.kind.is_delete()).count();
        (creates, deletes)
    }

    pub fn is_locked_down(&self) -> bool {
        self.lockdown_until.is_some_and(|until| Instant::now() < until)
    }
}

/// Owner of all per-guild state, keyed by guild ID.
#[derive(Default)]
pub struct GuildArena {
    inner: Mutex<HashMap<GuildId, GuildState>>,
}

impl GuildArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` against the guild's state, creating it on first contact.
    pub fn with_state<R>(&self, guild: &GuildId, f: impl FnOnce(&mut GuildState) -> R) -> R {
        let mut inner = lock_recovering(&self.inner);
        f(inner.entry(guild.clone()).or_default())
    }

    pub fn flag(&self, guild: &GuildId, actor: &ActorId) {
        self.with_state(guild, |s| {
            s.flagged.insert(actor.clone());
        });
    }

    /// Operator-driven unflag. Returns true if the actor was flagged.
    pub fn unflag(&self, guild: &GuildId, actor: &ActorId) -> bool {
        self.with_state(guild, |s| s.flagged.remove(actor))
    }

    pub fn is_flagged(&self, guild: &GuildId, actor: &ActorId) -> bool {
        let inner = lock_recovering(&self.inner);
        inner
            .get(guild)
            .is_some_and(|s| s.flagged.contains(actor))
    }

    /// Start (or extend) the guild's lockdown for `duration` from now.
    pub fn set_lockdown(&self, guild: &GuildId, duration: Duration) {
        self.with_state(guild, |s| {
            s.lockdown_until = Some(Instant::now() + duration);
        });
    }

    pub fn is_locked_down(&self, guild: &GuildId) -> bool {
        let inner = lock_recovering(&self.inner);
        inner.get(guild).is_some_and(GuildState::is_locked_down)
    }

    /// Drop all state for a guild the engine has departed.
    pub fn evict(&self, guild: &GuildId) {
        lock_recovering(&self.inner).remove(guild);
    }

    /// Drop per-actor windows that hold no in-window entries.
    pub fn sweep_windows(&self, window: Duration) {
        let now = Instant::now();
        let mut inner = lock_recovering(&self.inner);
        for state in inner.values_mut() {
            state.windows.retain(|_, entries| {
                entries.retain(|e| now.duration_since(e.at) <= window);
                !entries.is_empty()
            });
        }
    }
}
