//! Sliding-window hit counter keyed by (guild, actor).
//!
//! Pure counting with no knowledge of action semantics: [`record`] appends
//! the current instant, drops entries older than the window, and reports
//! whether the remaining count reached the threshold. Used directly for
//! externally-reported deletions and mass-ban detection, and as a building
//! block inside the activity tracker.
//!
//! [`record`]: SlidingWindowLimiter::record

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::platform::{ActorId, GuildId};

/// Per-(guild, actor) sliding-window counter.
pub struct SlidingWindowLimiter {
    threshold: usize,
    window: Duration,
    hits: Mutex<HashMap<(GuildId, ActorId), Vec<Instant>>>,
}

impl SlidingWindowLimiter {
    pub fn new(threshold: usize, window: Duration) -> Self {
        Self {
            threshold,
            window,
            hits: Mutex::new(HashMap::new()),
        }
    }

    /// Record a hit for the pair and return true iff the in-window count
    /// reached the threshold.
    pub fn record(&self, guild: &GuildId, actor: &ActorId) -> bool {
        let now = Instant::now();
        let mut hits = lock_recovering(&self.hits);
        let entries = hits
            .entry((guild.clone(), actor.clone()))
            .or_default();
        entries.push(now);
        entries.retain(|t| now.duration_since(*t) <= self.window);
        entries.len() >= self.threshold
    }

    /// In-window hit count for a pair, without recording.
    pub fn count(&self, guild: &GuildId, actor: &ActorId) -> usize {
        let now = Instant::now();
        let hits = lock_recovering(&self.hits);
        hits.get(&(guild.clone(), actor.clone()))
            .map(|entries| {
                entries
                    .iter()
                    .filter(|t| now.duration_since(**t) <= self.window)
                    .count()
            })
            .unwrap_or(0)
    }

    /// Drop pairs whose every entry has aged out of the window.
    pub fn sweep(&self) {
        let now = Instant::now();
        let mut hits = lock_recovering(&self.hits);
        hits.retain(|_, entries| {
            entries.retain(|t| now.duration_since(*t) <= self.window);
            !entries.is_empty()
        });
    }

    /// Number of tracked pairs, stale or not.
    pub fn tracked_pairs(&self) -> usize {
        lock_recovering(&self.hits).len()
    }
}

/// Lock a mutex, recovering the inner data if a holder panicked.
pub(crate) fn lock_recovering<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
