//! # guildguard-core
//!
//! Anti-nuke engine for a community chat guild: a sliding-window abuse
//! detector, a permission-escalation watchdog, a safety-gated mitigation
//! engine, a periodic structural snapshotter, and a best-effort topology
//! restorer.
//!
//! Inbound platform events enter through the [`event::EventRouter`], which
//! owns the single subscription per event type and fans out to the
//! detectors. Confirmed signals flow into the [`mitigate::MitigationEngine`],
//! which applies safety gates (whitelist, owner, self, hierarchy), runs the
//! graduated response, raises a time-bound lockdown, and hands off to the
//! restore path. The [`snapshot::SnapshotManager`] runs on its own timer so
//! a recent snapshot is always available when mitigation fires.

pub mod config;
pub mod detect;
pub mod event;
pub mod mitigate;
pub mod modlog;
pub mod platform;
pub mod rate_limit;
pub mod restore;
pub mod snapshot;
pub mod state;

pub use config::GuardConfig;
pub use event::{EventHandler, EventRouter, GuildEvent, GuildEventKind};
pub use mitigate::{MitigationEngine, MitigationOutcome, SkipReason};
pub use platform::PlatformClient;
