//! Engine settings and TOML configuration parsing.
//!
//! Detection thresholds are deliberately plain configuration rather than
//! constants: tuning them per deployment is an expected operational need.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::platform::ActorId;

/// Top-level GuildGuard configuration, loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Activity window for burst detection, in milliseconds.
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,

    /// Channel creations inside the window that confirm a nuke.
    #[serde(default = "default_create_threshold")]
    pub create_threshold: usize,

    /// Destructive actions inside the window that confirm a nuke.
    #[serde(default = "default_delete_threshold")]
    pub delete_threshold: usize,

    /// Hit count for the generic sliding-window limiter.
    #[serde(default = "default_limiter_threshold")]
    pub limiter_threshold: usize,

    /// Window for the generic sliding-window limiter, in milliseconds.
    #[serde(default = "default_limiter_window_ms")]
    pub limiter_window_ms: u64,

    /// Lockdown duration after a confirmed nuke, in milliseconds.
    #[serde(default = "default_lockdown_ms")]
    pub lockdown_ms: u64,

    /// Interval between structural snapshots, in seconds.
    #[serde(default = "default_snapshot_interval_secs")]
    pub snapshot_interval_secs: u64,

    /// Directory holding the one snapshot file per guild.
    #[serde(default = "default_snapshot_dir")]
    pub snapshot_dir: PathBuf,

    /// Path to the JSON-lines moderation log file.
    #[serde(default = "default_modlog_path")]
    pub modlog_path: PathBuf,

    /// Actor IDs categorically exempt from all mitigation. Fixed at
    /// startup; not runtime-mutable.
    #[serde(default)]
    pub whitelist: Vec<ActorId>,
}

impl GuardConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    pub fn limiter_window(&self) -> Duration {
        Duration::from_millis(self.limiter_window_ms)
    }

    pub fn lockdown(&self) -> Duration {
        Duration::from_millis(self.lockdown_ms)
    }

    pub fn snapshot_interval(&self) -> Duration {
        Duration::from_secs(self.snapshot_interval_secs)
    }
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            window_ms: default_window_ms(),
            create_threshold: default_create_threshold(),
            delete_threshold: default_delete_threshold(),
            limiter_threshold: default_limiter_threshold(),
            limiter_window_ms: default_limiter_window_ms(),
            lockdown_ms: default_lockdown_ms(),
            snapshot_interval_secs: default_snapshot_interval_secs(),
            snapshot_dir: default_snapshot_dir(),
            modlog_path: default_modlog_path(),
            whitelist: Vec::new(),
        }
    }
}

fn default_window_ms() -> u64 {
    1500
}

fn default_create_threshold() -> usize {
    3
}

fn default_delete_threshold() -> usize {
    3
}

fn default_limiter_threshold() -> usize {
    3
}

fn default_limiter_window_ms() -> u64 {
    7000
}

fn default_lockdown_ms() -> u64 {
    5000
}

fn default_snapshot_interval_secs() -> u64 {
    900
}

fn default_snapshot_dir() -> PathBuf {
    PathBuf::from("data/snapshots")
}

fn default_modlog_path() -> PathBuf {
    PathBuf::from("data/modlog.jsonl")
}
