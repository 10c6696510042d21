//! File-backed moderation log writer.
//!
//! JSON Lines, one record per line, flushed per write so a crash loses at
//! most the in-flight record. Parent directories are created on open.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};

use super::{ModerationLogger, ModerationRecord};
use crate::rate_limit::lock_recovering;

/// JSON-lines moderation logger appending to a single file.
pub struct FileModerationLogger {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl FileModerationLogger {
    /// Open (or create) the log file, creating parent directories as needed.
    pub fn new(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating parent dirs for {}", path.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("opening moderation log {}", path.display()))?;
        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl ModerationLogger for FileModerationLogger {
    fn log(&self, record: &ModerationRecord) -> Result<()> {
        let json = serde_json::to_string(record)?;
        let mut writer = lock_recovering(&self.writer);
        writeln!(writer, "{json}")?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::GuildId;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn writes_one_json_line_per_record() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs").join("modlog.jsonl");
        let logger = FileModerationLogger::new(path.clone()).unwrap();

        for i in 0..3 {
            logger
                .log(&ModerationRecord::new(
                    GuildId::from("g"),
                    None,
                    "nuke_mitigated",
                    "banned",
                    json!({ "n": i }),
                ))
                .unwrap();
        }

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        let first: ModerationRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.event, "nuke_mitigated");
    }

    #[test]
    fn reopening_appends() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("modlog.jsonl");
        let record = ModerationRecord::new(
            GuildId::from("g"),
            None,
            "restore_completed",
            "full",
            serde_json::Value::Null,
        );

        FileModerationLogger::new(path.clone()).unwrap().log(&record).unwrap();
        FileModerationLogger::new(path.clone()).unwrap().log(&record).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }
}
