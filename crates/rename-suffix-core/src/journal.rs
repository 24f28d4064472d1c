//! Append-only JSONL record of applied renames.

use crate::config::{Mode, RunConfig};
use crate::error::Error;
use crate::planner::PlanEntry;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use uuid::Uuid;

/// Settings shared by every record of one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunContext {
    pub run_id: String,
    pub root: String,
    pub chars_min: usize,
    pub preset: Option<String>,
    pub exts: Vec<String>,
    pub verify: bool,
    pub conflict_policy: Option<String>,
}

impl RunContext {
    pub fn from_config(config: &RunConfig) -> Self {
        let strip = config.mode == Mode::Strip;
        Self {
            run_id: Uuid::new_v4().to_string(),
            root: config.root.display().to_string(),
            chars_min: config.chars,
            preset: config.preset.map(|p| p.to_string()),
            exts: config.extensions.to_vec(),
            verify: strip && config.verify,
            conflict_policy: strip.then(|| config.conflict.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JournalRecord {
    pub ts: i64,
    #[serde(flatten)]
    pub context: RunContext,
    pub mode: String,
    pub dry_run: bool,
    pub old: String,
    pub new: String,
    pub suffix_used: Option<String>,
    pub suffix_removed: Option<String>,
    pub suffix_len: usize,
    pub blake3_b64url: Option<String>,
    pub size: Option<u64>,
    pub mtime: Option<i64>,
}

impl JournalRecord {
    /// Build the record for an applied entry; size and mtime come from the
    /// file at its new path when it can be read.
    pub fn for_entry(context: &RunContext, entry: &PlanEntry) -> Self {
        let metadata = fs::metadata(&entry.target).ok();
        let size = metadata.as_ref().map(|m| m.len());
        let mtime = metadata
            .and_then(|m| m.modified().ok())
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64);

        let (suffix_used, suffix_removed) = match entry.mode {
            Mode::Append => (entry.suffix.clone(), None),
            Mode::Strip => (None, entry.suffix.clone()),
        };

        Self {
            ts: chrono::Utc::now().timestamp(),
            context: context.clone(),
            mode: entry.mode.to_string(),
            dry_run: false,
            old: entry.source.display().to_string(),
            new: entry.target.display().to_string(),
            suffix_used,
            suffix_removed,
            suffix_len: entry.suffix_len(),
            blake3_b64url: entry.digest.map(|d| d.to_b64url()),
            size,
            mtime,
        }
    }
}

pub struct Journal {
    path: PathBuf,
    writer: BufWriter<File>,
    context: RunContext,
}

impl Journal {
    pub fn open(path: &Path, context: RunContext) -> Result<Self, Error> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| Error::io(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            context,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn context(&self) -> &RunContext {
        &self.context
    }

    /// Write one line and flush, so a crash mid-run keeps every applied rename.
    pub fn record(&mut self, entry: &PlanEntry) -> Result<(), Error> {
        let record = JournalRecord::for_entry(&self.context, entry);
        let line = serde_json::to_string(&record)?;
        writeln!(self.writer, "{}", line).map_err(|e| Error::io(&self.path, e))?;
        self.writer.flush().map_err(|e| Error::io(&self.path, e))
    }
}
