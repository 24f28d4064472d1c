//! Rename decisions for a single file against the run's claimed names.

use crate::config::Mode;
use crate::digest::{self, Digest};
use crate::error::Error;
use crate::naming::FileEntry;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

mod append;
mod strip;

pub use append::plan_append;
pub use strip::{plan_strip, StripOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Append mode: the name already carries a suffix.
    AlreadySuffixed,
    /// The same content already lives (or will live) at `target`.
    Duplicate,
    /// Strip mode: nothing to strip.
    NoSuffix,
    /// Strip mode under `keep-suffixed`: the bare name is taken.
    KeptSuffixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictReason {
    VerifyMismatch,
    NameTaken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Rename,
    Skip(SkipReason),
    Conflict(ConflictReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanEntry {
    pub source: PathBuf,
    pub target: PathBuf,
    pub action: Action,
    pub mode: Mode,
    pub digest: Option<Digest>,
    /// Suffix appended (append mode) or removed (strip mode).
    pub suffix: Option<String>,
    /// Disambiguator chosen under `add-counter`.
    pub counter: Option<usize>,
}

impl PlanEntry {
    fn new(entry: &FileEntry, mode: Mode, target: PathBuf, action: Action) -> Self {
        Self {
            source: entry.path.clone(),
            target,
            action,
            mode,
            digest: None,
            suffix: None,
            counter: None,
        }
    }

    fn with_digest(mut self, digest: Option<Digest>) -> Self {
        self.digest = digest;
        self
    }

    fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    pub fn is_rename(&self) -> bool {
        self.action == Action::Rename
    }

    pub fn suffix_len(&self) -> usize {
        self.suffix.as_ref().map(|s| s.len()).unwrap_or(0)
    }
}

/// Filesystem view the planner decides against.
pub trait Namespace: Sync {
    /// True if anything (file, directory, dangling link) occupies `path`.
    fn exists(&self, path: &Path) -> bool;
    fn digest(&self, path: &Path) -> Result<Digest, Error>;
}

pub struct DiskNamespace;

impl Namespace for DiskNamespace {
    fn exists(&self, path: &Path) -> bool {
        fs::symlink_metadata(path).is_ok()
    }

    fn digest(&self, path: &Path) -> Result<Digest, Error> {
        digest::digest_file(path)
    }
}

#[derive(Debug, Clone)]
pub struct Claim {
    pub source: PathBuf,
    pub digest: Option<Digest>,
}

/// Target names claimed so far in one run, owned by the run loop.
#[derive(Debug, Default)]
pub struct Claims {
    targets: HashMap<PathBuf, Claim>,
    contents: HashMap<(PathBuf, Digest), PathBuf>,
    materialized: HashMap<PathBuf, Vec<(PathBuf, String)>>,
}

impl Claims {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember an already-suffixed file on disk so later files with the same
    /// content in its directory are recognized as duplicates.
    pub fn register_existing(&mut self, entry: &FileEntry) {
        for (_, suffix) in entry.splits() {
            self.materialized
                .entry(entry.dir().to_path_buf())
                .or_default()
                .push((entry.path.clone(), suffix.to_string()));
        }
    }

    pub fn claim(&mut self, target: PathBuf, source: PathBuf, digest: Option<Digest>) {
        if let Some(digest) = digest {
            self.remember_content(dir_of(&target), digest, target.clone());
        }
        self.targets.insert(target, Claim { source, digest });
    }

    pub fn get(&self, target: &Path) -> Option<&Claim> {
        self.targets.get(target)
    }

    pub fn is_claimed(&self, target: &Path) -> bool {
        self.targets.contains_key(target)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    fn known_content(&self, dir: &Path, digest: &Digest) -> Option<&PathBuf> {
        self.contents.get(&(dir.to_path_buf(), *digest))
    }

    fn remember_content(&mut self, dir: PathBuf, digest: Digest, path: PathBuf) {
        self.contents.entry((dir, digest)).or_insert(path);
    }

    fn materialized_in(&self, dir: &Path) -> Vec<(PathBuf, String)> {
        self.materialized.get(dir).cloned().unwrap_or_default()
    }
}

fn dir_of(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}

#[derive(Debug, PartialEq, Eq)]
enum Occupant {
    Free,
    Same,
    Different,
}

fn is_taken(path: &Path, claims: &Claims, ns: &dyn Namespace) -> bool {
    claims.is_claimed(path) || ns.exists(path)
}

/// Who holds `path`: nobody, identical content, or something else.
///
/// An occupant that cannot be read counts as different content.
fn occupant(path: &Path, digest: &Digest, claims: &Claims, ns: &dyn Namespace) -> Occupant {
    if let Some(claim) = claims.get(path) {
        return match claim.digest {
            Some(claimed) if claimed == *digest => Occupant::Same,
            _ => Occupant::Different,
        };
    }
    if !ns.exists(path) {
        return Occupant::Free;
    }
    match ns.digest(path) {
        Ok(existing) if existing == *digest => Occupant::Same,
        Ok(_) => Occupant::Different,
        Err(err) => {
            warn!("Cannot read existing {}: {}", path.display(), err);
            Occupant::Different
        }
    }
}

fn source_digest(
    entry: &FileEntry,
    digest: Option<Digest>,
    ns: &dyn Namespace,
) -> Result<Digest, Error> {
    match digest {
        Some(digest) => Ok(digest),
        None => ns.digest(&entry.path),
    }
}
