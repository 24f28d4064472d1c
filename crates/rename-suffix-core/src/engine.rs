use crate::config::{Mode, RunConfig, ThreadingMode};
use crate::digest::Digest;
use crate::error::Error;
use crate::journal::Journal;
use crate::naming::FileEntry;
use crate::planner::{
    plan_append, plan_strip, Action, Claims, ConflictReason, DiskNamespace, Namespace, PlanEntry,
    SkipReason, StripOptions,
};
use crate::progress::ProgressReporter;
use crate::scanner::{self, ScanOptions};
use rayon::prelude::*;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, error, info};

pub struct RenameEngine {
    config: RunConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanStats {
    pub scanned: usize,
    pub considered: usize,
    pub skipped_not_target: usize,
    /// Walk errors and names that are not valid UTF-8.
    pub skipped_unreadable: usize,
    pub renames: usize,
    pub counter_renames: usize,
    pub skipped_already_suffixed: usize,
    pub skipped_duplicate: usize,
    pub skipped_no_suffix: usize,
    pub kept_suffixed: usize,
    pub verify_mismatch: usize,
    pub name_taken: usize,
    pub failures: usize,
}

impl PlanStats {
    fn count(&mut self, entry: &PlanEntry) {
        match entry.action {
            Action::Rename => {
                self.renames += 1;
                if entry.counter.is_some() {
                    self.counter_renames += 1;
                }
            }
            Action::Skip(SkipReason::AlreadySuffixed) => self.skipped_already_suffixed += 1,
            Action::Skip(SkipReason::Duplicate) => self.skipped_duplicate += 1,
            Action::Skip(SkipReason::NoSuffix) => self.skipped_no_suffix += 1,
            Action::Skip(SkipReason::KeptSuffixed) => self.kept_suffixed += 1,
            Action::Conflict(ConflictReason::VerifyMismatch) => self.verify_mismatch += 1,
            Action::Conflict(ConflictReason::NameTaken) => self.name_taken += 1,
        }
    }

    pub fn conflicts(&self) -> usize {
        self.verify_mismatch + self.name_taken
    }
}

/// A file that could not be planned or renamed.
#[derive(Debug)]
pub struct Failure {
    pub path: PathBuf,
    pub error: Error,
}

#[derive(Debug)]
pub struct RunPlan {
    pub mode: Mode,
    pub entries: Vec<PlanEntry>,
    pub failures: Vec<Failure>,
    pub stats: PlanStats,
}

impl RunPlan {
    pub fn renames(&self) -> impl Iterator<Item = &PlanEntry> {
        self.entries.iter().filter(|e| e.is_rename())
    }

    pub fn conflicts(&self) -> impl Iterator<Item = &PlanEntry> {
        self.entries
            .iter()
            .filter(|e| matches!(e.action, Action::Conflict(_)))
    }
}

#[derive(Debug, Default)]
pub struct ApplyReport {
    pub applied: Vec<PlanEntry>,
    pub failures: Vec<Failure>,
}

impl RenameEngine {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Scan the root and decide every file. Only a bad root or config is fatal;
    /// per-file problems land in `RunPlan::failures`.
    pub fn plan(&self, reporter: &dyn ProgressReporter) -> Result<RunPlan, Error> {
        self.config.validate()?;
        info!(
            "Planning {} of {} (chars={})",
            self.config.mode,
            self.config.root.display(),
            self.config.chars
        );

        reporter.on_scan_start();
        let scan_start = Instant::now();
        let scan = scanner::scan_directory(&self.config.root, &ScanOptions::from(&self.config))?;
        let scan_duration = scan_start.elapsed();
        reporter.on_scan_complete(scan.scanned, scan_duration.as_secs_f64());
        debug!(
            "Scan completed in {:.2}s, {} files, {} targets",
            scan_duration.as_secs_f64(),
            scan.scanned,
            scan.entries.len(),
        );

        let mut plan = self.plan_entries(scan.entries, &DiskNamespace, reporter);
        plan.stats.scanned = scan.scanned;
        plan.stats.skipped_not_target = scan.skipped_not_target;
        plan.stats.skipped_unreadable = scan.skipped_unreadable;
        Ok(plan)
    }

    /// Plan an already-scanned, ordered list of entries against `ns`.
    pub fn plan_entries(
        &self,
        entries: Vec<FileEntry>,
        ns: &dyn Namespace,
        reporter: &dyn ProgressReporter,
    ) -> RunPlan {
        let plan_start = Instant::now();
        let mode = self.config.mode;
        let mut claims = Claims::new();
        let mut stats = PlanStats {
            scanned: entries.len(),
            ..Default::default()
        };
        let mut planned = Vec::with_capacity(entries.len());
        let mut failures = Vec::new();

        if mode == Mode::Append {
            for entry in &entries {
                claims.register_existing(entry);
            }
        }

        let mut digests = self.precompute_digests(&entries, ns);

        for (index, entry) in entries.iter().enumerate() {
            stats.considered += 1;

            let digest = match digests.get_mut(index).and_then(Option::take) {
                Some(Ok(digest)) => Some(digest),
                Some(Err(err)) => {
                    self.record_failure(&mut failures, &mut stats, entry, err);
                    reporter.on_plan_progress(&stats);
                    continue;
                }
                None => None,
            };

            let decision = match mode {
                Mode::Append => plan_append(entry, digest, self.config.chars, &mut claims, ns),
                Mode::Strip => plan_strip(
                    entry,
                    digest,
                    StripOptions {
                        verify: self.config.verify,
                        conflict: self.config.conflict,
                    },
                    &mut claims,
                    ns,
                ),
            };

            match decision {
                Ok(plan_entry) => {
                    debug!(
                        "{:?}: {} -> {}",
                        plan_entry.action,
                        plan_entry.source.display(),
                        plan_entry.target.display()
                    );
                    stats.count(&plan_entry);
                    planned.push(plan_entry);
                }
                Err(err) => self.record_failure(&mut failures, &mut stats, entry, err),
            }
            reporter.on_plan_progress(&stats);
        }

        reporter.on_plan_complete(&stats, plan_start.elapsed().as_secs_f64());
        info!(
            "Planned {} renames, {} conflicts, {} failures",
            stats.renames,
            stats.conflicts(),
            stats.failures
        );

        RunPlan {
            mode,
            entries: planned,
            failures,
            stats,
        }
    }

    /// Digests computed up front in parallel mode. Decisions still happen in
    /// scan order against one claim set, so the plan matches a sequential run.
    fn precompute_digests(
        &self,
        entries: &[FileEntry],
        ns: &dyn Namespace,
    ) -> Vec<Option<Result<Digest, Error>>> {
        if self.config.threading != ThreadingMode::Parallel {
            return Vec::new();
        }
        let mode = self.config.mode;
        let verify = self.config.verify;
        entries
            .par_iter()
            .map(|entry| {
                let needed = match mode {
                    Mode::Append => entry.suffix().is_none(),
                    Mode::Strip => verify && entry.suffix().is_some(),
                };
                needed.then(|| ns.digest(&entry.path))
            })
            .collect()
    }

    fn record_failure(
        &self,
        failures: &mut Vec<Failure>,
        stats: &mut PlanStats,
        entry: &FileEntry,
        err: Error,
    ) {
        error!("Error processing file '{}': {}", entry.path.display(), err);
        stats.failures += 1;
        failures.push(Failure {
            path: entry.path.clone(),
            error: err,
        });
    }

    /// Apply every rename of `plan`, one file at a time.
    ///
    /// A target that appeared since planning is never overwritten. A failed
    /// rename is reported and the rest continue. Only journal write errors
    /// stop the run.
    pub fn apply(
        &self,
        plan: &RunPlan,
        mut journal: Option<&mut Journal>,
        reporter: &dyn ProgressReporter,
    ) -> Result<ApplyReport, Error> {
        let renames: Vec<&PlanEntry> = plan.renames().collect();
        let total = renames.len();
        let apply_start = Instant::now();
        let mut report = ApplyReport::default();

        reporter.on_apply_start(total);
        for (done, entry) in renames.into_iter().enumerate() {
            match apply_one(entry) {
                Ok(()) => {
                    debug!(
                        "Renamed {} -> {}",
                        entry.source.display(),
                        entry.target.display()
                    );
                    if let Some(journal) = journal.as_deref_mut() {
                        journal.record(entry)?;
                    }
                    report.applied.push(entry.clone());
                }
                Err(err) => {
                    error!("Failed to rename '{}': {}", entry.source.display(), err);
                    report.failures.push(Failure {
                        path: entry.source.clone(),
                        error: err,
                    });
                }
            }
            reporter.on_apply_progress(done + 1, total);
        }

        reporter.on_apply_complete(
            report.applied.len(),
            report.failures.len(),
            apply_start.elapsed().as_secs_f64(),
        );
        info!(
            "Applied {} renames, {} failed",
            report.applied.len(),
            report.failures.len()
        );
        Ok(report)
    }
}

fn apply_one(entry: &PlanEntry) -> Result<(), Error> {
    if fs::symlink_metadata(&entry.target).is_ok() {
        return Err(Error::TargetExists(entry.target.clone()));
    }
    fs::rename(&entry.source, &entry.target).map_err(|e| Error::io(&entry.source, e))
}
