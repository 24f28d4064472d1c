use crate::engine::PlanStats;

/// Trait for reporting run progress.
///
/// The CLI implements it with periodic stderr lines and an indicatif bar.
/// All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_scan_start(&self) {}
    fn on_scan_complete(&self, _total_files: usize, _duration_secs: f64) {}
    fn on_plan_progress(&self, _stats: &PlanStats) {}
    fn on_plan_complete(&self, _stats: &PlanStats, _duration_secs: f64) {}
    fn on_apply_start(&self, _total: usize) {}
    fn on_apply_progress(&self, _done: usize, _total: usize) {}
    fn on_apply_complete(&self, _applied: usize, _failed: usize, _duration_secs: f64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
