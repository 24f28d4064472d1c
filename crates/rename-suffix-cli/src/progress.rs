use indicatif::{ProgressBar, ProgressStyle};
use rename_suffix_core::{PlanStats, ProgressReporter};
use std::sync::Mutex;
use std::time::{Duration, Instant};

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// CLI progress reporter.
///
/// - Scan phase: spinner
/// - Plan phase: a stderr line every `every` files (0 disables)
/// - Apply phase: progress bar
pub struct CliReporter {
    every: usize,
    quiet: bool,
    started: Mutex<Instant>,
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new(every: usize, quiet: bool) -> Self {
        Self {
            every,
            quiet,
            started: Mutex::new(Instant::now()),
            bar: Mutex::new(None),
        }
    }

    fn set_bar(&self, pb: ProgressBar) {
        let mut guard = self.bar.lock().unwrap();
        if let Some(old) = guard.take() {
            old.finish_and_clear();
        }
        *guard = Some(pb);
    }

    fn finish_bar(&self) {
        let mut guard = self.bar.lock().unwrap();
        if let Some(pb) = guard.take() {
            pb.finish_and_clear();
        }
    }

    fn should_report(&self, considered: usize) -> bool {
        !self.quiet && self.every > 0 && considered > 0 && considered % self.every == 0
    }
}

pub fn progress_line(stats: &PlanStats, elapsed_secs: f64) -> String {
    let rate = if elapsed_secs > 0.0 {
        stats.considered as f64 / elapsed_secs
    } else {
        0.0
    };
    format!(
        "progress: considered={} renames={} skipped={} conflicts={} failures={} rate={:.1}/s",
        stats.considered,
        stats.renames,
        stats.skipped_already_suffixed
            + stats.skipped_duplicate
            + stats.skipped_no_suffix
            + stats.kept_suffixed,
        stats.conflicts(),
        stats.failures,
        rate
    )
}

impl ProgressReporter for CliReporter {
    fn on_scan_start(&self) {
        *self.started.lock().unwrap() = Instant::now();
        if self.quiet {
            return;
        }
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_chars(TICK_CHARS),
        );
        pb.set_message("Scanning files...");
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn on_scan_complete(&self, total_files: usize, duration_secs: f64) {
        self.finish_bar();
        if !self.quiet {
            eprintln!(
                "  \x1b[32m✓\x1b[0m Scan complete: {} files in {:.2}s",
                total_files, duration_secs
            );
        }
    }

    fn on_plan_progress(&self, stats: &PlanStats) {
        if self.should_report(stats.considered) {
            let elapsed = self.started.lock().unwrap().elapsed().as_secs_f64();
            eprintln!("{}", progress_line(stats, elapsed));
        }
    }

    fn on_plan_complete(&self, stats: &PlanStats, duration_secs: f64) {
        if !self.quiet {
            eprintln!(
                "  \x1b[32m✓\x1b[0m Plan complete: {} files considered in {:.2}s",
                stats.considered, duration_secs
            );
        }
    }

    fn on_apply_start(&self, total: usize) {
        if self.quiet || total == 0 {
            return;
        }
        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::with_template(
                "  {spinner:.cyan} Renaming [{bar:30.cyan/dim}] {pos}/{len} files ({eta} remaining)",
            )
            .unwrap()
            .progress_chars("━╸─")
            .tick_chars(TICK_CHARS),
        );
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn on_apply_progress(&self, done: usize, _total: usize) {
        let guard = self.bar.lock().unwrap();
        if let Some(pb) = guard.as_ref() {
            pb.set_position(done as u64);
        }
    }

    fn on_apply_complete(&self, applied: usize, failed: usize, duration_secs: f64) {
        self.finish_bar();
        if !self.quiet {
            eprintln!(
                "  \x1b[32m✓\x1b[0m Apply complete: {} renamed, {} failed in {:.2}s",
                applied, failed, duration_secs
            );
        }
    }
}
