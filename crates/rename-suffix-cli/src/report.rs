use colored::*;
use rename_suffix_core::{
    Action, ApplyReport, ConflictReason, Failure, Mode, PlanEntry, PlanStats, RunPlan,
};

/// One-line run summary, e.g.
/// `APPEND DRY-RUN: scanned=12 considered=10 would_rename=8 ...`.
pub fn summary_line(mode: Mode, applied: bool, stats: &PlanStats, renamed: usize) -> String {
    let mode = match mode {
        Mode::Append => "APPEND",
        Mode::Strip => "STRIP",
    };
    let (run, renamed_key) = if applied {
        ("APPLIED", "renamed")
    } else {
        ("DRY-RUN", "would_rename")
    };
    format!(
        "{} {}: scanned={} considered={} {}={} skipped_not_target={} \
         skipped_unreadable={} skipped_already_suffixed={} skipped_duplicate={} \
         skipped_no_suffix={} kept_suffixed={} verify_mismatch={} name_taken={} failures={}",
        mode,
        run,
        stats.scanned,
        stats.considered,
        renamed_key,
        renamed,
        stats.skipped_not_target,
        stats.skipped_unreadable,
        stats.skipped_already_suffixed,
        stats.skipped_duplicate,
        stats.skipped_no_suffix,
        stats.kept_suffixed,
        stats.verify_mismatch,
        stats.name_taken,
        stats.failures,
    )
}

pub fn rename_line(entry: &PlanEntry) -> String {
    format!("{}  ->  {}", entry.source.display(), entry.target.display())
}

pub fn conflict_line(entry: &PlanEntry) -> Option<String> {
    match entry.action {
        Action::Conflict(ConflictReason::VerifyMismatch) => Some(format!(
            "[conflict] suffix does not match content: {}",
            entry.source.display()
        )),
        Action::Conflict(ConflictReason::NameTaken) => Some(format!(
            "[conflict] would overwrite: {} (from {})",
            entry.target.display(),
            entry.source.display()
        )),
        _ => None,
    }
}

fn failure_line(failure: &Failure) -> String {
    format!("[failed] {}: {}", failure.path.display(), failure.error)
}

/// Print the planned renames (verbose only) and every conflict.
pub fn print_plan(plan: &RunPlan, verbose: bool, quiet: bool) {
    if verbose && !quiet {
        for entry in plan.renames() {
            println!("{}", rename_line(entry));
        }
    }
    if !quiet {
        for line in plan.conflicts().filter_map(conflict_line) {
            eprintln!("{}", line.yellow());
        }
    }
}

/// Print failures from planning and applying, then the summary line.
///
/// Failures are printed even in quiet mode.
pub fn print_summary(plan: &RunPlan, applied: Option<&ApplyReport>, quiet: bool) {
    for failure in &plan.failures {
        eprintln!("{}", failure_line(failure).red());
    }
    if let Some(report) = applied {
        for failure in &report.failures {
            eprintln!("{}", failure_line(failure).red());
        }
    }
    if quiet {
        return;
    }

    let mut stats = plan.stats;
    let renamed = match applied {
        Some(report) => {
            stats.failures += report.failures.len();
            report.applied.len()
        }
        None => stats.renames,
    };
    let line = summary_line(plan.mode, applied.is_some(), &stats, renamed);
    if stats.conflicts() > 0 || stats.failures > 0 {
        println!("{}", line.yellow());
    } else {
        println!("{}", line.green());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn entry(action: Action) -> PlanEntry {
        PlanEntry {
            source: PathBuf::from("/p/a__abcdef.heic"),
            target: PathBuf::from("/p/a.heic"),
            action,
            mode: Mode::Strip,
            digest: None,
            suffix: Some("abcdef".to_string()),
            counter: None,
        }
    }

    #[test]
    fn dry_run_summary_uses_would_rename() {
        let stats = PlanStats {
            scanned: 12,
            considered: 10,
            renames: 8,
            ..Default::default()
        };
        let line = summary_line(Mode::Append, false, &stats, stats.renames);
        assert!(line.starts_with("APPEND DRY-RUN: scanned=12 considered=10 would_rename=8 "));
    }

    #[test]
    fn applied_summary_uses_renamed() {
        let stats = PlanStats::default();
        let line = summary_line(Mode::Strip, true, &stats, 3);
        assert!(line.starts_with("STRIP APPLIED: scanned=0 considered=0 renamed=3 "));
        assert!(line.ends_with("name_taken=0 failures=0"));
    }

    #[test]
    fn summary_reports_unreadable_entries() {
        let stats = PlanStats {
            scanned: 4,
            skipped_unreadable: 2,
            ..Default::default()
        };
        let line = summary_line(Mode::Append, false, &stats, 0);
        assert!(line.contains(" skipped_not_target=0 skipped_unreadable=2 "));
    }

    #[test]
    fn rename_line_shows_both_paths() {
        assert_eq!(
            rename_line(&entry(Action::Rename)),
            "/p/a__abcdef.heic  ->  /p/a.heic"
        );
    }

    #[test]
    fn conflict_lines_name_the_reason() {
        assert_eq!(
            conflict_line(&entry(Action::Conflict(ConflictReason::NameTaken))).unwrap(),
            "[conflict] would overwrite: /p/a.heic (from /p/a__abcdef.heic)"
        );
        assert!(
            conflict_line(&entry(Action::Conflict(ConflictReason::VerifyMismatch)))
                .unwrap()
                .contains("does not match")
        );
        assert!(conflict_line(&entry(Action::Rename)).is_none());
    }
}
