mod commands;
mod logging;
mod progress;
mod report;

use anyhow::{Context, Result};
use clap::Parser;
use commands::Cli;
use dotenv::dotenv;
use progress::CliReporter;
use rename_suffix_core::config::load_configuration;
use rename_suffix_core::{
    AppConfig, ExtensionFilter, Journal, Mode, Preset, RenameEngine, RunConfig, RunContext,
    ThreadingMode,
};
use std::path::PathBuf;
use tracing::{error, info};

fn main() -> Result<()> {
    dotenv().ok();

    let args = Cli::parse();
    let _guard = logging::init_logger(args.verbose, args.quiet);

    let app_config = match load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            return Err(err).context("loading configuration");
        }
    };

    let config = build_run_config(&args, &app_config);
    let log_path = args
        .log
        .clone()
        .or_else(|| app_config.log_file.clone())
        .unwrap_or_else(|| config.default_log_path());

    run(&args, config, log_path)
}

/// Command-line flags win over `Config` file and environment values.
fn build_run_config(args: &Cli, app: &AppConfig) -> RunConfig {
    let mode = if args.strip { Mode::Strip } else { Mode::Append };
    let mut config = RunConfig::from_app_config(&args.root, mode, app);

    if let Some(chars) = args.chars {
        config.chars = chars;
    }
    if let Some(preset) = args.preset.map(Preset::from) {
        config.preset = Some(preset);
        config.extensions = ExtensionFilter::preset(preset);
    }
    if !args.ext.is_empty() {
        config.extensions = ExtensionFilter::from_list(&args.ext);
    }
    if let Some(verify) = args.verify_flag() {
        config.verify = verify;
    }
    if let Some(conflict) = args.conflict {
        config.conflict = conflict.into();
    }
    if args.parallel {
        config.threading = ThreadingMode::Parallel;
    }
    if args.no_recurse {
        config.recursive = false;
    }
    config
}

fn run(args: &Cli, config: RunConfig, log_path: PathBuf) -> Result<()> {
    let reporter = CliReporter::new(args.progress, args.quiet);
    let context = RunContext::from_config(&config);
    let engine = RenameEngine::new(config);

    let plan = engine
        .plan(&reporter)
        .with_context(|| format!("planning renames under {}", args.root.display()))?;
    report::print_plan(&plan, args.verbose, args.quiet);

    if !args.apply {
        report::print_summary(&plan, None, args.quiet);
        return Ok(());
    }

    let mut journal = Journal::open(&log_path, context)
        .with_context(|| format!("opening log {}", log_path.display()))?;
    info!(
        "Run {} logging to {}",
        journal.context().run_id,
        journal.path().display()
    );
    let applied = engine
        .apply(&plan, Some(&mut journal), &reporter)
        .with_context(|| format!("writing log {}", log_path.display()))?;

    report::print_summary(&plan, Some(&applied), args.quiet);
    if !args.quiet {
        println!("Log: {}", journal.path().display());
    }
    Ok(())
}
