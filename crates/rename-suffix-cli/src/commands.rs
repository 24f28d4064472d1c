use clap::{ArgAction, Parser, ValueEnum};
use rename_suffix_core::{ConflictPolicy, Preset};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "rename-suffix")]
#[command(
    about = "Rename camera-like files by appending/removing a short base64url(BLAKE3) suffix",
    long_about = "Rename camera-like files by appending/removing a short base64url(BLAKE3) \
                  suffix. Idempotent and collision-safe. Dry-run unless --apply is given."
)]
pub struct Cli {
    /// Root directory to scan
    pub root: PathBuf,

    /// Base suffix length in base64url characters [default: 6]
    #[arg(long, value_name = "N")]
    pub chars: Option<usize>,

    /// Actually rename files (default is a dry run)
    #[arg(long)]
    pub apply: bool,

    /// Strip suffixes instead of appending them
    #[arg(long)]
    pub strip: bool,

    /// Use a predefined extension set
    #[arg(long, value_enum)]
    pub preset: Option<PresetArg>,

    /// Extension to include (repeatable), e.g. --ext .heic --ext jpg
    #[arg(long = "ext", value_name = "EXT", action = ArgAction::Append)]
    pub ext: Vec<String>,

    /// When stripping, verify the suffix against the file digest (default)
    #[arg(long, overrides_with = "no_verify")]
    pub verify: bool,

    /// When stripping, do not verify the suffix (faster, less safe)
    #[arg(long, overrides_with = "verify")]
    pub no_verify: bool,

    /// When stripping, what to do if the bare name holds different content [default: refuse]
    #[arg(long, value_enum)]
    pub conflict: Option<ConflictArg>,

    /// JSONL log path (default: <ROOT>/rename-log.jsonl when --apply)
    #[arg(long, value_name = "PATH")]
    pub log: Option<PathBuf>,

    /// Print progress every N files (to stderr)
    #[arg(long, value_name = "N", default_value_t = 0)]
    pub progress: usize,

    /// Print each planned rename
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress non-error output (overrides --verbose/--progress)
    #[arg(short, long)]
    pub quiet: bool,

    /// Hash files on all cores before deciding names
    #[arg(long)]
    pub parallel: bool,

    /// Only look at files directly inside ROOT
    #[arg(long)]
    pub no_recurse: bool,
}

impl Cli {
    /// `Some` only when a verify flag was given on the command line.
    pub fn verify_flag(&self) -> Option<bool> {
        if self.no_verify {
            Some(false)
        } else if self.verify {
            Some(true)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PresetArg {
    AppleCamera,
}

impl From<PresetArg> for Preset {
    fn from(arg: PresetArg) -> Self {
        match arg {
            PresetArg::AppleCamera => Preset::AppleCamera,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConflictArg {
    Refuse,
    KeepSuffixed,
    AddCounter,
}

impl From<ConflictArg> for ConflictPolicy {
    fn from(arg: ConflictArg) -> Self {
        match arg {
            ConflictArg::Refuse => ConflictPolicy::Refuse,
            ConflictArg::KeepSuffixed => ConflictPolicy::KeepSuffixed,
            ConflictArg::AddCounter => ConflictPolicy::AddCounter,
        }
    }
}
