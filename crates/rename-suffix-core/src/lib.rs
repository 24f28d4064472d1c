pub mod config;
pub mod digest;
pub mod engine;
pub mod error;
pub mod journal;
pub mod naming;
pub mod planner;
pub mod progress;
pub mod scanner;

pub use config::{AppConfig, ConflictPolicy, ExtensionFilter, Mode, Preset, RunConfig, ThreadingMode};
pub use digest::{digest_file, encode, Digest, MAX_SUFFIX_CHARS};
pub use engine::{ApplyReport, Failure, PlanStats, RenameEngine, RunPlan};
pub use error::Error;
pub use journal::{Journal, RunContext};
pub use naming::FileEntry;
pub use planner::{Action, ConflictReason, PlanEntry, SkipReason};
pub use progress::{ProgressReporter, SilentReporter};
