use crate::digest::MAX_SUFFIX_CHARS;
use crate::error::Error;
use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_CHARS: usize = 6;
pub const DEFAULT_EXTENSION: &str = ".heic";
pub const DEFAULT_LOG_NAME: &str = "rename-log.jsonl";

pub const APPLE_CAMERA_EXTS: &[&str] = &[
    ".heic", ".heif", ".jpg", ".jpeg", ".png", ".mov", ".mp4",
    ".aae",  // iOS edits sidecar
    ".json", // sometimes produced by tooling
    ".xmp",  // metadata sidecar
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Append,
    Strip,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Append => f.write_str("append"),
            Mode::Strip => f.write_str("strip"),
        }
    }
}

/// What strip mode does when the bare name is taken by different content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictPolicy {
    #[default]
    Refuse,
    KeepSuffixed,
    AddCounter,
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictPolicy::Refuse => f.write_str("refuse"),
            ConflictPolicy::KeepSuffixed => f.write_str("keep-suffixed"),
            ConflictPolicy::AddCounter => f.write_str("add-counter"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Preset {
    AppleCamera,
}

impl Preset {
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Preset::AppleCamera => APPLE_CAMERA_EXTS,
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Preset::AppleCamera => f.write_str("apple-camera"),
        }
    }
}

impl FromStr for Preset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "apple-camera" => Ok(Preset::AppleCamera),
            other => Err(format!("unknown preset '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ThreadingMode {
    #[default]
    Sequential,
    Parallel,
}

/// Lowercased extensions with a leading dot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionFilter(BTreeSet<String>);

impl ExtensionFilter {
    /// Normalizes entries to `.ext` lowercase; blank entries are dropped.
    pub fn from_list<I, S>(exts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set = exts
            .into_iter()
            .filter_map(|e| {
                let e = e.as_ref().trim();
                if e.is_empty() {
                    return None;
                }
                let e = e.to_lowercase();
                Some(if e.starts_with('.') { e } else { format!(".{}", e) })
            })
            .collect();
        Self(set)
    }

    pub fn preset(preset: Preset) -> Self {
        Self::from_list(preset.extensions())
    }

    pub fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.0.contains(&format!(".{}", ext.to_lowercase())))
            .unwrap_or(false)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

impl Default for ExtensionFilter {
    fn default() -> Self {
        Self::from_list([DEFAULT_EXTENSION])
    }
}

/// Defaults read from an optional `Config` file and `RENAME_SUFFIX_*` variables.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub chars: Option<usize>,
    pub preset: Option<Preset>,
    pub extensions: Vec<String>,
    pub conflict: Option<ConflictPolicy>,
    pub verify: Option<bool>,
    pub ignore_patterns: Vec<String>,
    pub log_file: Option<PathBuf>,
}

pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .add_source(
            Environment::with_prefix("RENAME_SUFFIX")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("extensions")
                .with_list_parse_key("ignore_patterns"),
        )
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

/// Resolved settings for one run. Built once and passed to the engine.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub root: PathBuf,
    pub mode: Mode,
    pub chars: usize,
    pub verify: bool,
    pub conflict: ConflictPolicy,
    pub preset: Option<Preset>,
    pub extensions: ExtensionFilter,
    pub ignore_patterns: Vec<String>,
    pub recursive: bool,
    pub threading: ThreadingMode,
}

impl RunConfig {
    pub fn new(root: impl Into<PathBuf>, mode: Mode) -> Self {
        Self {
            root: root.into(),
            mode,
            chars: DEFAULT_CHARS,
            verify: true,
            conflict: ConflictPolicy::default(),
            preset: None,
            extensions: ExtensionFilter::default(),
            ignore_patterns: Vec::new(),
            recursive: true,
            threading: ThreadingMode::default(),
        }
    }

    /// Start from file/environment defaults.
    pub fn from_app_config(root: impl Into<PathBuf>, mode: Mode, app: &AppConfig) -> Self {
        let mut config = Self::new(root, mode);
        if let Some(chars) = app.chars {
            config.chars = chars;
        }
        if let Some(verify) = app.verify {
            config.verify = verify;
        }
        if let Some(conflict) = app.conflict {
            config.conflict = conflict;
        }
        if !app.extensions.is_empty() {
            config.extensions = ExtensionFilter::from_list(&app.extensions);
        } else if let Some(preset) = app.preset {
            config.extensions = ExtensionFilter::preset(preset);
        }
        config.preset = app.preset;
        config.ignore_patterns = app.ignore_patterns.clone();
        config
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.chars == 0 || self.chars > MAX_SUFFIX_CHARS {
            return Err(Error::InvalidChars(self.chars));
        }
        if !self.root.is_dir() {
            return Err(Error::InvalidRoot(self.root.clone()));
        }
        Ok(())
    }

    pub fn default_log_path(&self) -> PathBuf {
        self.root.join(DEFAULT_LOG_NAME)
    }
}
