use crate::config::{ExtensionFilter, RunConfig};
use crate::error::Error;
use crate::naming::FileEntry;
use glob::Pattern;
use std::path::Path;
use tracing::{error, warn};
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub extensions: ExtensionFilter,
    pub ignore_patterns: Vec<String>,
    pub recursive: bool,
}

impl From<&RunConfig> for ScanOptions {
    fn from(config: &RunConfig) -> Self {
        Self {
            extensions: config.extensions.clone(),
            ignore_patterns: config.ignore_patterns.clone(),
            recursive: config.recursive,
        }
    }
}

#[derive(Debug, Default)]
pub struct ScanResult {
    /// Matching files, sorted by path.
    pub entries: Vec<FileEntry>,
    /// Regular files seen, matching or not.
    pub scanned: usize,
    pub skipped_not_target: usize,
    pub skipped_unreadable: usize,
}

/// Walk `root` and collect regular files whose extension is allowed.
///
/// Symlinks are neither followed nor returned. Ignore patterns are glob
/// patterns matched against full paths, for directories and files alike.
pub fn scan_directory(root: &Path, options: &ScanOptions) -> Result<ScanResult, Error> {
    if !root.is_dir() {
        return Err(Error::InvalidRoot(root.to_path_buf()));
    }

    let ignore_patterns: Vec<Pattern> = options
        .ignore_patterns
        .iter()
        .filter_map(|glob| match Pattern::new(glob) {
            Ok(p) => Some(p),
            Err(e) => {
                error!("Invalid glob pattern '{}': {}", glob, e);
                None
            }
        })
        .collect();

    let mut walker = WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name();
    if !options.recursive {
        walker = walker.max_depth(1);
    }

    let mut result = ScanResult::default();
    let walker = walker.into_iter().filter_entry(|entry| {
        !ignore_patterns
            .iter()
            .any(|pattern| pattern.matches_path(entry.path()))
    });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                error!("Error walking {}: {}", root.display(), err);
                result.skipped_unreadable += 1;
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        result.scanned += 1;

        let path = entry.into_path();
        if !options.extensions.matches(&path) {
            result.skipped_not_target += 1;
            continue;
        }

        match FileEntry::from_path(path) {
            Ok(file_entry) => result.entries.push(file_entry),
            Err(err) => {
                warn!("Skipping {}", err);
                result.skipped_unreadable += 1;
            }
        }
    }

    result.entries.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(result)
}
