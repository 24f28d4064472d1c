//! File name parsing and construction for `NAME__suffix.ext` names.

use crate::digest::MAX_SUFFIX_CHARS;
use crate::error::Error;
use std::path::{Path, PathBuf};

pub const SUFFIX_SEPARATOR: &str = "__";

/// Characters of the URL-safe base64 alphabet.
pub fn is_suffix_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

/// Every way to read a file stem as `base__suffix`, longest suffix first.
///
/// The base64url alphabet contains `_`, so a suffix can itself start with
/// `_` or contain `__`. Each `__` in the stem is a split point when the base
/// before it is non-empty and the remainder is a base64url run no longer
/// than a full digest.
pub fn split_suffix_candidates(stem: &str) -> Vec<(&str, &str)> {
    let sep = SUFFIX_SEPARATOR.len();
    (1..stem.len().saturating_sub(sep))
        .filter(|&idx| &stem.as_bytes()[idx..idx + sep] == SUFFIX_SEPARATOR.as_bytes())
        .filter_map(|idx| {
            let suffix = &stem[idx + sep..];
            let valid = !suffix.is_empty()
                && suffix.len() <= MAX_SUFFIX_CHARS
                && suffix.chars().all(is_suffix_char);
            valid.then(|| (&stem[..idx], suffix))
        })
        .collect()
}

/// Preferred reading of a suffixed stem: the split with the longest suffix.
pub fn split_suffix(stem: &str) -> Option<(&str, &str)> {
    split_suffix_candidates(stem).into_iter().next()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: PathBuf,
    stem: String,
    extension: Option<String>,
    /// Base lengths of every suffix reading, longest suffix first.
    suffix_at: Vec<usize>,
}

impl FileEntry {
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self, Error> {
        let path = path.into();
        let file_name = path
            .file_name()
            .ok_or_else(|| Error::NonUtf8Name(path.clone()))?;
        let file_name = file_name
            .to_str()
            .ok_or_else(|| Error::NonUtf8Name(path.clone()))?;

        let as_path = Path::new(file_name);
        let stem = as_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(file_name)
            .to_string();
        let extension = as_path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_string());
        let suffix_at = split_suffix_candidates(&stem)
            .into_iter()
            .map(|(base, _)| base.len())
            .collect();

        Ok(Self {
            path,
            stem,
            extension,
            suffix_at,
        })
    }

    pub fn stem(&self) -> &str {
        &self.stem
    }

    /// Extension without the leading dot, case preserved.
    pub fn extension(&self) -> Option<&str> {
        self.extension.as_deref()
    }

    /// Stem with the preferred suffix removed.
    pub fn base(&self) -> &str {
        self.split().map(|(base, _)| base).unwrap_or(&self.stem[..])
    }

    /// Preferred suffix: the longest valid reading.
    pub fn suffix(&self) -> Option<&str> {
        self.split().map(|(_, suffix)| suffix)
    }

    /// All `(base, suffix)` readings of the stem, longest suffix first.
    pub fn splits(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.suffix_at.iter().map(move |&idx| {
            (
                &self.stem[..idx],
                &self.stem[idx + SUFFIX_SEPARATOR.len()..],
            )
        })
    }

    fn split(&self) -> Option<(&str, &str)> {
        self.splits().next()
    }

    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }

    /// `stem__suffix.ext` next to this file.
    pub fn suffixed_path(&self, suffix: &str) -> PathBuf {
        self.sibling(&format!("{}{}{}", self.stem, SUFFIX_SEPARATOR, suffix))
    }

    /// `base.ext` next to this file, for the preferred suffix.
    pub fn stripped_path(&self) -> Option<PathBuf> {
        self.split().map(|(base, _)| self.sibling(base))
    }

    /// `base (n).ext` next to this file.
    pub fn counter_path(&self, base: &str, n: usize) -> PathBuf {
        self.sibling(&format!("{} ({})", base, n))
    }

    /// `stem.ext` next to this file.
    pub fn sibling(&self, stem: &str) -> PathBuf {
        let name = match &self.extension {
            Some(ext) => format!("{}.{}", stem, ext),
            None => stem.to_string(),
        };
        self.dir().join(name)
    }
}
