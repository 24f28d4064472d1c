use std::path::PathBuf;
use thiserror::Error;

use crate::digest::MAX_SUFFIX_CHARS;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "Suffix space exhausted for {} after {max_chars} characters",
        .path.display()
    )]
    CollisionExhausted { path: PathBuf, max_chars: usize },

    #[error("Invalid suffix length {0}: expected 1..={max}", max = MAX_SUFFIX_CHARS)]
    InvalidChars(usize),

    #[error("Root is not a directory: {}", .0.display())]
    InvalidRoot(PathBuf),

    #[error("File name is not valid UTF-8: {}", .0.display())]
    NonUtf8Name(PathBuf),

    #[error("Target already exists: {}", .0.display())]
    TargetExists(PathBuf),

    #[error("Journal error: {0}")]
    Journal(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
