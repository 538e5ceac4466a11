//! Error type shared by the watchfiles crates

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for watch operations
pub type Result<T> = std::result::Result<T, WatchError>;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("unable to open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to stat {}: {source}", .path.display())]
    Stat {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to read directory {}: {source}", .path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid name pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("unable to watch {}: {reason}", .path.display())]
    Register { path: PathBuf, reason: String },

    #[error("event source error: {0}")]
    Source(String),

    #[error("no tokio runtime available to run the watch loop")]
    NoRuntime,
}

impl WatchError {
    /// Path the error concerns, if any
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            WatchError::Open { path, .. }
            | WatchError::Stat { path, .. }
            | WatchError::ReadDir { path, .. }
            | WatchError::Register { path, .. } => Some(path),
            _ => None,
        }
    }
}
