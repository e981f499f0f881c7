use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Remote conflict: {0}")]
    RemoteConflict(String),

    #[error("GitHub API error: {0}")]
    Remote(String),
}

impl SnapshotError {
    /// Process exit status for a run that ended with this error.
    pub fn exit_code(&self) -> i32 {
        1
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, SnapshotError::RemoteConflict(_))
    }
}

pub type Result<T> = std::result::Result<T, SnapshotError>;
