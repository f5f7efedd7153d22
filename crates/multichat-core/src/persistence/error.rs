//! Error and report types shared by the persistence layer.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// A write-side failure, surfaced to the caller.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error at {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error at {}: {}", .path.display(), .source)]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid id for a file name: {0:?}")]
    InvalidId(String),

    #[error("Home directory not set")]
    HomeDirUnavailable,
}

impl StorageError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn json(path: &Path, source: serde_json::Error) -> Self {
        StorageError::Json {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Why a single file could not be loaded.
///
/// Never fatal: bulk loads record it in a [`LoadReport`] and move on.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read {}: {}", .path.display(), .source)]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode {}: {}", .path.display(), .source)]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl LoadError {
    /// The file the failure belongs to.
    pub fn path(&self) -> &Path {
        match self {
            LoadError::Read { path, .. } | LoadError::Decode { path, .. } => path,
        }
    }
}

impl From<LoadError> for StorageError {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::Read { path, source } => StorageError::Io { path, source },
            LoadError::Decode { path, source } => StorageError::Json { path, source },
        }
    }
}

/// Outcome of loading a directory of entity files.
#[derive(Debug)]
pub struct LoadReport<T> {
    /// Entities that decoded cleanly, in load order.
    pub succeeded: Vec<T>,

    /// Skipped files and the reason each was skipped.
    pub failed: Vec<(PathBuf, String)>,
}

impl<T> Default for LoadReport<T> {
    fn default() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl<T> LoadReport<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one file's result. Failures are logged and kept.
    pub fn record(&mut self, result: Result<T, LoadError>) {
        match result {
            Ok(value) => self.succeeded.push(value),
            Err(err) => self.record_failure(err),
        }
    }

    pub fn record_failure(&mut self, err: LoadError) {
        log::warn!("Skipping unreadable file: {err}");
        self.failed.push((err.path().to_path_buf(), err.to_string()));
    }

    /// True when nothing was skipped.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    /// Take the loaded values, moving failures into `failures`.
    pub fn drain_into(self, failures: &mut Vec<(PathBuf, String)>) -> Vec<T> {
        failures.extend(self.failed);
        self.succeeded
    }
}
