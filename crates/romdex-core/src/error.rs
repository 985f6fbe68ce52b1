//! Error types for scanning operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that terminate a scan.
///
/// Per-file outcomes such as an unrecognized extension or a lookup miss are
/// not errors; every variant here aborts the scan that raised it. Records
/// already handed to the consumer stay where they are.
#[derive(Debug, Error)]
pub enum ScanError {
    /// One of the approximate filters is absent from the index.
    #[error("Index is missing the '{key}' filter")]
    MissingIndex { key: String },

    /// A filter is present but cannot be decoded.
    #[error("Index filter '{key}' is corrupt: {reason}")]
    CorruptIndex { key: String, reason: String },

    /// The lookup store could not be opened read-only.
    #[error("Lookup store unavailable at {path}: {reason}")]
    StoreUnavailable { path: PathBuf, reason: String },

    /// A query against an already opened store failed.
    #[error("Lookup failed: {reason}")]
    Lookup { reason: String },

    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Path not found.
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A zip container could not be read.
    #[error("Archive error at {path}: {reason}")]
    Archive { path: PathBuf, reason: String },

    /// Root path is not a directory.
    #[error("Root path is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// The consumer stopped receiving records.
    #[error("Result consumer disconnected")]
    Disconnected,

    /// The scan task ended without producing a result.
    #[error("Scan interrupted: {reason}")]
    Interrupted { reason: String },
}

impl ScanError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }

    /// Create an archive error with path context.
    pub fn archive(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Archive {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error belongs to the filesystem/archive read class.
    pub fn is_io_failure(&self) -> bool {
        matches!(
            self,
            Self::Io { .. } | Self::PermissionDenied { .. } | Self::NotFound { .. } | Self::Archive { .. }
        )
    }

    /// Whether this error was raised because the index could not be used.
    pub fn is_index_failure(&self) -> bool {
        matches!(
            self,
            Self::MissingIndex { .. }
                | Self::CorruptIndex { .. }
                | Self::StoreUnavailable { .. }
                | Self::Lookup { .. }
        )
    }
}
