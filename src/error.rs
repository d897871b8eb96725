//! Error taxonomy for the session log
//!
//! None of these ever reach a logging call site. They flow between the
//! internal components and end up either as a `tracing` diagnostic or as a
//! sentinel return value on the public surface.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised inside the session logging core
#[derive(Debug, Error)]
pub enum LogError {
    /// No candidate base directory accepted a write probe
    #[error("no writable log directory among {candidates} candidate(s)")]
    StorageUnavailable { candidates: usize },

    /// The active file disappeared between checks
    #[error("active log file is missing: {}", .0.display())]
    FileMissing(PathBuf),

    /// Both the primary and the fallback encoding failed
    #[error("write/read failed under both encodings: {}", .0.display())]
    EncodingFailure(PathBuf),

    /// A file's metadata could not be read during a retention sweep
    #[error("could not stat {file} during retention sweep: {source}")]
    RetentionStatFailure {
        file: String,
        #[source]
        source: std::io::Error,
    },

    /// A caller-supplied name does not match the log file naming pattern
    #[error("not a log file name: {0:?}")]
    InvalidFilename(String),

    /// Any other storage failure, with the operation that triggered it
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl LogError {
    /// Wrap an I/O error with a short description of what was being done
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        LogError::Io {
            context: context.into(),
            source,
        }
    }
}

/// Result alias for the logging core
pub type LogResult<T> = std::result::Result<T, LogError>;
