//! Log directory discovery
//!
//! Walks an ordered list of base directories and returns the first `logs`
//! subdirectory that accepts a real write. A directory existing is not taken
//! as proof that it is writable.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use uuid::Uuid;

use crate::config::friendly_io_error_message;
use crate::error::{LogError, LogResult};
use crate::storage::{Encoding, Storage};

/// Name of the subdirectory created inside each base directory
pub const LOGS_SUBDIR: &str = "logs";

const PROBE_MARKER: &str = "sessionlog write probe";

/// Finds a writable log directory
pub struct StorageLocator {
    storage: Arc<dyn Storage>,
}

impl StorageLocator {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Return `<base>/logs` for the first candidate that passes a write probe
    pub async fn locate(&self, candidates: &[PathBuf]) -> LogResult<PathBuf> {
        for base in candidates {
            let logs_dir = base.join(LOGS_SUBDIR);
            match self.prepare(&logs_dir).await {
                Ok(()) => {
                    tracing::debug!(dir = %logs_dir.display(), "Log directory is writable");
                    return Ok(logs_dir);
                }
                Err(e) => {
                    tracing::warn!(dir = %logs_dir.display(), error = %e, "Skipping log directory candidate");
                }
            }
        }

        Err(LogError::StorageUnavailable {
            candidates: candidates.len(),
        })
    }

    async fn prepare(&self, logs_dir: &Path) -> LogResult<()> {
        if !self.storage.exists(logs_dir).await {
            self.storage.mkdir(logs_dir).await.map_err(|e| {
                LogError::io(friendly_io_error_message(&e, "create log directory"), e)
            })?;
        }
        self.probe(logs_dir).await
    }

    /// Create, write, and delete a uniquely named file in `dir`
    async fn probe(&self, dir: &Path) -> LogResult<()> {
        let probe_path = dir.join(format!(".probe-{}", Uuid::new_v4()));

        if let Err(e) = self
            .storage
            .write_file(&probe_path, PROBE_MARKER, Encoding::Utf8)
            .await
        {
            // A partial file may have been left behind
            if self.storage.exists(&probe_path).await {
                let _ = self.storage.unlink(&probe_path).await;
            }
            return Err(LogError::io(
                friendly_io_error_message(&e, "write probe"),
                e,
            ));
        }

        self.storage
            .unlink(&probe_path)
            .await
            .map_err(|e| LogError::io(friendly_io_error_message(&e, "remove probe"), e))
    }
}
