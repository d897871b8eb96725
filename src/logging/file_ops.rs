//! Read, list, and delete operations over the log directory
//!
//! Nothing here returns an error: failures come back as `None`, `false`, or
//! an empty list, and the cause goes to the diagnostic log.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::LogError;
use crate::storage::{decode_fallback, Encoding};

use super::session::SessionManager;

/// Caller-facing file operations
#[derive(Clone)]
pub struct FileOps {
    session: Arc<SessionManager>,
}

impl FileOps {
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self { session }
    }

    /// Name of the file currently receiving appends
    pub fn active_file_name(&self) -> Option<String> {
        self.session.snapshot().active_file_name().map(String::from)
    }

    /// Log directory, initializing the session if needed
    async fn log_directory(&self) -> Option<PathBuf> {
        if !self.session.ensure_initialized().await {
            return None;
        }
        self.session.snapshot().log_directory
    }

    fn validate(&self, name: &str) -> bool {
        if self.session.policy().matches(name) {
            return true;
        }
        let err = LogError::InvalidFilename(name.to_string());
        tracing::warn!(error = %err, "Rejected log file operation");
        false
    }

    /// Log file names, newest first
    pub async fn list_files(&self) -> Vec<String> {
        let Some(dir) = self.log_directory().await else {
            return Vec::new();
        };

        let policy = self.session.policy();
        let mut names: Vec<String> = match self.session.storage().ls(&dir).await {
            Ok(names) => names.into_iter().filter(|n| policy.matches(n)).collect(),
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "Failed to list log files");
                return Vec::new();
            }
        };

        // YYYY-MM-DD sorts correctly as a string
        names.sort_by(|a, b| policy.date_segment(b).cmp(&policy.date_segment(a)));
        names
    }

    /// Contents of a log file
    ///
    /// `None` for a bad name, a missing or empty file, or content that can't
    /// be read under either encoding.
    pub async fn read_file(&self, name: &str) -> Option<String> {
        if !self.validate(name) {
            return None;
        }
        let dir = self.log_directory().await?;
        let path = dir.join(name);
        let storage = self.session.storage();

        if !storage.exists(&path).await {
            return None;
        }
        match storage.stat(&path).await {
            Ok(stat) if stat.size > 0 => {}
            Ok(_) => return None,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to stat log file");
                return None;
            }
        }

        match storage.read_file(&path, Encoding::Utf8).await {
            Ok(content) => return Some(content),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "UTF-8 read failed, retrying with fallback encoding");
            }
        }

        let fallback = storage
            .read_file(&path, Encoding::Base64)
            .await
            .and_then(|encoded| decode_fallback(&encoded));
        match fallback {
            Ok(content) => Some(content),
            Err(e) => {
                let err = LogError::EncodingFailure(path);
                tracing::warn!(error = %err, cause = %e, "Could not read log file");
                None
            }
        }
    }

    /// Contents of the active file
    pub async fn read_active_session_file(&self) -> Option<String> {
        if !self.session.ensure_initialized().await {
            return None;
        }
        let name = self.active_file_name()?;
        self.read_file(&name).await
    }

    /// Delete one log file
    ///
    /// Refuses the active file. A file that is already gone counts as deleted.
    pub async fn delete_file(&self, name: &str) -> bool {
        if !self.validate(name) {
            return false;
        }
        let Some(dir) = self.log_directory().await else {
            return false;
        };
        if self.active_file_name().as_deref() == Some(name) {
            tracing::warn!(file = %name, "Refusing to delete the active log file");
            return false;
        }

        let path = dir.join(name);
        let storage = self.session.storage();
        if !storage.exists(&path).await {
            return true;
        }
        match storage.unlink(&path).await {
            Ok(()) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => true,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to delete log file");
                false
            }
        }
    }

    /// Delete every log file except the active one
    ///
    /// Returns `true` only if every removal succeeded.
    pub async fn delete_all_except_active(&self) -> bool {
        let names = self.list_files().await;
        let Some(dir) = self.session.snapshot().log_directory else {
            return names.is_empty();
        };
        let active = self.active_file_name();
        let storage = self.session.storage();

        let mut all_deleted = true;
        for name in names.iter().filter(|n| Some(n.as_str()) != active.as_deref()) {
            match storage.unlink(&dir.join(name)).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(file = %name, error = %e, "Failed to delete log file");
                    all_deleted = false;
                }
            }
        }
        all_deleted
    }

    /// End the current session
    ///
    /// An empty active file is deleted. The next write starts a fresh
    /// session; the directory is kept.
    pub async fn reset_session(&self) {
        if let Some(path) = self.session.snapshot().active_file_path {
            let storage = self.session.storage();
            if let Ok(stat) = storage.stat(&path).await {
                if stat.is_file() && stat.size == 0 {
                    if let Err(e) = storage.unlink(&path).await {
                        tracing::warn!(path = %path.display(), error = %e, "Failed to remove empty log file");
                    }
                }
            }
        }
        self.session.invalidate("session reset");
    }

    /// Run a retention sweep now; returns how many files were deleted
    pub async fn cleanup_now(&self) -> Option<usize> {
        self.session.run_retention().await
    }
}
