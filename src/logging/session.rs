//! Session lifecycle
//!
//! The session is the span between a successful initialization and the next
//! invalidation. [`SessionManager`] owns the only mutable copy of
//! [`SessionState`]; everything else reads snapshots.
//!
//! ```text
//! Uninitialized ──ensure_initialized──▶ Initializing ──ok──▶ Ready
//!       ▲                                    │                 │
//!       └──────────── all candidates fail ◀──┘                 │
//!                                                              ▼
//!                    (next ensure_initialized) ◀──────── Invalidated
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::NaiveDate;

use crate::error::LogError;
use crate::storage::{Encoding, Storage};

use super::background::BackgroundTasks;
use super::clock::Clock;
use super::entry::format_timestamp;
use super::filename::FilenamePolicy;
use super::locator::StorageLocator;
use super::retention::{self, RetentionLimits};

/// How long a caller waits for someone else's initialization to finish
pub const INIT_WAIT: Duration = Duration::from_millis(500);

const INIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Where the session currently writes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Writable log directory, `None` until the first successful init
    pub log_directory: Option<PathBuf>,
    /// File receiving appends, `None` when uninitialized or invalidated
    pub active_file_path: Option<PathBuf>,
    /// Both paths are set and the file existed when this was flipped
    pub initialized: bool,
}

impl SessionState {
    /// File name of the active file
    pub fn active_file_name(&self) -> Option<&str> {
        self.active_file_path
            .as_deref()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
    }
}

/// Lifecycle phase of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Uninitialized,
    Initializing,
    Ready,
    Invalidated,
}

#[derive(Default)]
struct Inner {
    state: SessionState,
    invalidated: bool,
}

/// Static inputs to session initialization
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Ordered base directories; `logs/` is created inside the chosen one
    pub candidates: Vec<PathBuf>,
    pub policy: FilenamePolicy,
    pub limits: RetentionLimits,
}

/// Resets the in-progress flag even if the initializing future is dropped
struct InitGuard<'a>(&'a AtomicBool);

impl Drop for InitGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Owns session state and drives initialization and invalidation
pub struct SessionManager {
    storage: Arc<dyn Storage>,
    locator: StorageLocator,
    settings: SessionSettings,
    clock: Arc<dyn Clock>,
    background: BackgroundTasks,
    inner: Mutex<Inner>,
    initializing: AtomicBool,
    /// Held for every append to the active file, markers included
    append_lock: tokio::sync::Mutex<()>,
}

impl SessionManager {
    pub fn new(
        storage: Arc<dyn Storage>,
        settings: SessionSettings,
        clock: Arc<dyn Clock>,
        background: BackgroundTasks,
    ) -> Self {
        Self {
            locator: StorageLocator::new(Arc::clone(&storage)),
            storage,
            settings,
            clock,
            background,
            inner: Mutex::new(Inner::default()),
            initializing: AtomicBool::new(false),
            append_lock: tokio::sync::Mutex::new(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub fn policy(&self) -> &FilenamePolicy {
        &self.settings.policy
    }

    pub fn limits(&self) -> &RetentionLimits {
        &self.settings.limits
    }

    pub fn background(&self) -> &BackgroundTasks {
        &self.background
    }

    /// Exclusive access to appends on the active file
    ///
    /// Never call `ensure_initialized` while holding this; initialization
    /// takes it to write the session marker.
    pub async fn lock_appends(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.append_lock.lock().await
    }

    /// Current local date
    pub fn today(&self) -> NaiveDate {
        self.clock.now().date_naive()
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> SessionState {
        self.lock().state.clone()
    }

    pub fn phase(&self) -> SessionPhase {
        if self.initializing.load(Ordering::Acquire) {
            return SessionPhase::Initializing;
        }
        let inner = self.lock();
        if inner.state.initialized {
            SessionPhase::Ready
        } else if inner.invalidated {
            SessionPhase::Invalidated
        } else {
            SessionPhase::Uninitialized
        }
    }

    pub fn is_ready(&self) -> bool {
        self.lock().state.initialized
    }

    /// Drop the active file so the next `ensure_initialized` starts over.
    /// The directory is kept as a hint for the next initialization.
    pub fn invalidate(&self, reason: &str) {
        let mut inner = self.lock();
        if inner.state.initialized || inner.state.active_file_path.is_some() {
            tracing::debug!(reason, "Invalidating log session");
        }
        inner.state.active_file_path = None;
        inner.state.initialized = false;
        inner.invalidated = true;
    }

    /// Make sure a session is ready, initializing it if needed
    ///
    /// Returns `true` when the active file can be written. If another caller
    /// is already initializing, waits up to [`INIT_WAIT`] and then reports
    /// whatever state it finds.
    pub async fn ensure_initialized(&self) -> bool {
        if self.verify_ready().await {
            return true;
        }

        if self
            .initializing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return self.wait_for_initialization().await;
        }
        let _guard = InitGuard(&self.initializing);

        // Someone may have finished initializing between the check and the flag
        if self.verify_ready().await {
            return true;
        }
        self.initialize().await
    }

    /// Cheap check of a Ready session: expected name first, then existence
    async fn verify_ready(&self) -> bool {
        let state = self.snapshot();
        let Some(active) = state.active_file_path.filter(|_| state.initialized) else {
            return false;
        };

        let expected = self.settings.policy.current_filename(self.today());
        let current = active.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if current != expected {
            self.invalidate("date window rolled over");
            return false;
        }

        if !self.storage.exists(&active).await {
            let err = LogError::FileMissing(active);
            tracing::debug!(error = %err, "Re-initializing log session");
            self.invalidate("active file missing");
            return false;
        }

        true
    }

    async fn wait_for_initialization(&self) -> bool {
        let deadline = tokio::time::Instant::now() + INIT_WAIT;
        while self.initializing.load(Ordering::Acquire) && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(INIT_POLL_INTERVAL).await;
        }
        self.is_ready()
    }

    fn candidates(&self) -> Vec<PathBuf> {
        let mut candidates = Vec::with_capacity(self.settings.candidates.len() + 1);
        let cached_base = self
            .lock()
            .state
            .log_directory
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf);
        if let Some(base) = cached_base {
            candidates.push(base);
        }
        for candidate in &self.settings.candidates {
            if !candidates.contains(candidate) {
                candidates.push(candidate.clone());
            }
        }
        candidates
    }

    fn reset(&self) {
        *self.lock() = Inner::default();
    }

    async fn initialize(&self) -> bool {
        let logs_dir = match self.locator.locate(&self.candidates()).await {
            Ok(dir) => dir,
            Err(e) => {
                tracing::warn!(error = %e, "File logging disabled for this attempt");
                self.reset();
                return false;
            }
        };

        let now = self.clock.now();
        let name = self.settings.policy.current_filename(now.date_naive());
        let path = logs_dir.join(&name);

        let is_new = !self.storage.exists(&path).await;
        if is_new {
            if let Err(e) = self.storage.write_file(&path, "", Encoding::Utf8).await {
                tracing::warn!(path = %path.display(), error = %e, "Failed to create log file");
                self.reset();
                return false;
            }
        }

        let marker = if is_new {
            format!(
                "\n=== New Log Session Started at {} ===\n",
                format_timestamp(&now)
            )
        } else {
            format!("\n=== App Session Resumed at {} ===\n", format_timestamp(&now))
        };
        let appended = {
            let _appending = self.lock_appends().await;
            self.storage.append_file(&path, &marker, Encoding::Utf8).await
        };
        if let Err(e) = appended {
            tracing::warn!(path = %path.display(), error = %e, "Failed to write session marker");
        }

        if !self.storage.exists(&path).await {
            let err = LogError::FileMissing(path);
            tracing::warn!(error = %err, "Log file vanished during initialization");
            self.reset();
            return false;
        }

        {
            let mut inner = self.lock();
            inner.state = SessionState {
                log_directory: Some(logs_dir.clone()),
                active_file_path: Some(path.clone()),
                initialized: true,
            };
            inner.invalidated = false;
        }
        tracing::info!(
            path = %path.display(),
            resumed = !is_new,
            "Log session ready"
        );

        self.spawn_retention(logs_dir, name);
        true
    }

    fn spawn_retention(&self, logs_dir: PathBuf, active_name: String) {
        let storage = Arc::clone(&self.storage);
        let policy = self.settings.policy.clone();
        let limits = self.settings.limits;
        let today = self.today();

        self.background.spawn("retention sweep", async move {
            match retention::sweep(storage.as_ref(), &logs_dir, &active_name, &policy, &limits, today)
                .await
            {
                Ok(0) => {}
                Ok(count) => tracing::info!("Cleaned up {} old log files", count),
                Err(e) => tracing::warn!(dir = %logs_dir.display(), error = %e, "Retention sweep failed"),
            }
        });
    }

    /// Run a retention sweep now against the current directory
    ///
    /// Returns the number of deleted files, or `None` if no session could be
    /// initialized.
    pub async fn run_retention(&self) -> Option<usize> {
        if !self.ensure_initialized().await {
            return None;
        }
        let state = self.snapshot();
        let logs_dir = state.log_directory.clone()?;
        let active = state.active_file_name().unwrap_or_default().to_string();

        match retention::sweep(
            self.storage.as_ref(),
            &logs_dir,
            &active,
            &self.settings.policy,
            &self.settings.limits,
            self.today(),
        )
        .await
        {
            Ok(count) => Some(count),
            Err(e) => {
                tracing::warn!(dir = %logs_dir.display(), error = %e, "Retention sweep failed");
                None
            }
        }
    }
}
