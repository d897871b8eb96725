//! Public logging surface
//!
//! [`Logger`] ties the pieces together: a call is checked against the level
//! threshold and the suppression filters, mirrored to the console, and queued
//! for the active log file. Console output does not depend on file logging
//! being available.

use std::sync::Arc;

use crate::config::LogConfig;
use crate::storage::{FsStorage, Storage};

use super::background::BackgroundTasks;
use super::clock::{Clock, SystemClock};
use super::console::{ConsoleSink, NullConsole, TerminalConsole};
use super::entry::{LogArg, LogEntry, LogLevel};
use super::file_ops::FileOps;
use super::filename::FilenamePolicy;
use super::filters::LogFilters;
use super::session::{SessionManager, SessionSettings, SessionState};
use super::writer::{PendingWrite, WriteSerializer};

/// A logging session bound to one log directory
///
/// Must be created inside a tokio runtime; the writer and the initial
/// session setup run as tasks on it.
pub struct Logger {
    session: Arc<SessionManager>,
    writer: WriteSerializer,
    files: FileOps,
    filters: LogFilters,
    console: Arc<dyn ConsoleSink>,
    clock: Arc<dyn Clock>,
    background: BackgroundTasks,
    min_level: LogLevel,
}

impl Logger {
    /// Logger over the local filesystem and the system clock
    pub fn new(config: &LogConfig) -> Self {
        let console: Arc<dyn ConsoleSink> = if config.console {
            Arc::new(TerminalConsole)
        } else {
            Arc::new(NullConsole)
        };
        Self::with_backends(config, Arc::new(FsStorage::new()), Arc::new(SystemClock), console)
    }

    /// Logger with explicit storage, clock, and console
    pub fn with_backends(
        config: &LogConfig,
        storage: Arc<dyn Storage>,
        clock: Arc<dyn Clock>,
        console: Arc<dyn ConsoleSink>,
    ) -> Self {
        let background = BackgroundTasks::new();
        let settings = SessionSettings {
            candidates: config.candidate_dirs(),
            policy: FilenamePolicy::new(config.file_prefix.clone(), config.file_suffix.clone()),
            limits: config.retention_limits(),
        };
        let session = Arc::new(SessionManager::new(
            storage,
            settings,
            Arc::clone(&clock),
            background.clone(),
        ));

        let initial = Arc::clone(&session);
        background.spawn("initial session", async move {
            if !initial.ensure_initialized().await {
                tracing::warn!("File logging unavailable; continuing with console only");
            }
        });

        Self {
            writer: WriteSerializer::spawn(Arc::clone(&session)),
            files: FileOps::new(Arc::clone(&session)),
            filters: LogFilters::new(&config.filters),
            session,
            console,
            clock,
            background,
            min_level: LogLevel::Debug,
        }
    }

    /// Drop entries below `level`
    pub fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Log one entry built from `args`
    ///
    /// The line is queued before this returns; the returned future resolves
    /// once it has been written (or dropped).
    pub fn log(&self, level: LogLevel, args: Vec<LogArg>) -> PendingWrite {
        if level < self.min_level || self.filters.suppresses(&args) {
            return PendingWrite::skipped();
        }

        let entry = LogEntry::new(self.clock.now(), level, args);
        self.console.write_entry(&entry);
        self.writer.append(entry.file_line())
    }

    pub fn debug(&self, message: impl Into<LogArg>) -> PendingWrite {
        self.log(LogLevel::Debug, vec![message.into()])
    }

    pub fn info(&self, message: impl Into<LogArg>) -> PendingWrite {
        self.log(LogLevel::Info, vec![message.into()])
    }

    pub fn warn(&self, message: impl Into<LogArg>) -> PendingWrite {
        self.log(LogLevel::Warn, vec![message.into()])
    }

    pub fn error(&self, message: impl Into<LogArg>) -> PendingWrite {
        self.log(LogLevel::Error, vec![message.into()])
    }

    /// Replace the suppression filters for calls made after this returns
    pub fn set_filters(&self, filters: impl IntoIterator<Item = impl AsRef<str>>) {
        self.filters.set(filters);
    }

    pub fn filters(&self) -> Vec<String> {
        self.filters.list()
    }

    /// File listing, reading, and deletion
    pub fn files(&self) -> &FileOps {
        &self.files
    }

    /// Snapshot of the current session
    pub fn session_state(&self) -> SessionState {
        self.session.snapshot()
    }

    /// Whether file logging is ready, initializing it if needed
    pub async fn is_file_logging_ready(&self) -> bool {
        self.session.ensure_initialized().await
    }

    /// Wait for every line queued so far
    pub async fn flush(&self) {
        self.writer.flush().await;
    }

    /// Wait for queued lines and for background work such as retention sweeps
    pub async fn await_background_work(&self) {
        self.writer.flush().await;
        self.background.wait_idle().await;
    }
}
