//! Session logging
//!
//! Console plus file logging for one process. Files live in
//! `<base>/logs/<prefix><YYYY-MM-DD><suffix>`, one per two-day window, and
//! are pruned by count, age, and size.

mod background;
mod clock;
mod console;
mod entry;
mod file_ops;
mod filename;
mod filters;
mod locator;
mod logger;
mod retention;
mod session;
mod writer;

pub use background::BackgroundTasks;
pub use clock::{Clock, SystemClock};
pub use console::{render_console_line, ConsoleSink, NullConsole, TerminalConsole};
pub use entry::{format_timestamp, LogArg, LogEntry, LogLevel};
pub use file_ops::FileOps;
pub use filename::{FilenamePolicy, DEFAULT_PREFIX, DEFAULT_SUFFIX};
pub use filters::LogFilters;
pub use locator::{StorageLocator, LOGS_SUBDIR};
pub use logger::Logger;
pub use retention::{describe_files, select_for_deletion, sweep, LogFileDescriptor, RetentionLimits};
pub use session::{SessionManager, SessionPhase, SessionSettings, SessionState, INIT_WAIT};
pub use writer::{PendingWrite, WriteSerializer};

#[cfg(any(test, feature = "test-support"))]
pub use clock::FixedClock;
#[cfg(any(test, feature = "test-support"))]
pub use console::CapturedConsole;
