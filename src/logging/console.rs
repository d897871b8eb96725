//! Console output for log entries

use std::io::Write;

use crossterm::style::{style, StyledContent, Stylize};
use crossterm::tty::IsTty;

use super::entry::{format_timestamp, LogEntry, LogLevel};

/// Destination for the console copy of each entry
pub trait ConsoleSink: Send + Sync {
    fn write_entry(&self, entry: &LogEntry);
}

/// Writes colored entries to the terminal; warnings and errors go to stderr
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalConsole;

fn styled_level(level: LogLevel) -> StyledContent<&'static str> {
    let label = style(level.as_str());
    match level {
        LogLevel::Debug => label.dark_grey(),
        LogLevel::Info => label.cyan(),
        LogLevel::Warn => label.yellow().bold(),
        LogLevel::Error => label.red().bold(),
    }
}

/// Render one console line, with ANSI colors when `color` is set
pub fn render_console_line(entry: &LogEntry, color: bool) -> String {
    let timestamp = format_timestamp(&entry.timestamp);
    if color {
        format!(
            "{} [{}] {}",
            style(timestamp).dark_grey(),
            styled_level(entry.level),
            entry.message()
        )
    } else {
        format!("{} [{}] {}", timestamp, entry.level, entry.message())
    }
}

impl ConsoleSink for TerminalConsole {
    fn write_entry(&self, entry: &LogEntry) {
        // Console output is best effort; a closed pipe must not break logging
        if entry.level.is_alert() {
            let mut stderr = std::io::stderr().lock();
            let line = render_console_line(entry, stderr.is_tty());
            let _ = writeln!(stderr, "{}", line);
        } else {
            let mut stdout = std::io::stdout().lock();
            let line = render_console_line(entry, stdout.is_tty());
            let _ = writeln!(stdout, "{}", line);
        }
    }
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullConsole;

impl ConsoleSink for NullConsole {
    fn write_entry(&self, _entry: &LogEntry) {}
}

#[cfg(any(test, feature = "test-support"))]
pub use capture::CapturedConsole;

#[cfg(any(test, feature = "test-support"))]
mod capture {
    use std::sync::{Arc, Mutex};

    use super::{render_console_line, ConsoleSink, LogEntry};

    /// Collects rendered lines for assertions
    #[derive(Debug, Clone, Default)]
    pub struct CapturedConsole {
        lines: Arc<Mutex<Vec<String>>>,
    }

    impl CapturedConsole {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn lines(&self) -> Vec<String> {
            self.lines.lock().unwrap_or_else(|e| e.into_inner()).clone()
        }
    }

    impl ConsoleSink for CapturedConsole {
        fn write_entry(&self, entry: &LogEntry) {
            self.lines
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(render_console_line(entry, false));
        }
    }
}
