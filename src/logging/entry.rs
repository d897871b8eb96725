//! Log entries and their plain-text rendering
//!
//! File format, one entry per line:
//! `YYYY-MM-DD HH:mm:ss.mmm [LEVEL] message`

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Format a timestamp the way it appears in log files and session markers
pub fn format_timestamp(at: &DateTime<Local>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Get the display name for this level
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    /// Check if this level is a warning or error
    pub fn is_alert(&self) -> bool {
        matches!(self, LogLevel::Warn | LogLevel::Error)
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level: {}", other)),
        }
    }
}

/// One argument of a log call
#[derive(Debug, Clone, PartialEq)]
pub enum LogArg {
    /// Plain text; the only kind filters look at
    Text(String),
    /// Structured value, pretty-printed
    Json(serde_json::Value),
}

impl LogArg {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            LogArg::Text(s) => Some(s),
            LogArg::Json(_) => None,
        }
    }

    pub fn render(&self) -> String {
        match self {
            LogArg::Text(s) => s.clone(),
            LogArg::Json(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
        }
    }
}

impl From<&str> for LogArg {
    fn from(s: &str) -> Self {
        LogArg::Text(s.to_string())
    }
}

impl From<String> for LogArg {
    fn from(s: String) -> Self {
        LogArg::Text(s)
    }
}

impl From<serde_json::Value> for LogArg {
    fn from(value: serde_json::Value) -> Self {
        LogArg::Json(value)
    }
}

/// A single log call
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Timestamp when the call was made
    pub timestamp: DateTime<Local>,
    pub level: LogLevel,
    pub args: Vec<LogArg>,
}

impl LogEntry {
    pub fn new(timestamp: DateTime<Local>, level: LogLevel, args: Vec<LogArg>) -> Self {
        Self {
            timestamp,
            level,
            args,
        }
    }

    /// Arguments rendered and joined with spaces
    pub fn message(&self) -> String {
        self.args
            .iter()
            .map(LogArg::render)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// The line written to the log file, newline included
    pub fn file_line(&self) -> String {
        format!(
            "{} [{}] {}\n",
            format_timestamp(&self.timestamp),
            self.level,
            self.message()
        )
    }
}
