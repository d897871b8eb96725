//! sessionlog - file-backed session logging
//!
//! Mirrors log calls to the console and persists a plain-text copy to local
//! storage, with date-windowed file names, serialized appends, and
//! count/age/size retention.

pub mod config;
pub mod error;
pub mod logging;
pub mod storage;

pub use config::LogConfig;
pub use error::{LogError, LogResult};
pub use logging::{FileOps, LogArg, LogLevel, Logger};
