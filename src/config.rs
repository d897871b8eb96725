//! Configuration management for sessionlog

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::logging::RetentionLimits;

/// Categories of disk errors for user-friendly messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskErrorKind {
    /// Disk is full or quota exceeded
    DiskFull,
    /// Permission denied (read or write)
    PermissionDenied,
    /// File or directory not found
    NotFound,
    /// Other IO error
    Other,
}

impl DiskErrorKind {
    /// Get a user-friendly message for this error kind
    pub fn user_message(&self) -> &'static str {
        match self {
            DiskErrorKind::DiskFull => "disk full",
            DiskErrorKind::PermissionDenied => "permission denied",
            DiskErrorKind::NotFound => "file or directory not found",
            DiskErrorKind::Other => "storage error",
        }
    }
}

/// Categorize an IO error into a user-friendly category
pub fn categorize_io_error(e: &std::io::Error) -> DiskErrorKind {
    use std::io::ErrorKind;

    match e.kind() {
        ErrorKind::StorageFull | ErrorKind::WriteZero => DiskErrorKind::DiskFull,
        ErrorKind::PermissionDenied | ErrorKind::ReadOnlyFilesystem => {
            DiskErrorKind::PermissionDenied
        }
        ErrorKind::NotFound => DiskErrorKind::NotFound,
        _ => {
            #[cfg(unix)]
            {
                if let Some(os_error) = e.raw_os_error() {
                    // ENOSPC = 28; EDQUOT = 122 on Linux, 69 on macOS
                    if os_error == 28 || os_error == 122 || os_error == 69 {
                        return DiskErrorKind::DiskFull;
                    }
                    // EACCES
                    if os_error == 13 {
                        return DiskErrorKind::PermissionDenied;
                    }
                }
            }
            DiskErrorKind::Other
        }
    }
}

/// Create a user-friendly error message from an IO error
pub fn friendly_io_error_message(e: &std::io::Error, context: &str) -> String {
    match categorize_io_error(e) {
        DiskErrorKind::Other => format!("{}: {}", context, e),
        kind => format!("{}: {}", context, kind.user_message()),
    }
}

/// Session log configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogConfig {
    /// Keep at most this many log files (0 or less disables the count rule)
    #[serde(default = "default_max_log_files")]
    pub max_log_files: i64,

    /// Roll over and prune files larger than this many MB (0 or less disables)
    #[serde(default = "default_max_log_size_mb")]
    pub max_log_size_mb: f64,

    /// Delete files whose date is older than this many days (0 or less disables)
    #[serde(default = "default_max_log_age_days")]
    pub max_log_age_days: i64,

    /// Case-insensitive substrings; matching entries are suppressed entirely
    #[serde(default)]
    pub filters: Vec<String>,

    /// Preferred base directory, tried before the built-in candidates.
    /// `~` and environment variables are expanded.
    #[serde(default)]
    pub log_directory_base: Option<String>,

    /// Log file name prefix
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,

    /// Log file name suffix
    #[serde(default = "default_file_suffix")]
    pub file_suffix: String,

    /// Mirror entries to the terminal
    #[serde(default = "default_console")]
    pub console: bool,
}

fn default_max_log_files() -> i64 {
    5
}

fn default_max_log_size_mb() -> f64 {
    10.0
}

fn default_max_log_age_days() -> i64 {
    7
}

fn default_file_prefix() -> String {
    "session_".to_string()
}

fn default_file_suffix() -> String {
    ".txt".to_string()
}

fn default_console() -> bool {
    true
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            max_log_files: default_max_log_files(),
            max_log_size_mb: default_max_log_size_mb(),
            max_log_age_days: default_max_log_age_days(),
            filters: Vec::new(),
            log_directory_base: None,
            file_prefix: default_file_prefix(),
            file_suffix: default_file_suffix(),
            console: default_console(),
        }
    }
}

impl LogConfig {
    /// Load configuration from file, or return default if not found
    pub fn load() -> Result<Self> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from a specific file, or return default if not found
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    /// Retention limits derived from this configuration
    pub fn retention_limits(&self) -> RetentionLimits {
        RetentionLimits {
            max_file_count: self.max_log_files,
            max_age_days: self.max_log_age_days,
            max_size_mb: self.max_log_size_mb,
        }
    }

    /// Ordered base directories for the storage locator
    ///
    /// The override comes first, then the config dir, the platform data dir,
    /// and finally the system temp dir. Duplicates are dropped.
    pub fn candidate_dirs(&self) -> Vec<PathBuf> {
        let mut candidates = Vec::new();

        if let Some(base) = &self.log_directory_base {
            match shellexpand::full(base) {
                Ok(expanded) => candidates.push(PathBuf::from(expanded.as_ref())),
                Err(e) => {
                    tracing::warn!(base = %base, error = %e, "Could not expand log directory override");
                    candidates.push(PathBuf::from(base));
                }
            }
        }

        candidates.push(config_dir());
        if let Some(data_dir) = dirs::data_local_dir() {
            candidates.push(data_dir.join("sessionlog"));
        }
        candidates.push(std::env::temp_dir().join("sessionlog"));

        let mut seen = std::collections::HashSet::new();
        candidates.retain(|p| seen.insert(p.clone()));
        candidates
    }
}

/// Get the base configuration directory (~/.sessionlog)
/// Falls back to ./.sessionlog if home directory cannot be determined
pub fn config_dir() -> PathBuf {
    try_config_dir().unwrap_or_else(|| {
        tracing::warn!("Could not determine home directory, using current directory for config");
        PathBuf::from(".sessionlog")
    })
}

/// Try to get the base configuration directory, returning None if home dir is unavailable
pub fn try_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".sessionlog"))
}

/// Get the path to the config file
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.max_log_files, 5);
        assert_eq!(config.max_log_age_days, 7);
        assert_eq!(config.file_prefix, "session_");
        assert_eq!(config.file_suffix, ".txt");
        assert!(config.filters.is_empty());
    }

    #[test]
    fn test_config_serialization() {
        let mut config = LogConfig::default();
        config.filters = vec!["[Network]".to_string()];
        config.max_log_size_mb = 2.5;

        let toml_str = toml::to_string(&config).unwrap();
        let parsed: LogConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: LogConfig = toml::from_str("max_log_files = 0\n").unwrap();
        assert_eq!(parsed.max_log_files, 0);
        assert_eq!(parsed.max_log_age_days, 7);
        assert!(parsed.console);
    }

    #[test]
    fn test_load_missing_file_returns_default() {
        let temp_dir = TempDir::new().unwrap();
        let config = LogConfig::load_from(&temp_dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, LogConfig::default());
    }

    #[test]
    fn test_load_rejects_bad_toml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "max_log_files = \"many\"").unwrap();
        assert!(LogConfig::load_from(&path).is_err());
    }

    #[test]
    fn test_candidate_dirs_override_first() {
        let config = LogConfig {
            log_directory_base: Some("/srv/app".to_string()),
            ..LogConfig::default()
        };
        let candidates = config.candidate_dirs();
        assert_eq!(candidates[0], PathBuf::from("/srv/app"));
        assert!(candidates.len() >= 2);
        assert_eq!(
            candidates.last().unwrap(),
            &std::env::temp_dir().join("sessionlog")
        );
    }

    #[test]
    fn test_retention_limits_from_config() {
        let config = LogConfig {
            max_log_files: 3,
            max_log_age_days: -1,
            max_log_size_mb: 0.5,
            ..LogConfig::default()
        };
        let limits = config.retention_limits();
        assert_eq!(limits.max_file_count, 3);
        assert_eq!(limits.max_age_days, -1);
        assert_eq!(limits.max_size_mb, 0.5);
    }

    #[test]
    fn test_categorize_io_error() {
        let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "x");
        assert_eq!(categorize_io_error(&denied), DiskErrorKind::PermissionDenied);

        let missing = std::io::Error::new(std::io::ErrorKind::NotFound, "x");
        assert_eq!(categorize_io_error(&missing), DiskErrorKind::NotFound);
        assert_eq!(
            friendly_io_error_message(&missing, "probe"),
            "probe: file or directory not found"
        );
    }

    #[test]
    fn test_config_dir_does_not_panic() {
        let dir = config_dir();
        assert!(dir.ends_with(".sessionlog"));
    }
}
