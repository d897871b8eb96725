//! Suppression filters
//!
//! An entry is dropped entirely (no console, no file) when any filter
//! substring appears, case-insensitively, in any of its text arguments.
//! Updates are not atomic with respect to calls already in progress: a call
//! that has passed the check before `set` returns may still go through.

use std::sync::RwLock;

use super::entry::LogArg;

/// Case-insensitive substring filters
#[derive(Debug, Default)]
pub struct LogFilters {
    needles: RwLock<Vec<String>>,
}

fn normalize(filters: impl IntoIterator<Item = impl AsRef<str>>) -> Vec<String> {
    filters
        .into_iter()
        .map(|f| f.as_ref().to_lowercase())
        .filter(|f| !f.is_empty())
        .collect()
}

impl LogFilters {
    pub fn new(filters: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        Self {
            needles: RwLock::new(normalize(filters)),
        }
    }

    /// Replace the filter list
    pub fn set(&self, filters: impl IntoIterator<Item = impl AsRef<str>>) {
        let normalized = normalize(filters);
        if let Ok(mut needles) = self.needles.write() {
            *needles = normalized;
        }
    }

    /// Current filters, lowercased
    pub fn list(&self) -> Vec<String> {
        self.needles.read().map(|n| n.clone()).unwrap_or_default()
    }

    /// Whether an entry with these arguments should be suppressed
    pub fn suppresses(&self, args: &[LogArg]) -> bool {
        let Ok(needles) = self.needles.read() else {
            return false;
        };
        if needles.is_empty() {
            return false;
        }
        args.iter().filter_map(LogArg::as_text).any(|text| {
            let text = text.to_lowercase();
            needles.iter().any(|needle| text.contains(needle.as_str()))
        })
    }
}
