//! Log file retention management
//!
//! Handles cleanup of old log files based on count, age, and size. The rules
//! run in that order, each on the survivors of the previous one, and the
//! active file is never a candidate.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::NaiveDate;

use crate::error::LogError;
use crate::storage::Storage;

use super::filename::FilenamePolicy;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Retention limits. A value of zero or less disables that rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetentionLimits {
    pub max_file_count: i64,
    pub max_age_days: i64,
    pub max_size_mb: f64,
}

impl RetentionLimits {
    /// Limits with every rule disabled
    pub fn unlimited() -> Self {
        Self {
            max_file_count: 0,
            max_age_days: 0,
            max_size_mb: 0.0,
        }
    }

    /// Whether `size_bytes` is over the size limit (false when disabled)
    pub fn exceeds_size(&self, size_bytes: u64) -> bool {
        self.max_size_mb > 0.0 && size_bytes as f64 / BYTES_PER_MB > self.max_size_mb
    }
}

/// A log file as seen during one listing; never cached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFileDescriptor {
    pub name: String,
    /// Date parsed from the name, `None` when it doesn't parse
    pub date: Option<NaiveDate>,
    pub size_bytes: u64,
}

/// Pick the files to delete
///
/// `today` is the current local date. Files with an unparsable date sort as
/// the oldest for the count rule and are ignored by the age rule.
pub fn select_for_deletion(
    files: &[LogFileDescriptor],
    active_file: &str,
    limits: &RetentionLimits,
    today: NaiveDate,
) -> BTreeSet<String> {
    let mut doomed = BTreeSet::new();

    let mut survivors: Vec<&LogFileDescriptor> =
        files.iter().filter(|f| f.name != active_file).collect();
    survivors.sort_by(|a, b| {
        let a_date = a.date.unwrap_or(NaiveDate::MIN);
        let b_date = b.date.unwrap_or(NaiveDate::MIN);
        b_date.cmp(&a_date).then_with(|| b.name.cmp(&a.name))
    });

    if limits.max_file_count > 0 {
        let keep = limits.max_file_count as usize;
        if survivors.len() > keep {
            for file in survivors.drain(keep..) {
                doomed.insert(file.name.clone());
            }
        }
    }

    let mut aged_out = BTreeSet::new();
    if limits.max_age_days > 0 {
        for file in &survivors {
            if let Some(date) = file.date {
                let days_old = (today - date).num_days();
                if days_old > limits.max_age_days {
                    aged_out.insert(file.name.clone());
                }
            }
        }
    }

    for file in &survivors {
        if !aged_out.contains(&file.name) && limits.exceeds_size(file.size_bytes) {
            doomed.insert(file.name.clone());
        }
    }

    doomed.extend(aged_out);
    doomed
}

/// Build descriptors for every matching file in `logs_dir`
///
/// Files whose stat fails are left out and reported.
pub async fn describe_files(
    storage: &dyn Storage,
    logs_dir: &Path,
    policy: &FilenamePolicy,
) -> std::io::Result<Vec<LogFileDescriptor>> {
    let names = storage.ls(logs_dir).await?;
    let mut files = Vec::new();

    for name in names.into_iter().filter(|n| policy.matches(n)) {
        match storage.stat(&logs_dir.join(&name)).await {
            Ok(stat) if stat.is_file() => files.push(LogFileDescriptor {
                date: policy.parse_date(&name),
                size_bytes: stat.size,
                name,
            }),
            Ok(_) => {}
            Err(source) => {
                let err = LogError::RetentionStatFailure { file: name, source };
                tracing::warn!(error = %err, "Skipping log file in retention sweep");
            }
        }
    }

    Ok(files)
}

/// Run one retention sweep over `logs_dir`
///
/// Returns the number of files deleted.
pub async fn sweep(
    storage: &dyn Storage,
    logs_dir: &Path,
    active_file: &str,
    policy: &FilenamePolicy,
    limits: &RetentionLimits,
    today: NaiveDate,
) -> std::io::Result<usize> {
    let files = describe_files(storage, logs_dir, policy).await?;
    let doomed = select_for_deletion(&files, active_file, limits, today);

    let mut deleted_count = 0;
    for name in doomed {
        match storage.unlink(&logs_dir.join(&name)).await {
            Ok(()) => {
                tracing::debug!(file = %name, "Deleted old log file");
                deleted_count += 1;
            }
            Err(e) => tracing::warn!(file = %name, error = %e, "Failed to delete old log file"),
        }
    }

    Ok(deleted_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn file(name: &str, size_bytes: u64) -> LogFileDescriptor {
        LogFileDescriptor {
            name: name.to_string(),
            date: FilenamePolicy::default().parse_date(name),
            size_bytes,
        }
    }

    fn limits(count: i64, age: i64, size: f64) -> RetentionLimits {
        RetentionLimits {
            max_file_count: count,
            max_age_days: age,
            max_size_mb: size,
        }
    }

    const ACTIVE: &str = "session_2024-03-13.txt";

    #[test]
    fn test_count_rule_keeps_newest() {
        let files = vec![
            file("session_2024-03-01.txt", 10),
            file("session_2024-03-03.txt", 10),
            file("session_2024-03-05.txt", 10),
        ];

        let doomed = select_for_deletion(&files, ACTIVE, &limits(2, 0, 0.0), date(2024, 3, 13));

        assert_eq!(
            doomed.into_iter().collect::<Vec<_>>(),
            vec!["session_2024-03-01.txt".to_string()]
        );
    }

    #[test]
    fn test_active_file_never_selected() {
        let huge = 50 * 1024 * 1024;
        let files = vec![
            file(ACTIVE, huge),
            file("session_2020-01-01.txt", huge),
            file("session_2024-03-11.txt", 0),
        ];

        for l in [
            limits(1, 0, 0.0),
            limits(0, 1, 0.0),
            limits(0, 0, 1.0),
            limits(1, 1, 1.0),
        ] {
            // Far enough in the future that the active file is ancient
            let doomed = select_for_deletion(&files, ACTIVE, &l, date(2030, 1, 1));
            assert!(!doomed.contains(ACTIVE), "active file selected with {:?}", l);
        }
    }

    #[test]
    fn test_age_rule_uses_strictly_greater() {
        let files = vec![
            file("session_2024-03-06.txt", 0),
            file("session_2024-03-05.txt", 0),
        ];

        let doomed = select_for_deletion(&files, ACTIVE, &limits(0, 7, 0.0), date(2024, 3, 13));

        // 7 days old survives, 8 days old goes
        assert!(!doomed.contains("session_2024-03-06.txt"));
        assert!(doomed.contains("session_2024-03-05.txt"));
    }

    #[test]
    fn test_size_rule() {
        let files = vec![
            file("session_2024-03-11.txt", 2 * 1024 * 1024 + 1),
            file("session_2024-03-09.txt", 1024 * 1024),
        ];

        let doomed = select_for_deletion(&files, ACTIVE, &limits(0, 0, 2.0), date(2024, 3, 13));

        assert_eq!(doomed.len(), 1);
        assert!(doomed.contains("session_2024-03-11.txt"));
    }

    #[test]
    fn test_unparsable_dates_sort_oldest_and_skip_age_rule() {
        let files = vec![
            file("session_2024-99-99.txt", 0),
            file("session_2024-03-11.txt", 0),
            file("session_2024-03-09.txt", 0),
        ];

        let by_count = select_for_deletion(&files, ACTIVE, &limits(2, 0, 0.0), date(2024, 3, 13));
        assert_eq!(by_count.len(), 1);
        assert!(by_count.contains("session_2024-99-99.txt"));

        let by_age = select_for_deletion(&files, ACTIVE, &limits(0, 1, 0.0), date(2024, 3, 13));
        assert!(!by_age.contains("session_2024-99-99.txt"));
        assert_eq!(by_age.len(), 2);
    }

    #[test]
    fn test_rules_apply_to_survivors_without_double_counting() {
        // Oldest file qualifies under both count and age; selected once
        let files = vec![
            file("session_2024-01-01.txt", 0),
            file("session_2024-03-11.txt", 0),
            file("session_2024-03-09.txt", 0),
        ];

        let doomed = select_for_deletion(&files, ACTIVE, &limits(2, 30, 0.0), date(2024, 3, 13));

        assert_eq!(doomed.len(), 1);
        assert!(doomed.contains("session_2024-01-01.txt"));
    }

    #[test]
    fn test_disabled_limits_select_nothing() {
        let files = vec![
            file("session_2000-01-01.txt", u64::MAX / 2),
            file("session_2000-01-03.txt", u64::MAX / 2),
        ];

        let doomed = select_for_deletion(&files, ACTIVE, &RetentionLimits::unlimited(), date(2024, 3, 13));
        assert!(doomed.is_empty());

        let negative = select_for_deletion(&files, ACTIVE, &limits(-1, -1, -1.0), date(2024, 3, 13));
        assert!(negative.is_empty());
    }

    #[tokio::test]
    async fn test_sweep_deletes_and_skips_unstatable_files() {
        let storage = MemoryStorage::new();
        let dir = Path::new("/base/logs");
        storage.insert_file(dir.join(ACTIVE), "active");
        storage.insert_file(dir.join("session_2020-01-01.txt"), "old");
        storage.insert_file(dir.join("session_2020-01-03.txt"), "old but unstatable");
        storage.insert_file(dir.join("notes.txt"), "not a log");
        storage.fail_stat(dir.join("session_2020-01-03.txt"));

        let deleted = sweep(
            &storage,
            dir,
            ACTIVE,
            &FilenamePolicy::default(),
            &limits(0, 7, 0.0),
            date(2024, 3, 13),
        )
        .await
        .unwrap();

        assert_eq!(deleted, 1);
        assert!(storage.has_file(dir.join(ACTIVE)));
        assert!(!storage.has_file(dir.join("session_2020-01-01.txt")));
        assert!(storage.has_file(dir.join("session_2020-01-03.txt")));
        assert!(storage.has_file(dir.join("notes.txt")));
    }

    #[tokio::test]
    async fn test_sweep_missing_directory_is_an_error() {
        let storage = MemoryStorage::new();
        let result = sweep(
            &storage,
            Path::new("/missing"),
            ACTIVE,
            &FilenamePolicy::default(),
            &limits(1, 1, 1.0),
            date(2024, 3, 13),
        )
        .await;
        assert!(result.is_err());
    }
}
