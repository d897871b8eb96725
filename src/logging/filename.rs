//! Log file naming
//!
//! Files are named `<prefix><YYYY-MM-DD><suffix>`. The date is the first day
//! of a two-day window: odd days name the file after themselves, even days
//! after the previous (odd) day, so the 1st and 2nd share a file, the 3rd and
//! 4th share the next, and so on. Month ends with 31 days give the 31st a
//! file of its own.

use chrono::{Datelike, Duration, NaiveDate};

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATE_LEN: usize = 10;

/// Default file name prefix
pub const DEFAULT_PREFIX: &str = "session_";

/// Default file name suffix
pub const DEFAULT_SUFFIX: &str = ".txt";

/// Derives and recognizes log file names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenamePolicy {
    prefix: String,
    suffix: String,
}

impl Default for FilenamePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX, DEFAULT_SUFFIX)
    }
}

impl FilenamePolicy {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    /// Base date of the window containing `today`
    pub fn window_start(today: NaiveDate) -> NaiveDate {
        if today.day() % 2 == 1 {
            today
        } else {
            today - Duration::days(1)
        }
    }

    /// Name of the file that should receive entries on `today`
    pub fn current_filename(&self, today: NaiveDate) -> String {
        self.filename_for(Self::window_start(today))
    }

    /// Name of the file for an explicit base date
    pub fn filename_for(&self, date: NaiveDate) -> String {
        format!("{}{}{}", self.prefix, date.format(DATE_FORMAT), self.suffix)
    }

    /// The `YYYY-MM-DD` segment of a matching name
    ///
    /// Only the shape is checked (`dddd-dd-dd`), not that the date exists.
    pub fn date_segment<'a>(&self, name: &'a str) -> Option<&'a str> {
        let segment = name
            .strip_prefix(self.prefix.as_str())?
            .strip_suffix(self.suffix.as_str())?;
        if segment.len() != DATE_LEN {
            return None;
        }
        let shaped = segment.bytes().enumerate().all(|(i, b)| match i {
            4 | 7 => b == b'-',
            _ => b.is_ascii_digit(),
        });
        shaped.then_some(segment)
    }

    /// Whether `name` follows the naming pattern
    pub fn matches(&self, name: &str) -> bool {
        self.date_segment(name).is_some()
    }

    /// Calendar date embedded in `name`, if it parses
    pub fn parse_date(&self, name: &str) -> Option<NaiveDate> {
        let segment = self.date_segment(name)?;
        NaiveDate::parse_from_str(segment, DATE_FORMAT).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_even_day_uses_previous_date() {
        let policy = FilenamePolicy::default();
        assert_eq!(
            policy.current_filename(date(2024, 3, 14)),
            "session_2024-03-13.txt"
        );
    }

    #[test]
    fn test_odd_day_uses_same_date() {
        let policy = FilenamePolicy::default();
        assert_eq!(
            policy.current_filename(date(2024, 3, 15)),
            "session_2024-03-15.txt"
        );
    }

    #[test]
    fn test_window_across_month_boundary() {
        let policy = FilenamePolicy::default();
        // 31st is odd, the 1st of the next month is odd too
        assert_eq!(
            policy.current_filename(date(2024, 1, 31)),
            "session_2024-01-31.txt"
        );
        assert_eq!(
            policy.current_filename(date(2024, 2, 1)),
            "session_2024-02-01.txt"
        );
        assert_eq!(
            policy.current_filename(date(2024, 2, 2)),
            "session_2024-02-01.txt"
        );
    }

    #[test]
    fn test_parity_holds_for_every_day_of_a_year() {
        let policy = FilenamePolicy::default();
        let mut day = date(2023, 1, 1);
        while day.year() == 2023 {
            let expected = if day.day() % 2 == 1 {
                day
            } else {
                day - Duration::days(1)
            };
            assert_eq!(policy.current_filename(day), policy.filename_for(expected));
            day += Duration::days(1);
        }
    }

    #[test]
    fn test_custom_prefix_and_suffix() {
        let policy = FilenamePolicy::new("app-", ".log");
        assert_eq!(policy.current_filename(date(2024, 6, 9)), "app-2024-06-09.log");
        assert!(policy.matches("app-2024-06-09.log"));
        assert!(!policy.matches("session_2024-06-09.txt"));
    }

    #[test]
    fn test_matches_checks_shape_only() {
        let policy = FilenamePolicy::default();
        assert!(policy.matches("session_2024-03-13.txt"));
        assert!(policy.matches("session_2024-99-99.txt"));
        assert!(!policy.matches("session_2024-3-13.txt"));
        assert!(!policy.matches("session_2024-03-13.txt.bak"));
        assert!(!policy.matches("../session_2024-03-13.txt"));
        assert!(!policy.matches("session_abcd-03-13.txt"));
    }

    #[test]
    fn test_parse_date() {
        let policy = FilenamePolicy::default();
        assert_eq!(
            policy.parse_date("session_2024-03-13.txt"),
            Some(date(2024, 3, 13))
        );
        assert_eq!(policy.parse_date("session_2024-99-99.txt"), None);
        assert_eq!(policy.parse_date("other.txt"), None);
    }
}
