//! Form number generation.
//!
//! Numbers are grouped per `{year}{month}` with a per-group sequence, e.g.
//! the third payment order of January 2021 is `PP2101003`. The sequence is
//! tenant-scoped; uniqueness of the rendered number is enforced by storage.

use chrono::{DateTime, Datelike, Utc};

/// Increment group for a form date: `year * 100 + month` (e.g. `202101`).
pub fn increment_group(date: DateTime<Utc>) -> u32 {
    date.year() as u32 * 100 + date.month()
}

/// Render a form number: prefix + 2-digit year + 2-digit month + 3-digit
/// zero-padded sequence.
pub fn format_number(prefix: &str, date: DateTime<Utc>, increment: u32) -> String {
    format!(
        "{}{:02}{:02}{:03}",
        prefix,
        date.year() % 100,
        date.month(),
        increment
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 10, 0, 0).unwrap()
    }

    #[test]
    fn number_is_prefix_year_month_sequence() {
        assert_eq!(format_number("PP", date(2021, 1, 15), 1), "PP2101001");
        assert_eq!(format_number("PP", date(2021, 1, 15), 42), "PP2101042");
        assert_eq!(format_number("PI", date(2024, 12, 1), 7), "PI2412007");
    }

    #[test]
    fn group_changes_with_year_and_month() {
        assert_eq!(increment_group(date(2021, 1, 15)), 202101);
        assert_eq!(increment_group(date(2021, 2, 1)), 202102);
        assert_ne!(
            increment_group(date(2021, 3, 31)),
            increment_group(date(2022, 3, 31))
        );
    }
}
