//! Parsing for human-readable configuration values
//!
//! Both parsers return `None` on malformed input so the configuration layer
//! can report which setting was wrong instead of silently using a default.

use std::time::Duration;

/// Split a value like `"30s"` into its number and the unit suffix that matched.
fn split_unit<'a>(s: &'a str, units: &[&'static str]) -> (&'a str, Option<&'static str>) {
    for unit in units {
        if let Some(num) = s.strip_suffix(unit) {
            return (num.trim(), Some(unit));
        }
    }
    (s, None)
}

/// Parse a size string (`"10MB"`, `"512KB"`, `"1GB"`, `"1024B"`, `"1024"`) into bytes.
pub fn parse_size(s: &str) -> Option<usize> {
    let s = s.trim().to_uppercase();
    let (num, unit) = split_unit(&s, &["GB", "MB", "KB", "B"]);
    let multiplier: usize = match unit {
        Some("GB") => 1024 * 1024 * 1024,
        Some("MB") => 1024 * 1024,
        Some("KB") => 1024,
        _ => 1,
    };

    num.parse::<usize>().ok()?.checked_mul(multiplier)
}

/// Parse a duration string (`"100ms"`, `"30s"`, `"5m"`, `"1h"`, `"1d"`).
///
/// A bare number is read as seconds.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim().to_lowercase();
    let (num, unit) = split_unit(&s, &["ms", "s", "m", "h", "d"]);
    let millis: u64 = match unit {
        Some("ms") => 1,
        Some("m") => 60 * 1000,
        Some("h") => 60 * 60 * 1000,
        Some("d") => 24 * 60 * 60 * 1000,
        _ => 1000,
    };

    num.parse::<u64>()
        .ok()?
        .checked_mul(millis)
        .map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("1KB"), Some(1024));
        assert_eq!(parse_size("10MB"), Some(10 * 1024 * 1024));
        assert_eq!(parse_size("1gb"), Some(1024 * 1024 * 1024));
        assert_eq!(parse_size("512B"), Some(512));
        assert_eq!(parse_size("100"), Some(100));
        assert_eq!(parse_size("  5MB  "), Some(5 * 1024 * 1024));
    }

    #[test]
    fn test_parse_size_rejects_garbage() {
        assert_eq!(parse_size("lots"), None);
        assert_eq!(parse_size("MB"), None);
        assert_eq!(parse_size("-1KB"), None);
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("100ms"), Some(Duration::from_millis(100)));
        assert_eq!(parse_duration("30s"), Some(Duration::from_secs(30)));
        assert_eq!(parse_duration("5m"), Some(Duration::from_secs(300)));
        assert_eq!(parse_duration("1h"), Some(Duration::from_secs(3600)));
        assert_eq!(parse_duration("1d"), Some(Duration::from_secs(86400)));
        assert_eq!(parse_duration("60"), Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        assert_eq!(parse_duration("soon"), None);
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("5 minutes"), None);
    }
}
