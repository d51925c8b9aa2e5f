//! Recurrence frequency strings.
//!
//! Frequencies are written as an integer followed by a unit
//! (`30m`, `12h`, `2d`). Parsing never fails the caller: an unparseable
//! string falls back to a configured default duration.

use chrono::{DateTime, Duration, Utc};

/// Last-resort fallback when even the configured default is unparseable.
pub const FALLBACK_FREQUENCY_HOURS: i64 = 24;

/// Parse a frequency string into a duration.
///
/// Accepts `<n><unit>` with optional whitespace, where unit is one of
/// `m`/`min`/`minute(s)`, `h`/`hr`/`hour(s)`, `d`/`day(s)`, plus the
/// aliases `hourly`, `daily` and `weekly`. Zero, negative and
/// out-of-range values are rejected.
pub fn parse_frequency(input: &str) -> Option<Duration> {
    let s = input.trim().to_lowercase();
    match s.as_str() {
        "hourly" => return Some(Duration::hours(1)),
        "daily" => return Some(Duration::days(1)),
        "weekly" => return Some(Duration::days(7)),
        _ => {}
    }

    let split = s.find(|c: char| !c.is_ascii_digit())?;
    let (digits, unit) = s.split_at(split);
    let value: i64 = digits.parse().ok()?;
    if value <= 0 {
        return None;
    }

    match unit.trim() {
        "m" | "min" | "mins" | "minute" | "minutes" => Duration::try_minutes(value),
        "h" | "hr" | "hrs" | "hour" | "hours" => Duration::try_hours(value),
        "d" | "day" | "days" => Duration::try_days(value),
        _ => None,
    }
}

/// Parse a frequency, failing closed to `default` (and then to 24h).
pub fn frequency_or_default(input: &str, default: &str) -> Duration {
    if let Some(duration) = parse_frequency(input) {
        return duration;
    }
    tracing::warn!(
        frequency = input,
        fallback = default,
        "Unparseable frequency, using default"
    );
    parse_frequency(default).unwrap_or_else(|| Duration::hours(FALLBACK_FREQUENCY_HOURS))
}

/// `from + frequency`, failing closed like [`frequency_or_default`].
///
/// A frequency that parses but lands past the representable calendar falls
/// back to `default`, then to 24h.
pub fn next_run_after(from: DateTime<Utc>, frequency: &str, default: &str) -> DateTime<Utc> {
    if let Some(at) = from.checked_add_signed(frequency_or_default(frequency, default)) {
        return at;
    }
    tracing::warn!(
        frequency,
        fallback = default,
        "Frequency overflows the calendar, using default"
    );
    parse_frequency(default)
        .and_then(|every| from.checked_add_signed(every))
        .or_else(|| from.checked_add_signed(Duration::hours(FALLBACK_FREQUENCY_HOURS)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_units() {
        assert_eq!(parse_frequency("30m"), Some(Duration::minutes(30)));
        assert_eq!(parse_frequency("12h"), Some(Duration::hours(12)));
        assert_eq!(parse_frequency("2d"), Some(Duration::days(2)));
        assert_eq!(parse_frequency(" 4 hours "), Some(Duration::hours(4)));
        assert_eq!(parse_frequency("15min"), Some(Duration::minutes(15)));
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!(parse_frequency("daily"), Some(Duration::days(1)));
        assert_eq!(parse_frequency("Hourly"), Some(Duration::hours(1)));
        assert_eq!(parse_frequency("weekly"), Some(Duration::days(7)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_frequency(""), None);
        assert_eq!(parse_frequency("h"), None);
        assert_eq!(parse_frequency("12"), None);
        assert_eq!(parse_frequency("0h"), None);
        assert_eq!(parse_frequency("12 fortnights"), None);
    }

    #[test]
    fn test_fails_closed_to_default() {
        assert_eq!(frequency_or_default("soon", "6h"), Duration::hours(6));
        assert_eq!(
            frequency_or_default("soon", "never"),
            Duration::hours(FALLBACK_FREQUENCY_HOURS)
        );
    }

    #[test]
    fn test_out_of_range_values_fail_closed() {
        assert_eq!(parse_frequency("999999999999d"), None);
        assert_eq!(parse_frequency("999999999999999h"), None);
        assert_eq!(
            frequency_or_default("999999999999d", "24h"),
            Duration::hours(24)
        );
    }

    #[test]
    fn test_next_run_after_overflow_uses_default() {
        let now = Utc::now();
        assert_eq!(next_run_after(now, "6h", "24h"), now + Duration::hours(6));
        assert_eq!(
            next_run_after(now, "100000000d", "12h"),
            now + Duration::hours(12)
        );
        assert_eq!(
            next_run_after(now, "100000000d", "100000000d"),
            now + Duration::hours(FALLBACK_FREQUENCY_HOURS)
        );
    }
}
