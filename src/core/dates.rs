//! Timestamp parsing shared by the reports and routes. Records store dates
//! as ISO-8601 strings, sometimes full timestamps, sometimes bare days.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

/// Parse an ISO-8601 timestamp or bare `YYYY-MM-DD` date. Bare dates read
/// as midnight UTC.
pub fn parse_when(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(timestamp.naive_utc());
    }
    if let Ok(timestamp) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(timestamp);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Day-granularity view of a timestamp, for inclusive day-range filters.
pub fn parse_day(raw: &str) -> Option<NaiveDate> {
    parse_when(raw).map(|when| when.date())
}

pub fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Current instant formatted the way the mobile clients write timestamps:
/// `2025-03-01T17:30:00.000Z`.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn to_iso(when: NaiveDateTime) -> String {
    DateTime::<Utc>::from_naive_utc_and_offset(when, Utc).to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_timestamps() {
        let when = parse_when("2025-03-01T17:30:00.000Z").unwrap();
        assert_eq!(when.date(), NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
    }

    #[test]
    fn parses_bare_dates_as_midnight() {
        let when = parse_when("2025-03-01").unwrap();
        assert_eq!(when.time(), chrono::NaiveTime::MIN);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_when("not a date").is_none());
        assert!(parse_day("").is_none());
    }

    #[test]
    fn day_truncation_drops_time_of_day() {
        assert_eq!(
            parse_day("2025-03-01T23:59:59.000Z"),
            parse_day("2025-03-01")
        );
    }
}
