// src/utils/time.rs - Time helpers for timestamps coming from the API

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Clock and timestamp parsing helpers
pub struct Time;

impl Time {
    /// Get current UTC time
    pub fn now() -> DateTime<Utc> {
        Utc::now()
    }

    /// Parses the timestamp shapes the API emits.
    ///
    /// Accepts RFC 3339, naive ISO date-times (read as UTC) and bare dates.
    pub fn parse(value: &str) -> Option<DateTime<Utc>> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
            return Some(dt.with_timezone(&Utc));
        }
        for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
                return Some(Utc.from_utc_datetime(&naive));
            }
        }
        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .ok()
            .map(Self::start_of_day)
    }

    /// Midnight UTC at the start of `date`
    pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
        Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::default()))
    }

    /// Last millisecond of `date`
    pub fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
        Self::start_of_day(date) + Duration::hours(24) - Duration::milliseconds(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_shapes() {
        let rfc = Time::parse("2024-03-05T10:00:00Z").unwrap();
        let naive = Time::parse("2024-03-05T10:00:00.000").unwrap();
        assert_eq!(rfc, naive);

        let date = Time::parse("2024-03-05").unwrap();
        assert_eq!(date, Time::start_of_day(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()));

        assert!(Time::parse("").is_none());
        assert!(Time::parse("yesterday").is_none());
    }

    #[test]
    fn test_end_of_day_is_inclusive_boundary() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let end = Time::end_of_day(day);
        assert_eq!(end + Duration::milliseconds(1), Time::start_of_day(day.succ_opt().unwrap()));
    }
}
