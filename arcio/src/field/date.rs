//! ARC archive dates: `yyyyMMddHHmmss` in UTC.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

const FORMAT: &str = "%Y%m%d%H%M%S";
pub(super) const EXPECTED_FORMAT: &str = "yyyyMMddHHmmss";

/// Parse a date, strictly.
///
/// The input must be exactly 14 ASCII digits forming a valid calendar date and time. Dates at or
/// before 1970-01-01T00:00:00Z are not accepted as archive dates.
pub(super) fn parse(s: &str) -> Option<DateTime<Utc>> {
    // chrono accepts variable-width numbers, so enforce the fixed width here
    if s.len() != EXPECTED_FORMAT.len() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let naive = NaiveDateTime::parse_from_str(s, FORMAT).ok()?;
    let date = Utc.from_utc_datetime(&naive);
    if date.timestamp() <= 0 {
        return None;
    }
    Some(date)
}

#[cfg(test)]
mod tests {
    use super::parse;
    use chrono::{TimeZone, Utc};

    #[test]
    fn parses_strict_format() {
        let date = parse("20111224193000").expect("date should be valid");
        assert_eq!(date, Utc.with_ymd_and_hms(2011, 12, 24, 19, 30, 0).unwrap());
    }

    #[test]
    fn rejects_other_formats() {
        assert_eq!(parse("2011-12-24T19:30:00Z"), None);
        assert_eq!(parse("201112241930"), None);
        assert_eq!(parse("2011122419300a"), None);
        assert_eq!(parse("+2011122419300"), None);
    }

    #[test]
    fn rejects_invalid_calendar_values() {
        assert_eq!(parse("20111324193000"), None);
        assert_eq!(parse("20110230000000"), None);
        assert_eq!(parse("20111224253000"), None);
    }

    #[test]
    fn rejects_epoch_and_earlier() {
        assert_eq!(parse("00000000000000"), None);
        assert_eq!(parse("19700101000000"), None);
        assert_eq!(parse("19691231235959"), None);
        assert!(parse("19700101000001").is_some());
    }
}
