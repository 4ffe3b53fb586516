//! Event date parsing.
//!
//! Source exports mix ISO timestamps, date-only values and German
//! `dd.mm.yyyy` dates. Date-only values resolve to midnight.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use cts_model::ParseError;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y", "%Y/%m/%d"];

/// Parses an event timestamp.
///
/// `formats` are tried first, in order; each may be a date-time or a
/// date-only chrono format. The built-in formats follow, then RFC 3339 with
/// the offset dropped (wall-clock time is kept).
pub fn parse_event_datetime(raw: &str, formats: &[String]) -> Result<NaiveDateTime, ParseError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(ParseError::EmptyDate);
    }

    let custom = formats.iter().map(String::as_str);
    for format in custom.clone().chain(DATETIME_FORMATS.iter().copied()) {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(parsed);
        }
    }
    for format in custom.chain(DATE_FORMATS.iter().copied()) {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Ok(date.and_time(chrono::NaiveTime::MIN));
        }
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.naive_local());
    }

    Err(ParseError::UnrecognizedDate(value.to_string()))
}

/// Date-only variant used for cut-off dates in configuration.
pub fn parse_event_date(raw: &str, formats: &[String]) -> Result<NaiveDate, ParseError> {
    parse_event_datetime(raw, formats).map(|parsed| parsed.date())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn test_iso_variants() {
        assert_eq!(
            parse_event_datetime("2021-01-05 08:30:00", &[]).unwrap(),
            dt(2021, 1, 5, 8, 30, 0)
        );
        assert_eq!(
            parse_event_datetime("2021-01-05T08:30:00.250", &[]).unwrap(),
            dt(2021, 1, 5, 8, 30, 0) + chrono::Duration::milliseconds(250)
        );
        assert_eq!(
            parse_event_datetime("2021-01-05 08:30", &[]).unwrap(),
            dt(2021, 1, 5, 8, 30, 0)
        );
    }

    #[test]
    fn test_date_only_is_midnight() {
        assert_eq!(
            parse_event_datetime("2021-01-05", &[]).unwrap(),
            dt(2021, 1, 5, 0, 0, 0)
        );
        assert_eq!(
            parse_event_datetime(" 05.01.2021 ", &[]).unwrap(),
            dt(2021, 1, 5, 0, 0, 0)
        );
    }

    #[test]
    fn test_rfc3339_keeps_wall_clock() {
        assert_eq!(
            parse_event_datetime("2021-01-05T23:00:00+01:00", &[]).unwrap(),
            dt(2021, 1, 5, 23, 0, 0)
        );
    }

    #[test]
    fn test_custom_format_wins() {
        let formats = vec!["%m/%d/%Y".to_string()];
        assert_eq!(
            parse_event_datetime("01/05/2021", &formats).unwrap(),
            dt(2021, 1, 5, 0, 0, 0)
        );
    }

    #[test]
    fn test_unparseable_dates() {
        assert_eq!(parse_event_datetime("  ", &[]), Err(ParseError::EmptyDate));
        assert_eq!(
            parse_event_datetime("yesterday", &[]),
            Err(ParseError::UnrecognizedDate("yesterday".to_string()))
        );
        assert!(parse_event_datetime("2021-13-45", &[]).is_err());
    }
}
