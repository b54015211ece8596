use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%d-%m-%Y", "%Y%m%d"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parses a calendar date in one of the accepted feed formats.
///
/// A timestamp is accepted only at midnight, where it converts to a date
/// without loss.
pub fn parse_date(str_date: &str) -> Option<NaiveDate> {
    let trimmed = str_date.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
        .or_else(|| parse_midnight(trimmed))
}

fn parse_midnight(trimmed: &str) -> Option<NaiveDate> {
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(trimmed)
                .ok()
                .map(|dt| dt.naive_local())
        })
        .filter(|dt| dt.time() == NaiveTime::MIN)
        .map(|dt| dt.date())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_iso_date() {
        assert_eq!(
            parse_date("2024-02-29"),
            NaiveDate::from_ymd_opt(2024, 2, 29)
        );
    }

    #[test]
    fn test_parse_alternative_formats() {
        assert!(parse_date("2024/01/31").is_some());
        assert!(parse_date("31-01-2024").is_some());
        assert!(parse_date("20240131").is_some());
    }

    #[test]
    fn test_parse_midnight_timestamp() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 31);
        assert_eq!(parse_date("2024-01-31T00:00:00"), day);
        assert_eq!(parse_date("2024-01-31 00:00:00.000"), day);
        assert_eq!(parse_date("2024-01-31T00:00:00+05:00"), day);
        assert!(parse_date("2024-01-31T12:30:00").is_none());
        assert!(parse_date("2024-01-31T00:00:00.5").is_none());
    }

    #[test]
    fn test_parse_invalid_date() {
        assert!(parse_date("2023-02-29").is_none());
        assert!(parse_date("yesterday").is_none());
        assert!(parse_date("").is_none());
    }
}
