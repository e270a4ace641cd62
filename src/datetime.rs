// Date and datetime literals
// Recognizes YYYY-MM-DD and YYYY-MM-DD hh:mm:ss[.fff] strings and formats them back

use chrono::{NaiveDate, NaiveDateTime};

use crate::value::JValue;

const DATE_SHAPE: &str = "dddd-dd-dd";
const TIME_SHAPE: &str = "dd:dd:dd";

/// Check `s` against a shape where `d` stands for any ASCII digit.
fn has_shape(s: &str, shape: &str) -> bool {
    s.len() == shape.len()
        && s.bytes().zip(shape.bytes()).all(|(c, p)| match p {
            b'd' => c.is_ascii_digit(),
            _ => c == p,
        })
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    if !has_shape(s, DATE_SHAPE) {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Parse `YYYY-MM-DD hh:mm:ss` with either a space or `T` separator and an
/// optional fraction of one to three digits.
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    if s.len() < 19 || !s.as_bytes()[..19].is_ascii() {
        return None;
    }
    let (head, fraction) = s.split_at(19);
    let date_ok = has_shape(&head[..10], DATE_SHAPE);
    let sep_ok = matches!(head.as_bytes()[10], b' ' | b'T');
    if !date_ok || !sep_ok || !has_shape(&head[11..], TIME_SHAPE) {
        return None;
    }
    if !fraction.is_empty() {
        let digits = fraction.strip_prefix('.')?;
        if digits.is_empty() || digits.len() > 3 || !digits.bytes().all(|c| c.is_ascii_digit()) {
            return None;
        }
    }
    let normalized = s.replacen('T', " ", 1);
    NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%d %H:%M:%S%.f").ok()
}

/// Promote a string to a date or datetime value if it has that shape.
pub fn promote(s: &str) -> Option<JValue> {
    if let Some(d) = parse_date(s) {
        return Some(JValue::Date(d));
    }
    parse_datetime(s).map(JValue::DateTime)
}

pub fn format_date(d: &NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

pub fn format_datetime(dt: &NaiveDateTime) -> String {
    dt.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date() {
        let d = parse_date("2023-02-28").unwrap();
        assert_eq!(format_date(&d), "2023-02-28");
        assert!(parse_date("2023-02-30").is_none());
        assert!(parse_date("2023-2-28").is_none());
        assert!(parse_date("not a date").is_none());
    }

    #[test]
    fn test_parse_datetime() {
        let dt = parse_datetime("2021-07-04 13:05:09").unwrap();
        assert_eq!(format_datetime(&dt), "2021-07-04 13:05:09.000");
        let dt = parse_datetime("2021-07-04T13:05:09.25").unwrap();
        assert_eq!(format_datetime(&dt), "2021-07-04 13:05:09.250");
        assert!(parse_datetime("2021-07-04 25:00:00").is_none());
        assert!(parse_datetime("2021-07-04 13:05:09.1234").is_none());
        assert!(parse_datetime("2021-07-04").is_none());
    }

    #[test]
    fn test_promote() {
        assert!(matches!(promote("1999-12-31"), Some(JValue::Date(_))));
        assert!(matches!(promote("1999-12-31 23:59:59"), Some(JValue::DateTime(_))));
        assert!(promote("hello").is_none());
    }
}
