//! Time related utils.

use chrono::Utc;

use crate::{Error, Result};

/// DateTime in UTC, the only time flavor used for signing.
pub type DateTime = chrono::DateTime<Utc>;

/// Get the current time.
pub fn now() -> DateTime {
    Utc::now()
}

/// Format a time into an RFC 1123 HTTP date, always in GMT.
///
/// e.g. `Mon, 02 Jan 2006 15:04:05 GMT`
pub fn format_http_date(t: DateTime) -> String {
    t.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Format a time into RFC 3339 with seconds precision.
///
/// e.g. `2006-01-02T15:04:05Z`
pub fn format_rfc3339(t: DateTime) -> String {
    t.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Parse an RFC 3339 time into [`DateTime`].
pub fn parse_rfc3339(s: &str) -> Result<DateTime> {
    let t = chrono::DateTime::parse_from_rfc3339(s)
        .map_err(|e| Error::unexpected(format!("parse {s} into rfc3339 failed")).with_source(e))?;
    Ok(t.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn test_time() -> DateTime {
        Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_format_http_date() {
        assert_eq!(format_http_date(test_time()), "Wed, 01 Jan 2020 00:00:00 GMT");
    }

    #[test]
    fn test_format_rfc3339() {
        assert_eq!(format_rfc3339(test_time()), "2020-01-01T00:00:00Z");
    }

    #[test]
    fn test_parse_rfc3339() {
        assert_eq!(parse_rfc3339("2020-01-01T00:00:00Z").unwrap(), test_time());
        assert!(parse_rfc3339("Wed, 01 Jan 2020").is_err());
    }
}
