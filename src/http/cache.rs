//! Conditional request module
//!
//! `Last-Modified` generation and `If-Modified-Since` evaluation.

use chrono::{DateTime, Utc};
use std::time::SystemTime;

/// Format a timestamp as an HTTP date, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`
pub fn format_http_date(time: SystemTime) -> String {
    let time: DateTime<Utc> = time.into();
    time.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Check whether the client's cached copy is still current
///
/// Comparison is done at second precision, since HTTP dates carry no
/// fractional part. An unparseable header never matches.
pub fn is_not_modified(if_modified_since: Option<&str>, modified: SystemTime) -> bool {
    let Some(header) = if_modified_since else {
        return false;
    };
    let Ok(since) = DateTime::parse_from_rfc2822(header.trim()) else {
        return false;
    };
    let modified: DateTime<Utc> = modified.into();
    modified.timestamp() <= since.timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    fn at(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn test_format_http_date() {
        assert_eq!(format_http_date(at(784_111_777)), "Sun, 06 Nov 1994 08:49:37 GMT");
    }

    #[test]
    fn test_not_modified_when_same_or_newer() {
        let header = Some("Sun, 06 Nov 1994 08:49:37 GMT");
        assert!(is_not_modified(header, at(784_111_777)));
        assert!(is_not_modified(header, at(784_111_700)));
        // sub-second precision on disk is ignored
        assert!(is_not_modified(
            header,
            at(784_111_777) + Duration::from_millis(400)
        ));
    }

    #[test]
    fn test_modified_after_header() {
        assert!(!is_not_modified(
            Some("Sun, 06 Nov 1994 08:49:37 GMT"),
            at(784_111_778)
        ));
    }

    #[test]
    fn test_missing_or_invalid_header() {
        assert!(!is_not_modified(None, at(0)));
        assert!(!is_not_modified(Some("yesterday"), at(0)));
    }
}
