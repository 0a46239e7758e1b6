use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Opaque identifier assigned by the backend to a report job.
pub type JobId = String;

/// All timestamps are UTC.
pub type Timestamp = DateTime<Utc>;

/// Parse an ISO-8601 timestamp.
///
/// RFC 3339 values are converted to UTC; values without an offset are taken
/// to be UTC already. A bare date reads as midnight.
pub fn parse_timestamp(raw: &str) -> Option<Timestamp> {
    let raw = raw.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(t.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
}
