//! Date/time parsing for the formats Salesforce and host stores emit.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};

/// Parse a timestamp in any of the accepted forms, normalized to UTC.
///
/// Accepts RFC 3339, the Salesforce wire form (`2024-03-01T10:00:00.000+0000`),
/// zone-less ISO date-times (read as UTC), bare dates (midnight UTC) and
/// integer epoch seconds.
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| Utc.from_utc_datetime(&naive));
    }
    raw.parse::<i64>().ok().and_then(from_epoch)
}

pub fn from_epoch(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
}

/// `2024-03-01T10:00:00Z`: the literal form SOQL accepts in conditions.
pub fn format_soql_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// `2024-03-01T10:00:00`: zone-less ISO form used by local date-time fields.
pub fn format_local_iso(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_salesforce_wire_format() {
        let dt = parse_datetime("2024-03-01T10:00:00.000+0200").unwrap();
        assert_eq!(format_soql_datetime(&dt), "2024-03-01T08:00:00Z");
    }

    #[test]
    fn parses_rfc3339_and_naive_forms() {
        assert_eq!(
            parse_datetime("2024-03-01T10:00:00Z"),
            parse_datetime("2024-03-01T10:00:00")
        );
        assert_eq!(
            format_local_iso(&parse_datetime("2024-03-01").unwrap()),
            "2024-03-01T00:00:00"
        );
    }

    #[test]
    fn parses_epoch_seconds() {
        let dt = parse_datetime("1709287200").unwrap();
        assert_eq!(format_soql_datetime(&dt), "2024-03-01T10:00:00Z");
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_datetime("").is_none());
        assert!(parse_datetime("yesterday").is_none());
    }
}
