//! Time-bound and step parsing for range queries.

use crate::error::MetricsError;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::time::Duration;

/// Parse a time bound: an ISO-8601 instant with timezone, or a relative
/// duration with a leading `-` that is added to `now`.
pub fn parse_time(s: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, String> {
    if let Some(rel) = s.strip_prefix('-') {
        let dur = humantime::parse_duration(rel.trim()).map_err(|e| e.to_string())?;
        let dur = ChronoDuration::from_std(dur).map_err(|e| e.to_string())?;
        return Ok(now - dur);
    }
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| e.to_string())
}

/// Parse and validate the start/end pair. `end` defaults to `now` when
/// empty; the start must not be after the end.
pub fn validate_time_range(
    start: &str,
    end: &str,
    now: DateTime<Utc>,
) -> Result<(DateTime<Utc>, DateTime<Utc>), MetricsError> {
    let parsed_start = parse_time(start, now).map_err(|detail| MetricsError::InvalidTime {
        which: "start",
        detail,
    })?;

    let parsed_end = if end.is_empty() {
        now
    } else {
        parse_time(end, now).map_err(|detail| MetricsError::InvalidTime {
            which: "end",
            detail,
        })?
    };

    if parsed_start > parsed_end {
        return Err(MetricsError::StartAfterEnd);
    }
    Ok((parsed_start, parsed_end))
}

/// Parse the step duration (`15s`, `1m`, `1h30m`). The step must be
/// positive.
pub fn parse_step(s: &str) -> Result<Duration, MetricsError> {
    let dur = humantime::parse_duration(s.trim()).map_err(|e| MetricsError::InvalidStep(e.to_string()))?;
    if dur.is_zero() {
        return Err(MetricsError::InvalidStep("step must be positive".to_string()));
    }
    Ok(dur)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_absolute_time() {
        let t = parse_time("2024-06-15T10:00:00Z", now()).unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(2024, 6, 15, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_absolute_time_with_offset() {
        let t = parse_time("2024-06-15T12:00:00+02:00", now()).unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(2024, 6, 15, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_relative_time() {
        let t = parse_time("-1h", now()).unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(2024, 6, 15, 11, 0, 0).unwrap());

        let t = parse_time("-30m", now()).unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(2024, 6, 15, 11, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_time_rejects_garbage() {
        assert!(parse_time("yesterday", now()).is_err());
        assert!(parse_time("-notaduration", now()).is_err());
        assert!(parse_time("2024-06-15 10:00:00", now()).is_err());
        assert!(parse_time("", now()).is_err());
    }

    #[test]
    fn test_validate_range_end_defaults_to_now() {
        let (start, end) = validate_time_range("-1h", "", now()).unwrap();
        assert_eq!(end, now());
        assert!(start < end);
    }

    #[test]
    fn test_validate_range_start_after_end() {
        let err = validate_time_range(
            "2024-06-15T11:00:00Z",
            "2024-06-15T10:00:00Z",
            now(),
        )
        .unwrap_err();
        assert!(matches!(err, MetricsError::StartAfterEnd));
    }

    #[test]
    fn test_validate_range_bad_start() {
        let err = validate_time_range("junk", "", now()).unwrap_err();
        assert!(matches!(
            err,
            MetricsError::InvalidTime { which: "start", .. }
        ));
        assert!(err.to_string().contains("invalid start time format"));
    }

    #[test]
    fn test_parse_step() {
        assert_eq!(parse_step("15s").unwrap(), Duration::from_secs(15));
        assert_eq!(parse_step("1m").unwrap(), Duration::from_secs(60));
        assert_eq!(parse_step("1h30m").unwrap(), Duration::from_secs(5400));
    }

    #[test]
    fn test_parse_step_invalid() {
        assert!(matches!(parse_step("abc"), Err(MetricsError::InvalidStep(_))));
        assert!(matches!(parse_step("0s"), Err(MetricsError::InvalidStep(_))));
    }
}
