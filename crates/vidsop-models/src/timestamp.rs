//! Timestamp formatting for segment time ranges.
//!
//! The integration payload and client events use `mm:ss` (minutes roll
//! past 59 for videos longer than an hour, matching the burned-in
//! overlay).

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum TimestampError {
    #[error("empty timestamp")]
    Empty,

    #[error("invalid {0} value: {1}")]
    InvalidValue(&'static str, String),

    #[error("negative timestamp component")]
    Negative,

    #[error("unsupported timestamp format: {0}")]
    InvalidFormat(String),
}

/// Format seconds as `mm:ss`, flooring fractional seconds.
pub fn format_mmss(total_secs: f64) -> String {
    let total = total_secs.max(0.0).floor() as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// Format a time window as `mm:ss-mm:ss`.
pub fn format_range(start_secs: f64, end_secs: f64) -> String {
    format!("{}-{}", format_mmss(start_secs), format_mmss(end_secs))
}

/// Parse `SS`, `MM:SS` or `HH:MM:SS` (fractional seconds allowed) to
/// total seconds.
pub fn parse_timestamp(ts: &str) -> Result<f64, TimestampError> {
    let ts = ts.trim();
    if ts.is_empty() {
        return Err(TimestampError::Empty);
    }

    let parts: Vec<&str> = ts.split(':').collect();
    let parse = |label: &'static str, s: &str| -> Result<f64, TimestampError> {
        let v: f64 = s
            .parse()
            .map_err(|_| TimestampError::InvalidValue(label, s.to_string()))?;
        if v < 0.0 {
            return Err(TimestampError::Negative);
        }
        Ok(v)
    };

    match parts.len() {
        1 => parse("seconds", parts[0]),
        2 => Ok(parse("minutes", parts[0])? * 60.0 + parse("seconds", parts[1])?),
        3 => Ok(parse("hours", parts[0])? * 3600.0
            + parse("minutes", parts[1])? * 60.0
            + parse("seconds", parts[2])?),
        _ => Err(TimestampError::InvalidFormat(ts.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_mmss_basics() {
        assert_eq!(format_mmss(0.0), "00:00");
        assert_eq!(format_mmss(59.9), "00:59");
        assert_eq!(format_mmss(780.0), "13:00");
        // Minutes keep counting past the hour
        assert_eq!(format_mmss(3725.0), "62:05");
    }

    #[test]
    fn format_range_matches_segment_display() {
        assert_eq!(format_range(780.0, 1200.0), "13:00-20:00");
    }

    #[test]
    fn parse_roundtrip() {
        assert_eq!(parse_timestamp("90").unwrap(), 90.0);
        assert_eq!(parse_timestamp("05:30").unwrap(), 330.0);
        assert_eq!(parse_timestamp("01:30:00").unwrap(), 5400.0);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(parse_timestamp(""), Err(TimestampError::Empty));
        assert!(matches!(
            parse_timestamp("a:b"),
            Err(TimestampError::InvalidValue(_, _))
        ));
        assert!(matches!(
            parse_timestamp("1:2:3:4"),
            Err(TimestampError::InvalidFormat(_))
        ));
    }
}
