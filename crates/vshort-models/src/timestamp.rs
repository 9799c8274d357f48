//! Timestamp parsing and formatting.
//!
//! Ranking responses may carry times either as JSON numbers (seconds) or as
//! `HH:MM:SS(.mmm)`, `MM:SS` or `SS` strings. Both are accepted.

use serde::de::{self, Deserializer, Visitor};
use std::fmt;
use thiserror::Error;

/// Timestamp parsing failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimestampError {
    #[error("timestamp is empty")]
    Empty,
    #[error("invalid {0} value: {1}")]
    InvalidValue(&'static str, String),
    #[error("timestamp must not be negative")]
    Negative,
    #[error("invalid timestamp format: {0}")]
    InvalidFormat(String),
}

/// Parse a timestamp string to total seconds.
///
/// ```
/// use vshort_models::timestamp::parse_timestamp;
/// assert_eq!(parse_timestamp("01:30:00").unwrap(), 5400.0);
/// assert_eq!(parse_timestamp("05:30").unwrap(), 330.0);
/// assert_eq!(parse_timestamp("90.5").unwrap(), 90.5);
/// ```
pub fn parse_timestamp(ts: &str) -> Result<f64, TimestampError> {
    let ts = ts.trim();
    if ts.is_empty() {
        return Err(TimestampError::Empty);
    }

    const UNITS: [&str; 3] = ["hours", "minutes", "seconds"];
    let parts: Vec<&str> = ts.split(':').collect();
    if parts.len() > UNITS.len() {
        return Err(TimestampError::InvalidFormat(ts.to_string()));
    }

    // Align the parts to the right so "MM:SS" maps to minutes/seconds.
    let offset = UNITS.len() - parts.len();
    let mut total = 0.0;
    for (i, part) in parts.iter().enumerate() {
        let unit = UNITS[offset + i];
        let value: f64 = part
            .parse()
            .map_err(|_| TimestampError::InvalidValue(unit, part.to_string()))?;
        if value < 0.0 {
            return Err(TimestampError::Negative);
        }
        total = total * 60.0 + value;
    }

    Ok(total)
}

/// Format seconds as `HH:MM:SS`, or `HH:MM:SS.mmm` when there is a fraction.
pub fn format_seconds(total_secs: f64) -> String {
    let total_secs = total_secs.max(0.0);
    let hours = (total_secs / 3600.0).floor() as u32;
    let mins = ((total_secs % 3600.0) / 60.0).floor() as u32;
    let secs = total_secs % 60.0;

    if (secs - secs.floor()).abs() > 0.0001 {
        format!("{:02}:{:02}:{:06.3}", hours, mins, secs)
    } else {
        format!("{:02}:{:02}:{:02}", hours, mins, secs.floor() as u32)
    }
}

/// Serde helper accepting either a number of seconds or a timestamp string.
pub fn deserialize_seconds<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    struct SecondsVisitor;

    impl<'de> Visitor<'de> for SecondsVisitor {
        type Value = f64;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("seconds as a number or an HH:MM:SS string")
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<f64, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<f64, E> {
            parse_timestamp(v).map_err(E::custom)
        }
    }

    deserializer.deserialize_any(SecondsVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_formats() {
        assert_eq!(parse_timestamp("00:01:10").unwrap(), 70.0);
        assert_eq!(parse_timestamp("1:10").unwrap(), 70.0);
        assert_eq!(parse_timestamp("70").unwrap(), 70.0);
        assert!((parse_timestamp("00:00:10.250").unwrap() - 10.25).abs() < 1e-9);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_timestamp("  "), Err(TimestampError::Empty));
        assert_eq!(parse_timestamp("-5"), Err(TimestampError::Negative));
        assert!(matches!(
            parse_timestamp("1:2:3:4"),
            Err(TimestampError::InvalidFormat(_))
        ));
        assert!(matches!(
            parse_timestamp("ab:10"),
            Err(TimestampError::InvalidValue("minutes", _))
        ));
    }

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(0.0), "00:00:00");
        assert_eq!(format_seconds(3725.0), "01:02:05");
        assert_eq!(format_seconds(10.5), "00:00:10.500");
    }

    #[test]
    fn test_deserialize_number_or_string() {
        #[derive(serde::Deserialize)]
        struct Window {
            #[serde(deserialize_with = "deserialize_seconds")]
            t: f64,
        }

        let a: Window = serde_json::from_str(r#"{"t": 12}"#).unwrap();
        let b: Window = serde_json::from_str(r#"{"t": 12.5}"#).unwrap();
        let c: Window = serde_json::from_str(r#"{"t": "00:01:00"}"#).unwrap();
        assert_eq!(a.t, 12.0);
        assert_eq!(b.t, 12.5);
        assert_eq!(c.t, 60.0);
        assert!(serde_json::from_str::<Window>(r#"{"t": "soon"}"#).is_err());
    }
}
