//! Timestamp formatting utilities
//!
//! Record timestamps are rendered in one of five encodings: three numeric
//! epoch forms, UTC ISO 8601, and the default local wall-clock form.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp encodings supported by both encoder variants
///
/// # Examples
///
/// ```
/// use rust_tee_logger::TimeFormat;
/// use chrono::{TimeZone, Utc};
///
/// let t = Utc.with_ymd_and_hms(2025, 1, 8, 10, 30, 45).unwrap();
/// assert_eq!(TimeFormat::Iso8601Utc.render(&t), "2025-01-08T10:30:45.000Z");
/// assert_eq!(TimeFormat::EpochNanos.render(&t), "1736332245000000000");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeFormat {
    /// Fractional seconds since the Unix epoch: `1736332245.123456`
    EpochSeconds,

    /// Fractional milliseconds since the Unix epoch: `1736332245123.456`
    EpochMillis,

    /// Integer nanoseconds since the Unix epoch
    EpochNanos,

    /// UTC ISO 8601 with milliseconds: `2025-01-08T10:30:45.123Z`
    Iso8601Utc,

    /// Local wall clock: `2025-01-08 18:30:45.123`
    #[default]
    LocalMillis,
}

impl TimeFormat {
    /// Resolve a configuration name.
    ///
    /// `seconds`, `milliseconds`, `nanoseconds` and `utc` select the matching
    /// encoding; any other value selects the local default.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "seconds" => TimeFormat::EpochSeconds,
            "milliseconds" => TimeFormat::EpochMillis,
            "nanoseconds" => TimeFormat::EpochNanos,
            "utc" => TimeFormat::Iso8601Utc,
            _ => TimeFormat::LocalMillis,
        }
    }

    /// Check if this is an epoch-based numeric format
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            TimeFormat::EpochSeconds | TimeFormat::EpochMillis | TimeFormat::EpochNanos
        )
    }

    /// Timestamp as a JSON value: numbers for epoch forms, strings otherwise
    #[must_use]
    pub fn to_json(&self, datetime: &DateTime<Utc>) -> serde_json::Value {
        match self {
            TimeFormat::EpochSeconds => float_or_string(epoch_nanos(datetime) as f64 / 1e9),
            TimeFormat::EpochMillis => float_or_string(epoch_nanos(datetime) as f64 / 1e6),
            TimeFormat::EpochNanos => serde_json::Value::Number(epoch_nanos(datetime).into()),
            _ => serde_json::Value::String(self.render(datetime)),
        }
    }

    /// Timestamp as text
    #[must_use]
    pub fn render(&self, datetime: &DateTime<Utc>) -> String {
        match self {
            TimeFormat::EpochSeconds => (epoch_nanos(datetime) as f64 / 1e9).to_string(),
            TimeFormat::EpochMillis => (epoch_nanos(datetime) as f64 / 1e6).to_string(),
            TimeFormat::EpochNanos => epoch_nanos(datetime).to_string(),
            TimeFormat::Iso8601Utc => datetime.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
            TimeFormat::LocalMillis => datetime
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S%.3f")
                .to_string(),
        }
    }
}

/// Current local time in the default layout, for console-only output
pub(crate) fn local_now() -> String {
    TimeFormat::LocalMillis.render(&Utc::now())
}

fn epoch_nanos(datetime: &DateTime<Utc>) -> i64 {
    // Out of range only past the year 2262
    datetime
        .timestamp_nanos_opt()
        .unwrap_or_else(|| datetime.timestamp_micros().saturating_mul(1000))
}

fn float_or_string(value: f64) -> serde_json::Value {
    serde_json::Number::from_f64(value)
        .map(serde_json::Value::Number)
        .unwrap_or_else(|| serde_json::Value::String(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_datetime() -> DateTime<Utc> {
        // 2025-01-08 10:30:45.123456 UTC
        Utc.with_ymd_and_hms(2025, 1, 8, 10, 30, 45)
            .single()
            .expect("valid datetime")
            + chrono::Duration::microseconds(123456)
    }

    #[test]
    fn test_from_name() {
        assert_eq!(TimeFormat::from_name("seconds"), TimeFormat::EpochSeconds);
        assert_eq!(TimeFormat::from_name("milliseconds"), TimeFormat::EpochMillis);
        assert_eq!(TimeFormat::from_name("nanoseconds"), TimeFormat::EpochNanos);
        assert_eq!(TimeFormat::from_name("UTC"), TimeFormat::Iso8601Utc);
        assert_eq!(TimeFormat::from_name("json"), TimeFormat::LocalMillis);
        assert_eq!(TimeFormat::from_name(""), TimeFormat::LocalMillis);
    }

    #[test]
    fn test_iso8601_utc_format() {
        let result = TimeFormat::Iso8601Utc.render(&fixed_datetime());
        assert_eq!(result, "2025-01-08T10:30:45.123Z");
    }

    #[test]
    fn test_epoch_nanos_format() {
        let value = TimeFormat::EpochNanos.to_json(&fixed_datetime());
        assert_eq!(value.as_i64(), Some(1_736_332_245_123_456_000));
    }

    #[test]
    fn test_epoch_seconds_is_fractional() {
        let value = TimeFormat::EpochSeconds.to_json(&fixed_datetime());
        let seconds = value.as_f64().expect("numeric seconds");
        assert!((seconds - 1_736_332_245.123_456).abs() < 1e-3);
    }

    #[test]
    fn test_epoch_millis_is_larger_than_seconds() {
        let secs = TimeFormat::EpochSeconds.to_json(&fixed_datetime()).as_f64().unwrap();
        let millis = TimeFormat::EpochMillis.to_json(&fixed_datetime()).as_f64().unwrap();
        assert!((millis / 1000.0 - secs).abs() < 1e-3);
    }

    #[test]
    fn test_local_layout() {
        let result = TimeFormat::LocalMillis.render(&fixed_datetime());
        // YYYY-MM-DD HH:MM:SS.mmm
        assert_eq!(result.len(), 23);
        assert_eq!(&result[4..5], "-");
        assert_eq!(&result[10..11], " ");
        assert_eq!(&result[19..20], ".");
        assert!(result.ends_with("123"));
    }

    #[test]
    fn test_string_formats_are_json_strings() {
        assert!(TimeFormat::LocalMillis.to_json(&fixed_datetime()).is_string());
        assert!(TimeFormat::Iso8601Utc.to_json(&fixed_datetime()).is_string());
        assert!(!TimeFormat::Iso8601Utc.is_numeric());
        assert!(TimeFormat::EpochMillis.is_numeric());
    }
}
