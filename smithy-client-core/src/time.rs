//! Timestamp wire formats.

use std::time::SystemTime;

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};

use crate::error::TimestampError;

/// The textual representation used for a timestamp on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimestampFormat {
    /// Fractional seconds since the Unix epoch, e.g. `1515531081.123`.
    EpochSeconds,
    /// RFC 3339 date-time, e.g. `2018-01-09T20:51:21.123Z`.
    DateTime,
    /// RFC 7231 IMF-fixdate, e.g. `Tue, 09 Jan 2018 20:51:21 GMT`.
    HttpDate,
}

impl TimestampFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimestampFormat::EpochSeconds => "epoch-seconds",
            TimestampFormat::DateTime => "date-time",
            TimestampFormat::HttpDate => "http-date",
        }
    }

    /// Render a timestamp as a string in this format.
    pub fn format(&self, value: &DateTime<Utc>) -> String {
        match self {
            TimestampFormat::EpochSeconds => format_epoch_seconds(value),
            TimestampFormat::DateTime => value.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            TimestampFormat::HttpDate => httpdate::fmt_http_date(SystemTime::from(*value)),
        }
    }

    /// Parse a timestamp rendered in this format.
    pub fn parse(&self, value: &str) -> Result<DateTime<Utc>, TimestampError> {
        let err = || TimestampError {
            format: self.as_str(),
            value: value.to_string(),
        };
        match self {
            TimestampFormat::EpochSeconds => {
                let seconds: f64 = value.trim().parse().map_err(|_| err())?;
                from_epoch_seconds(seconds).ok_or_else(err)
            }
            TimestampFormat::DateTime => DateTime::parse_from_rfc3339(value.trim())
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|_| err()),
            TimestampFormat::HttpDate => httpdate::parse_http_date(value.trim())
                .map(DateTime::<Utc>::from)
                .map_err(|_| err()),
        }
    }
}

/// Convert fractional epoch seconds into a UTC timestamp, keeping millisecond
/// precision.
pub fn from_epoch_seconds(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    let millis = (seconds * 1000.0).round() as i64;
    Utc.timestamp_millis_opt(millis).single()
}

/// Fractional epoch seconds for a timestamp.
pub fn to_epoch_seconds(value: &DateTime<Utc>) -> f64 {
    value.timestamp_millis() as f64 / 1000.0
}

fn format_epoch_seconds(value: &DateTime<Utc>) -> String {
    let millis = value.timestamp_subsec_millis();
    if millis == 0 {
        value.timestamp().to_string()
    } else {
        format!("{:.3}", to_epoch_seconds(value))
            .trim_end_matches('0')
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2018, 1, 9, 20, 51, 21).unwrap()
    }

    #[test]
    fn test_http_date_format() {
        assert_eq!(
            TimestampFormat::HttpDate.format(&sample()),
            "Tue, 09 Jan 2018 20:51:21 GMT"
        );
        assert_eq!(
            TimestampFormat::HttpDate
                .parse("Tue, 09 Jan 2018 20:51:21 GMT")
                .unwrap(),
            sample()
        );
    }

    #[test]
    fn test_date_time_format() {
        assert_eq!(
            TimestampFormat::DateTime.format(&sample()),
            "2018-01-09T20:51:21Z"
        );
        assert_eq!(
            TimestampFormat::DateTime
                .parse("2018-01-09T20:51:21Z")
                .unwrap(),
            sample()
        );
    }

    #[test]
    fn test_epoch_seconds_format() {
        assert_eq!(TimestampFormat::EpochSeconds.format(&sample()), "1515531081");
        let fractional = sample() + chrono::Duration::milliseconds(120);
        assert_eq!(
            TimestampFormat::EpochSeconds.format(&fractional),
            "1515531081.12"
        );
        assert_eq!(
            TimestampFormat::EpochSeconds.parse("1515531081.12").unwrap(),
            fractional
        );
    }

    #[test]
    fn test_invalid_timestamp() {
        let err = TimestampFormat::HttpDate.parse("yesterday").unwrap_err();
        assert_eq!(err.format, "http-date");
        assert!(TimestampFormat::EpochSeconds.parse("NaN").is_err());
    }
}
