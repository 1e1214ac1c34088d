//! Timestamp parsing, trim-window validation and timecode formatting.
//!
//! Job descriptors may express times either as plain seconds or as
//! timestamp strings (`SS`, `MM:SS`, `HH:MM:SS`, each with optional `.mmm`).

use serde::{Deserialize, Deserializer};

/// Parse a timestamp string to total seconds.
///
/// Supports formats:
/// - `HH:MM:SS` or `HH:MM:SS.mmm`
/// - `MM:SS` or `MM:SS.mmm`
/// - `SS` or `SS.mmm`
///
/// # Examples
/// ```
/// use cutline_models::timestamp::parse_timestamp;
/// assert_eq!(parse_timestamp("01:30:00").unwrap(), 5400.0);
/// assert_eq!(parse_timestamp("05:30").unwrap(), 330.0);
/// assert_eq!(parse_timestamp("90").unwrap(), 90.0);
/// ```
pub fn parse_timestamp(ts: &str) -> Result<f64, TimestampError> {
    let ts = ts.trim();
    if ts.is_empty() {
        return Err(TimestampError::Empty);
    }

    let parts: Vec<&str> = ts.split(':').collect();
    if parts.len() > 3 {
        return Err(TimestampError::InvalidFormat(ts.to_string()));
    }

    // Components are read right to left: seconds, minutes, hours.
    const NAMES: [&str; 3] = ["seconds", "minutes", "hours"];
    const SCALE: [f64; 3] = [1.0, 60.0, 3600.0];

    let mut total = 0.0;
    for (pos, part) in parts.iter().rev().enumerate() {
        let value: f64 = part
            .parse()
            .map_err(|_| TimestampError::InvalidValue(NAMES[pos], part.to_string()))?;
        if value < 0.0 {
            return Err(TimestampError::Negative);
        }
        total += value * SCALE[pos];
    }

    Ok(total)
}

/// Format seconds as `HH:MM:SS.mmm`.
///
/// Negative and non-finite inputs format as zero. Used for every cue line the
/// pipeline writes.
///
/// # Examples
/// ```
/// use cutline_models::timestamp::format_timecode;
/// assert_eq!(format_timecode(3723.5), "01:02:03.500");
/// ```
pub fn format_timecode(seconds: f64) -> String {
    let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
    let total_ms = (seconds * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let total_secs = total_ms / 1000;
    let secs = total_secs % 60;
    let total_mins = total_secs / 60;
    let mins = total_mins % 60;
    let hours = total_mins / 60;

    format!("{:02}:{:02}:{:02}.{:03}", hours, mins, secs, ms)
}

/// Validated trim window for one segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimWindow {
    /// Start time in seconds
    pub start_secs: f64,
    /// End time in seconds, clamped to the probed duration
    pub end_secs: f64,
    /// Probed source duration in seconds
    pub probed_duration: f64,
}

impl TrimWindow {
    /// Resolve a requested window against the probed duration.
    ///
    /// A missing start defaults to 0 and a missing end to the probed duration.
    /// An end past the probed duration is clamped down to it. The resulting
    /// window must satisfy `0 <= start < end <= probed_duration`.
    pub fn resolve(
        start: Option<f64>,
        end: Option<f64>,
        probed_duration: f64,
    ) -> Result<Self, TimestampError> {
        if !probed_duration.is_finite() || probed_duration <= 0.0 {
            return Err(TimestampError::UnknownDuration);
        }

        let start_secs = start.unwrap_or(0.0);
        if start_secs < 0.0 || !start_secs.is_finite() {
            return Err(TimestampError::Negative);
        }

        let end_secs = match end {
            Some(end) if end > 0.0 => end.min(probed_duration),
            _ => probed_duration,
        };

        if start_secs >= end_secs {
            return Err(TimestampError::StartNotBeforeEnd {
                start_secs,
                end_secs,
            });
        }

        Ok(Self {
            start_secs,
            end_secs,
            probed_duration,
        })
    }

    /// Duration of the window in seconds.
    pub fn new_duration(&self) -> f64 {
        self.end_secs - self.start_secs
    }

    /// Whether the window covers the whole source.
    pub fn is_full(&self) -> bool {
        self.start_secs == 0.0 && self.end_secs >= self.probed_duration
    }
}

/// Timestamp parsing/validation error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TimestampError {
    #[error("Timestamp cannot be empty")]
    Empty,

    #[error("Timestamp cannot be negative")]
    Negative,

    #[error("Invalid {0} value: {1}")]
    InvalidValue(&'static str, String),

    #[error("Invalid timestamp format '{0}'. Use HH:MM:SS, MM:SS or SS, optionally with .mmm")]
    InvalidFormat(String),

    #[error("Start time ({start_secs}s) must be before end time ({end_secs}s)")]
    StartNotBeforeEnd { start_secs: f64, end_secs: f64 },

    #[error("Source duration is unknown or zero")]
    UnknownDuration,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTime {
    Seconds(f64),
    Text(String),
}

/// Deserialize an optional time given as seconds or as a timestamp string.
pub(crate) fn deserialize_opt_seconds<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawTime>::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(RawTime::Seconds(secs)) if secs < 0.0 => {
            Err(serde::de::Error::custom(TimestampError::Negative))
        }
        Some(RawTime::Seconds(secs)) => Ok(Some(secs)),
        Some(RawTime::Text(text)) => parse_timestamp(&text)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
