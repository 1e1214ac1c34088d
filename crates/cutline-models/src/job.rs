//! Job descriptor definitions.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;
use uuid::Uuid;

use crate::timestamp::deserialize_opt_seconds;

/// Number of screenshots captured when the descriptor does not say.
pub const DEFAULT_SCREENSHOT_COUNT: u32 = 5;

/// Unique identifier for a job.
///
/// Doubles as the output filename stem.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One input clip with an optional trim window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SegmentSpec {
    /// Remote URL or local path
    #[serde(alias = "url", alias = "path")]
    pub source: String,

    /// Start of the window in seconds (defaults to 0)
    #[serde(
        default,
        deserialize_with = "deserialize_opt_seconds",
        skip_serializing_if = "Option::is_none"
    )]
    #[schemars(with = "Option<f64>")]
    pub start_time: Option<f64>,

    /// End of the window in seconds (defaults to the probed duration)
    #[serde(
        default,
        deserialize_with = "deserialize_opt_seconds",
        skip_serializing_if = "Option::is_none"
    )]
    #[schemars(with = "Option<f64>")]
    pub end_time: Option<f64>,
}

impl SegmentSpec {
    /// Create a segment covering the whole source.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            start_time: None,
            end_time: None,
        }
    }

    /// Set the trim window.
    pub fn with_window(mut self, start: Option<f64>, end: Option<f64>) -> Self {
        self.start_time = start;
        self.end_time = end;
        self
    }

    /// Parsed URL when the source is a remote http(s) location.
    pub fn remote_url(&self) -> Option<Url> {
        remote_url(&self.source)
    }
}

/// An image or video layered on top of the base video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OverlaySpec {
    /// Remote URL or local path
    #[serde(alias = "url", alias = "path")]
    pub source: String,

    /// Start of visibility on the output timeline
    #[serde(
        default,
        deserialize_with = "deserialize_opt_seconds",
        skip_serializing_if = "Option::is_none"
    )]
    #[schemars(with = "Option<f64>")]
    pub start_time: Option<f64>,

    /// End of visibility on the output timeline
    #[serde(
        default,
        deserialize_with = "deserialize_opt_seconds",
        skip_serializing_if = "Option::is_none"
    )]
    #[schemars(with = "Option<f64>")]
    pub end_time: Option<f64>,

    /// Watermarks stay visible for the whole output
    #[serde(default)]
    pub is_watermark: bool,

    /// Horizontal offset in pixels
    #[serde(default)]
    pub x: i32,

    /// Vertical offset in pixels
    #[serde(default)]
    pub y: i32,
}

impl OverlaySpec {
    /// Create an overlay at the top-left corner, visible throughout.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            start_time: None,
            end_time: None,
            is_watermark: false,
            x: 0,
            y: 0,
        }
    }

    /// Mark as watermark.
    pub fn watermark(mut self) -> Self {
        self.is_watermark = true;
        self
    }

    /// Set the position.
    pub fn at(mut self, x: i32, y: i32) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    /// Set the visibility window.
    pub fn between(mut self, start: f64, end: f64) -> Self {
        self.start_time = Some(start);
        self.end_time = Some(end);
        self
    }

    /// Visibility window, present only for timed non-watermark overlays.
    pub fn enable_window(&self) -> Option<(f64, f64)> {
        if self.is_watermark {
            return None;
        }
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => None,
        }
    }
}

/// A declarative editing job as submitted by a caller.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobDescriptor {
    /// Input clips in merge order
    pub videos: Vec<SegmentSpec>,

    /// Overlays; position in the list is the z-order
    #[serde(default)]
    pub overlays: Vec<OverlaySpec>,

    /// Capture evenly spaced screenshots of the output
    #[serde(default)]
    pub screenshots: bool,

    /// Number of screenshots to capture
    #[serde(
        default,
        alias = "ssCount",
        skip_serializing_if = "Option::is_none"
    )]
    pub screenshot_count: Option<u32>,

    /// Generate a sprite sheet with a cue file
    #[serde(default)]
    pub sprite: bool,

    /// Caller-facing name, echoed back untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Opaque caller metadata, echoed back untouched
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub meta: serde_json::Value,
}

impl JobDescriptor {
    /// Create a descriptor for the given segments with no extras.
    pub fn new(videos: Vec<SegmentSpec>) -> Self {
        Self {
            videos,
            overlays: Vec::new(),
            screenshots: false,
            screenshot_count: None,
            sprite: false,
            name: None,
            meta: serde_json::Value::Null,
        }
    }

    /// Add an overlay on top of the existing ones.
    pub fn with_overlay(mut self, overlay: OverlaySpec) -> Self {
        self.overlays.push(overlay);
        self
    }

    /// Request `count` screenshots.
    pub fn with_screenshots(mut self, count: u32) -> Self {
        self.screenshots = true;
        self.screenshot_count = Some(count);
        self
    }

    /// Request a sprite sheet.
    pub fn with_sprite(mut self) -> Self {
        self.sprite = true;
        self
    }

    /// Screenshot count, falling back to the given default.
    pub fn screenshot_count_or(&self, default: u32) -> u32 {
        self.screenshot_count.unwrap_or(default)
    }
}

/// A descriptor bound to an identity and creation time.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Job {
    /// Unique job ID
    pub id: JobId,

    /// When the job was created
    pub created_at: DateTime<Utc>,

    /// The submitted descriptor
    #[serde(flatten)]
    pub descriptor: JobDescriptor,
}

impl Job {
    /// Create a job with a fresh ID.
    pub fn new(descriptor: JobDescriptor) -> Self {
        Self {
            id: JobId::new(),
            created_at: Utc::now(),
            descriptor,
        }
    }

    /// Use a caller-supplied ID.
    pub fn with_id(mut self, id: JobId) -> Self {
        self.id = id;
        self
    }
}

/// Parse `source` as a remote http(s) URL.
pub fn remote_url(source: &str) -> Option<Url> {
    let url = Url::parse(source).ok()?;
    match url.scheme() {
        "http" | "https" => Some(url),
        _ => None,
    }
}
