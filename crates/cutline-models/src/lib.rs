//! Shared data models for the Cutline editing pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Job descriptors (segments, overlays, capture flags)
//! - Pipeline stages and the status events emitted while a job runs
//! - Encoding and sprite settings
//! - Timestamp parsing and `HH:MM:SS.mmm` timecode formatting

pub mod encoding;
pub mod event;
pub mod job;
pub mod stage;
pub mod timestamp;

// Re-export common types
pub use encoding::{EncodingConfig, SpriteConfig};
pub use event::{JobEvent, SpriteOutput, StageProgress};
pub use job::{
    remote_url, Job, JobDescriptor, JobId, OverlaySpec, SegmentSpec, DEFAULT_SCREENSHOT_COUNT,
};
pub use stage::JobStage;
pub use timestamp::{format_timecode, parse_timestamp, TimestampError, TrimWindow};
