//! Segment types, one per pipeline step.
//!
//! `SegmentSpec` (as submitted) becomes a [`ResolvedSegment`] once its
//! readable location is known, a [`ProbedSegment`] once inspected and
//! validated, and a [`TrimmedSegment`] once cut.

use std::path::PathBuf;

use cutline_media::MediaInfo;
use cutline_models::{SegmentSpec, TrimWindow};

/// A segment whose readable location is known.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSegment {
    /// Position in the job's segment list
    pub index: usize,
    pub spec: SegmentSpec,
    /// Path or URL the engine reads from
    pub location: String,
    /// Whether `location` is a fetched temp copy
    pub downloaded: bool,
}

/// A segment with a validated window and stream details.
#[derive(Debug, Clone)]
pub struct ProbedSegment {
    pub index: usize,
    pub location: String,
    pub downloaded: bool,
    pub window: TrimWindow,
    pub frame_rate: f64,
    pub frame_count: u64,
    pub info: MediaInfo,
}

impl ProbedSegment {
    /// Validate `resolved` against its inspection result.
    pub fn from_probe(
        resolved: ResolvedSegment,
        info: MediaInfo,
    ) -> Result<Self, cutline_models::TimestampError> {
        let window = TrimWindow::resolve(
            resolved.spec.start_time,
            resolved.spec.end_time,
            info.duration,
        )?;
        Ok(Self {
            index: resolved.index,
            location: resolved.location,
            downloaded: resolved.downloaded,
            window,
            frame_rate: info.video.frame_rate,
            frame_count: info.video.frame_count,
            info,
        })
    }

    pub fn start_time(&self) -> f64 {
        self.window.start_secs
    }

    pub fn end_time(&self) -> f64 {
        self.window.end_secs
    }

    pub fn probed_duration(&self) -> f64 {
        self.window.probed_duration
    }

    pub fn new_duration(&self) -> f64 {
        self.window.new_duration()
    }

    /// Frames expected in the trimmed output.
    pub fn expected_frames(&self) -> f64 {
        self.frame_rate * self.new_duration()
    }
}

/// A segment cut to its window.
#[derive(Debug, Clone)]
pub struct TrimmedSegment {
    pub segment: ProbedSegment,
    pub trimmed_path: PathBuf,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use cutline_media::{MediaInfo, VideoStreamInfo};

    pub fn media_info(duration: f64, frame_rate: f64) -> MediaInfo {
        MediaInfo {
            duration,
            video: VideoStreamInfo {
                frame_rate,
                frame_count: (duration * frame_rate).round() as u64,
                width: 1280,
                height: 720,
                codec: "h264".to_string(),
            },
            has_audio: true,
            format_name: "mov,mp4,m4a,3gp,3g2,mj2".to_string(),
            size: 0,
            bitrate: 0,
            raw: serde_json::Value::Null,
        }
    }
}
