//! FFmpeg progress parsing.

use serde::{Deserialize, Serialize};

/// Highest percent reported while a stage is still running.
pub const RUNNING_CEILING: f64 = 99.0;

/// Progress information from FFmpeg.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FfmpegProgress {
    /// Current frame number
    pub frame: u64,
    /// Current FPS
    pub fps: f64,
    /// Output time in microseconds
    pub out_time_us: i64,
    /// Output time as string (HH:MM:SS.microseconds)
    pub out_time: String,
    /// Encoding speed (e.g., 1.5 = 1.5x realtime)
    pub speed: f64,
    /// Whether encoding is complete
    pub is_complete: bool,
}

impl FfmpegProgress {
    /// Output time in seconds.
    pub fn out_time_secs(&self) -> f64 {
        self.out_time_us.max(0) as f64 / 1_000_000.0
    }

    /// Percent of `total_secs` written so far, clamped to 100.
    pub fn percent_of_duration(&self, total_secs: f64) -> f64 {
        if total_secs <= 0.0 {
            return 0.0;
        }
        (self.out_time_secs() / total_secs * 100.0).clamp(0.0, 100.0)
    }

    /// Percent of `total_frames` written so far, clamped to 100.
    pub fn percent_of_frames(&self, total_frames: f64) -> f64 {
        if total_frames <= 0.0 {
            return 0.0;
        }
        (self.frame as f64 / total_frames * 100.0).clamp(0.0, 100.0)
    }
}

/// Callback type for progress updates.
pub type ProgressCallback = Box<dyn Fn(FfmpegProgress) + Send + Sync + 'static>;

/// A no-op progress callback.
pub fn ignore_progress() -> ProgressCallback {
    Box::new(|_| {})
}

/// Percent tracker that never goes backwards and reports 100 once.
///
/// While running, values are held at or below [`RUNNING_CEILING`]; only
/// [`MonotonicPercent::finish`] yields 100.
#[derive(Debug, Default)]
pub struct MonotonicPercent {
    last: Option<f64>,
    finished: bool,
}

impl MonotonicPercent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a running value. Returns it when it moved forward.
    pub fn advance(&mut self, percent: f64) -> Option<f64> {
        if self.finished || !percent.is_finite() {
            return None;
        }
        let percent = percent.clamp(0.0, RUNNING_CEILING);
        match self.last {
            Some(last) if percent <= last => None,
            _ => {
                self.last = Some(percent);
                Some(percent)
            }
        }
    }

    /// Mark the stage complete. Returns 100 on the first call only.
    pub fn finish(&mut self) -> Option<f64> {
        if self.finished {
            return None;
        }
        self.finished = true;
        self.last = Some(100.0);
        Some(100.0)
    }

    /// Last reported value.
    pub fn current(&self) -> f64 {
        self.last.unwrap_or(0.0)
    }
}

/// Parse one line of FFmpeg's `-progress` output into `current`.
///
/// Returns a snapshot at the end of each progress block.
pub fn parse_progress_line(line: &str, current: &mut FfmpegProgress) -> Option<FfmpegProgress> {
    let (key, value) = line.trim().split_once('=')?;

    match key {
        // `out_time_ms` is microseconds despite its name
        "out_time_us" | "out_time_ms" => {
            if let Ok(us) = value.parse::<i64>() {
                current.out_time_us = us;
            }
        }
        "out_time" => current.out_time = value.to_string(),
        "frame" => {
            if let Ok(frame) = value.parse() {
                current.frame = frame;
            }
        }
        "fps" => {
            if let Ok(fps) = value.parse() {
                current.fps = fps;
            }
        }
        "speed" => {
            // "1.5x" or "N/A"
            if let Some(speed) = value.strip_suffix('x').and_then(|s| s.trim().parse().ok()) {
                current.speed = speed;
            }
        }
        "progress" => {
            current.is_complete = value == "end";
            return Some(current.clone());
        }
        _ => {}
    }

    None
}

/// Whether a stderr line belongs to the `-progress` key/value stream.
pub(crate) fn is_progress_key(line: &str) -> bool {
    const KEYS: &[&str] = &[
        "frame", "fps", "stream_", "bitrate", "total_size", "out_time", "dup_frames",
        "drop_frames", "speed", "progress",
    ];
    match line.split_once('=') {
        Some((key, _)) => KEYS.iter().any(|k| key.starts_with(k)),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_of_duration() {
        let progress = FfmpegProgress {
            out_time_us: 5_000_000,
            ..Default::default()
        };
        assert!((progress.percent_of_duration(10.0) - 50.0).abs() < 0.01);
        assert!((progress.percent_of_duration(2.0) - 100.0).abs() < 0.01);
        assert_eq!(progress.percent_of_duration(0.0), 0.0);
    }

    #[test]
    fn test_percent_of_frames() {
        let progress = FfmpegProgress {
            frame: 150,
            ..Default::default()
        };
        assert!((progress.percent_of_frames(600.0) - 25.0).abs() < 0.01);
    }

    #[test]
    fn test_progress_parsing() {
        let mut progress = FfmpegProgress::default();

        assert!(parse_progress_line("out_time_us=5000000", &mut progress).is_none());
        assert_eq!(progress.out_time_us, 5_000_000);

        parse_progress_line("frame=120", &mut progress);
        parse_progress_line("speed=1.5x", &mut progress);
        parse_progress_line("speed=N/A", &mut progress);
        assert!((progress.speed - 1.5).abs() < 0.01);

        let snapshot = parse_progress_line("progress=continue", &mut progress).unwrap();
        assert_eq!(snapshot.frame, 120);
        assert!(!snapshot.is_complete);

        let snapshot = parse_progress_line("progress=end", &mut progress).unwrap();
        assert!(snapshot.is_complete);
    }

    #[test]
    fn test_progress_key_detection() {
        assert!(is_progress_key("out_time=00:00:01.000000"));
        assert!(is_progress_key("stream_0_0_q=28.0"));
        assert!(!is_progress_key("Invalid data found when processing input"));
        assert!(!is_progress_key("[concat @ 0x55] Impossible to open 'a.mp4'"));
    }

    #[test]
    fn test_monotonic_percent() {
        let mut tracker = MonotonicPercent::new();
        assert_eq!(tracker.advance(10.0), Some(10.0));
        assert_eq!(tracker.advance(5.0), None);
        assert_eq!(tracker.advance(10.0), None);
        assert_eq!(tracker.advance(100.0), Some(RUNNING_CEILING));
        assert_eq!(tracker.advance(100.0), None);
        assert_eq!(tracker.finish(), Some(100.0));
        assert_eq!(tracker.finish(), None);
        assert_eq!(tracker.advance(50.0), None);
        assert_eq!(tracker.current(), 100.0);
    }
}
