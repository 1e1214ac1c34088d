//! FFprobe media inspection.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::command::check_ffprobe;
use crate::error::{MediaError, MediaResult};

/// Video stream details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoStreamInfo {
    /// Frame rate (fps)
    pub frame_rate: f64,
    /// Total frames, from the container or estimated from duration
    pub frame_count: u64,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Video codec
    pub codec: String,
}

/// Media file information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Duration in seconds
    pub duration: f64,
    /// Primary video stream
    pub video: VideoStreamInfo,
    /// Whether an audio stream is present
    pub has_audio: bool,
    /// Container format name
    pub format_name: String,
    /// File size in bytes
    pub size: u64,
    /// Bitrate in bits/second
    pub bitrate: u64,
    /// Untouched ffprobe output
    pub raw: serde_json::Value,
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeFormat {
    format_name: Option<String>,
    duration: Option<String>,
    size: Option<String>,
    bit_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    nb_frames: Option<String>,
    duration: Option<String>,
}

impl MediaInfo {
    /// Build from ffprobe `-print_format json -show_format -show_streams` output.
    pub fn from_ffprobe_json(bytes: &[u8]) -> MediaResult<Self> {
        let raw: serde_json::Value = serde_json::from_slice(bytes)?;
        let probe: FfprobeOutput = serde_json::from_value(raw.clone())?;

        let video_stream = probe
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"))
            .ok_or_else(|| MediaError::InvalidVideo("No video stream found".to_string()))?;
        let has_audio = probe
            .streams
            .iter()
            .any(|s| s.codec_type.as_deref() == Some("audio"));

        let duration = parse_num::<f64>(&probe.format.duration)
            .or_else(|| parse_num(&video_stream.duration))
            .unwrap_or(0.0);

        // r_frame_rate is the container's base rate; avg_frame_rate can be 0/0
        let frame_rate = [&video_stream.r_frame_rate, &video_stream.avg_frame_rate]
            .into_iter()
            .flatten()
            .find_map(|r| parse_frame_rate(r))
            .unwrap_or(0.0);

        let frame_count = parse_num::<u64>(&video_stream.nb_frames)
            .filter(|n| *n > 0)
            .unwrap_or_else(|| (frame_rate * duration).round() as u64);

        Ok(Self {
            duration,
            video: VideoStreamInfo {
                frame_rate,
                frame_count,
                width: video_stream.width.unwrap_or(0),
                height: video_stream.height.unwrap_or(0),
                codec: video_stream.codec_name.clone().unwrap_or_default(),
            },
            has_audio,
            format_name: probe.format.format_name.unwrap_or_default(),
            size: parse_num(&probe.format.size).unwrap_or(0),
            bitrate: parse_num(&probe.format.bit_rate).unwrap_or(0),
            raw,
        })
    }
}

/// Probe a local file or URL for information.
pub async fn probe_media(source: &str) -> MediaResult<MediaInfo> {
    if !is_url(source) && !Path::new(source).exists() {
        return Err(MediaError::FileNotFound(source.into()));
    }

    let ffprobe = check_ffprobe()?;
    debug!(source = source, "Probing media");

    let output = Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(source)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::probe_failed(
            source,
            format!("ffprobe exited with {}", output.status),
            Some(String::from_utf8_lossy(&output.stderr).trim().to_string()),
        ));
    }

    MediaInfo::from_ffprobe_json(&output.stdout).map_err(|e| match e {
        MediaError::InvalidVideo(_) => e,
        other => MediaError::probe_failed(source, other.to_string(), None),
    })
}

fn is_url(source: &str) -> bool {
    source.contains("://")
}

fn parse_num<T: std::str::FromStr>(value: &Option<String>) -> Option<T> {
    value.as_deref().and_then(|v| v.trim().parse().ok())
}

/// Parse frame rate string (e.g., "30/1" or "29.97").
fn parse_frame_rate(s: &str) -> Option<f64> {
    let rate = match s.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.parse().ok()?;
            let den: f64 = den.parse().ok()?;
            if den <= 0.0 {
                return None;
            }
            num / den
        }
        None => s.parse().ok()?,
    };
    (rate > 0.0).then_some(rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "streams": [
            { "codec_type": "video", "codec_name": "h264", "width": 1920, "height": 1080,
              "r_frame_rate": "30000/1001", "avg_frame_rate": "30000/1001", "nb_frames": "1798" },
            { "codec_type": "audio", "codec_name": "aac" }
        ],
        "format": { "format_name": "mov,mp4,m4a,3gp,3g2,mj2", "duration": "60.026",
                    "size": "1048576", "bit_rate": "139748" }
    }"#;

    #[test]
    fn test_parse_frame_rate() {
        assert!((parse_frame_rate("30/1").unwrap() - 30.0).abs() < 0.01);
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert!((parse_frame_rate("29.97").unwrap() - 29.97).abs() < 0.01);
        assert_eq!(parse_frame_rate("0/0"), None);
    }

    #[test]
    fn test_from_ffprobe_json() {
        let info = MediaInfo::from_ffprobe_json(SAMPLE.as_bytes()).unwrap();
        assert!((info.duration - 60.026).abs() < 1e-9);
        assert_eq!(info.video.frame_count, 1798);
        assert_eq!(info.video.width, 1920);
        assert_eq!(info.video.codec, "h264");
        assert!(info.has_audio);
        assert_eq!(info.size, 1_048_576);
        assert_eq!(info.raw["format"]["bit_rate"], "139748");
    }

    #[test]
    fn test_frame_count_fallback() {
        let json = r#"{
            "streams": [{ "codec_type": "video", "r_frame_rate": "25/1", "avg_frame_rate": "0/0" }],
            "format": { "duration": "10.0" }
        }"#;
        let info = MediaInfo::from_ffprobe_json(json.as_bytes()).unwrap();
        assert_eq!(info.video.frame_rate, 25.0);
        assert_eq!(info.video.frame_count, 250);
        assert!(!info.has_audio);
    }

    #[test]
    fn test_missing_video_stream() {
        let json = r#"{ "streams": [{ "codec_type": "audio" }], "format": {} }"#;
        let err = MediaInfo::from_ffprobe_json(json.as_bytes()).unwrap_err();
        assert!(matches!(err, MediaError::InvalidVideo(_)));
    }

    #[tokio::test]
    async fn test_probe_missing_file() {
        let err = probe_media("/definitely/not/here.mp4").await.unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }
}
