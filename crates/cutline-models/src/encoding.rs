//! Video encoding and sprite sheet configuration.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default video codec (H.264)
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
/// Default encoding preset
pub const DEFAULT_PRESET: &str = "fast";
/// Default CRF (Constant Rate Factor)
pub const DEFAULT_CRF: u8 = 20;

/// Sprite sheet defaults
pub const DEFAULT_SPRITE_THUMBNAILS: u32 = 100;
pub const DEFAULT_SPRITE_COLUMNS: u32 = 7;
pub const DEFAULT_SPRITE_WIDTH: u32 = 178;
pub const DEFAULT_SPRITE_HEIGHT: u32 = 100;

/// Video encoding configuration for stages that re-encode.
///
/// Audio is always passed through, so only video settings live here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EncodingConfig {
    /// Video codec (e.g., "libx264", "h264_nvenc")
    #[serde(default = "default_video_codec")]
    pub codec: String,

    /// Encoding preset (e.g., "fast", "medium", "slow")
    #[serde(default = "default_preset")]
    pub preset: String,

    /// Constant Rate Factor (quality, 0-51, lower is better)
    #[serde(default = "default_crf")]
    pub crf: u8,

    /// Use hardware acceleration (NVENC)
    #[serde(default)]
    pub use_nvenc: bool,

    /// Additional FFmpeg output arguments
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_video_codec() -> String {
    DEFAULT_VIDEO_CODEC.to_string()
}
fn default_preset() -> String {
    DEFAULT_PRESET.to_string()
}
fn default_crf() -> u8 {
    DEFAULT_CRF
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            codec: DEFAULT_VIDEO_CODEC.to_string(),
            preset: DEFAULT_PRESET.to_string(),
            crf: DEFAULT_CRF,
            use_nvenc: false,
            extra_args: Vec::new(),
        }
    }
}

impl EncodingConfig {
    /// Returns a new config with updated CRF.
    pub fn with_crf(mut self, crf: u8) -> Self {
        self.crf = crf;
        self
    }

    /// Enable NVENC hardware acceleration.
    pub fn with_nvenc(mut self) -> Self {
        self.use_nvenc = true;
        self.codec = "h264_nvenc".to_string();
        self
    }

    /// Convert to FFmpeg video output arguments.
    pub fn to_ffmpeg_args(&self) -> Vec<String> {
        let mut args = vec![
            "-c:v".to_string(),
            self.codec.clone(),
            "-preset".to_string(),
            self.preset.clone(),
        ];

        // NVENC takes -cq instead of -crf
        let quality_flag = if self.use_nvenc { "-cq" } else { "-crf" };
        args.extend_from_slice(&[quality_flag.to_string(), self.crf.to_string()]);

        args.extend(self.extra_args.iter().cloned());
        args
    }
}

/// Sprite sheet layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SpriteConfig {
    /// Number of thumbnails to extract
    #[serde(default = "default_total")]
    pub total_thumbnails: u32,

    /// Tiles per row
    #[serde(default = "default_columns")]
    pub columns: u32,

    /// Thumbnail width in pixels
    #[serde(default = "default_width")]
    pub width: u32,

    /// Thumbnail height in pixels
    #[serde(default = "default_height")]
    pub height: u32,

    /// Fixed spacing between thumbnails in seconds; derived from the
    /// duration when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_secs: Option<f64>,
}

fn default_total() -> u32 {
    DEFAULT_SPRITE_THUMBNAILS
}
fn default_columns() -> u32 {
    DEFAULT_SPRITE_COLUMNS
}
fn default_width() -> u32 {
    DEFAULT_SPRITE_WIDTH
}
fn default_height() -> u32 {
    DEFAULT_SPRITE_HEIGHT
}

impl Default for SpriteConfig {
    fn default() -> Self {
        Self {
            total_thumbnails: DEFAULT_SPRITE_THUMBNAILS,
            columns: DEFAULT_SPRITE_COLUMNS,
            width: DEFAULT_SPRITE_WIDTH,
            height: DEFAULT_SPRITE_HEIGHT,
            interval_secs: None,
        }
    }
}

impl SpriteConfig {
    /// Spacing between thumbnails for a source of `duration` seconds.
    pub fn interval_for(&self, duration: f64) -> f64 {
        match self.interval_secs {
            Some(interval) if interval > 0.0 => interval,
            _ => duration / self.total_thumbnails.max(1) as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EncodingConfig::default();
        assert_eq!(config.codec, "libx264");
        assert_eq!(config.crf, DEFAULT_CRF);
    }

    #[test]
    fn test_ffmpeg_args() {
        let args = EncodingConfig::default().with_crf(23).to_ffmpeg_args();
        assert_eq!(args, vec!["-c:v", "libx264", "-preset", "fast", "-crf", "23"]);
    }

    #[test]
    fn test_nvenc_config() {
        let args = EncodingConfig::default().with_nvenc().to_ffmpeg_args();
        assert!(args.contains(&"h264_nvenc".to_string()));
        assert!(args.contains(&"-cq".to_string()));
    }

    #[test]
    fn test_sprite_interval() {
        let config = SpriteConfig::default();
        assert!((config.interval_for(200.0) - 2.0).abs() < 1e-9);

        let fixed = SpriteConfig {
            interval_secs: Some(5.0),
            ..Default::default()
        };
        assert_eq!(fixed.interval_for(200.0), 5.0);
    }
}
