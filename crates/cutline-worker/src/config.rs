//! Worker configuration.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use cutline_models::{EncodingConfig, SpriteConfig, DEFAULT_SCREENSHOT_COUNT};

use crate::error::{WorkerError, WorkerResult};

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Directory for intermediate files
    pub work_dir: PathBuf,
    /// Directory receiving final outputs
    pub output_dir: PathBuf,
    /// Directory receiving screenshots and sprite sheets
    pub screenshot_dir: PathBuf,
    /// Maximum concurrent jobs
    pub max_concurrent_jobs: usize,
    /// Deadline for each download
    pub download_timeout: Duration,
    /// Deadline for each other engine invocation
    pub stage_timeout: Option<Duration>,
    /// Settings for stages that re-encode
    pub encoding: EncodingConfig,
    /// Sprite sheet layout
    pub sprite: SpriteConfig,
    /// Screenshots taken when a job asks for them without a count
    pub default_screenshot_count: u32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("./tmp"),
            output_dir: PathBuf::from("./output"),
            screenshot_dir: PathBuf::from("./screenshots"),
            max_concurrent_jobs: 2,
            download_timeout: Duration::from_secs(600),
            stage_timeout: None,
            encoding: EncodingConfig::default(),
            sprite: SpriteConfig::default(),
            default_screenshot_count: DEFAULT_SCREENSHOT_COUNT,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from any key lookup, falling back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let path = |key: &str, default: PathBuf| lookup(key).map(PathBuf::from).unwrap_or(default);

        let encoding = EncodingConfig {
            codec: lookup("CUTLINE_VIDEO_CODEC").unwrap_or(defaults.encoding.codec.clone()),
            preset: lookup("CUTLINE_PRESET").unwrap_or(defaults.encoding.preset.clone()),
            crf: parse_key(&lookup, "CUTLINE_CRF").unwrap_or(defaults.encoding.crf),
            use_nvenc: parse_key(&lookup, "CUTLINE_USE_NVENC").unwrap_or(false),
            ..defaults.encoding.clone()
        };

        let sprite = SpriteConfig {
            total_thumbnails: parse_key(&lookup, "CUTLINE_SPRITE_THUMBNAILS")
                .unwrap_or(defaults.sprite.total_thumbnails),
            columns: parse_key(&lookup, "CUTLINE_SPRITE_COLUMNS").unwrap_or(defaults.sprite.columns),
            width: parse_key(&lookup, "CUTLINE_SPRITE_WIDTH").unwrap_or(defaults.sprite.width),
            height: parse_key(&lookup, "CUTLINE_SPRITE_HEIGHT").unwrap_or(defaults.sprite.height),
            interval_secs: parse_key(&lookup, "CUTLINE_SPRITE_INTERVAL_SECS"),
        };

        Self {
            work_dir: path("CUTLINE_WORK_DIR", defaults.work_dir),
            output_dir: path("CUTLINE_OUTPUT_DIR", defaults.output_dir),
            screenshot_dir: path("CUTLINE_SCREENSHOT_DIR", defaults.screenshot_dir),
            max_concurrent_jobs: parse_key(&lookup, "CUTLINE_MAX_JOBS")
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.max_concurrent_jobs),
            download_timeout: parse_key(&lookup, "CUTLINE_DOWNLOAD_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.download_timeout),
            stage_timeout: parse_key(&lookup, "CUTLINE_STAGE_TIMEOUT_SECS")
                .filter(|secs: &u64| *secs > 0)
                .map(Duration::from_secs),
            encoding,
            sprite,
            default_screenshot_count: parse_key(&lookup, "CUTLINE_SCREENSHOT_COUNT")
                .unwrap_or(defaults.default_screenshot_count),
        }
    }

    /// Put every directory under a common root.
    pub fn rooted_at(root: &Path) -> Self {
        Self {
            work_dir: root.join("tmp"),
            output_dir: root.join("output"),
            screenshot_dir: root.join("screenshots"),
            ..Self::default()
        }
    }

    /// Create the working directories.
    pub async fn ensure_dirs(&self) -> WorkerResult<()> {
        for dir in [&self.work_dir, &self.output_dir, &self.screenshot_dir] {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                WorkerError::validation(format!("cannot create {}: {}", dir.display(), e))
            })?;
        }
        Ok(())
    }
}

fn parse_key<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key).and_then(|raw| raw.trim().parse().ok())
}
