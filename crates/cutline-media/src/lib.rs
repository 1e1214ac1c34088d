//! FFmpeg CLI wrapper for the Cutline pipeline.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building with any number of inputs
//! - Progress parsing from `-progress pipe:2`
//! - Cancellation and timeouts, with children killed on drop
//! - FFprobe inspection
//! - Overlay chain and concat manifest builders
//! - Sprite sheet tiling via the `image` crate

pub mod command;
pub mod engine;
pub mod error;
pub mod filters;
pub mod fs_utils;
pub mod probe;
pub mod progress;
pub mod tile;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegInput, FfmpegRunner};
pub use engine::{CodecEngine, FfmpegEngine, RunOptions};
pub use error::{MediaError, MediaResult};
pub use filters::{build_overlay_chain, concat_manifest, OverlayPlacement};
pub use fs_utils::move_file;
pub use probe::{probe_media, MediaInfo, VideoStreamInfo};
pub use progress::{FfmpegProgress, MonotonicPercent, ProgressCallback};
pub use tile::{GridTiler, ImageTiler, TileLayout};
