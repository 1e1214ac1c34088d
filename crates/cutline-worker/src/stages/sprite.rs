//! Sprite sheet stage.
//!
//! Thumbnails are sampled at a fixed interval into a scratch directory,
//! tiled row-major into one JPEG, and described by a WebVTT cue sheet whose
//! payloads point at each tile (`sprite.jpg#xywh=x,y,w,h`).

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use cutline_media::filters::thumbnail_filter;
use cutline_media::{FfmpegCommand, TileLayout};
use cutline_models::{format_timecode, JobStage, SpriteConfig, SpriteOutput};

use super::StageContext;
use crate::error::{WorkerError, WorkerResult};
use crate::temp::TempArtifactSet;

const THUMBNAIL_PATTERN: &str = "thumb_%04d.jpg";

fn thumbnail_path(dir: &Path, i: usize) -> PathBuf {
    dir.join(format!("thumb_{:04}.jpg", i))
}

/// Extraction command writing `thumb_0000.jpg`, `thumb_0001.jpg`, ... into
/// `dir`.
pub fn thumbnail_command(video: &Path, dir: &Path, interval: f64, config: &SpriteConfig) -> FfmpegCommand {
    FfmpegCommand::new(video, dir.join(THUMBNAIL_PATTERN))
        .video_filter(thumbnail_filter(interval, config.width, config.height))
        .frames(config.total_thumbnails)
        .output_args(["-start_number", "0"])
}

/// WebVTT cues for tiled thumbnails.
///
/// `thumbnails[k]` is the source index of the thumbnail at tile `k`; its cue
/// covers `[i * interval, (i + 1) * interval)`.
pub fn build_cue_sheet(thumbnails: &[usize], interval: f64, layout: TileLayout, sprite_name: &str) -> String {
    let mut vtt = String::from("WEBVTT\n\n");
    for (k, &i) in thumbnails.iter().enumerate() {
        let (x, y) = layout.origin(k);
        let start = i as f64 * interval;
        let end = (i + 1) as f64 * interval;
        let _ = write!(
            vtt,
            "{}\n{} --> {}\n{}#xywh={},{},{},{}\n\n",
            k + 1,
            format_timecode(start),
            format_timecode(end),
            sprite_name,
            x,
            y,
            layout.tile_width,
            layout.tile_height
        );
    }
    vtt
}

/// Build the sprite sheet and cue file for `video`.
///
/// Both files are tracked in `temp`; a failed stage leaves them for cleanup.
pub async fn generate_sprite(
    ctx: &StageContext,
    video: &Path,
    temp: &mut TempArtifactSet,
) -> WorkerResult<SpriteOutput> {
    let config = &ctx.config.sprite;
    let failed = |e| WorkerError::stage_failed(JobStage::GeneratingSprite, e);

    let info = ctx
        .engine
        .probe(&video.to_string_lossy())
        .await
        .map_err(failed)?;
    let interval = config.interval_for(info.duration);
    if interval.is_nan() || interval <= 0.0 {
        return Err(WorkerError::sprite(format!(
            "cannot sample thumbnails from a {:.3}s video",
            info.duration
        )));
    }

    let scratch = tempfile::Builder::new()
        .prefix("sprite-")
        .tempdir_in(&ctx.config.work_dir)
        .map_err(|e| WorkerError::sprite(format!("scratch directory: {}", e)))?;

    info!(
        thumbnails = config.total_thumbnails,
        interval, "Extracting sprite thumbnails"
    );
    let duration = info.duration;
    let on_progress = ctx.progress_reporter(JobStage::GeneratingSprite, None, move |p| {
        Some(p.percent_of_duration(duration))
    });
    ctx.engine
        .run(
            &thumbnail_command(video, scratch.path(), interval, config),
            &ctx.run_options(),
            on_progress,
        )
        .await
        .map_err(failed)?;

    let present: Vec<usize> = (0..config.total_thumbnails as usize)
        .filter(|&i| thumbnail_path(scratch.path(), i).is_file())
        .collect();
    if present.is_empty() {
        return Err(WorkerError::sprite("no thumbnails were extracted"));
    }
    let images: Vec<PathBuf> = present
        .iter()
        .map(|&i| thumbnail_path(scratch.path(), i))
        .collect();

    let job_id = ctx.publisher.job_id();
    let layout = TileLayout::from(config);
    let image_path = ctx.config.screenshot_dir.join(format!("{}-sprite.jpg", job_id));
    let cues_path = ctx.config.screenshot_dir.join(format!("{}-sprite.vtt", job_id));

    temp.track(&image_path);
    temp.track(&cues_path);
    let image = ctx
        .tiler
        .tile(&images, layout, &image_path)
        .await
        .map_err(failed)?;

    let sprite_name = image
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    tokio::fs::write(&cues_path, build_cue_sheet(&present, interval, layout, &sprite_name))
        .await
        .map_err(|e| WorkerError::sprite(format!("writing cue sheet: {}", e)))?;

    debug!(
        image = %image.display(),
        cues = %cues_path.display(),
        tiles = present.len(),
        "Sprite generated"
    );
    Ok(SpriteOutput {
        image,
        cues: cues_path,
        thumbnails: present.len(),
    })
}
