//! Merge stage: concatenate trimmed segments in order.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use cutline_media::filters::concat_manifest;
use cutline_media::fs_utils::{extension_of, unique_path};
use cutline_media::{FfmpegCommand, MonotonicPercent};
use cutline_models::{JobEvent, JobStage};

use super::StageContext;
use crate::error::{WorkerError, WorkerResult};
use crate::segment::TrimmedSegment;
use crate::temp::TempArtifactSet;

/// Frames expected in the merged output.
pub fn total_expected_frames(segments: &[TrimmedSegment]) -> f64 {
    segments.iter().map(|s| s.segment.expected_frames()).sum()
}

/// Concat demuxer command reading `manifest` into `output`.
pub fn merge_command(manifest: &Path, output: &Path) -> FfmpegCommand {
    FfmpegCommand::new(manifest, output)
        .input_args(["-f", "concat", "-safe", "0"])
        .stream_copy()
}

/// Concatenate `segments` into one file under the work directory.
///
/// The manifest and the output are tracked in `temp`; the manifest is
/// released before returning.
pub async fn merge_segments(
    ctx: &StageContext,
    segments: &[TrimmedSegment],
    temp: &mut TempArtifactSet,
) -> WorkerResult<PathBuf> {
    let work_dir = &ctx.config.work_dir;
    let paths: Vec<&Path> = segments.iter().map(|s| s.trimmed_path.as_path()).collect();

    let manifest = temp.track(unique_path(work_dir, ".txt"));
    tokio::fs::write(&manifest, concat_manifest(&paths)).await?;

    let ext = segments
        .first()
        .map(|s| extension_of(&s.trimmed_path.to_string_lossy(), ".mp4"))
        .unwrap_or_else(|| ".mp4".to_string());
    let output = temp.track(unique_path(work_dir, &ext));

    let total_frames = total_expected_frames(segments);
    info!(segments = segments.len(), total_frames, "Merging segments");

    let tracker = Arc::new(Mutex::new(MonotonicPercent::new()));
    let running = Arc::clone(&tracker);
    let on_progress = ctx.progress_reporter(JobStage::Merging, None, move |p| {
        let percent = p.percent_of_frames(total_frames);
        running.lock().ok().and_then(|mut m| m.advance(percent))
    });

    ctx.engine
        .run(&merge_command(&manifest, &output), &ctx.run_options(), on_progress)
        .await
        .map_err(|e| WorkerError::stage_failed(JobStage::Merging, e))?;

    if let Some(done) = tracker.lock().ok().and_then(|mut m| m.finish()) {
        ctx.publisher.publish(JobEvent::progress(JobStage::Merging, done));
    }
    temp.release(&manifest).await;

    debug!(output = %output.display(), "Segments merged");
    Ok(output)
}
