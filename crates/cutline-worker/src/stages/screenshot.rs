//! Screenshot stage.

use futures::future::join_all;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info, warn};

use cutline_media::fs_utils::{remove_quietly, unique_path};
use cutline_media::progress::ignore_progress;
use cutline_media::FfmpegCommand;
use cutline_models::{JobEvent, JobStage};

use super::StageContext;
use crate::error::{WorkerError, WorkerResult};
use crate::temp::TempArtifactSet;

/// Seconds trimmed from the end so the last capture lands on a real frame.
const END_MARGIN_SECS: f64 = 2.0;

/// Capture times for `count` screenshots of a `duration`-second video.
///
/// `t_i = floor((duration - 2) / count * i)` for `i = 1..=count`.
pub fn screenshot_times(duration: f64, count: u32) -> Vec<f64> {
    if count == 0 {
        return Vec::new();
    }
    let usable = (duration - END_MARGIN_SECS).max(0.0);
    (1..=count)
        .map(|i| (usable / count as f64 * i as f64).floor())
        .collect()
}

/// Single-frame grab at `at` seconds.
pub fn screenshot_command(source: &Path, at: f64, output: &Path) -> FfmpegCommand {
    FfmpegCommand::new(source, output).seek(at).single_frame()
}

/// Capture `count` stills of `video` into the screenshot directory.
///
/// Captures run concurrently. A failed capture is logged and left out of
/// the result; cancellation fails the stage. Every capture path is tracked
/// in `temp` until the job hands it out.
pub async fn capture_screenshots(
    ctx: &StageContext,
    video: &Path,
    count: u32,
    temp: &mut TempArtifactSet,
) -> WorkerResult<Vec<PathBuf>> {
    let source = video.to_string_lossy();
    let info = ctx
        .engine
        .probe(&source)
        .await
        .map_err(|e| WorkerError::probe(source.as_ref(), e))?;

    let times = screenshot_times(info.duration, count);
    let total = times.len();
    info!(count = total, duration = info.duration, "Capturing screenshots");

    let outputs: Vec<PathBuf> = times
        .iter()
        .map(|_| temp.track(unique_path(&ctx.config.screenshot_dir, ".jpg")))
        .collect();

    let completed = AtomicUsize::new(0);
    let captures = times.iter().zip(outputs).map(|(&at, output)| {
        let completed = &completed;
        async move {
            let command = screenshot_command(video, at, &output);
            let result = ctx
                .engine
                .run(&command, &ctx.run_options(), ignore_progress())
                .await;

            let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
            ctx.publisher.publish(JobEvent::progress(
                JobStage::CapturingScreenshots,
                done as f64 / total as f64 * 100.0,
            ));

            match result {
                Ok(()) => {
                    debug!(at, output = %output.display(), "Screenshot captured");
                    Ok(Some(output))
                }
                Err(e) => {
                    remove_quietly(&output).await;
                    if e.is_cancelled() {
                        return Err(WorkerError::Cancelled);
                    }
                    warn!(at, error = %e, "Screenshot capture failed");
                    Ok(None)
                }
            }
        }
    });

    let mut files = Vec::with_capacity(total);
    for result in join_all(captures).await {
        if let Some(path) = result? {
            files.push(path);
        }
    }
    Ok(files)
}
