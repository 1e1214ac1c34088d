//! Overlay stage: composite image or video layers over the base video.

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use cutline_media::filters::OVERLAY_OUTPUT_LABEL;
use cutline_media::fs_utils::{extension_of, unique_path};
use cutline_media::progress::RUNNING_CEILING;
use cutline_media::{build_overlay_chain, FfmpegCommand, OverlayPlacement};
use cutline_models::{EncodingConfig, JobEvent, JobStage, OverlaySpec};

use super::StageContext;
use crate::error::{WorkerError, WorkerResult};
use crate::temp::TempArtifactSet;

/// Command compositing `overlays` over `base` into `output`.
pub fn overlay_command(
    base: &Path,
    overlays: &[OverlaySpec],
    encoding: &EncodingConfig,
    output: &Path,
) -> FfmpegCommand {
    let placements: Vec<OverlayPlacement> = overlays.iter().map(OverlayPlacement::from).collect();

    let command = overlays
        .iter()
        .fold(FfmpegCommand::new(base, output), |cmd, overlay| {
            cmd.add_input(&overlay.source)
        });

    command
        .filter_complex(build_overlay_chain(&placements))
        .map(format!("[{}]", OVERLAY_OUTPUT_LABEL))
        .map("0:a?")
        .output_args(encoding.to_ffmpeg_args())
        .audio_codec("copy")
}

/// Composite `overlays` over `base`, returning the new file (tracked in
/// `temp`).
pub async fn apply_overlays(
    ctx: &StageContext,
    base: &Path,
    base_duration: f64,
    overlays: &[OverlaySpec],
    temp: &mut TempArtifactSet,
) -> WorkerResult<PathBuf> {
    let ext = extension_of(&base.to_string_lossy(), ".mp4");
    let output = temp.track(unique_path(&ctx.config.work_dir, &ext));
    let command = overlay_command(base, overlays, &ctx.config.encoding, &output);

    info!(overlays = overlays.len(), "Applying overlays");

    let on_progress = ctx.progress_reporter(JobStage::Compositing, None, move |p| {
        Some(p.percent_of_duration(base_duration).min(RUNNING_CEILING))
    });
    ctx.engine
        .run(&command, &ctx.run_options(), on_progress)
        .await
        .map_err(|e| WorkerError::stage_failed(JobStage::Compositing, e))?;

    ctx.publisher
        .publish(JobEvent::progress(JobStage::Compositing, 100.0));
    debug!(output = %output.display(), "Overlays applied");
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_command_layout() {
        let overlays = vec![
            OverlaySpec::new("logo.png").watermark().at(10, 10),
            OverlaySpec::new("banner.png").at(0, 600).between(5.0, 10.0),
        ];
        let cmd = overlay_command(
            Path::new("/work/base.mp4"),
            &overlays,
            &EncodingConfig::default(),
            Path::new("/work/out.mp4"),
        );

        let sources: Vec<&str> = cmd.inputs().iter().map(|i| i.source.as_str()).collect();
        assert_eq!(sources, ["/work/base.mp4", "logo.png", "banner.png"]);

        let filter = cmd.output_value("-filter_complex").unwrap();
        assert!(filter.starts_with("[0:v][1:v]overlay=x=10:y=10[v1];"));
        assert!(filter.ends_with("enable='between(t,5,10)'[vout]"));

        let args = cmd.get_output_args();
        assert!(args.windows(2).any(|w| w[0] == "-map" && w[1] == "[vout]"));
        assert!(args.windows(2).any(|w| w[0] == "-map" && w[1] == "0:a?"));
        assert_eq!(cmd.output_value("-c:v"), Some("libx264"));
        assert_eq!(cmd.output_value("-c:a"), Some("copy"));
    }

    #[test]
    fn test_watermark_has_no_time_predicate() {
        let overlays = vec![OverlaySpec::new("logo.png").watermark().between(1.0, 2.0)];
        let cmd = overlay_command(
            Path::new("base.mp4"),
            &overlays,
            &EncodingConfig::default(),
            Path::new("out.mp4"),
        );
        let filter = cmd.output_value("-filter_complex").unwrap();
        assert_eq!(filter, "[0:v][1:v]overlay=x=0:y=0[vout]");
    }
}
