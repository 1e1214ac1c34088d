//! Trim stage.

use std::path::Path;
use tracing::{debug, info};

use cutline_media::fs_utils::{extension_of, unique_path};
use cutline_media::FfmpegCommand;
use cutline_models::{JobEvent, JobStage};

use super::StageContext;
use crate::error::{WorkerError, WorkerResult};
use crate::segment::{ProbedSegment, TrimmedSegment};
use crate::temp::TempArtifactSet;

/// Stream-copy command cutting `segment` to its window.
///
/// A window covering the whole source gets no seek or duration, so the
/// output is a plain copy.
pub fn trim_command(segment: &ProbedSegment, output: &Path) -> FfmpegCommand {
    let command = FfmpegCommand::new(&segment.location, output);
    let command = if segment.window.is_full() {
        command
    } else {
        command
            .seek(segment.start_time())
            .duration(segment.new_duration())
    };
    command.stream_copy()
}

/// Overall trimming percent when segment `index` of `total` is at `percent`.
pub fn overall_percent(index: usize, total: usize, percent: f64) -> f64 {
    if total == 0 {
        return 100.0;
    }
    (index as f64 + percent.clamp(0.0, 100.0) / 100.0) / total as f64 * 100.0
}

/// Cut one segment into a fresh file under the work directory, tracked in
/// `temp`.
pub async fn trim_segment(
    ctx: &StageContext,
    segment: ProbedSegment,
    total: usize,
    temp: &mut TempArtifactSet,
) -> WorkerResult<TrimmedSegment> {
    let ext = extension_of(&segment.location, ".mp4");
    let output = temp.track(unique_path(&ctx.config.work_dir, &ext));
    let command = trim_command(&segment, &output);

    let index = segment.index;
    let new_duration = segment.new_duration();
    info!(
        index,
        start = segment.start_time(),
        duration = new_duration,
        "Trimming segment"
    );

    let on_progress = ctx.progress_reporter(JobStage::Trimming, Some(index), move |p| {
        Some(overall_percent(index, total, p.percent_of_duration(new_duration)))
    });
    ctx.engine
        .run(&command, &ctx.run_options(), on_progress)
        .await
        .map_err(|e| WorkerError::trim_failed(index, e))?;

    ctx.publisher.publish(JobEvent::indexed_progress(
        JobStage::Trimming,
        index,
        overall_percent(index, total, 100.0),
    ));
    debug!(index, output = %output.display(), "Segment trimmed");

    Ok(TrimmedSegment {
        segment,
        trimmed_path: output,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::fixtures::media_info;
    use crate::segment::ResolvedSegment;
    use cutline_models::SegmentSpec;

    fn probed(start: Option<f64>, end: Option<f64>, duration: f64) -> ProbedSegment {
        let resolved = ResolvedSegment {
            index: 0,
            spec: SegmentSpec::new("in.mkv").with_window(start, end),
            location: "in.mkv".to_string(),
            downloaded: false,
        };
        ProbedSegment::from_probe(resolved, media_info(duration, 25.0)).unwrap()
    }

    #[test]
    fn test_trim_command_seeks_before_input() {
        let cmd = trim_command(&probed(Some(5.0), Some(15.0), 60.0), Path::new("out.mkv"));
        let args = cmd.build_args();
        let ss = args.iter().position(|a| a == "-ss").unwrap();
        let t = args.iter().position(|a| a == "-t").unwrap();
        let input = args.iter().position(|a| a == "-i").unwrap();
        assert!(ss < input && t < input);
        assert_eq!(args[ss + 1].parse::<f64>().unwrap(), 5.0);
        assert_eq!(args[t + 1].parse::<f64>().unwrap(), 10.0);
        assert_eq!(cmd.output_value("-c"), Some("copy"));
    }

    #[test]
    fn test_full_window_is_plain_copy() {
        let cmd = trim_command(&probed(Some(0.0), None, 42.0), Path::new("out.mkv"));
        let args = cmd.build_args();
        assert!(!args.iter().any(|a| a == "-ss"));
        assert!(!args.iter().any(|a| a == "-t"));
        assert_eq!(cmd.output_value("-c"), Some("copy"));
    }

    #[test]
    fn test_overall_percent() {
        assert_eq!(overall_percent(0, 2, 0.0), 0.0);
        assert_eq!(overall_percent(0, 2, 100.0), 50.0);
        assert_eq!(overall_percent(1, 2, 50.0), 75.0);
        assert_eq!(overall_percent(1, 2, 250.0), 100.0);
    }
}
