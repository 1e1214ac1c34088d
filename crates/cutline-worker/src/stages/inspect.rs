//! Inspection and window validation.

use tracing::debug;

use super::StageContext;
use crate::error::{WorkerError, WorkerResult};
use crate::segment::{ProbedSegment, ResolvedSegment};

/// Probe every segment once and resolve its trim window.
///
/// Fails on the first unreadable source or invalid window, before any
/// trimming starts.
pub async fn probe_segments(
    ctx: &StageContext,
    segments: Vec<ResolvedSegment>,
) -> WorkerResult<Vec<ProbedSegment>> {
    let mut probed = Vec::with_capacity(segments.len());
    for segment in segments {
        if ctx.is_cancelled() {
            return Err(WorkerError::Cancelled);
        }

        let info = ctx
            .engine
            .probe(&segment.location)
            .await
            .map_err(|e| WorkerError::probe(&segment.spec.source, e))?;

        let index = segment.index;
        let source = segment.spec.source.clone();
        let checked = ProbedSegment::from_probe(segment, info).map_err(|e| {
            WorkerError::validation(format!("segment {} ({}): {}", index, source, e))
        })?;

        debug!(
            index,
            start = checked.start_time(),
            end = checked.end_time(),
            probed = checked.probed_duration(),
            fps = checked.frame_rate,
            "Segment inspected"
        );
        probed.push(checked);
    }
    Ok(probed)
}
