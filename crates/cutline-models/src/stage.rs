//! Pipeline stages.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stage of a job run, in pipeline order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum JobStage {
    /// Job accepted, nothing has run yet
    #[default]
    Created,
    /// Fetching remote sources
    Downloading,
    /// Probing and validating trim windows
    Validating,
    /// Cutting each segment
    Trimming,
    /// Concatenating trimmed segments
    Merging,
    /// Applying overlays
    Compositing,
    /// Capturing screenshots of the output
    CapturingScreenshots,
    /// Building the sprite sheet and cue file
    GeneratingSprite,
    /// Relocating the output and cleaning up
    Finalizing,
    /// Output is in place
    Ready,
    /// Job aborted
    Failed,
}

impl JobStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStage::Created => "created",
            JobStage::Downloading => "downloading",
            JobStage::Validating => "validating",
            JobStage::Trimming => "trimming",
            JobStage::Merging => "merging",
            JobStage::Compositing => "compositing",
            JobStage::CapturingScreenshots => "capturing_screenshots",
            JobStage::GeneratingSprite => "generating_sprite",
            JobStage::Finalizing => "finalizing",
            JobStage::Ready => "ready",
            JobStage::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStage::Ready | JobStage::Failed)
    }

    /// Whether the pipeline may move from `self` to `next`.
    ///
    /// Stages only move forward; any non-terminal stage may fail.
    pub fn can_advance_to(&self, next: JobStage) -> bool {
        if self.is_terminal() {
            return false;
        }
        next == JobStage::Failed || next > *self
    }
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_names_match_as_str() {
        for stage in [
            JobStage::Created,
            JobStage::CapturingScreenshots,
            JobStage::GeneratingSprite,
            JobStage::Failed,
        ] {
            let json = serde_json::to_value(stage).unwrap();
            assert_eq!(json, stage.as_str());
        }
    }

    #[test]
    fn test_transitions() {
        assert!(JobStage::Created.can_advance_to(JobStage::Trimming));
        assert!(JobStage::Merging.can_advance_to(JobStage::Failed));
        assert!(!JobStage::Merging.can_advance_to(JobStage::Trimming));
        assert!(!JobStage::Ready.can_advance_to(JobStage::Failed));
        assert!(!JobStage::Failed.can_advance_to(JobStage::Ready));
    }
}
