//! Status events published while a job runs.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::JobStage;

/// Progress of one stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StageProgress {
    pub stage: JobStage,

    /// Segment or download index, for per-item stages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,

    /// Percent complete (0-100)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent: Option<f64>,
}

impl StageProgress {
    pub fn entered(stage: JobStage) -> Self {
        Self {
            stage,
            index: None,
            percent: None,
        }
    }

    pub fn percent(stage: JobStage, percent: f64) -> Self {
        Self {
            stage,
            index: None,
            percent: Some(percent.clamp(0.0, 100.0)),
        }
    }

    pub fn indexed(stage: JobStage, index: usize, percent: f64) -> Self {
        Self {
            stage,
            index: Some(index),
            percent: Some(percent.clamp(0.0, 100.0)),
        }
    }
}

/// Sprite sheet produced for a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SpriteOutput {
    /// Tiled image
    pub image: PathBuf,
    /// WebVTT cue file
    pub cues: PathBuf,
    /// Thumbnails actually tiled
    pub thumbnails: usize,
}

/// Event published to a status sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobEvent {
    /// Stage entered or progressed
    Status(StageProgress),

    /// Screenshots captured, in timestamp order
    Screenshots { files: Vec<PathBuf> },

    /// Sprite sheet generated
    Sprite(SpriteOutput),

    /// Non-fatal problem; the job continues
    Warning {
        stage: JobStage,
        message: String,
    },

    /// Output relocated; terminal
    Ready {
        output: PathBuf,
        #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
        meta: serde_json::Value,
        timestamp: DateTime<Utc>,
    },

    /// Job aborted; terminal
    Failed {
        stage: JobStage,
        error: String,
        #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
        meta: serde_json::Value,
        timestamp: DateTime<Utc>,
    },
}

impl JobEvent {
    pub fn status(stage: JobStage) -> Self {
        Self::Status(StageProgress::entered(stage))
    }

    pub fn progress(stage: JobStage, percent: f64) -> Self {
        Self::Status(StageProgress::percent(stage, percent))
    }

    pub fn indexed_progress(stage: JobStage, index: usize, percent: f64) -> Self {
        Self::Status(StageProgress::indexed(stage, index, percent))
    }

    pub fn warning(stage: JobStage, message: impl Into<String>) -> Self {
        Self::Warning {
            stage,
            message: message.into(),
        }
    }

    pub fn ready(output: PathBuf, meta: serde_json::Value) -> Self {
        Self::Ready {
            output,
            meta,
            timestamp: Utc::now(),
        }
    }

    pub fn failed(stage: JobStage, error: impl Into<String>, meta: serde_json::Value) -> Self {
        Self::Failed {
            stage,
            error: error.into(),
            meta,
            timestamp: Utc::now(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ready { .. } | Self::Failed { .. })
    }

    /// Stage this event belongs to, if any.
    pub fn stage(&self) -> Option<JobStage> {
        match self {
            Self::Status(p) => Some(p.stage),
            Self::Screenshots { .. } => Some(JobStage::CapturingScreenshots),
            Self::Sprite(_) => Some(JobStage::GeneratingSprite),
            Self::Warning { stage, .. } | Self::Failed { stage, .. } => Some(*stage),
            Self::Ready { .. } => Some(JobStage::Ready),
        }
    }
}
