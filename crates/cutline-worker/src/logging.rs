//! Structured job logging.
//!
//! Every line carries the job ID and operation so a single run can be
//! followed through interleaved output from concurrent jobs.

use std::path::Path;
use tracing::{debug, error, info, warn, Span};

use cutline_models::{JobId, JobStage};

/// Per-job logger with consistent fields.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    operation: String,
}

impl JobLogger {
    pub fn new(job_id: &JobId, operation: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn log_start(&self, segments: usize, overlays: usize) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            segments,
            overlays,
            "Job started"
        );
    }

    pub fn log_stage(&self, stage: JobStage) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            stage = stage.as_str(),
            "Stage entered"
        );
    }

    pub fn log_progress(&self, stage: JobStage, index: Option<usize>, percent: f64) {
        debug!(
            job_id = %self.job_id,
            stage = stage.as_str(),
            index = ?index,
            percent = format_args!("{:.1}", percent),
            "Stage progress"
        );
    }

    pub fn log_warning(&self, stage: JobStage, message: &str) {
        warn!(
            job_id = %self.job_id,
            operation = %self.operation,
            stage = stage.as_str(),
            "Job warning: {}", message
        );
    }

    pub fn log_error(&self, stage: JobStage, message: &str) {
        error!(
            job_id = %self.job_id,
            operation = %self.operation,
            stage = stage.as_str(),
            "Job failed: {}", message
        );
    }

    pub fn log_completion(&self, output: &Path) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            output = %output.display(),
            "Job completed"
        );
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Span wrapping the whole run.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "job",
            job_id = %self.job_id,
            operation = %self.operation
        )
    }
}
