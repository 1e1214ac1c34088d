//! Worker error types.

use thiserror::Error;

use cutline_media::MediaError;
use cutline_models::{JobStage, TimestampError};

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Invalid job: {0}")]
    Validation(String),

    #[error("Failed to inspect {source_name}: {error}")]
    Probe {
        source_name: String,
        #[source]
        error: MediaError,
    },

    #[error("Download of {url} failed: {message}")]
    DownloadFailed { url: String, message: String },

    #[error("Download of {url} timed out after {secs} seconds")]
    DownloadTimeout { url: String, secs: u64 },

    #[error("Trimming segment {index} failed: {error}")]
    Trim {
        index: usize,
        #[source]
        error: MediaError,
    },

    #[error("Merging segments failed: {0}")]
    Merge(#[source] MediaError),

    #[error("Applying overlays failed: {0}")]
    Composite(#[source] MediaError),

    #[error("Sprite generation failed: {0}")]
    Sprite(String),

    #[error("Job cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn sprite(msg: impl Into<String>) -> Self {
        Self::Sprite(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn probe(source: impl Into<String>, error: MediaError) -> Self {
        if error.is_cancelled() {
            return Self::Cancelled;
        }
        Self::Probe {
            source_name: source.into(),
            error,
        }
    }

    pub fn trim_failed(index: usize, error: MediaError) -> Self {
        if error.is_cancelled() {
            return Self::Cancelled;
        }
        Self::Trim { index, error }
    }

    /// Wrap an engine error in the variant for `stage`.
    pub fn stage_failed(stage: JobStage, error: MediaError) -> Self {
        if error.is_cancelled() {
            return Self::Cancelled;
        }
        match stage {
            JobStage::Merging => Self::Merge(error),
            JobStage::Compositing => Self::Composite(error),
            JobStage::GeneratingSprite => Self::Sprite(error.to_string()),
            _ => Self::Media(error),
        }
    }

    /// Map an engine error from fetching `url`.
    pub fn download_failed(url: impl Into<String>, error: MediaError) -> Self {
        let url = url.into();
        match error {
            MediaError::Cancelled => Self::Cancelled,
            MediaError::Timeout(secs) => Self::DownloadTimeout { url, secs },
            other => Self::DownloadFailed {
                url,
                message: other.to_string(),
            },
        }
    }

    /// Raised before any stage runs; callers may treat it as a bad request.
    pub fn is_validation(&self) -> bool {
        matches!(self, WorkerError::Validation(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, WorkerError::Cancelled)
    }

    /// Whether the job should abort on this error.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, WorkerError::Sprite(_))
    }
}

impl From<TimestampError> for WorkerError {
    fn from(err: TimestampError) -> Self {
        Self::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_failed_picks_variant() {
        let err = WorkerError::stage_failed(
            JobStage::Merging,
            MediaError::ffmpeg_failed("exit 1", None, Some(1)),
        );
        assert!(matches!(err, WorkerError::Merge(_)));

        let err = WorkerError::stage_failed(JobStage::Compositing, MediaError::Cancelled);
        assert!(err.is_cancelled());

        let err = WorkerError::stage_failed(JobStage::GeneratingSprite, MediaError::Timeout(3));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_download_errors_are_named() {
        let err = WorkerError::download_failed("https://x.test/a.mkv", MediaError::Timeout(600));
        assert!(matches!(err, WorkerError::DownloadTimeout { secs: 600, .. }));
        assert!(err.to_string().contains("https://x.test/a.mkv"));

        let err = WorkerError::download_failed(
            "https://x.test/a.mkv",
            MediaError::ffmpeg_failed("exit 1", Some("404 Not Found".into()), Some(1)),
        );
        assert!(matches!(err, WorkerError::DownloadFailed { .. }));
    }

    #[test]
    fn test_validation_classification() {
        let err: WorkerError = TimestampError::UnknownDuration.into();
        assert!(err.is_validation());
        assert!(err.is_fatal());
        assert!(!WorkerError::Cancelled.is_validation());
    }
}
