//! Pipeline stages.
//!
//! Each stage consumes the previous step's artifacts and returns new ones.
//! Stages publish progress through the job's [`StatusPublisher`] and run the
//! engine with the job's cancellation signal.

pub mod download;
pub mod inspect;
pub mod merge;
pub mod overlay;
pub mod screenshot;
pub mod sprite;
pub mod trim;

use std::sync::Arc;
use std::time::Duration;

use cutline_media::{CodecEngine, FfmpegProgress, ImageTiler, ProgressCallback, RunOptions};
use cutline_models::{JobEvent, JobStage};
use tokio::sync::watch;

use crate::config::WorkerConfig;
use crate::status::StatusPublisher;

/// Everything a stage needs from the job run.
#[derive(Clone)]
pub struct StageContext {
    pub engine: Arc<dyn CodecEngine>,
    pub tiler: Arc<dyn ImageTiler>,
    pub config: Arc<WorkerConfig>,
    pub publisher: StatusPublisher,
    pub cancel: watch::Receiver<bool>,
}

impl StageContext {
    /// Options for an engine call bounded by the stage timeout.
    pub fn run_options(&self) -> RunOptions {
        self.run_options_with_timeout(self.config.stage_timeout)
    }

    pub fn run_options_with_timeout(&self, timeout: Option<Duration>) -> RunOptions {
        RunOptions::new()
            .with_cancel(self.cancel.clone())
            .with_timeout(timeout)
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// Callback publishing `percent` of `stage` as computed by `to_percent`.
    pub fn progress_reporter<F>(&self, stage: JobStage, index: Option<usize>, to_percent: F) -> ProgressCallback
    where
        F: Fn(&FfmpegProgress) -> Option<f64> + Send + Sync + 'static,
    {
        let publisher = self.publisher.clone();
        Box::new(move |progress: FfmpegProgress| {
            if let Some(percent) = to_percent(&progress) {
                let event = match index {
                    Some(i) => JobEvent::indexed_progress(stage, i, percent),
                    None => JobEvent::progress(stage, percent),
                };
                publisher.publish(event);
            }
        })
    }
}
