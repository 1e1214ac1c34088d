//! Status sinks.
//!
//! The pipeline pushes [`JobEvent`]s to a caller-supplied sink. Publishing
//! never blocks and never fails the job.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use cutline_models::{JobEvent, JobId};

/// Receiver of job events.
pub trait StatusSink: Send + Sync {
    fn publish(&self, job_id: &JobId, event: JobEvent);
}

/// Writes events to the log.
#[derive(Debug, Clone, Default)]
pub struct TracingStatusSink;

impl StatusSink for TracingStatusSink {
    fn publish(&self, job_id: &JobId, event: JobEvent) {
        match &event {
            JobEvent::Status(progress) => debug!(
                job_id = %job_id,
                stage = progress.stage.as_str(),
                index = ?progress.index,
                percent = ?progress.percent,
                "status"
            ),
            JobEvent::Warning { stage, message } => warn!(
                job_id = %job_id,
                stage = stage.as_str(),
                "warning: {}", message
            ),
            JobEvent::Failed { stage, error, .. } => warn!(
                job_id = %job_id,
                stage = stage.as_str(),
                "failed: {}", error
            ),
            other => info!(
                job_id = %job_id,
                event = %serde_json::to_string(other).unwrap_or_default(),
                "event"
            ),
        }
    }
}

/// Forwards events into an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelStatusSink {
    tx: mpsc::UnboundedSender<(JobId, JobEvent)>,
}

impl ChannelStatusSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(JobId, JobEvent)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl StatusSink for ChannelStatusSink {
    fn publish(&self, job_id: &JobId, event: JobEvent) {
        // A dropped receiver just means nobody is listening
        let _ = self.tx.send((job_id.clone(), event));
    }
}

/// Delivers each event to several sinks.
#[derive(Clone, Default)]
pub struct FanoutStatusSink {
    sinks: Vec<Arc<dyn StatusSink>>,
}

impl FanoutStatusSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn StatusSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl StatusSink for FanoutStatusSink {
    fn publish(&self, job_id: &JobId, event: JobEvent) {
        for sink in &self.sinks {
            sink.publish(job_id, event.clone());
        }
    }
}

/// Sink bound to one job, cheap to clone into progress callbacks.
#[derive(Clone)]
pub struct StatusPublisher {
    job_id: JobId,
    sink: Arc<dyn StatusSink>,
}

impl StatusPublisher {
    pub fn new(job_id: JobId, sink: Arc<dyn StatusSink>) -> Self {
        Self { job_id, sink }
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    pub fn publish(&self, event: JobEvent) {
        self.sink.publish(&self.job_id, event);
    }
}
