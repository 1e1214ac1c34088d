//! Job controller.
//!
//! Drives one job through the stage sequence
//! `created -> downloading -> validating -> trimming -> merging ->
//! compositing -> capturing_screenshots -> generating_sprite -> finalizing ->
//! ready`, skipping stages the job does not need. Any error moves the job to
//! `failed` after removing its intermediate files.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::Instrument;

use cutline_media::fs_utils::extension_of;
use cutline_media::{move_file, CodecEngine, ImageTiler};
use cutline_models::{Job, JobDescriptor, JobEvent, JobId, JobStage, SpriteOutput};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::stages::download::{run_downloads, DownloadPlan};
use crate::stages::inspect::probe_segments;
use crate::stages::merge::merge_segments;
use crate::stages::overlay::apply_overlays;
use crate::stages::screenshot::capture_screenshots;
use crate::stages::sprite::generate_sprite;
use crate::stages::trim::trim_segment;
use crate::stages::StageContext;
use crate::status::{StatusPublisher, StatusSink};
use crate::temp::TempArtifactSet;

/// Result of a completed job.
#[derive(Debug, Clone, Serialize)]
pub struct JobOutcome {
    pub job_id: JobId,
    /// Final video in the output directory
    pub output: PathBuf,
    /// Captured stills, in timestamp order
    pub screenshots: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sprite: Option<SpriteOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub meta: serde_json::Value,
    pub completed_at: DateTime<Utc>,
}

/// Handle to a running job.
pub struct JobHandle {
    job_id: JobId,
    cancel: Arc<watch::Sender<bool>>,
    task: JoinHandle<WorkerResult<JobOutcome>>,
}

impl JobHandle {
    pub(crate) fn new(
        job_id: JobId,
        cancel: Arc<watch::Sender<bool>>,
        task: JoinHandle<WorkerResult<JobOutcome>>,
    ) -> Self {
        Self {
            job_id,
            cancel,
            task,
        }
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Stop the job. Running engine processes are killed and the job fails
    /// with [`WorkerError::Cancelled`].
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    /// Wait for the job to finish.
    pub async fn join(self) -> WorkerResult<JobOutcome> {
        self.task
            .await
            .map_err(|e| WorkerError::internal(format!("job task failed: {}", e)))?
    }
}

/// Check a descriptor before any stage runs.
pub fn validate_descriptor(descriptor: &JobDescriptor) -> WorkerResult<()> {
    if descriptor.videos.is_empty() {
        return Err(WorkerError::validation("job has no videos"));
    }
    if let Some(i) = descriptor.videos.iter().position(|v| v.source.trim().is_empty()) {
        return Err(WorkerError::validation(format!("video {} has no source", i)));
    }
    if let Some(i) = descriptor.overlays.iter().position(|o| o.source.trim().is_empty()) {
        return Err(WorkerError::validation(format!("overlay {} has no source", i)));
    }
    if descriptor.screenshots && descriptor.screenshot_count == Some(0) {
        return Err(WorkerError::validation("screenshot count must be positive"));
    }
    Ok(())
}

/// Current stage of a run; publishes every transition.
struct StageTracker {
    current: JobStage,
    publisher: StatusPublisher,
    logger: JobLogger,
    cancel: watch::Receiver<bool>,
}

impl StageTracker {
    fn new(publisher: StatusPublisher, logger: JobLogger, cancel: watch::Receiver<bool>) -> Self {
        Self {
            current: JobStage::Created,
            publisher,
            logger,
            cancel,
        }
    }

    fn current(&self) -> JobStage {
        self.current
    }

    fn check_cancelled(&self) -> WorkerResult<()> {
        if *self.cancel.borrow() {
            return Err(WorkerError::Cancelled);
        }
        Ok(())
    }

    fn advance(&mut self, next: JobStage) -> WorkerResult<()> {
        self.check_cancelled()?;
        if !self.current.can_advance_to(next) {
            return Err(WorkerError::internal(format!(
                "illegal stage transition {} -> {}",
                self.current, next
            )));
        }
        self.current = next;
        self.logger.log_stage(next);
        self.publisher.publish(JobEvent::status(next));
        Ok(())
    }
}

/// Runs jobs against a codec engine, image tiler and status sink.
pub struct JobController {
    engine: Arc<dyn CodecEngine>,
    tiler: Arc<dyn ImageTiler>,
    config: Arc<WorkerConfig>,
    sink: Arc<dyn StatusSink>,
}

impl JobController {
    pub fn new(
        engine: Arc<dyn CodecEngine>,
        tiler: Arc<dyn ImageTiler>,
        config: WorkerConfig,
        sink: Arc<dyn StatusSink>,
    ) -> Self {
        Self {
            engine,
            tiler,
            config: Arc::new(config),
            sink,
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Run `job` on its own task.
    pub fn spawn(self: &Arc<Self>, job: Job) -> JobHandle {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let job_id = job.id.clone();
        let controller = Arc::clone(self);
        let task = tokio::spawn(async move { controller.run(job, cancel_rx).await });
        JobHandle::new(job_id, Arc::new(cancel_tx), task)
    }

    /// Run `job` to completion on the current task.
    ///
    /// Exactly one terminal event (`ready` or `failed`) is published.
    pub async fn run(&self, job: Job, cancel: watch::Receiver<bool>) -> WorkerResult<JobOutcome> {
        let logger = JobLogger::new(&job.id, "edit");
        let span = logger.create_span();
        self.execute(job, cancel, logger).instrument(span).await
    }

    async fn execute(
        &self,
        job: Job,
        cancel: watch::Receiver<bool>,
        logger: JobLogger,
    ) -> WorkerResult<JobOutcome> {
        let publisher = StatusPublisher::new(job.id.clone(), Arc::clone(&self.sink));
        let ctx = StageContext {
            engine: Arc::clone(&self.engine),
            tiler: Arc::clone(&self.tiler),
            config: Arc::clone(&self.config),
            publisher: publisher.clone(),
            cancel: cancel.clone(),
        };
        let mut tracker = StageTracker::new(publisher.clone(), logger.clone(), cancel);
        let mut temp = TempArtifactSet::new();

        match self
            .pipeline(&job, &ctx, &mut tracker, &mut temp, &logger)
            .await
        {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                temp.cleanup_all().await;
                let stage = tracker.current();
                logger.log_error(stage, &e.to_string());
                publisher.publish(JobEvent::failed(
                    stage,
                    e.to_string(),
                    job.descriptor.meta.clone(),
                ));
                Err(e)
            }
        }
    }

    async fn pipeline(
        &self,
        job: &Job,
        ctx: &StageContext,
        tracker: &mut StageTracker,
        temp: &mut TempArtifactSet,
        logger: &JobLogger,
    ) -> WorkerResult<JobOutcome> {
        let descriptor = &job.descriptor;
        validate_descriptor(descriptor)?;
        self.config.ensure_dirs().await?;
        logger.log_start(descriptor.videos.len(), descriptor.overlays.len());

        let plan = DownloadPlan::for_segments(&job.id, &descriptor.videos, &self.config.work_dir);
        let downloads = plan.targets();
        if !plan.is_empty() {
            tracker.advance(JobStage::Downloading)?;
            for target in &downloads {
                temp.track(target);
            }
            run_downloads(ctx, &plan).await?;
        }

        tracker.advance(JobStage::Validating)?;
        let probed = probe_segments(ctx, plan.resolve(descriptor.videos.clone())).await?;

        tracker.advance(JobStage::Trimming)?;
        let total = probed.len();
        let mut trimmed = Vec::with_capacity(total);
        for segment in probed {
            tracker.check_cancelled()?;
            trimmed.push(trim_segment(ctx, segment, total, temp).await?);
        }
        temp.release_all(&downloads).await;

        let (mut current, duration) = if trimmed.len() > 1 {
            tracker.advance(JobStage::Merging)?;
            let merged = merge_segments(ctx, &trimmed, temp).await?;
            let cuts: Vec<PathBuf> = trimmed.iter().map(|t| t.trimmed_path.clone()).collect();
            temp.release_all(&cuts).await;
            let duration: f64 = trimmed.iter().map(|t| t.segment.new_duration()).sum();
            (merged, duration)
        } else {
            let only = trimmed
                .into_iter()
                .next()
                .ok_or_else(|| WorkerError::internal("no segments were trimmed"))?;
            let duration = only.segment.new_duration();
            (only.trimmed_path, duration)
        };

        if !descriptor.overlays.is_empty() {
            tracker.advance(JobStage::Compositing)?;
            let composited =
                apply_overlays(ctx, &current, duration, &descriptor.overlays, temp).await?;
            temp.release(&current).await;
            current = composited;
        }

        // Files handed to the caller alongside the video
        let mut deliverables: Vec<PathBuf> = Vec::new();

        let mut screenshots = Vec::new();
        if descriptor.screenshots {
            tracker.advance(JobStage::CapturingScreenshots)?;
            let count = descriptor.screenshot_count_or(self.config.default_screenshot_count);
            screenshots = capture_screenshots(ctx, &current, count, temp).await?;
            deliverables.extend(screenshots.iter().cloned());
            ctx.publisher.publish(JobEvent::Screenshots {
                files: screenshots.clone(),
            });
        }

        let mut sprite = None;
        if descriptor.sprite {
            tracker.advance(JobStage::GeneratingSprite)?;
            match generate_sprite(ctx, &current, temp).await {
                Ok(output) => {
                    deliverables.push(output.image.clone());
                    deliverables.push(output.cues.clone());
                    ctx.publisher.publish(JobEvent::Sprite(output.clone()));
                    sprite = Some(output);
                }
                Err(e) if !e.is_fatal() => {
                    let message = e.to_string();
                    logger.log_warning(JobStage::GeneratingSprite, &message);
                    ctx.publisher
                        .publish(JobEvent::warning(JobStage::GeneratingSprite, message));
                }
                Err(e) => return Err(e),
            }
        }

        tracker.advance(JobStage::Finalizing)?;
        let output = self.finalize(&job.id, &current, &deliverables, temp).await?;

        // Past this point the output is in place; the job cannot fail.
        tracker.current = JobStage::Ready;
        logger.log_completion(&output);
        ctx.publisher.publish(JobEvent::ready(
            output.clone(),
            descriptor.meta.clone(),
        ));

        Ok(JobOutcome {
            job_id: job.id.clone(),
            output,
            screenshots,
            sprite,
            name: descriptor.name.clone(),
            meta: descriptor.meta.clone(),
            completed_at: Utc::now(),
        })
    }

    /// Move the last artifact to `<output_dir>/<job_id><ext>`, keep the
    /// `deliverables` and drop every other intermediate file.
    async fn finalize(
        &self,
        job_id: &JobId,
        current: &Path,
        deliverables: &[PathBuf],
        temp: &mut TempArtifactSet,
    ) -> WorkerResult<PathBuf> {
        let ext = extension_of(&current.to_string_lossy(), ".mp4");
        let output = self.config.output_dir.join(format!("{}{}", job_id, ext));
        move_file(current, &output).await?;
        temp.untrack(current);
        for path in deliverables {
            temp.untrack(path);
        }
        temp.cleanup_all().await;
        Ok(output)
    }
}
