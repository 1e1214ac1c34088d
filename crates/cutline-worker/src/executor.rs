//! Job executor.

use std::sync::Arc;

use tokio::sync::{watch, Semaphore};
use tracing::{debug, error, info};

use cutline_media::command::cancelled;
use cutline_models::Job;

use crate::controller::{JobController, JobHandle, JobOutcome};
use crate::error::{WorkerError, WorkerResult};

/// Runs submitted jobs with bounded concurrency.
pub struct JobExecutor {
    controller: Arc<JobController>,
    job_semaphore: Arc<Semaphore>,
    shutdown: watch::Sender<bool>,
}

impl JobExecutor {
    /// Create an executor allowing the controller's `max_concurrent_jobs`.
    pub fn new(controller: JobController) -> Self {
        let permits = controller.config().max_concurrent_jobs.max(1);
        let (shutdown, _) = watch::channel(false);
        Self {
            controller: Arc::new(controller),
            job_semaphore: Arc::new(Semaphore::new(permits)),
            shutdown,
        }
    }

    /// Queue `job`. It starts once a slot is free.
    pub fn submit(&self, job: Job) -> JobHandle {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let cancel_tx = Arc::new(cancel_tx);
        let job_id = job.id.clone();

        // Shutdown cancels every job, queued or running
        let forward = {
            let cancel_tx = Arc::clone(&cancel_tx);
            let shutdown_rx = self.shutdown.subscribe();
            tokio::spawn(async move {
                cancelled(Some(shutdown_rx)).await;
                cancel_tx.send_replace(true);
            })
        };

        let controller = Arc::clone(&self.controller);
        let semaphore = Arc::clone(&self.job_semaphore);
        let task = tokio::spawn(async move {
            let result = match semaphore.acquire_owned().await {
                Ok(_permit) => {
                    debug!(job_id = %job.id, "Job slot acquired");
                    controller.run(job, cancel_rx).await
                }
                Err(_) => Err(WorkerError::internal("executor is closed")),
            };
            forward.abort();
            result
        });

        JobHandle::new(job_id, cancel_tx, task)
    }

    /// Run every job and wait for all of them, in submission order.
    pub async fn run_all(&self, jobs: Vec<Job>) -> Vec<WorkerResult<JobOutcome>> {
        info!(
            jobs = jobs.len(),
            max_concurrent = self.controller.config().max_concurrent_jobs,
            "Running jobs"
        );
        let handles: Vec<JobHandle> = jobs.into_iter().map(|job| self.submit(job)).collect();

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            let job_id = handle.job_id().clone();
            let result = handle.join().await;
            if let Err(e) = &result {
                error!(job_id = %job_id, "Job failed: {}", e);
            }
            results.push(result);
        }
        results
    }

    /// Cancel every submitted job.
    pub fn shutdown(&self) {
        info!("Shutting down executor");
        self.shutdown.send_replace(true);
    }
}
