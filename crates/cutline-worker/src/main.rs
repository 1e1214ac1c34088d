//! Editing worker binary.
//!
//! Runs every job file given on the command line and prints the outcomes
//! as JSON.

use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cutline_media::{FfmpegEngine, GridTiler};
use cutline_models::{Job, JobDescriptor};
use cutline_worker::{FanoutStatusSink, JobController, JobExecutor, TracingStatusSink, WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env().add_directive("cutline=info".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    let paths: Vec<PathBuf> = std::env::args_os().skip(1).map(PathBuf::from).collect();
    if paths.is_empty() {
        anyhow::bail!("usage: cutline-worker <job.json>...");
    }

    info!("Starting cutline-worker");

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    let mut jobs = Vec::with_capacity(paths.len());
    for path in &paths {
        let raw = tokio::fs::read(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let descriptor: JobDescriptor = serde_json::from_slice(&raw)
            .with_context(|| format!("parsing {}", path.display()))?;
        jobs.push(Job::new(descriptor));
    }

    let sink = FanoutStatusSink::new().with(Arc::new(TracingStatusSink));
    let controller = JobController::new(
        Arc::new(FfmpegEngine::new()),
        Arc::new(GridTiler::new()),
        config,
        Arc::new(sink),
    );
    let executor = Arc::new(JobExecutor::new(controller));

    // Setup signal handler
    let signal_executor = Arc::clone(&executor);
    let shutdown_handle = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal");
            signal_executor.shutdown();
        }
    });

    let results = executor.run_all(jobs).await;
    shutdown_handle.abort();

    let mut failures = 0;
    for result in results {
        match result {
            Ok(outcome) => println!("{}", serde_json::to_string(&outcome)?),
            Err(e) => {
                failures += 1;
                error!("Job error: {}", e);
            }
        }
    }

    info!("Worker shutdown complete");
    if failures > 0 {
        std::process::exit(1);
    }
    Ok(())
}
