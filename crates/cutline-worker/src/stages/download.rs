//! Download stage.
//!
//! Remote sources that are not in a directly seekable container are fetched
//! to local MP4 copies before inspection. Each distinct URL is fetched once
//! per job, into a file named after the job so concurrent jobs never share a
//! download.

use futures::future::try_join_all;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use url::Url;

use cutline_media::FfmpegCommand;
use cutline_models::{remote_url, JobEvent, JobId, JobStage, SegmentSpec};

use super::StageContext;
use crate::error::{WorkerError, WorkerResult};
use crate::segment::ResolvedSegment;

/// Container extensions the engine can seek in over HTTP.
pub const SEEKABLE_EXTENSIONS: &[&str] = &["mp4", "m4v", "mov"];

/// One remote fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetch {
    pub url: String,
    pub target: PathBuf,
}

/// Fetches needed by a job, deduplicated by URL.
#[derive(Debug, Clone, Default)]
pub struct DownloadPlan {
    fetches: Vec<Fetch>,
}

impl DownloadPlan {
    /// Work out which segment sources of job `job_id` must be fetched into
    /// `work_dir`.
    pub fn for_segments(job_id: &JobId, segments: &[SegmentSpec], work_dir: &Path) -> Self {
        let mut fetches: Vec<Fetch> = Vec::new();
        for spec in segments {
            if let Some(url) = needs_download(&spec.source) {
                let url = url.to_string();
                if !fetches.iter().any(|f| f.url == url) {
                    fetches.push(Fetch {
                        target: download_target(work_dir, job_id, &url),
                        url,
                    });
                }
            }
        }
        Self { fetches }
    }

    pub fn is_empty(&self) -> bool {
        self.fetches.is_empty()
    }

    pub fn fetches(&self) -> &[Fetch] {
        &self.fetches
    }

    /// Local targets, in fetch order.
    pub fn targets(&self) -> Vec<PathBuf> {
        self.fetches.iter().map(|f| f.target.clone()).collect()
    }

    /// Bind each segment to where the engine should read it.
    pub fn resolve(&self, segments: Vec<SegmentSpec>) -> Vec<ResolvedSegment> {
        segments
            .into_iter()
            .enumerate()
            .map(|(index, spec)| {
                let fetched = needs_download(&spec.source).and_then(|url| {
                    let url = url.to_string();
                    self.fetches.iter().find(|f| f.url == url)
                });
                let (location, downloaded) = match fetched {
                    Some(fetch) => (fetch.target.to_string_lossy().into_owned(), true),
                    None => (spec.source.clone(), false),
                };
                ResolvedSegment {
                    index,
                    spec,
                    location,
                    downloaded,
                }
            })
            .collect()
    }
}

/// Remote URL of `source` when it must be fetched first.
pub fn needs_download(source: &str) -> Option<Url> {
    let url = remote_url(source)?;
    let seekable = Path::new(url.path())
        .extension()
        .and_then(|e| e.to_str())
        .map(|ext| {
            SEEKABLE_EXTENSIONS
                .iter()
                .any(|s| s.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false);
    (!seekable).then_some(url)
}

/// `<work_dir>/<job_id>-<sha256(url)>.mp4`
pub fn download_target(work_dir: &Path, job_id: &JobId, url: &str) -> PathBuf {
    let digest = Sha256::digest(url.as_bytes());
    work_dir.join(format!("{}-{:x}.mp4", job_id, digest))
}

/// Run every fetch concurrently. Fails on the first error, which drops
/// (and kills) the remaining transfers.
pub async fn run_downloads(ctx: &StageContext, plan: &DownloadPlan) -> WorkerResult<Vec<PathBuf>> {
    info!(count = plan.fetches.len(), "Downloading remote sources");
    let transfers = plan
        .fetches
        .iter()
        .enumerate()
        .map(|(index, fetch)| download_one(ctx, index, fetch));
    try_join_all(transfers).await
}

async fn download_one(ctx: &StageContext, index: usize, fetch: &Fetch) -> WorkerResult<PathBuf> {
    // Only used for progress; a failed probe just means no percentages
    let remote_duration = match ctx.engine.probe(&fetch.url).await {
        Ok(info) if info.duration > 0.0 => Some(info.duration),
        Ok(_) => None,
        Err(e) => {
            debug!(url = %fetch.url, error = %e, "Remote duration unavailable");
            None
        }
    };

    let command = FfmpegCommand::new(&fetch.url, &fetch.target).stream_copy();
    let options = ctx.run_options_with_timeout(Some(ctx.config.download_timeout));
    let on_progress = ctx.progress_reporter(JobStage::Downloading, Some(index), move |p| {
        remote_duration.map(|total| p.percent_of_duration(total))
    });

    ctx.engine
        .run(&command, &options, on_progress)
        .await
        .map_err(|e| WorkerError::download_failed(&fetch.url, e))?;

    ctx.publisher.publish(JobEvent::indexed_progress(
        JobStage::Downloading,
        index,
        100.0,
    ));
    debug!(url = %fetch.url, target = %fetch.target.display(), "Download complete");
    Ok(fetch.target.clone())
}
