//! Codec engine abstraction.
//!
//! Stages talk to FFmpeg only through [`CodecEngine`], so a scripted engine
//! can stand in for the real binaries.

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::watch;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;
use crate::probe::{probe_media, MediaInfo};
use crate::progress::ProgressCallback;

/// Per-invocation controls.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Job cancellation signal
    pub cancel: Option<watch::Receiver<bool>>,
    /// Deadline for the invocation
    pub timeout: Option<Duration>,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Whether cancellation has already been signalled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|rx| *rx.borrow())
    }
}

/// Something that can inspect media and execute transcode commands.
#[async_trait]
pub trait CodecEngine: Send + Sync {
    /// Inspect a local path or URL.
    async fn probe(&self, source: &str) -> MediaResult<MediaInfo>;

    /// Execute a command, reporting progress until it finishes.
    async fn run(
        &self,
        command: &FfmpegCommand,
        options: &RunOptions,
        on_progress: ProgressCallback,
    ) -> MediaResult<()>;
}

/// Engine backed by the `ffmpeg` and `ffprobe` binaries on PATH.
#[derive(Debug, Clone, Default)]
pub struct FfmpegEngine;

impl FfmpegEngine {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CodecEngine for FfmpegEngine {
    async fn probe(&self, source: &str) -> MediaResult<MediaInfo> {
        probe_media(source).await
    }

    async fn run(
        &self,
        command: &FfmpegCommand,
        options: &RunOptions,
        on_progress: ProgressCallback,
    ) -> MediaResult<()> {
        let mut runner = FfmpegRunner::new();
        if let Some(cancel) = options.cancel.clone() {
            runner = runner.with_cancel(cancel);
        }
        if let Some(timeout) = options.timeout {
            runner = runner.with_timeout(timeout);
        }
        runner.run_with_progress(command, on_progress).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_options() {
        let (tx, rx) = watch::channel(false);
        let options = RunOptions::new()
            .with_cancel(rx)
            .with_timeout(Some(Duration::from_secs(5)));
        assert!(!options.is_cancelled());
        tx.send(true).unwrap();
        assert!(options.is_cancelled());
        assert_eq!(options.timeout, Some(Duration::from_secs(5)));
    }

    #[tokio::test]
    async fn test_engine_respects_prior_cancellation() {
        let (_tx, rx) = watch::channel(true);
        let options = RunOptions::new().with_cancel(rx);
        let cmd = FfmpegCommand::new("in.mp4", "out.mp4");
        let err = FfmpegEngine::new()
            .run(&cmd, &options, crate::progress::ignore_progress())
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }
}
