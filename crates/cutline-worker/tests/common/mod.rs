//! Scripted codec engine and job harness for pipeline tests.
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::{mpsc, Notify};

use cutline_media::command::cancelled;
use cutline_media::{
    CodecEngine, FfmpegCommand, FfmpegProgress, GridTiler, MediaError, MediaInfo, MediaResult,
    ProgressCallback, RunOptions, VideoStreamInfo,
};
use cutline_models::{Job, JobEvent, JobId, JobStage};
use cutline_worker::{ChannelStatusSink, JobController, WorkerConfig};

pub const FPS: f64 = 25.0;
const DEFAULT_DURATION: f64 = 10.0;

type Predicate = Box<dyn Fn(&FfmpegCommand) -> bool + Send + Sync>;

/// Engine that writes plausible outputs without running FFmpeg.
///
/// Stream copies copy their input bytes, concat merges append the listed
/// files, thumbnail patterns and single-frame grabs write small JPEGs.
/// Output durations are remembered so later probes see them.
#[derive(Default)]
pub struct FakeEngine {
    durations: Mutex<HashMap<String, f64>>,
    commands: Mutex<Vec<FfmpegCommand>>,
    fail_when: Mutex<Option<Predicate>>,
    block_when: Mutex<Option<Predicate>>,
    delays: Mutex<Vec<(Predicate, Duration)>>,
    skipped_thumbnails: Mutex<HashSet<usize>>,
    pub blocked: Notify,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `duration` seconds when `source` is probed.
    pub fn script_probe(&self, source: &str, duration: f64) {
        self.durations
            .lock()
            .unwrap()
            .insert(source.to_string(), duration);
    }

    /// Fail every command matching `predicate` after writing a partial output.
    pub fn fail_when(&self, predicate: impl Fn(&FfmpegCommand) -> bool + Send + Sync + 'static) {
        *self.fail_when.lock().unwrap() = Some(Box::new(predicate));
    }

    /// Hold every command matching `predicate` until the job is cancelled
    /// or the invocation's timeout elapses.
    pub fn block_when(&self, predicate: impl Fn(&FfmpegCommand) -> bool + Send + Sync + 'static) {
        *self.block_when.lock().unwrap() = Some(Box::new(predicate));
    }

    /// Sleep `delay` before writing the output of commands matching
    /// `predicate`. The first matching rule wins.
    pub fn delay_when(
        &self,
        predicate: impl Fn(&FfmpegCommand) -> bool + Send + Sync + 'static,
        delay: Duration,
    ) {
        self.delays.lock().unwrap().push((Box::new(predicate), delay));
    }

    fn delay_for(&self, command: &FfmpegCommand) -> Option<Duration> {
        self.delays
            .lock()
            .unwrap()
            .iter()
            .find(|(p, _)| p(command))
            .map(|(_, d)| *d)
    }

    /// Do not write these thumbnail indices.
    pub fn skip_thumbnails(&self, indices: &[usize]) {
        self.skipped_thumbnails.lock().unwrap().extend(indices);
    }

    pub fn commands(&self) -> Vec<FfmpegCommand> {
        self.commands.lock().unwrap().clone()
    }

    pub fn commands_matching(&self, predicate: impl Fn(&FfmpegCommand) -> bool) -> Vec<FfmpegCommand> {
        self.commands().into_iter().filter(|c| predicate(c)).collect()
    }

    fn duration_of(&self, source: &str) -> Option<f64> {
        self.durations.lock().unwrap().get(source).copied()
    }

    fn remember(&self, output: &Path, duration: f64) {
        self.durations
            .lock()
            .unwrap()
            .insert(output.to_string_lossy().into_owned(), duration);
    }

    fn output_duration(&self, command: &FfmpegCommand) -> f64 {
        let input = &command.inputs()[0];
        if is_merge(command) {
            return manifest_entries(Path::new(&input.source))
                .iter()
                .map(|p| self.duration_of(&p.to_string_lossy()).unwrap_or(DEFAULT_DURATION))
                .sum();
        }
        let limit = input
            .args
            .windows(2)
            .find(|w| w[0] == "-t")
            .and_then(|w| w[1].parse::<f64>().ok());
        limit
            .or_else(|| self.duration_of(&input.source))
            .unwrap_or(DEFAULT_DURATION)
    }

    fn write_output(&self, command: &FfmpegCommand) -> MediaResult<()> {
        let output = command.output();
        let input = &command.inputs()[0];

        if is_thumbnail_pattern(command) {
            let count: usize = command
                .output_value("-frames:v")
                .and_then(|v| v.parse().ok())
                .unwrap_or(0);
            let skipped = self.skipped_thumbnails.lock().unwrap().clone();
            let dir = output.parent().unwrap_or(Path::new("."));
            for i in (0..count).filter(|i| !skipped.contains(i)) {
                write_jpeg(&dir.join(format!("thumb_{:04}.jpg", i)))?;
            }
            return Ok(());
        }
        if command.output_value("-frames:v").is_some() {
            return write_jpeg(output);
        }

        let bytes = if is_merge(command) {
            let mut merged = Vec::new();
            for entry in manifest_entries(Path::new(&input.source)) {
                merged.extend(std::fs::read(entry)?);
            }
            merged
        } else if input.source.starts_with("http") {
            format!("fetched {}", input.source).into_bytes()
        } else {
            let mut bytes = std::fs::read(&input.source)?;
            if command.inputs().len() > 1 {
                bytes.extend_from_slice(b"+overlays");
            }
            bytes
        };
        std::fs::write(output, bytes)?;
        self.remember(output, self.output_duration(command));
        Ok(())
    }
}

#[async_trait]
impl CodecEngine for FakeEngine {
    async fn probe(&self, source: &str) -> MediaResult<MediaInfo> {
        if let Some(duration) = self.duration_of(source) {
            return Ok(media_info(duration));
        }
        if source.starts_with("http") {
            return Err(MediaError::probe_failed(source, "unreachable", None));
        }
        if Path::new(source).is_file() {
            return Ok(media_info(DEFAULT_DURATION));
        }
        Err(MediaError::FileNotFound(PathBuf::from(source)))
    }

    async fn run(
        &self,
        command: &FfmpegCommand,
        options: &RunOptions,
        on_progress: ProgressCallback,
    ) -> MediaResult<()> {
        self.commands.lock().unwrap().push(command.clone());
        if options.is_cancelled() {
            return Err(MediaError::Cancelled);
        }

        let blocks = self
            .block_when
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|p| p(command));
        if blocks {
            self.blocked.notify_one();
            let wait = cancelled(options.cancel.clone());
            match options.timeout {
                Some(limit) => {
                    if tokio::time::timeout(limit, wait).await.is_err() {
                        return Err(MediaError::Timeout(limit.as_secs()));
                    }
                }
                None => wait.await,
            }
            return Err(MediaError::Cancelled);
        }
        if let Some(delay) = self.delay_for(command) {
            tokio::time::sleep(delay).await;
        }

        let total_secs = self.output_duration(command);
        let fails = self
            .fail_when
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|p| p(command));
        if fails {
            on_progress(progress_at(total_secs, 0.3));
            std::fs::write(command.output(), b"partial")?;
            return Err(MediaError::ffmpeg_failed(
                "scripted failure",
                Some("Conversion failed!".to_string()),
                Some(1),
            ));
        }

        // One step goes backwards, as FFmpeg's frame counter sometimes does
        for fraction in [0.3, 0.2, 0.6, 1.0] {
            on_progress(progress_at(total_secs, fraction));
        }
        self.write_output(command)
    }
}

pub fn media_info(duration: f64) -> MediaInfo {
    MediaInfo {
        duration,
        video: VideoStreamInfo {
            frame_rate: FPS,
            frame_count: (duration * FPS).round() as u64,
            width: 1280,
            height: 720,
            codec: "h264".to_string(),
        },
        has_audio: true,
        format_name: "mov,mp4,m4a,3gp,3g2,mj2".to_string(),
        size: 0,
        bitrate: 0,
        raw: serde_json::Value::Null,
    }
}

fn progress_at(total_secs: f64, fraction: f64) -> FfmpegProgress {
    let secs = total_secs * fraction;
    FfmpegProgress {
        frame: (secs * FPS).round() as u64,
        fps: FPS,
        out_time_us: (secs * 1_000_000.0) as i64,
        speed: 4.0,
        is_complete: fraction >= 1.0,
        ..Default::default()
    }
}

fn write_jpeg(path: &Path) -> MediaResult<()> {
    image::RgbImage::from_pixel(16, 9, image::Rgb([200, 40, 40]))
        .save_with_format(path, image::ImageFormat::Jpeg)?;
    Ok(())
}

fn manifest_entries(manifest: &Path) -> Vec<PathBuf> {
    std::fs::read_to_string(manifest)
        .unwrap_or_default()
        .lines()
        .filter_map(|line| line.strip_prefix("file '")?.strip_suffix('\'').map(PathBuf::from))
        .collect()
}

pub fn is_merge(command: &FfmpegCommand) -> bool {
    command.inputs()[0].args.iter().any(|a| a == "concat")
}

pub fn is_download(command: &FfmpegCommand) -> bool {
    command.inputs()[0].source.starts_with("http")
}

pub fn is_overlay(command: &FfmpegCommand) -> bool {
    command.inputs().len() > 1
}

pub fn is_thumbnail_pattern(command: &FfmpegCommand) -> bool {
    command.output().to_string_lossy().contains("%04d")
}

pub fn is_screenshot(command: &FfmpegCommand) -> bool {
    command.output_value("-frames:v") == Some("1") && !is_thumbnail_pattern(command)
}

pub fn is_trim(command: &FfmpegCommand) -> bool {
    command.output_value("-c") == Some("copy")
        && !is_merge(command)
        && !is_download(command)
}

/// Seek value of the first input, if any.
pub fn seek_of(command: &FfmpegCommand) -> Option<f64> {
    command.inputs()[0]
        .args
        .windows(2)
        .find(|w| w[0] == "-ss")
        .and_then(|w| w[1].parse().ok())
}

/// A controller over a scratch root, wired to the fake engine.
pub struct Harness {
    pub root: TempDir,
    pub config: WorkerConfig,
    pub engine: Arc<FakeEngine>,
    pub controller: Arc<JobController>,
    events: mpsc::UnboundedReceiver<(JobId, JobEvent)>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    pub fn with_config(adjust: impl FnOnce(&mut WorkerConfig)) -> Self {
        let root = TempDir::new().unwrap();
        let mut config = WorkerConfig::rooted_at(root.path());
        adjust(&mut config);

        let engine = Arc::new(FakeEngine::new());
        let (sink, events) = ChannelStatusSink::new();
        let controller = Arc::new(JobController::new(
            engine.clone(),
            Arc::new(GridTiler::new()),
            config.clone(),
            Arc::new(sink),
        ));
        std::fs::create_dir_all(root.path().join("sources")).unwrap();

        Self {
            root,
            config,
            engine,
            controller,
            events,
        }
    }

    /// Write a local source file and script its duration.
    pub fn source(&self, name: &str, duration: f64) -> String {
        let path = self.root.path().join("sources").join(name);
        std::fs::write(&path, format!("<{}>", name)).unwrap();
        let path = path.to_string_lossy().into_owned();
        self.engine.script_probe(&path, duration);
        path
    }

    pub async fn run(&self, job: Job) -> cutline_worker::WorkerResult<cutline_worker::JobOutcome> {
        let (_cancel_tx, cancel_rx) = tokio::sync::watch::channel(false);
        self.controller.run(job, cancel_rx).await
    }

    /// Every event published so far.
    pub fn events(&mut self) -> Vec<JobEvent> {
        let mut events = Vec::new();
        while let Ok((_, event)) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    pub fn files_in(dir: &Path) -> Vec<PathBuf> {
        match std::fs::read_dir(dir) {
            Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
            Err(_) => Vec::new(),
        }
    }
}

/// Stages entered, in order.
pub fn stages_entered(events: &[JobEvent]) -> Vec<JobStage> {
    events
        .iter()
        .filter_map(|e| match e {
            JobEvent::Status(p) if p.index.is_none() && p.percent.is_none() => Some(p.stage),
            _ => None,
        })
        .collect()
}

/// Percent values reported for `stage`.
pub fn percents(events: &[JobEvent], stage: JobStage) -> Vec<f64> {
    events
        .iter()
        .filter_map(|e| match e {
            JobEvent::Status(p) if p.stage == stage => p.percent,
            _ => None,
        })
        .collect()
}
