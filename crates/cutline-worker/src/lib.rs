//! Editing job pipeline.
//!
//! This crate provides:
//! - The job controller and its stage state machine
//! - Download, trim, merge, overlay, screenshot and sprite stages
//! - Status sinks for stage progress and terminal events
//! - Temp artifact tracking with cleanup on every exit path
//! - A bounded-concurrency executor with graceful shutdown

pub mod config;
pub mod controller;
pub mod error;
pub mod executor;
pub mod logging;
pub mod segment;
pub mod stages;
pub mod status;
pub mod temp;

pub use config::WorkerConfig;
pub use controller::{JobController, JobHandle, JobOutcome};
pub use error::{WorkerError, WorkerResult};
pub use executor::JobExecutor;
pub use logging::JobLogger;
pub use status::{ChannelStatusSink, FanoutStatusSink, StatusPublisher, StatusSink, TracingStatusSink};
pub use temp::TempArtifactSet;
