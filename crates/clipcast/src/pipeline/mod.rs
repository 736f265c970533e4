//! The dubbing pipeline run for each dispatched job.

pub mod config;
pub mod context;
pub mod error;
pub mod progress;
pub mod runner;
pub mod services;

pub use config::PipelineConfig;
pub use context::PipelineContext;
pub use error::PipelineError;
pub use progress::{ChatProgress, NoopProgress, PipelineStep, ProgressEvent, ProgressReporter};
pub use runner::DubbingPipeline;
pub use services::{
    ContentGenerator, GeneratedScript, MediaResolver, MergeOutput, MergeService, Notifier,
    NullNotifier, ScriptOutcome,
};
