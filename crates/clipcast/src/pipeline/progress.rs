use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::services::Notifier;
use crate::dispatcher::Job;
use crate::sanitize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStep {
    Resolve,
    Download,
    Script,
    Voice,
    Merge,
    Store,
}

impl PipelineStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStep::Resolve => "resolve",
            PipelineStep::Download => "download",
            PipelineStep::Script => "script",
            PipelineStep::Voice => "voice",
            PipelineStep::Merge => "merge",
            PipelineStep::Store => "store",
        }
    }
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events emitted by the pipeline while a job runs.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Step(PipelineStep),
    Completed {
        artifact_id: String,
        title: Option<String>,
    },
    Failed {
        error: String,
    },
}

impl ProgressEvent {
    pub fn message(&self) -> String {
        match self {
            ProgressEvent::Step(step) => format!("⏳ {step}"),
            ProgressEvent::Completed { artifact_id, title } => match title {
                Some(title) if !title.is_empty() => format!("✅ {title} ({artifact_id})"),
                _ => format!("✅ {artifact_id}"),
            },
            ProgressEvent::Failed { error } => format!(
                "❌ {}",
                sanitize::truncate_message(error, sanitize::MAX_ERROR_LEN)
            ),
        }
    }
}

#[async_trait]
pub trait ProgressReporter: Send + Sync {
    async fn report(&self, job: &Job, event: ProgressEvent);
}

/// No-op reporter for tests.
pub struct NoopProgress;

#[async_trait]
impl ProgressReporter for NoopProgress {
    async fn report(&self, _job: &Job, _event: ProgressEvent) {}
}

/// Tells the originating chat how a job ended. Step events are logged only.
pub struct ChatProgress {
    notifier: Arc<dyn Notifier>,
}

impl ChatProgress {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }
}

#[async_trait]
impl ProgressReporter for ChatProgress {
    async fn report(&self, job: &Job, event: ProgressEvent) {
        if let ProgressEvent::Step(step) = event {
            debug!(job_id = %job.id, %step, "Pipeline step started");
            return;
        }
        let Some(chat_id) = job.origin_chat_id else {
            return;
        };
        if let Err(e) = self.notifier.notify(chat_id, &event.message()).await {
            warn!(job_id = %job.id, error = %e, "Failed to notify chat");
        }
    }
}
