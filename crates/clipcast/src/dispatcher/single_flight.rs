use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::job::Job;
use super::queue::JobQueue;
use crate::error::Result;
use crate::sanitize;

/// The expensive work behind a job.
#[async_trait]
pub trait PipelineRunner: Send + Sync + 'static {
    async fn run(&self, job: &Job) -> Result<()>;
}

/// How a pipeline run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded,
    Failed(String),
}

impl<E: std::fmt::Display> From<std::result::Result<(), E>> for JobOutcome {
    fn from(result: std::result::Result<(), E>) -> Self {
        match result {
            Ok(()) => JobOutcome::Succeeded,
            Err(e) => JobOutcome::Failed(sanitize::truncate_message(
                &e.to_string(),
                sanitize::MAX_ERROR_LEN,
            )),
        }
    }
}

#[derive(Debug)]
pub enum SubmitOutcome {
    /// The job is processing; the handle completes once this run and every
    /// queued run it promoted have finished.
    Started { job: Job, handle: JoinHandle<()> },
    /// Another job is processing; this one waits at `position` (1-based).
    Queued { job: Job, position: usize },
}

impl SubmitOutcome {
    pub fn job(&self) -> &Job {
        match self {
            SubmitOutcome::Started { job, .. } | SubmitOutcome::Queued { job, .. } => job,
        }
    }
}

/// Serializes pipeline runs through a persistent queue.
///
/// The "is anything processing?" check and the write that follows are two
/// separate store operations, so two submissions racing through that window
/// can both start. Nothing else depends on single-flight for correctness.
#[derive(Clone)]
pub struct Dispatcher {
    queue: JobQueue,
    runner: Arc<dyn PipelineRunner>,
}

impl Dispatcher {
    pub fn new(queue: JobQueue, runner: Arc<dyn PipelineRunner>) -> Self {
        Self { queue, runner }
    }

    pub fn queue(&self) -> &JobQueue {
        &self.queue
    }

    pub async fn submit(&self, job: Job) -> Result<SubmitOutcome> {
        if self.queue.any_processing().await? {
            let job = self.queue.write_queued(job).await?;
            let position = self.queue.queued().await?.len();
            info!(job_id = %job.id, position, "Job queued behind a running job");
            return Ok(SubmitOutcome::Queued { job, position });
        }

        let job = self.queue.write_processing(job).await?;
        info!(job_id = %job.id, "Job started");
        let handle = self.spawn_run(job.clone());
        Ok(SubmitOutcome::Started { job, handle })
    }

    /// Records a finished run. A record that was cancelled meanwhile stays
    /// gone.
    pub async fn on_pipeline_complete(&self, job_id: &str, outcome: JobOutcome) -> Result<()> {
        match outcome {
            JobOutcome::Succeeded => {
                self.queue.remove(job_id).await?;
                info!(job_id, "Job completed");
            }
            JobOutcome::Failed(message) => {
                if self.queue.mark_failed(job_id, &message).await? {
                    warn!(job_id, error = %message, "Job failed");
                } else {
                    debug!(job_id, "Job failed after being cancelled; nothing recorded");
                }
            }
        }
        Ok(())
    }

    /// Promotes the oldest queued job when nothing is processing and starts
    /// running it. Returns the promoted job and the handle of its run.
    pub async fn drain_next(&self) -> Result<Option<(Job, JoinHandle<()>)>> {
        match self.promote_next().await? {
            Some(job) => {
                let handle = self.spawn_run(job.clone());
                Ok(Some((job, handle)))
            }
            None => Ok(None),
        }
    }

    /// Drops a job in any state. A processing job's in-flight run is not
    /// interrupted; only its bookkeeping goes away.
    pub async fn cancel(&self, job_id: &str) -> Result<bool> {
        if self.queue.remove_queued(job_id).await? {
            info!(job_id, "Queued job cancelled");
            return Ok(true);
        }
        if self.queue.remove(job_id).await? {
            info!(job_id, "Job record removed");
            return Ok(true);
        }
        Ok(false)
    }

    pub async fn processing(&self) -> Result<Vec<Job>> {
        self.queue.processing().await
    }

    pub async fn queued(&self) -> Result<Vec<Job>> {
        self.queue.queued().await
    }

    pub async fn failed(&self) -> Result<Vec<Job>> {
        self.queue.failed().await
    }

    async fn promote_next(&self) -> Result<Option<Job>> {
        if self.queue.any_processing().await? {
            return Ok(None);
        }
        let Some(next) = self.queue.queued().await?.into_iter().next() else {
            return Ok(None);
        };
        let job = self.queue.promote(next).await?;
        info!(job_id = %job.id, "Queued job promoted");
        Ok(Some(job))
    }

    fn spawn_run(&self, job: Job) -> JoinHandle<()> {
        let dispatcher = self.clone();
        tokio::spawn(async move { dispatcher.run_until_drained(job).await })
    }

    async fn run_until_drained(&self, mut job: Job) {
        loop {
            let outcome = JobOutcome::from(self.runner.run(&job).await);
            if let Err(e) = self.on_pipeline_complete(&job.id, outcome).await {
                error!(job_id = %job.id, error = %e, "Failed to record job outcome");
            }
            match self.promote_next().await {
                Ok(Some(next)) => job = next,
                Ok(None) => break,
                Err(e) => {
                    error!(error = %e, "Failed to promote next queued job");
                    break;
                }
            }
        }
    }
}
