use crate::error::Result;
use crate::store::{keys, TenantStore};

use super::job::{Job, JobStatus};

/// Persistent job bookkeeping.
///
/// `jobs/{id}.json` holds processing and failed jobs, `queue/{id}.json`
/// holds jobs waiting for their turn.
#[derive(Clone)]
pub struct JobQueue {
    store: TenantStore,
}

impl JobQueue {
    pub fn new(store: TenantStore) -> Self {
        Self { store }
    }

    pub async fn get(&self, id: &str) -> Result<Option<Job>> {
        Ok(self.store.get_json(&keys::job(id)).await?)
    }

    pub async fn get_queued(&self, id: &str) -> Result<Option<Job>> {
        Ok(self.store.get_json(&keys::queued_job(id)).await?)
    }

    /// Every job record under `jobs/`, processing and failed alike.
    pub async fn records(&self) -> Result<Vec<Job>> {
        self.read_all(keys::JOBS_PREFIX).await
    }

    pub async fn processing(&self) -> Result<Vec<Job>> {
        self.with_status(JobStatus::Processing).await
    }

    pub async fn failed(&self) -> Result<Vec<Job>> {
        self.with_status(JobStatus::Failed).await
    }

    pub async fn any_processing(&self) -> Result<bool> {
        Ok(!self.processing().await?.is_empty())
    }

    /// Waiting jobs, oldest first. Ties on `created_at` break by id.
    pub async fn queued(&self) -> Result<Vec<Job>> {
        let mut jobs = self.read_all(keys::QUEUE_PREFIX).await?;
        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(jobs)
    }

    pub async fn write_processing(&self, job: Job) -> Result<Job> {
        let job = job.with_status(JobStatus::Processing);
        self.store.put_json(&keys::job(&job.id), &job).await?;
        Ok(job)
    }

    pub async fn write_queued(&self, job: Job) -> Result<Job> {
        let job = job.with_status(JobStatus::Queued);
        self.store.put_json(&keys::queued_job(&job.id), &job).await?;
        Ok(job)
    }

    /// Moves a queued job to processing. The processing record is written
    /// before the queue entry is removed.
    pub async fn promote(&self, job: Job) -> Result<Job> {
        let job = self.write_processing(job).await?;
        self.store.delete(&keys::queued_job(&job.id)).await?;
        Ok(job)
    }

    /// Marks a processing job failed. Returns `false` when the record is
    /// gone, in which case nothing is written.
    pub async fn mark_failed(&self, id: &str, error: &str) -> Result<bool> {
        let Some(mut job) = self.get(id).await? else {
            return Ok(false);
        };
        job.status = JobStatus::Failed;
        job.error_message = Some(error.to_string());
        self.store.put_json(&keys::job(id), &job).await?;
        Ok(true)
    }

    /// Removes the `jobs/` record. Returns whether one existed.
    pub async fn remove(&self, id: &str) -> Result<bool> {
        let key = keys::job(id);
        let existed = self.store.exists(&key).await?;
        self.store.delete(&key).await?;
        Ok(existed)
    }

    pub async fn remove_queued(&self, id: &str) -> Result<bool> {
        let key = keys::queued_job(id);
        let existed = self.store.exists(&key).await?;
        self.store.delete(&key).await?;
        Ok(existed)
    }

    async fn with_status(&self, status: JobStatus) -> Result<Vec<Job>> {
        Ok(self
            .records()
            .await?
            .into_iter()
            .filter(|job| job.status == status)
            .collect())
    }

    async fn read_all(&self, prefix: &str) -> Result<Vec<Job>> {
        let objects = self.store.list(Some(prefix)).await?;
        let mut jobs = Vec::with_capacity(objects.len());
        for meta in objects {
            if keys::id_from_json_key(&meta.key, prefix).is_none() {
                continue;
            }
            match self.store.get_json::<Job>(&meta.key).await {
                Ok(Some(job)) => jobs.push(job),
                Ok(None) => {}
                Err(e) => log::warn!("Ignoring unreadable job record {}: {}", meta.key, e),
            }
        }
        Ok(jobs)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};

    use super::*;
    use crate::store::MemoryBlobStore;

    fn queue() -> JobQueue {
        JobQueue::new(TenantStore::new(Arc::new(MemoryBlobStore::new()), "42").unwrap())
    }

    fn job(id: &str, offset_secs: i64) -> Job {
        let mut job = Job::new(format!("https://v.example/{id}"), None, None);
        job.id = id.to_string();
        job.created_at = Utc::now() + Duration::seconds(offset_secs);
        job
    }

    #[tokio::test]
    async fn test_queued_fifo_with_id_tiebreak() {
        let q = queue();
        let base = Utc::now();
        for (id, offset) in [("c", 5), ("b", 0), ("a", 0)] {
            let mut j = job(id, 0);
            j.created_at = base + Duration::seconds(offset);
            q.write_queued(j).await.unwrap();
        }
        let ids: Vec<String> = q.queued().await.unwrap().into_iter().map(|j| j.id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_promote_moves_record() {
        let q = queue();
        q.write_queued(job("a", 0)).await.unwrap();

        let promoted = q.promote(job("a", 0)).await.unwrap();
        assert_eq!(promoted.status, JobStatus::Processing);
        assert!(q.queued().await.unwrap().is_empty());
        assert!(q.any_processing().await.unwrap());
    }

    #[tokio::test]
    async fn test_mark_failed_keeps_record_visible() {
        let q = queue();
        q.write_processing(job("a", 0)).await.unwrap();

        assert!(q.mark_failed("a", "merge failed").await.unwrap());
        assert!(!q.any_processing().await.unwrap());
        let failed = q.failed().await.unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].error_message.as_deref(), Some("merge failed"));
    }

    #[tokio::test]
    async fn test_mark_failed_does_not_resurrect() {
        let q = queue();
        assert!(!q.mark_failed("gone", "boom").await.unwrap());
        assert!(q.records().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_reports_existence() {
        let q = queue();
        q.write_processing(job("a", 0)).await.unwrap();
        assert!(q.remove("a").await.unwrap());
        assert!(!q.remove("a").await.unwrap());
    }
}
