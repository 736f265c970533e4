use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One requested pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub source_url: String,
    /// Affiliate link to attach to the resulting artifact.
    #[serde(default)]
    pub link_attachment: Option<String>,
    #[serde(default)]
    pub origin_chat_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub status: JobStatus,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl Job {
    pub fn new(source_url: impl Into<String>, link_attachment: Option<String>, origin_chat_id: Option<i64>) -> Self {
        Self {
            id: new_job_id(),
            source_url: source_url.into(),
            link_attachment: link_attachment.filter(|l| !l.trim().is_empty()),
            origin_chat_id,
            created_at: Utc::now(),
            status: JobStatus::Queued,
            error_message: None,
        }
    }

    pub(crate) fn with_status(mut self, status: JobStatus) -> Self {
        self.status = status;
        self
    }
}

/// Short opaque job id: 8 lowercase hex characters.
pub fn new_job_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_id_shape() {
        let id = new_job_id();
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(new_job_id(), id);
    }

    #[test]
    fn test_new_job_drops_blank_link() {
        let job = Job::new("https://v.example/1", Some("  ".to_string()), Some(5));
        assert!(job.link_attachment.is_none());
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.origin_chat_id, Some(5));
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let job = Job::new("u", None, None).with_status(JobStatus::Processing);
        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json["status"], "processing");
        assert!(json.get("sourceUrl").is_some());
    }
}
