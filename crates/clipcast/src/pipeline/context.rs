use bytes::Bytes;

use crate::dispatcher::Job;
use crate::gallery::StoredMedia;

use super::services::{GeneratedScript, MergeOutput};

/// State carried between pipeline steps.
pub struct PipelineContext {
    pub job: Job,
    /// Artifacts take the id of the job that produced them.
    pub artifact_id: String,

    // Set by the resolve step.
    pub media_url: Option<String>,

    // Set by the download step.
    pub original: Option<Bytes>,

    // Set by the script step.
    pub script: Option<GeneratedScript>,

    // Set by the voice step.
    pub audio_base64: Option<String>,

    // Set by the merge step.
    pub merged: Option<MergeOutput>,

    // Set by the store step.
    pub stored: Option<StoredMedia>,
}

impl PipelineContext {
    pub fn new(job: Job) -> Self {
        Self {
            artifact_id: job.id.clone(),
            job,
            media_url: None,
            original: None,
            script: None,
            audio_base64: None,
            merged: None,
            stored: None,
        }
    }

    /// URL the media is fetched from: the resolved one, or the source.
    pub fn media_url(&self) -> &str {
        self.media_url.as_deref().unwrap_or(&self.job.source_url)
    }
}
