use async_trait::async_trait;
use bytes::Bytes;

use crate::clients::HttpError;

/// An upload session opened by [`PublishingApi::start_upload`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSession {
    /// External video id; also the id of the published post.
    pub video_id: String,
    pub upload_url: String,
}

/// The external publishing platform.
#[async_trait]
pub trait PublishingApi: Send + Sync {
    async fn start_upload(&self, page_id: &str, credential: &str) -> Result<UploadSession, HttpError>;

    async fn upload(&self, session: &UploadSession, credential: &str, media: Bytes) -> Result<(), HttpError>;

    async fn finish(
        &self,
        page_id: &str,
        credential: &str,
        video_id: &str,
        description: &str,
    ) -> Result<(), HttpError>;

    async fn comment(&self, post_id: &str, credential: &str, message: &str) -> Result<(), HttpError>;

    async fn delete_post(&self, post_id: &str, credential: &str) -> Result<(), HttpError>;
}

/// Reads media bytes by URL.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Bytes, HttpError>;
}

/// Writes a short caption from a voice-over script.
#[async_trait]
pub trait CaptionGenerator: Send + Sync {
    async fn generate(&self, script: &str) -> Result<String, HttpError>;
}
