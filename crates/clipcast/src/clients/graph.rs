use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::http::{read_json, HttpError, TRANSFER_TIMEOUT};
use crate::publish::api::{PublishingApi, UploadSession};
use crate::sanitize;

/// Graph API reels publishing.
///
/// Credentials travel in the JSON body or the `Authorization` header,
/// never in the URL.
pub struct GraphApiClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct StartResponse {
    video_id: Option<String>,
    upload_url: Option<String>,
}

impl GraphApiClient {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn reels_url(&self, page_id: &str) -> String {
        format!("{}/{}/video_reels", self.base_url, page_id)
    }
}

#[async_trait]
impl PublishingApi for GraphApiClient {
    async fn start_upload(&self, page_id: &str, credential: &str) -> Result<UploadSession, HttpError> {
        let response = self
            .http
            .post(self.reels_url(page_id))
            .json(&json!({ "upload_phase": "start", "access_token": credential }))
            .send()
            .await?;
        let start: StartResponse = read_json(response).await?;

        match (start.video_id, start.upload_url) {
            (Some(video_id), Some(upload_url)) if !video_id.is_empty() => {
                debug!(
                    page_id,
                    video_id = %video_id,
                    upload_url = %sanitize::redact_url_query(&upload_url),
                    "Upload session opened"
                );
                Ok(UploadSession { video_id, upload_url })
            }
            _ => Err(HttpError::Decode(
                "start response is missing video_id or upload_url".to_string(),
            )),
        }
    }

    async fn upload(&self, session: &UploadSession, credential: &str, media: Bytes) -> Result<(), HttpError> {
        let size = media.len();
        let response = self
            .http
            .post(&session.upload_url)
            .header(AUTHORIZATION, format!("OAuth {credential}"))
            .header("offset", "0")
            .header("file_size", size.to_string())
            .timeout(TRANSFER_TIMEOUT)
            .body(media)
            .send()
            .await?;
        let _: serde_json::Value = read_json(response).await?;
        debug!(video_id = %session.video_id, size, "Media uploaded");
        Ok(())
    }

    async fn finish(
        &self,
        page_id: &str,
        credential: &str,
        video_id: &str,
        description: &str,
    ) -> Result<(), HttpError> {
        let response = self
            .http
            .post(self.reels_url(page_id))
            .json(&json!({
                "upload_phase": "finish",
                "video_id": video_id,
                "video_state": "PUBLISHED",
                "description": description,
                "access_token": credential,
            }))
            .send()
            .await?;
        let _: serde_json::Value = read_json(response).await?;
        Ok(())
    }

    async fn comment(&self, post_id: &str, credential: &str, message: &str) -> Result<(), HttpError> {
        let response = self
            .http
            .post(format!("{}/{}/comments", self.base_url, post_id))
            .json(&json!({ "message": message, "access_token": credential }))
            .send()
            .await?;
        let _: serde_json::Value = read_json(response).await?;
        Ok(())
    }

    async fn delete_post(&self, post_id: &str, credential: &str) -> Result<(), HttpError> {
        let response = self
            .http
            .delete(format!("{}/{}", self.base_url, post_id))
            .bearer_auth(credential)
            .send()
            .await?;
        let _: serde_json::Value = read_json(response).await?;
        Ok(())
    }
}
