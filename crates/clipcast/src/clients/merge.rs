use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::http::{read_json, HttpError, TRANSFER_TIMEOUT};
use crate::pipeline::services::{MergeOutput, MergeService};

/// Client of the media merge service.
pub struct MergeClient {
    http: reqwest::Client,
    base_url: String,
    sample_rate: u32,
}

#[derive(Deserialize)]
struct MergeResponse {
    video_base64: String,
    #[serde(default)]
    thumb_base64: Option<String>,
    #[serde(default)]
    duration: f64,
}

impl MergeClient {
    pub fn new(http: reqwest::Client, base_url: &str, sample_rate: u32) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            sample_rate,
        }
    }
}

#[async_trait]
impl MergeService for MergeClient {
    async fn merge(&self, media_url: &str, audio_base64: &str) -> Result<MergeOutput, HttpError> {
        let response = self
            .http
            .post(format!("{}/merge", self.base_url))
            .json(&json!({
                "video_url": media_url,
                "audio_base64": audio_base64,
                "sample_rate": self.sample_rate,
            }))
            .timeout(TRANSFER_TIMEOUT)
            .send()
            .await?;
        let merged: MergeResponse = read_json(response).await?;
        if merged.video_base64.is_empty() {
            return Err(HttpError::Decode("merge returned no video".to_string()));
        }
        Ok(MergeOutput {
            media_base64: merged.video_base64,
            thumbnail_base64: merged.thumb_base64.filter(|t| !t.is_empty()),
            duration_seconds: merged.duration,
        })
    }
}
