use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;

use super::http::{read_json, HttpError};
use crate::pipeline::services::MediaResolver;

/// Resolves share links into direct media URLs.
pub struct ResolverClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct ResolveResponse {
    #[serde(default)]
    video_url: Option<String>,
}

impl ResolverClient {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl MediaResolver for ResolverClient {
    async fn resolve(&self, source_url: &str) -> Result<Option<String>, HttpError> {
        let response = self
            .http
            .post(format!("{}/xhs/resolve", self.base_url))
            .json(&json!({ "url": source_url }))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resolved: ResolveResponse = read_json(response).await?;
        Ok(resolved.video_url.filter(|u| !u.is_empty()))
    }
}
