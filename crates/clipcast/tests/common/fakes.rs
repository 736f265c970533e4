//! Scripted fakes for the external collaborators.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use tokio::sync::Barrier;

use clipcast::clients::HttpError;
use clipcast::error::StoreError;
use clipcast::pipeline::{
    ContentGenerator, GeneratedScript, MediaResolver, MergeOutput, MergeService, ScriptOutcome,
};
use clipcast::publish::{CaptionGenerator, MediaFetcher, PublishingApi, UploadSession};
use clipcast::store::{BlobStore, MemoryBlobStore, ObjectMeta};

/// A publishing API call as seen by [`ScriptedPublishingApi`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    Start { page_id: String },
    Upload { video_id: String, size: usize },
    Finish { page_id: String, video_id: String, description: String },
    Comment { post_id: String, credential: String, message: String },
    Delete { post_id: String },
}

/// Publishing API that records calls and fails phases on demand.
#[derive(Default)]
pub struct ScriptedPublishingApi {
    calls: Mutex<Vec<ApiCall>>,
    next_video: AtomicUsize,
    fail_finish: Mutex<VecDeque<HttpError>>,
    fail_start: Mutex<VecDeque<HttpError>>,
}

impl ScriptedPublishingApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `finish` call fails with `error`.
    pub fn fail_next_finish(&self, error: HttpError) {
        self.fail_finish.lock().unwrap().push_back(error);
    }

    pub fn fail_next_start(&self, error: HttpError) {
        self.fail_start.lock().unwrap().push_back(error);
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn comments(&self) -> Vec<ApiCall> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, ApiCall::Comment { .. }))
            .collect()
    }

    pub fn finished(&self) -> Vec<ApiCall> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, ApiCall::Finish { .. }))
            .collect()
    }

    fn record(&self, call: ApiCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl PublishingApi for ScriptedPublishingApi {
    async fn start_upload(&self, page_id: &str, _credential: &str) -> Result<UploadSession, HttpError> {
        self.record(ApiCall::Start {
            page_id: page_id.to_string(),
        });
        if let Some(error) = self.fail_start.lock().unwrap().pop_front() {
            return Err(error);
        }
        let n = self.next_video.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(UploadSession {
            video_id: format!("fbv-{n}"),
            upload_url: format!("https://upload.test/fbv-{n}"),
        })
    }

    async fn upload(&self, session: &UploadSession, _credential: &str, media: Bytes) -> Result<(), HttpError> {
        self.record(ApiCall::Upload {
            video_id: session.video_id.clone(),
            size: media.len(),
        });
        Ok(())
    }

    async fn finish(
        &self,
        page_id: &str,
        _credential: &str,
        video_id: &str,
        description: &str,
    ) -> Result<(), HttpError> {
        self.record(ApiCall::Finish {
            page_id: page_id.to_string(),
            video_id: video_id.to_string(),
            description: description.to_string(),
        });
        match self.fail_finish.lock().unwrap().pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn comment(&self, post_id: &str, credential: &str, message: &str) -> Result<(), HttpError> {
        self.record(ApiCall::Comment {
            post_id: post_id.to_string(),
            credential: credential.to_string(),
            message: message.to_string(),
        });
        Ok(())
    }

    async fn delete_post(&self, post_id: &str, _credential: &str) -> Result<(), HttpError> {
        self.record(ApiCall::Delete {
            post_id: post_id.to_string(),
        });
        Ok(())
    }
}

/// Returns the same bytes for every URL and remembers what was fetched.
pub struct StaticFetcher {
    pub body: Bytes,
    fetched: Mutex<Vec<String>>,
}

impl StaticFetcher {
    pub fn new(body: &'static [u8]) -> Self {
        Self {
            body: Bytes::from_static(body),
            fetched: Mutex::new(Vec::new()),
        }
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, HttpError> {
        self.fetched.lock().unwrap().push(url.to_string());
        Ok(self.body.clone())
    }
}

/// Script and voice generator with a canned reply.
pub struct CannedGenerator {
    pub outcome: ScriptOutcome,
    script_urls: Mutex<Vec<String>>,
}

impl CannedGenerator {
    pub fn structured(script: &str, title: &str, category: &str) -> Self {
        Self {
            outcome: ScriptOutcome::Structured(GeneratedScript {
                script: script.to_string(),
                title: title.to_string(),
                category: category.to_string(),
            }),
            script_urls: Mutex::new(Vec::new()),
        }
    }

    pub fn script_urls(&self) -> Vec<String> {
        self.script_urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentGenerator for CannedGenerator {
    async fn generate_script(&self, media_url: &str, _duration_seconds: f64) -> Result<ScriptOutcome, HttpError> {
        self.script_urls.lock().unwrap().push(media_url.to_string());
        Ok(self.outcome.clone())
    }

    async fn synthesize_voice(&self, _script: &str) -> Result<String, HttpError> {
        Ok(STANDARD.encode(b"pcm-audio"))
    }
}

#[async_trait]
impl CaptionGenerator for CannedGenerator {
    async fn generate(&self, _script: &str) -> Result<String, HttpError> {
        Ok("generated caption".to_string())
    }
}

/// Merge service that fails with queued errors before succeeding.
pub struct FlakyMerger {
    failures: Mutex<VecDeque<HttpError>>,
    attempts: AtomicUsize,
    pub duration_seconds: f64,
}

impl FlakyMerger {
    pub fn reliable() -> Self {
        Self::failing_with(Vec::new())
    }

    pub fn failing_with(failures: Vec<HttpError>) -> Self {
        Self {
            failures: Mutex::new(failures.into()),
            attempts: AtomicUsize::new(0),
            duration_seconds: 21.5,
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MergeService for FlakyMerger {
    async fn merge(&self, _media_url: &str, _audio_base64: &str) -> Result<MergeOutput, HttpError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        Ok(MergeOutput {
            media_base64: STANDARD.encode(b"dubbed-media"),
            thumbnail_base64: Some(STANDARD.encode(b"thumb")),
            duration_seconds: self.duration_seconds,
        })
    }
}

/// Resolver that maps every share link to one direct URL, or to nothing.
pub struct FixedResolver(pub Option<String>);

#[async_trait]
impl MediaResolver for FixedResolver {
    async fn resolve(&self, _source_url: &str) -> Result<Option<String>, HttpError> {
        Ok(self.0.clone())
    }
}

/// Memory store whose first `gated` listings of `jobs/` wait for each other.
///
/// Holding every submitter at the "is anything processing?" read until all
/// of them have made it forces the check-then-write race to happen.
pub struct RacingStore {
    inner: MemoryBlobStore,
    barrier: Barrier,
    gated: usize,
    seen: AtomicUsize,
}

impl RacingStore {
    pub fn new(gated: usize) -> Self {
        Self {
            inner: MemoryBlobStore::new(),
            barrier: Barrier::new(gated),
            gated,
            seen: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl BlobStore for RacingStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, data: Bytes) -> Result<(), StoreError> {
        self.inner.put(key, data).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.inner.delete(key).await
    }

    async fn head(&self, key: &str) -> Result<Option<ObjectMeta>, StoreError> {
        self.inner.head(key).await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>, StoreError> {
        let listing = self.inner.list(prefix).await?;
        if prefix.ends_with("jobs/") && self.seen.fetch_add(1, Ordering::SeqCst) < self.gated {
            self.barrier.wait().await;
        }
        Ok(listing)
    }
}

pub fn transient(message: &str) -> HttpError {
    HttpError::Connect(message.to_string())
}

pub fn shared<T>(value: T) -> Arc<T> {
    Arc::new(value)
}
