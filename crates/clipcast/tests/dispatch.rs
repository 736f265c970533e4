//! Dispatcher and dubbing pipeline tests over the in-memory store.

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use clipcast::clients::HttpError;
use clipcast::config::MediaConfig;
use clipcast::dispatcher::{Dispatcher, Job, JobQueue, PipelineRunner, SubmitOutcome};
use clipcast::gallery::ArtifactStore;
use clipcast::pipeline::{
    DubbingPipeline, MediaResolver, MergeOutput, MergeService, NoopProgress, PipelineConfig,
    PipelineError,
};
use clipcast::store::{BlobStore, MemoryBlobStore, TenantStore};
use clipcast::{ClipcastError, RetryPolicy};

use common::*;

struct Rig {
    artifacts: ArtifactStore,
    queue: JobQueue,
    generator: Arc<CannedGenerator>,
    merger: Arc<FlakyMerger>,
}

fn tenant(backend: Arc<dyn BlobStore>) -> TenantStore {
    TenantStore::new(backend, "t1").unwrap()
}

fn rig(merger: FlakyMerger) -> Rig {
    let store = tenant(Arc::new(MemoryBlobStore::new()));
    Rig {
        artifacts: ArtifactStore::new(store.clone(), MediaConfig::default()),
        queue: JobQueue::new(store),
        generator: Arc::new(CannedGenerator::structured(
            "Look at this blender go",
            "Pocket blender",
            "Kitchen",
        )),
        merger: Arc::new(merger),
    }
}

fn fast_retry() -> Arc<PipelineConfig> {
    Arc::new(PipelineConfig {
        resolver_hosts: vec!["xhs".to_string()],
        merge_retry: RetryPolicy::new(3, Duration::from_secs(5)),
        ..PipelineConfig::default()
    })
}

fn pipeline(rig: &Rig, resolver: Option<Arc<dyn MediaResolver>>) -> DubbingPipeline {
    DubbingPipeline::new(
        fast_retry(),
        resolver,
        Arc::new(StaticFetcher::new(b"original-bytes")),
        rig.generator.clone(),
        rig.merger.clone(),
        rig.artifacts.clone(),
        Arc::new(NoopProgress),
    )
}

/// Merge service that waits for a permit before every merge.
struct GatedMerger {
    gate: Arc<Semaphore>,
    inner: FlakyMerger,
}

#[async_trait]
impl MergeService for GatedMerger {
    async fn merge(&self, media_url: &str, audio_base64: &str) -> Result<MergeOutput, HttpError> {
        self.gate.acquire().await.unwrap().forget();
        self.inner.merge(media_url, audio_base64).await
    }
}

#[tokio::test]
async fn test_pipeline_stores_artifact_and_updates_gallery() {
    let rig = rig(FlakyMerger::reliable());
    let job = Job::new("https://cdn.test/clip.mp4", Some("https://shop.test/p".to_string()), Some(77));

    let artifact = pipeline(&rig, None).process(&job).await.unwrap();

    assert_eq!(artifact.id, job.id);
    assert_eq!(artifact.title.as_deref(), Some("Pocket blender"));
    assert_eq!(artifact.category.as_deref(), Some("Kitchen"));
    assert_eq!(artifact.affiliate_link.as_deref(), Some("https://shop.test/p"));
    assert_eq!(artifact.origin_chat_id, Some(77));
    assert_eq!(artifact.duration_seconds, 21.5);
    assert_eq!(artifact.public_url, format!("store:media/{}.mp4", job.id));
    assert!(artifact.thumbnail_url.is_some());
    assert!(artifact.original_url.as_deref().unwrap().ends_with("_original.mp4"));

    assert_eq!(rig.artifacts.get(&job.id).await.unwrap(), Some(artifact.clone()));
    let snapshot = rig.artifacts.gallery().read().await.unwrap();
    assert_eq!(snapshot.ids(), vec![job.id.as_str()]);
    assert_eq!(rig.generator.script_urls(), vec!["https://cdn.test/clip.mp4"]);
}

#[tokio::test(start_paused = true)]
async fn test_pipeline_retries_transient_merge_failures() {
    let rig = rig(FlakyMerger::failing_with(vec![
        transient("connection reset"),
        transient("connection reset"),
    ]));
    let job = Job::new("https://cdn.test/clip.mp4", None, None);

    let artifact = pipeline(&rig, None).process(&job).await.unwrap();

    assert_eq!(rig.merger.attempts(), 3);
    assert_eq!(artifact.id, job.id);
}

#[tokio::test(start_paused = true)]
async fn test_pipeline_does_not_retry_upstream_rejection() {
    let rig = rig(FlakyMerger::failing_with(vec![HttpError::api("audio too long")]));
    let job = Job::new("https://cdn.test/clip.mp4", None, None);

    let err = pipeline(&rig, None).process(&job).await.unwrap_err();

    assert!(matches!(err, ClipcastError::Pipeline(PipelineError::Merge(_))));
    assert_eq!(rig.merger.attempts(), 1);
    assert!(rig.artifacts.get(&job.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_pipeline_resolves_share_links() {
    let rig = rig(FlakyMerger::reliable());
    let resolver: Arc<dyn MediaResolver> =
        Arc::new(FixedResolver(Some("https://cdn.test/direct.mp4".to_string())));
    let job = Job::new("http://xhslink.com/a/b", None, None);

    pipeline(&rig, Some(resolver)).process(&job).await.unwrap();

    assert_eq!(rig.generator.script_urls(), vec!["https://cdn.test/direct.mp4"]);
}

#[tokio::test]
async fn test_pipeline_fails_when_nothing_resolves() {
    let rig = rig(FlakyMerger::reliable());
    let resolver: Arc<dyn MediaResolver> = Arc::new(FixedResolver(None));
    let job = Job::new("http://xhslink.com/a/b", None, None);

    let err = pipeline(&rig, Some(resolver)).process(&job).await.unwrap_err();

    assert!(matches!(
        err,
        ClipcastError::Pipeline(PipelineError::NothingResolved(_))
    ));
    assert_eq!(rig.merger.attempts(), 0);
}

#[tokio::test]
async fn test_second_submission_waits_and_is_promoted() {
    let gate = Arc::new(Semaphore::new(0));
    let base = rig(FlakyMerger::reliable());
    let runner = Arc::new(DubbingPipeline::new(
        fast_retry(),
        None,
        Arc::new(StaticFetcher::new(b"original-bytes")),
        base.generator.clone(),
        Arc::new(GatedMerger {
            gate: gate.clone(),
            inner: FlakyMerger::reliable(),
        }),
        base.artifacts.clone(),
        Arc::new(NoopProgress),
    ));
    let dispatcher = Dispatcher::new(base.queue.clone(), runner);

    let first = dispatcher
        .submit(Job::new("https://cdn.test/a.mp4", None, None))
        .await
        .unwrap();
    let second = dispatcher
        .submit(Job::new("https://cdn.test/b.mp4", None, None))
        .await
        .unwrap();

    let (a, handle) = match first {
        SubmitOutcome::Started { job, handle } => (job, handle),
        other => panic!("expected start, got {other:?}"),
    };
    let b = match second {
        SubmitOutcome::Queued { job, position } => {
            assert_eq!(position, 1);
            job
        }
        other => panic!("expected queue, got {other:?}"),
    };

    gate.add_permits(2);
    handle.await.unwrap();

    assert!(base.artifacts.get(&a.id).await.unwrap().is_some());
    assert!(base.artifacts.get(&b.id).await.unwrap().is_some());
    assert!(base.queue.records().await.unwrap().is_empty());
    assert!(base.queue.queued().await.unwrap().is_empty());
    assert_eq!(base.artifacts.gallery().read().await.unwrap().artifacts.len(), 2);
}

/// Runner with nothing to do.
struct InstantRunner;

#[async_trait]
impl PipelineRunner for InstantRunner {
    async fn run(&self, _job: &Job) -> clipcast::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_concurrent_submissions_can_both_start() {
    let store = tenant(Arc::new(RacingStore::new(2)));
    let dispatcher = Dispatcher::new(JobQueue::new(store), Arc::new(InstantRunner));

    let (first, second) = tokio::join!(
        dispatcher.submit(Job::new("https://cdn.test/a.mp4", None, None)),
        dispatcher.submit(Job::new("https://cdn.test/b.mp4", None, None)),
    );

    // Both saw an idle queue before either wrote its processing record.
    let mut handles = Vec::new();
    for outcome in [first.unwrap(), second.unwrap()] {
        match outcome {
            SubmitOutcome::Started { handle, .. } => handles.push(handle),
            other => panic!("expected both to start, got {other:?}"),
        }
    }
    for handle in handles {
        handle.await.unwrap();
    }
    assert!(dispatcher.processing().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_run_is_kept_until_cancelled() {
    let base = rig(FlakyMerger::failing_with(vec![HttpError::api("bad audio")]));
    let dispatcher = Dispatcher::new(base.queue.clone(), Arc::new(pipeline(&base, None)));

    let SubmitOutcome::Started { job, handle } = dispatcher
        .submit(Job::new("https://cdn.test/a.mp4", None, None))
        .await
        .unwrap()
    else {
        panic!("expected start");
    };
    handle.await.unwrap();

    let failed = dispatcher.failed().await.unwrap();
    assert_eq!(failed.len(), 1);
    assert!(failed[0].error_message.as_deref().unwrap().contains("bad audio"));

    assert!(dispatcher.cancel(&job.id).await.unwrap());
    assert!(dispatcher.failed().await.unwrap().is_empty());
    assert!(!dispatcher.cancel(&job.id).await.unwrap());
}
