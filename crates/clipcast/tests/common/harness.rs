//! Test harness wiring one tenant's components over in-memory backends.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

use clipcast::config::{CommentMode, MediaConfig, PublishingConfig, SchedulerConfig};
use clipcast::db::Database;
use clipcast::gallery::{Artifact, ArtifactStore};
use clipcast::ledger::Ledger;
use clipcast::publish::{CaptionBuilder, PendingComments, PublishPipeline, PublishingApi};
use clipcast::scheduler::{parse_timezone, Scheduler, SlotClaims};
use clipcast::store::{BlobStore, MemoryBlobStore, TenantStore};
use clipcast::targets::{NewTarget, Target, TargetRegistry};

use super::fakes::{ScriptedPublishingApi, StaticFetcher};

pub const TENANT: &str = "t1";

/// A tenant with a scripted publishing API, ready for scheduler runs.
pub struct TestHarness {
    pub backend: Arc<MemoryBlobStore>,
    pub store: TenantStore,
    pub db: Database,
    pub ledger: Ledger,
    pub targets: TargetRegistry,
    pub artifacts: ArtifactStore,
    pub api: Arc<ScriptedPublishingApi>,
    pub fetcher: Arc<StaticFetcher>,
    pub scheduler: Scheduler,
}

impl TestHarness {
    /// Inline comments with no delay.
    pub fn new() -> Self {
        Self::with_comment_mode(CommentMode::Inline, 0)
    }

    pub fn with_comment_mode(mode: CommentMode, delay_secs: u64) -> Self {
        Self::with_config(mode, delay_secs, SchedulerConfig::default())
    }

    /// Inline comments, scheduler matching slots within `minutes`.
    pub fn with_slot_tolerance(minutes: u32) -> Self {
        let scheduler = SchedulerConfig {
            slot_tolerance_minutes: minutes,
            ..SchedulerConfig::default()
        };
        Self::with_config(CommentMode::Inline, 0, scheduler)
    }

    pub fn with_config(mode: CommentMode, delay_secs: u64, scheduler_config: SchedulerConfig) -> Self {
        let backend = Arc::new(MemoryBlobStore::new());
        let store = TenantStore::new(backend.clone() as Arc<dyn BlobStore>, TENANT)
            .expect("Failed to create tenant store");
        let db = Database::open_in_memory().expect("Failed to open database");

        let ledger = Ledger::new(db.clone());
        let targets = TargetRegistry::new(
            db.clone(),
            parse_timezone("Asia/Bangkok").expect("Failed to parse timezone"),
        );
        let artifacts = ArtifactStore::new(store.clone(), MediaConfig::default());

        let publishing = PublishingConfig {
            comment_delay_secs: delay_secs,
            comment_mode: mode,
            comment_template: "Shop here: {link}".to_string(),
            hashtags: "#deals".to_string(),
            ..PublishingConfig::default()
        };

        let api = Arc::new(ScriptedPublishingApi::new());
        let fetcher = Arc::new(StaticFetcher::new(b"dubbed-media"));
        let comments = PendingComments::new(
            store.clone(),
            api.clone() as Arc<dyn PublishingApi>,
            Duration::from_secs(delay_secs),
            &publishing.comment_template,
        );
        let publisher = PublishPipeline::new(
            api.clone(),
            fetcher.clone(),
            CaptionBuilder::new(None, &publishing),
            ledger.clone(),
            targets.clone(),
            comments,
            &publishing,
        );
        let scheduler = Scheduler::new(
            targets.clone(),
            artifacts.clone(),
            SlotClaims::new(store.clone()),
            publisher,
            &scheduler_config,
        );

        Self {
            backend,
            store,
            db,
            ledger,
            targets,
            artifacts,
            api,
            fetcher,
            scheduler,
        }
    }

    pub fn claims(&self) -> SlotClaims {
        SlotClaims::new(self.store.clone())
    }

    pub fn publisher(&self) -> &PublishPipeline {
        self.scheduler.publisher()
    }

    pub fn add_target(&self, target: NewTarget) -> Target {
        self.targets
            .upsert(target, at(2026, 3, 1, 0, 0))
            .expect("Failed to register target")
    }

    pub fn target(&self, id: &str) -> Target {
        self.targets.require(id).expect("Target not found")
    }

    /// Stores the artifact object and folds it into the gallery.
    pub async fn add_artifact(&self, artifact: Artifact) -> Artifact {
        self.artifacts
            .put(&artifact)
            .await
            .expect("Failed to store artifact");
        self.artifacts
            .gallery()
            .upsert(&artifact.id)
            .await
            .expect("Failed to update gallery");
        artifact
    }

    /// Whether the tenant store holds `key`.
    pub async fn has_object(&self, key: &str) -> bool {
        self.store.exists(key).await.expect("Failed to check object")
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// UTC instant shorthand.
pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0).unwrap()
}
