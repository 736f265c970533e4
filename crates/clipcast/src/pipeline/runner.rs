use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use chrono::Utc;
use tracing::{debug, info, info_span, warn, Instrument};

use super::config::PipelineConfig;
use super::context::PipelineContext;
use super::error::PipelineError;
use super::progress::{PipelineStep, ProgressEvent, ProgressReporter};
use super::services::{ContentGenerator, MediaResolver, MergeService};
use crate::dispatcher::{Job, PipelineRunner};
use crate::error::Result;
use crate::gallery::{Artifact, ArtifactStore};
use crate::publish::api::MediaFetcher;
use crate::retry::with_retry;
use crate::sanitize;

/// Turns a submitted source link into a dubbed, stored artifact.
pub struct DubbingPipeline {
    config: Arc<PipelineConfig>,
    resolver: Option<Arc<dyn MediaResolver>>,
    fetcher: Arc<dyn MediaFetcher>,
    generator: Arc<dyn ContentGenerator>,
    merger: Arc<dyn MergeService>,
    artifacts: ArtifactStore,
    progress: Arc<dyn ProgressReporter>,
}

impl DubbingPipeline {
    pub fn new(
        config: Arc<PipelineConfig>,
        resolver: Option<Arc<dyn MediaResolver>>,
        fetcher: Arc<dyn MediaFetcher>,
        generator: Arc<dyn ContentGenerator>,
        merger: Arc<dyn MergeService>,
        artifacts: ArtifactStore,
        progress: Arc<dyn ProgressReporter>,
    ) -> Self {
        Self {
            config,
            resolver,
            fetcher,
            generator,
            merger,
            artifacts,
            progress,
        }
    }

    /// Runs every step for `job` and returns the stored artifact.
    pub async fn process(&self, job: &Job) -> Result<Artifact> {
        let span = info_span!(
            "pipeline",
            job_id = %job.id,
            source = %sanitize::redact_url_query(&job.source_url),
        );
        let result = self.run_steps(PipelineContext::new(job.clone())).instrument(span).await;

        let event = match &result {
            Ok(artifact) => ProgressEvent::Completed {
                artifact_id: artifact.id.clone(),
                title: artifact.title.clone(),
            },
            Err(e) => ProgressEvent::Failed { error: e.to_string() },
        };
        self.progress.report(job, event).await;
        result
    }

    async fn run_steps(&self, mut ctx: PipelineContext) -> Result<Artifact> {
        self.step(&ctx, PipelineStep::Resolve).await;
        self.step_resolve(&mut ctx).instrument(info_span!("resolve")).await?;

        self.step(&ctx, PipelineStep::Download).await;
        self.step_download(&mut ctx).instrument(info_span!("download")).await?;

        self.step(&ctx, PipelineStep::Script).await;
        self.step_script(&mut ctx).instrument(info_span!("script")).await?;

        self.step(&ctx, PipelineStep::Voice).await;
        self.step_voice(&mut ctx).instrument(info_span!("voice")).await?;

        self.step(&ctx, PipelineStep::Merge).await;
        self.step_merge(&mut ctx).instrument(info_span!("merge")).await?;

        self.step(&ctx, PipelineStep::Store).await;
        let artifact = self.step_store(&mut ctx).instrument(info_span!("store")).await?;

        info!(artifact_id = %artifact.id, "Artifact stored");
        Ok(artifact)
    }

    async fn step(&self, ctx: &PipelineContext, step: PipelineStep) {
        self.progress.report(&ctx.job, ProgressEvent::Step(step)).await;
    }

    async fn step_resolve(&self, ctx: &mut PipelineContext) -> Result<()> {
        if !self.config.needs_resolution(&ctx.job.source_url) {
            return Ok(());
        }
        let Some(resolver) = &self.resolver else {
            warn!("Source needs resolution but no resolver is configured; using it as is");
            return Ok(());
        };
        let resolved = resolver
            .resolve(&ctx.job.source_url)
            .await
            .map_err(PipelineError::Resolve)?
            .ok_or_else(|| {
                PipelineError::NothingResolved(sanitize::redact_url_query(&ctx.job.source_url))
            })?;
        debug!(media_url = %sanitize::redact_url_query(&resolved), "Source resolved");
        ctx.media_url = Some(resolved);
        Ok(())
    }

    async fn step_download(&self, ctx: &mut PipelineContext) -> Result<()> {
        let original = self
            .fetcher
            .fetch(ctx.media_url())
            .await
            .map_err(PipelineError::Download)?;
        debug!(size = original.len(), "Source media downloaded");
        ctx.original = Some(original);
        Ok(())
    }

    async fn step_script(&self, ctx: &mut PipelineContext) -> Result<()> {
        let outcome = self
            .generator
            .generate_script(ctx.media_url(), self.config.duration_hint_seconds)
            .await
            .map_err(PipelineError::Script)?;
        if outcome.is_fallback() {
            warn!("Script was recovered from a non-JSON reply");
        }
        let script = outcome.into_script();
        if script.script.trim().is_empty() {
            return Err(PipelineError::EmptyScript.into());
        }
        debug!(chars = script.script.chars().count(), category = %script.category, "Script generated");
        ctx.script = Some(script);
        Ok(())
    }

    async fn step_voice(&self, ctx: &mut PipelineContext) -> Result<()> {
        let script = ctx.script.as_ref().ok_or(PipelineError::Incomplete("script"))?;
        let audio = self
            .generator
            .synthesize_voice(&script.script)
            .await
            .map_err(PipelineError::Voice)?;
        ctx.audio_base64 = Some(audio);
        Ok(())
    }

    async fn step_merge(&self, ctx: &mut PipelineContext) -> Result<()> {
        let audio = ctx.audio_base64.as_deref().ok_or(PipelineError::Incomplete("voice"))?;
        let media_url = ctx.media_url();
        let merged = with_retry(&self.config.merge_retry, "merge", || {
            self.merger.merge(media_url, audio)
        })
        .await
        .map_err(PipelineError::Merge)?;
        debug!(duration = merged.duration_seconds, "Media merged");
        ctx.merged = Some(merged);
        Ok(())
    }

    async fn step_store(&self, ctx: &mut PipelineContext) -> Result<Artifact> {
        let merged = ctx.merged.take().ok_or(PipelineError::Incomplete("merge"))?;
        let script = ctx.script.take().ok_or(PipelineError::Incomplete("script"))?;

        let media = decode_base64(&merged.media_base64)?;
        let thumbnail = merged
            .thumbnail_base64
            .as_deref()
            .filter(|t| !t.is_empty())
            .map(decode_base64)
            .transpose()?;

        let stored = self
            .artifacts
            .put_media(&ctx.artifact_id, media, thumbnail, ctx.original.take())
            .await?;

        let non_empty = |s: String| (!s.trim().is_empty()).then_some(s);

        let artifact = Artifact {
            id: ctx.artifact_id.clone(),
            script: non_empty(script.script),
            title: non_empty(script.title),
            category: non_empty(script.category),
            affiliate_link: ctx.job.link_attachment.clone(),
            public_url: stored.public_url.clone(),
            thumbnail_url: stored.thumbnail_url.clone(),
            original_url: stored.original_url.clone(),
            duration_seconds: merged.duration_seconds,
            created_at: Utc::now(),
            origin_chat_id: ctx.job.origin_chat_id,
        };
        ctx.stored = Some(stored);

        self.artifacts.put(&artifact).await?;
        self.artifacts.gallery().upsert(&artifact.id).await?;
        Ok(artifact)
    }
}

fn decode_base64(encoded: &str) -> std::result::Result<Bytes, PipelineError> {
    Ok(Bytes::from(STANDARD.decode(encoded.trim().as_bytes())?))
}

#[async_trait]
impl PipelineRunner for DubbingPipeline {
    async fn run(&self, job: &Job) -> Result<()> {
        self.process(job).await.map(|_| ())
    }
}
