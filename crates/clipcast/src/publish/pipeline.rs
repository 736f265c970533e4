use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, info_span, warn, Instrument};

use super::api::{MediaFetcher, PublishingApi};
use super::caption::CaptionBuilder;
use super::comments::{render_comment, PendingComment, PendingComments};
use super::error::PublishError;
use crate::config::{CommentMode, PublishingConfig};
use crate::error::Result;
use crate::gallery::Artifact;
use crate::ledger::{Ledger, PublishStatus, SlotRef};
use crate::sanitize;
use crate::targets::{Target, TargetRegistry};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishOptions {
    pub skip_comment: bool,
    /// Local slot this publish serves; `None` for forced posts.
    pub slot: Option<SlotRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "status", content = "detail")]
pub enum CommentOutcome {
    /// No link on the artifact, or comments were skipped.
    Skipped,
    Posted,
    Deferred,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishOutcome {
    pub record_id: i64,
    pub external_post_id: String,
    pub comment: CommentOutcome,
}

/// Drives one artifact through start, upload and finish on a target.
///
/// A `posting` ledger record is written before the first external call. Phase
/// errors turn it into `failed`; publish phases are never retried.
#[derive(Clone)]
pub struct PublishPipeline {
    api: Arc<dyn PublishingApi>,
    fetcher: Arc<dyn MediaFetcher>,
    captions: CaptionBuilder,
    ledger: Ledger,
    targets: TargetRegistry,
    comments: PendingComments,
    comment_mode: CommentMode,
    comment_delay: Duration,
    comment_template: String,
}

impl PublishPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        api: Arc<dyn PublishingApi>,
        fetcher: Arc<dyn MediaFetcher>,
        captions: CaptionBuilder,
        ledger: Ledger,
        targets: TargetRegistry,
        comments: PendingComments,
        config: &PublishingConfig,
    ) -> Self {
        Self {
            api,
            fetcher,
            captions,
            ledger,
            targets,
            comments,
            comment_mode: config.comment_mode,
            comment_delay: Duration::from_secs(config.comment_delay_secs),
            comment_template: config.comment_template.clone(),
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn comments(&self) -> &PendingComments {
        &self.comments
    }

    pub async fn publish(
        &self,
        target: &Target,
        artifact: &Artifact,
        options: PublishOptions,
        now: DateTime<Utc>,
    ) -> Result<PublishOutcome> {
        let span = info_span!("publish", target = %target.id, artifact = %artifact.id);
        async {
            let caption = self.captions.build(artifact).await;
            let record_id = self.ledger.begin(&target.id, &artifact.id, now, options.slot)?;

            let video_id = match self.run_phases(target, artifact, &caption).await {
                Ok(video_id) => video_id,
                Err(e) => {
                    let message = sanitize::truncate_message(&e.to_string(), sanitize::MAX_ERROR_LEN);
                    warn!(record_id, phase = e.phase(), error = %message, "Publish failed");
                    self.ledger.mark_failed(record_id, &message)?;
                    return Err(e.into());
                }
            };

            let comment = self.follow_up(target, artifact, &video_id, options, now).await;
            self.ledger.mark_success(record_id, &video_id)?;
            info!(record_id, video_id = %video_id, "Published");

            Ok(PublishOutcome {
                record_id,
                external_post_id: video_id,
                comment,
            })
        }
        .instrument(span)
        .await
    }

    async fn run_phases(
        &self,
        target: &Target,
        artifact: &Artifact,
        caption: &str,
    ) -> std::result::Result<String, PublishError> {
        let session = self
            .api
            .start_upload(&target.id, &target.credential)
            .await
            .map_err(PublishError::Start)?;

        let media = self
            .fetcher
            .fetch(&artifact.public_url)
            .await
            .map_err(PublishError::Fetch)?;
        self.api
            .upload(&session, &target.credential, media)
            .await
            .map_err(PublishError::Upload)?;

        self.api
            .finish(&target.id, &target.credential, &session.video_id, caption)
            .await
            .map_err(PublishError::Finish)?;
        Ok(session.video_id)
    }

    /// Posts the affiliate-link comment. Never fails the publish.
    async fn follow_up(
        &self,
        target: &Target,
        artifact: &Artifact,
        post_id: &str,
        options: PublishOptions,
        now: DateTime<Utc>,
    ) -> CommentOutcome {
        let Some(link) = artifact.affiliate_link.as_deref().filter(|l| !l.trim().is_empty()) else {
            return CommentOutcome::Skipped;
        };
        if options.skip_comment {
            info!(post_id, "Comment skipped on request");
            return CommentOutcome::Skipped;
        }

        match self.comment_mode {
            CommentMode::Deferred => {
                let pending = PendingComment {
                    external_post_id: post_id.to_string(),
                    credential: target.comment_credential().to_string(),
                    link: link.to_string(),
                    created_at: now,
                };
                match self.comments.defer(&pending).await {
                    Ok(()) => CommentOutcome::Deferred,
                    Err(e) => {
                        warn!(post_id, error = %e, "Failed to defer comment");
                        CommentOutcome::Failed(e.to_string())
                    }
                }
            }
            CommentMode::Inline => {
                tokio::time::sleep(self.comment_delay).await;
                let message = render_comment(&self.comment_template, link);
                match self
                    .api
                    .comment(post_id, target.comment_credential(), &message)
                    .await
                {
                    Ok(()) => CommentOutcome::Posted,
                    Err(e) => {
                        warn!(post_id, error = %e, "Comment failed");
                        CommentOutcome::Failed(e.to_string())
                    }
                }
            }
        }
    }

    /// Deletes the remote post on a best-effort basis and marks the record
    /// withdrawn, which releases its artifact. Returns `false` if the record
    /// was already withdrawn.
    pub async fn withdraw(&self, record_id: i64) -> Result<bool> {
        let record = self
            .ledger
            .get(record_id)?
            .ok_or(PublishError::RecordNotFound(record_id))?;
        if record.status == PublishStatus::Withdrawn {
            return Ok(false);
        }

        match (&record.external_post_id, self.targets.get(&record.target_id)?) {
            (Some(post_id), Some(target)) => {
                if let Err(e) = self.api.delete_post(post_id, &target.credential).await {
                    warn!(record_id, post_id = %post_id, error = %e, "Remote delete failed");
                }
            }
            (Some(post_id), None) => {
                warn!(record_id, post_id = %post_id, "Target is gone; remote post left in place");
            }
            (None, _) => {}
        }

        self.ledger.mark_withdrawn(record_id)?;
        info!(record_id, artifact = %record.artifact_id, "Publish record withdrawn");
        Ok(true)
    }
}
