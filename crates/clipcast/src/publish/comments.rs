//! Deferred follow-up comments.
//!
//! In deferred mode the publish run stores the comment instead of sleeping
//! through the delay; the next scheduler tick past the delay posts it. An
//! entry is deleted once it has been attempted, whether or not the post
//! succeeded.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::api::PublishingApi;
use crate::error::Result;
use crate::store::{keys, TenantStore};

#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingComment {
    pub external_post_id: String,
    pub credential: String,
    pub link: String,
    pub created_at: DateTime<Utc>,
}

impl fmt::Debug for PendingComment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingComment")
            .field("external_post_id", &self.external_post_id)
            .field("credential", &crate::sanitize::redact_token(&self.credential))
            .field("link", &self.link)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Result of one pass over the pending comments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CommentSweep {
    pub posted: usize,
    pub failed: usize,
    pub waiting: usize,
}

/// Renders the comment text: `{link}` in the template is replaced.
pub fn render_comment(template: &str, link: &str) -> String {
    if template.contains("{link}") {
        template.replace("{link}", link)
    } else {
        format!("{template} {link}")
    }
}

#[derive(Clone)]
pub struct PendingComments {
    store: TenantStore,
    api: Arc<dyn PublishingApi>,
    delay: Duration,
    template: String,
}

impl PendingComments {
    pub fn new(store: TenantStore, api: Arc<dyn PublishingApi>, delay: Duration, template: &str) -> Self {
        Self {
            store,
            api,
            delay,
            template: template.to_string(),
        }
    }

    pub async fn defer(&self, comment: &PendingComment) -> Result<()> {
        self.store
            .put_json(&keys::pending_comment(&comment.external_post_id), comment)
            .await?;
        log::debug!("Comment for post {} deferred", comment.external_post_id);
        Ok(())
    }

    pub async fn pending(&self) -> Result<Vec<PendingComment>> {
        let objects = self.store.list(Some(keys::PENDING_COMMENTS_PREFIX)).await?;
        let mut comments = Vec::with_capacity(objects.len());
        for object in objects {
            match self.store.get_json::<PendingComment>(&object.key).await {
                Ok(Some(comment)) => comments.push(comment),
                Ok(None) => {}
                Err(e) => {
                    log::warn!("Dropping unreadable pending comment '{}': {}", object.key, e);
                    self.store.delete(&object.key).await?;
                }
            }
        }
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(comments)
    }

    /// Posts every comment at least `delay` old and deletes it afterwards.
    pub async fn process_due(&self, now: DateTime<Utc>) -> Result<CommentSweep> {
        let mut sweep = CommentSweep::default();
        for comment in self.pending().await? {
            let age = (now - comment.created_at).to_std().unwrap_or(Duration::ZERO);
            if age < self.delay {
                sweep.waiting += 1;
                continue;
            }

            let message = render_comment(&self.template, &comment.link);
            match self
                .api
                .comment(&comment.external_post_id, &comment.credential, &message)
                .await
            {
                Ok(()) => {
                    log::info!("Posted deferred comment on {}", comment.external_post_id);
                    sweep.posted += 1;
                }
                Err(e) => {
                    log::warn!(
                        "Deferred comment on {} failed: {}",
                        comment.external_post_id,
                        e
                    );
                    sweep.failed += 1;
                }
            }
            self.store
                .delete(&keys::pending_comment(&comment.external_post_id))
                .await?;
        }
        Ok(sweep)
    }
}
