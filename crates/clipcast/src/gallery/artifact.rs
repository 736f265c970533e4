use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::snapshot::Gallery;
use crate::config::MediaConfig;
use crate::error::{ClipcastError, Result};
use crate::store::{keys, TenantStore};

/// A finished, publishable media item and its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub id: String,
    #[serde(default)]
    pub script: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub affiliate_link: Option<String>,
    pub public_url: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub original_url: Option<String>,
    #[serde(default)]
    pub duration_seconds: f64,
    pub created_at: DateTime<Utc>,
    /// Chat the originating request came from, for notifications.
    #[serde(default)]
    pub origin_chat_id: Option<i64>,
}

impl Artifact {
    pub fn has_affiliate_link(&self) -> bool {
        self.affiliate_link
            .as_deref()
            .is_some_and(|l| !l.trim().is_empty())
    }

    /// Whether a title could be generated for this artifact and is missing.
    pub fn needs_title(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        !present(&self.title) && present(&self.script)
    }
}

/// Metadata changes applied by [`ArtifactStore::edit`].
///
/// `None` leaves a field alone; `Some("")` clears it.
#[derive(Debug, Clone, Default)]
pub struct ArtifactEdit {
    pub title: Option<String>,
    pub category: Option<String>,
    pub affiliate_link: Option<String>,
}

impl ArtifactEdit {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.category.is_none() && self.affiliate_link.is_none()
    }

    fn apply(self, artifact: &mut Artifact) {
        fn set(field: &mut Option<String>, value: Option<String>) {
            if let Some(value) = value {
                let value = value.trim().to_string();
                *field = if value.is_empty() { None } else { Some(value) };
            }
        }
        set(&mut artifact.title, self.title);
        set(&mut artifact.category, self.category);
        set(&mut artifact.affiliate_link, self.affiliate_link);
    }
}

/// URLs of media objects written by [`ArtifactStore::put_media`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMedia {
    pub public_url: String,
    pub thumbnail_url: Option<String>,
    pub original_url: Option<String>,
}

/// Per-artifact metadata objects plus their media.
///
/// Mutations that change what the gallery shows go through here so the
/// snapshot is refreshed alongside the artifact object.
#[derive(Clone)]
pub struct ArtifactStore {
    store: TenantStore,
    gallery: Gallery,
    media: MediaConfig,
}

impl ArtifactStore {
    pub fn new(store: TenantStore, media: MediaConfig) -> Self {
        let gallery = Gallery::new(store.clone());
        Self {
            store,
            gallery,
            media,
        }
    }

    pub fn gallery(&self) -> &Gallery {
        &self.gallery
    }

    pub async fn get(&self, id: &str) -> Result<Option<Artifact>> {
        Ok(self.store.get_json(&keys::artifact(id)).await?)
    }

    pub async fn require(&self, id: &str) -> Result<Artifact> {
        self.get(id)
            .await?
            .ok_or_else(|| ClipcastError::ArtifactNotFound(id.to_string()))
    }

    /// Writes the metadata object only. Callers publishing a new artifact
    /// follow up with [`Gallery::upsert`].
    pub async fn put(&self, artifact: &Artifact) -> Result<()> {
        self.store
            .put_json(&keys::artifact(&artifact.id), artifact)
            .await?;
        Ok(())
    }

    /// Ids of every stored artifact object, sorted.
    pub async fn list_ids(&self) -> Result<Vec<String>> {
        let objects = self.store.list(Some(keys::ARTIFACTS_PREFIX)).await?;
        Ok(objects
            .iter()
            .filter_map(|meta| keys::id_from_json_key(&meta.key, keys::ARTIFACTS_PREFIX))
            .map(str::to_string)
            .collect())
    }

    /// Artifacts with a script but no title, oldest first. Read from the
    /// artifact objects; undecodable ones are skipped.
    pub async fn untitled(&self) -> Result<Vec<Artifact>> {
        let mut untitled = Vec::new();
        for id in self.list_ids().await? {
            match self.get(&id).await {
                Ok(Some(artifact)) if artifact.needs_title() => untitled.push(artifact),
                Ok(_) => {}
                Err(e) => log::warn!("Skipping artifact {}: {}", id, e),
            }
        }
        untitled.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(untitled)
    }

    /// Writes the dubbed media, and the thumbnail and original when present.
    pub async fn put_media(
        &self,
        id: &str,
        media: Bytes,
        thumbnail: Option<Bytes>,
        original: Option<Bytes>,
    ) -> Result<StoredMedia> {
        let tenant = self.store.tenant();

        let media_key = keys::media(id);
        self.store.put(&media_key, media).await?;

        let thumbnail_url = match thumbnail {
            Some(data) => {
                let key = keys::thumbnail(id);
                self.store.put(&key, data).await?;
                Some(self.media.public_url(tenant, &key))
            }
            None => None,
        };

        let original_url = match original {
            Some(data) => {
                let key = keys::original_media(id);
                self.store.put(&key, data).await?;
                Some(self.media.public_url(tenant, &key))
            }
            None => None,
        };

        Ok(StoredMedia {
            public_url: self.media.public_url(tenant, &media_key),
            thumbnail_url,
            original_url,
        })
    }

    /// Applies `edit` to a stored artifact and refreshes the gallery.
    pub async fn edit(&self, id: &str, edit: ArtifactEdit) -> Result<Artifact> {
        let mut artifact = self.require(id).await?;
        edit.apply(&mut artifact);
        self.put(&artifact).await?;
        self.gallery.upsert(&artifact.id).await?;
        Ok(artifact)
    }

    /// Removes the artifact, its media and its gallery entry.
    ///
    /// Publish records referencing the artifact are left untouched.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let existed = self.store.exists(&keys::artifact(id)).await?;
        for key in [
            keys::artifact(id),
            keys::media(id),
            keys::thumbnail(id),
            keys::original_media(id),
        ] {
            self.store.delete(&key).await?;
        }
        self.gallery.remove(id).await?;
        if existed {
            log::info!("Deleted artifact {}", id);
        }
        Ok(existed)
    }
}
