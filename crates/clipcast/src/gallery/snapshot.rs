use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::artifact::Artifact;
use crate::error::Result;
use crate::ledger::Ledger;
use crate::store::{keys, TenantStore};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GallerySnapshot {
    pub artifacts: Vec<Artifact>,
    pub updated_at: DateTime<Utc>,
}

impl GallerySnapshot {
    fn new(mut artifacts: Vec<Artifact>) -> Self {
        artifacts.sort_by(newest_first);
        Self {
            artifacts,
            updated_at: Utc::now(),
        }
    }

    pub fn ids(&self) -> Vec<&str> {
        self.artifacts.iter().map(|a| a.id.as_str()).collect()
    }

    pub fn find(&self, id: &str) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.id == id)
    }
}

fn newest_first(a: &Artifact, b: &Artifact) -> Ordering {
    b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id))
}

/// Maintains `gallery-snapshot.json`, the denormalized artifact listing.
///
/// The snapshot is replaced as one object, so readers see either the old or
/// the new listing. `upsert` and `remove` are read-modify-write without a
/// lock: two concurrent writers can lose one update, which the next
/// `rebuild` repairs.
#[derive(Clone)]
pub struct Gallery {
    store: TenantStore,
}

impl Gallery {
    pub fn new(store: TenantStore) -> Self {
        Self { store }
    }

    /// Recomputes the snapshot from every artifact object.
    pub async fn rebuild(&self) -> Result<GallerySnapshot> {
        let objects = self.store.list(Some(keys::ARTIFACTS_PREFIX)).await?;

        let mut artifacts = Vec::with_capacity(objects.len());
        for meta in &objects {
            let Some(id) = keys::id_from_json_key(&meta.key, keys::ARTIFACTS_PREFIX) else {
                continue;
            };
            match self.store.get_json::<Artifact>(&meta.key).await {
                Ok(Some(artifact)) => artifacts.push(artifact),
                Ok(None) => {}
                Err(e) => log::warn!("Skipping artifact {} in gallery rebuild: {}", id, e),
            }
        }

        let snapshot = GallerySnapshot::new(artifacts);
        self.write(&snapshot).await?;
        log::info!("Gallery rebuilt with {} artifacts", snapshot.artifacts.len());
        Ok(snapshot)
    }

    /// Folds one artifact's current state into the snapshot. A missing
    /// artifact object leaves the snapshot untouched.
    pub async fn upsert(&self, artifact_id: &str) -> Result<()> {
        let Some(artifact) = self
            .store
            .get_json::<Artifact>(&keys::artifact(artifact_id))
            .await?
        else {
            log::debug!("Gallery upsert for {} skipped: no artifact object", artifact_id);
            return Ok(());
        };

        let mut artifacts = self.current().await?.map(|s| s.artifacts).unwrap_or_default();
        match artifacts.iter_mut().find(|a| a.id == artifact.id) {
            Some(existing) => *existing = artifact,
            None => artifacts.insert(0, artifact),
        }
        self.write(&GallerySnapshot::new(artifacts)).await
    }

    /// Drops one entry. Absent snapshot or entry is a no-op.
    pub async fn remove(&self, artifact_id: &str) -> Result<()> {
        let Some(mut snapshot) = self.current().await? else {
            return Ok(());
        };
        let before = snapshot.artifacts.len();
        snapshot.artifacts.retain(|a| a.id != artifact_id);
        if snapshot.artifacts.len() == before {
            return Ok(());
        }
        self.write(&GallerySnapshot::new(snapshot.artifacts)).await
    }

    /// Returns the snapshot, building it on first use.
    pub async fn read(&self) -> Result<GallerySnapshot> {
        match self.current().await? {
            Some(snapshot) => Ok(snapshot),
            None => self.rebuild().await,
        }
    }

    /// Gallery artifacts currently claimed by a publish record.
    pub async fn used(&self, ledger: &Ledger) -> Result<Vec<Artifact>> {
        let claimed = ledger.claimed_artifact_ids()?;
        Ok(self
            .read()
            .await?
            .artifacts
            .into_iter()
            .filter(|a| claimed.contains(&a.id))
            .collect())
    }

    /// Gallery artifacts no publish record has claimed.
    pub async fn available(&self, ledger: &Ledger) -> Result<Vec<Artifact>> {
        let claimed = ledger.claimed_artifact_ids()?;
        Ok(self
            .read()
            .await?
            .artifacts
            .into_iter()
            .filter(|a| !claimed.contains(&a.id))
            .collect())
    }

    async fn current(&self) -> Result<Option<GallerySnapshot>> {
        match self.store.get_json(keys::GALLERY_SNAPSHOT).await {
            Ok(snapshot) => Ok(snapshot),
            Err(crate::error::StoreError::Decode { .. }) => {
                log::warn!("Gallery snapshot is unreadable, treating it as absent");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, snapshot: &GallerySnapshot) -> Result<()> {
        self.store.put_json(keys::GALLERY_SNAPSHOT, snapshot).await?;
        Ok(())
    }
}
