use rand::Rng;

use crate::error::Result;
use crate::gallery::{Artifact, ArtifactStore};
use crate::ledger::Ledger;

/// Picks one unclaimed artifact uniformly at random.
///
/// Candidates are the stored artifact objects, not the gallery snapshot, so
/// an artifact written without its snapshot upsert is still eligible.
/// Objects that vanish or fail to decode between listing and reading are
/// skipped. Returns `None` when nothing is eligible.
pub async fn pick_artifact(artifacts: &ArtifactStore, ledger: &Ledger) -> Result<Option<Artifact>> {
    let claimed = ledger.claimed_artifact_ids()?;
    let mut candidates: Vec<String> = artifacts
        .list_ids()
        .await?
        .into_iter()
        .filter(|id| !claimed.contains(id))
        .collect();
    while !candidates.is_empty() {
        let index = rand::rng().random_range(0..candidates.len());
        let id = candidates.swap_remove(index);
        match artifacts.get(&id).await {
            Ok(Some(artifact)) => return Ok(Some(artifact)),
            Ok(None) => log::debug!("Artifact {} disappeared before it could be picked", id),
            Err(e) => log::warn!("Skipping artifact {}: {}", id, e),
        }
    }

    log::debug!("No unclaimed artifacts available");
    Ok(None)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;

    use super::*;
    use crate::config::MediaConfig;
    use crate::db::Database;
    use crate::store::{MemoryBlobStore, TenantStore};

    fn artifact(id: &str) -> Artifact {
        Artifact {
            id: id.to_string(),
            script: None,
            title: None,
            category: None,
            affiliate_link: None,
            public_url: format!("store:media/{id}.mp4"),
            thumbnail_url: None,
            original_url: None,
            duration_seconds: 15.0,
            created_at: Utc::now(),
            origin_chat_id: None,
        }
    }

    fn setup() -> (TenantStore, ArtifactStore, Ledger) {
        let store = TenantStore::new(Arc::new(MemoryBlobStore::new()), "t1").unwrap();
        let artifacts = ArtifactStore::new(store.clone(), MediaConfig::default());
        let ledger = Ledger::new(Database::open_in_memory().unwrap());
        (store, artifacts, ledger)
    }

    #[tokio::test]
    async fn test_claimed_artifacts_are_never_picked() {
        let (_store, artifacts, ledger) = setup();
        for id in ["a1", "a2"] {
            artifacts.put(&artifact(id)).await.unwrap();
            artifacts.gallery().upsert(id).await.unwrap();
        }
        ledger.begin("page-1", "a1", Utc::now(), None).unwrap();

        for _ in 0..20 {
            let picked = pick_artifact(&artifacts, &ledger).await.unwrap().unwrap();
            assert_eq!(picked.id, "a2");
        }
    }

    #[tokio::test]
    async fn test_empty_gallery_picks_nothing() {
        let (_store, artifacts, ledger) = setup();
        assert!(pick_artifact(&artifacts, &ledger).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_artifact_without_snapshot_entry_is_eligible() {
        let (_store, artifacts, ledger) = setup();
        artifacts.put(&artifact("listed")).await.unwrap();
        artifacts.gallery().upsert("listed").await.unwrap();
        // Stored without the follow-up upsert.
        artifacts.put(&artifact("orphan")).await.unwrap();
        ledger.begin("page-1", "listed", Utc::now(), None).unwrap();

        let picked = pick_artifact(&artifacts, &ledger).await.unwrap().unwrap();
        assert_eq!(picked.id, "orphan");
    }

    #[tokio::test]
    async fn test_stale_snapshot_entry_never_blocks_good_artifact() {
        let (store, artifacts, ledger) = setup();
        for id in ["good", "stale"] {
            artifacts.put(&artifact(id)).await.unwrap();
            artifacts.gallery().upsert(id).await.unwrap();
        }
        // Metadata removed without touching the snapshot.
        store.delete("artifacts/stale.json").await.unwrap();

        for _ in 0..40 {
            let picked = pick_artifact(&artifacts, &ledger).await.unwrap().unwrap();
            assert_eq!(picked.id, "good");
        }
    }

    #[tokio::test]
    async fn test_undecodable_artifact_is_skipped() {
        let (store, artifacts, ledger) = setup();
        artifacts.put(&artifact("good")).await.unwrap();
        store.put("artifacts/broken.json", "not json").await.unwrap();

        for _ in 0..20 {
            let picked = pick_artifact(&artifacts, &ledger).await.unwrap().unwrap();
            assert_eq!(picked.id, "good");
        }
    }
}
