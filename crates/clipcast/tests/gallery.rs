//! Gallery snapshot consistency tests.

mod common;

use clipcast::gallery::ArtifactEdit;
use clipcast::ledger::PublishStatus;

use common::harness::at;
use common::*;

#[tokio::test]
async fn test_rebuild_then_upsert_matches_fresh_rebuild() {
    let h = TestHarness::new();
    let empty = h.artifacts.gallery().rebuild().await.unwrap();
    assert!(empty.artifacts.is_empty());
    assert!(h.has_object("gallery-snapshot.json").await);
    assert!(h.artifacts.gallery().read().await.unwrap().artifacts.is_empty());

    for (id, day) in [("old", 1), ("mid", 2)] {
        h.artifacts
            .put(&ArtifactBuilder::new(id).created_at(at(2026, 2, day, 0, 0)).build())
            .await
            .unwrap();
    }
    h.artifacts.gallery().rebuild().await.unwrap();

    h.add_artifact(ArtifactBuilder::new("new").created_at(at(2026, 2, 3, 0, 0)).build())
        .await;
    let incremental = h.artifacts.gallery().read().await.unwrap();
    let rebuilt = h.artifacts.gallery().rebuild().await.unwrap();

    assert_eq!(incremental.ids(), vec!["new", "mid", "old"]);
    assert_eq!(incremental.ids(), rebuilt.ids());
    assert_eq!(incremental.artifacts, rebuilt.artifacts);
}

#[tokio::test]
async fn test_skipped_upsert_diverges_until_rebuild() {
    let h = TestHarness::new();
    h.add_artifact(ArtifactBuilder::new("listed").build()).await;
    // Metadata written without the follow-up upsert.
    h.artifacts
        .put(&ArtifactBuilder::new("orphan").created_at(at(2026, 2, 5, 0, 0)).build())
        .await
        .unwrap();

    let stale = h.artifacts.gallery().read().await.unwrap();
    assert_eq!(stale.ids(), vec!["listed"]);
    assert!(h.artifacts.gallery().available(&h.ledger).await.unwrap().len() == 1);

    let repaired = h.artifacts.gallery().rebuild().await.unwrap();
    assert_eq!(repaired.ids(), vec!["orphan", "listed"]);
    assert_eq!(h.artifacts.list_ids().await.unwrap(), vec!["listed", "orphan"]);
}

#[tokio::test]
async fn test_read_builds_missing_snapshot() {
    let h = TestHarness::new();
    h.artifacts
        .put(&ArtifactBuilder::new("a1").build())
        .await
        .unwrap();
    assert!(!h.has_object("gallery-snapshot.json").await);

    let snapshot = h.artifacts.gallery().read().await.unwrap();

    assert_eq!(snapshot.ids(), vec!["a1"]);
    assert!(h.has_object("gallery-snapshot.json").await);
}

#[tokio::test]
async fn test_edit_and_delete_keep_snapshot_in_step() {
    let h = TestHarness::new();
    h.add_artifact(ArtifactBuilder::new("a1").build()).await;
    h.add_artifact(ArtifactBuilder::new("a2").build()).await;

    let edited = h
        .artifacts
        .edit(
            "a1",
            ArtifactEdit {
                title: Some("Renamed".to_string()),
                category: Some(String::new()),
                affiliate_link: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(edited.title.as_deref(), Some("Renamed"));
    assert_eq!(edited.category, None);

    let snapshot = h.artifacts.gallery().read().await.unwrap();
    assert_eq!(
        snapshot.find("a1").and_then(|a| a.title.as_deref()),
        Some("Renamed")
    );

    assert!(h.artifacts.delete("a2").await.unwrap());
    assert!(!h.artifacts.delete("a2").await.unwrap());
    let snapshot = h.artifacts.gallery().read().await.unwrap();
    assert_eq!(snapshot.ids(), vec!["a1"]);
}

#[tokio::test]
async fn test_used_and_available_partition_gallery() {
    let h = TestHarness::new();
    h.add_target(TargetBuilder::new("page-1").build());
    h.add_artifact(ArtifactBuilder::new("a1").build()).await;
    h.add_artifact(ArtifactBuilder::new("a2").build()).await;
    h.add_artifact(ArtifactBuilder::new("a3").build()).await;

    let posting = h.ledger.begin("page-1", "a1", at(2026, 3, 1, 0, 0), None).unwrap();
    let failed = h.ledger.begin("page-1", "a2", at(2026, 3, 1, 0, 1), None).unwrap();
    h.ledger.mark_failed(failed, "start: boom").unwrap();

    let used: Vec<String> = h
        .artifacts
        .gallery()
        .used(&h.ledger)
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.id)
        .collect();
    let mut available: Vec<String> = h
        .artifacts
        .gallery()
        .available(&h.ledger)
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.id)
        .collect();
    available.sort();

    assert_eq!(used, vec!["a1"]);
    assert_eq!(available, vec!["a2", "a3"]);
    assert_eq!(h.ledger.get(posting).unwrap().unwrap().status, PublishStatus::Posting);
}
