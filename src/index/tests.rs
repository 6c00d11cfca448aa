//! Index Module Tests
//!
//! Covers the in-memory implementation the protocol tests depend on: the
//! semantics here must match what MySQL would do (staged deletes, duplicate
//! rejection, newest-first listing) or the coordinator tests prove nothing.

use chrono::{TimeZone, Utc};

use crate::index::memory::InMemoryIndex;
use crate::index::types::{ImageRecord, IndexError};
use crate::index::{DeleteTransaction, ImageIndex};

fn record(image_id: &str, minute: u32) -> ImageRecord {
    ImageRecord {
        image_id: image_id.to_string(),
        user_id: "user-1".to_string(),
        image_name: format!("{}.png", image_id),
        path: format!("http://10.0.0.5:4001/download/{}", image_id),
        created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap(),
    }
}

#[tokio::test]
async fn insert_then_find_round_trips() {
    let index = InMemoryIndex::new();
    index.insert_image(&record("img-1", 0)).await.unwrap();

    let found = index.find_image("img-1").await.unwrap().unwrap();
    assert_eq!(found.image_name, "img-1.png");
    assert!(index.find_image("img-2").await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_id_is_rejected() {
    let index = InMemoryIndex::new();
    index.insert_image(&record("img-1", 0)).await.unwrap();

    let err = index.insert_image(&record("img-1", 1)).await.unwrap_err();
    assert!(matches!(err, IndexError::DuplicateId(id) if id == "img-1"));
    assert_eq!(index.len(), 1);
}

#[tokio::test]
async fn list_is_newest_first() {
    let index = InMemoryIndex::new();
    index.insert_image(&record("img-old", 0)).await.unwrap();
    index.insert_image(&record("img-new", 30)).await.unwrap();
    index.insert_image(&record("img-mid", 15)).await.unwrap();

    let ids: Vec<String> = index
        .list_images()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.image_id)
        .collect();
    assert_eq!(ids, vec!["img-new", "img-mid", "img-old"]);
}

#[tokio::test]
async fn staged_delete_is_invisible_until_commit() {
    let index = InMemoryIndex::new();
    index.insert_image(&record("img-1", 0)).await.unwrap();

    let tx = index.begin_delete("img-1").await.unwrap();
    // Uncommitted: other readers still see the row.
    assert!(index.find_image("img-1").await.unwrap().is_some());

    tx.commit().await.unwrap();
    assert!(index.find_image("img-1").await.unwrap().is_none());
}

#[tokio::test]
async fn rollback_restores_the_row() {
    let index = InMemoryIndex::new();
    index.insert_image(&record("img-1", 0)).await.unwrap();

    let tx = index.begin_delete("img-1").await.unwrap();
    tx.rollback().await.unwrap();

    assert!(index.find_image("img-1").await.unwrap().is_some());
}

#[tokio::test]
async fn injected_insert_failure_fires_once() {
    let index = InMemoryIndex::new();
    index.fail_next_insert();

    let err = index.insert_image(&record("img-1", 0)).await.unwrap_err();
    assert!(matches!(err, IndexError::Unavailable(_)));
    assert!(index.is_empty());

    // The flag is one-shot; the retry with a fresh id succeeds.
    index.insert_image(&record("img-2", 1)).await.unwrap();
    assert_eq!(index.insert_attempts(), 2);
}

#[tokio::test]
async fn injected_commit_failure_leaves_the_row() {
    let index = InMemoryIndex::new();
    index.insert_image(&record("img-1", 0)).await.unwrap();
    index.fail_commit();

    let tx = index.begin_delete("img-1").await.unwrap();
    let err = tx.commit().await.unwrap_err();

    assert!(matches!(err, IndexError::Unavailable(_)));
    assert!(index.find_image("img-1").await.unwrap().is_some());
}
