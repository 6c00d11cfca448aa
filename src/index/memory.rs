use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use super::store::{DeleteTransaction, ImageIndex};
use super::types::{ImageRecord, IndexError};

/// In-memory index backing the consistency-protocol tests.
///
/// Mirrors the observable semantics of the MySQL implementation: a delete
/// opened with `begin_delete` is invisible to readers until committed, and a
/// rollback leaves the row untouched. Failure-injection flags force the
/// partial-failure paths the coordinators must compensate for, and call
/// counters let tests assert which index operations ran.
#[derive(Default)]
pub struct InMemoryIndex {
    rows: Arc<DashMap<String, ImageRecord>>,
    fail_next_insert: AtomicBool,
    fail_begin_delete: AtomicBool,
    fail_commit: AtomicBool,
    insert_attempts: AtomicUsize,
    delete_begins: AtomicUsize,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `insert_image` fail with `IndexError::Unavailable`.
    pub fn fail_next_insert(&self) {
        self.fail_next_insert.store(true, Ordering::SeqCst);
    }

    pub fn fail_begin_delete(&self) {
        self.fail_begin_delete.store(true, Ordering::SeqCst);
    }

    pub fn fail_commit(&self) {
        self.fail_commit.store(true, Ordering::SeqCst);
    }

    pub fn insert_attempts(&self) -> usize {
        self.insert_attempts.load(Ordering::SeqCst)
    }

    pub fn delete_begins(&self) -> usize {
        self.delete_begins.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait]
impl ImageIndex for InMemoryIndex {
    async fn insert_image(&self, record: &ImageRecord) -> Result<(), IndexError> {
        self.insert_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_next_insert.swap(false, Ordering::SeqCst) {
            return Err(IndexError::Unavailable("injected insert failure".into()));
        }
        if self.rows.contains_key(&record.image_id) {
            return Err(IndexError::DuplicateId(record.image_id.clone()));
        }
        self.rows.insert(record.image_id.clone(), record.clone());
        Ok(())
    }

    async fn find_image(&self, image_id: &str) -> Result<Option<ImageRecord>, IndexError> {
        Ok(self.rows.get(image_id).map(|entry| entry.value().clone()))
    }

    async fn list_images(&self) -> Result<Vec<ImageRecord>, IndexError> {
        let mut records: Vec<ImageRecord> =
            self.rows.iter().map(|entry| entry.value().clone()).collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn begin_delete(&self, image_id: &str) -> Result<Box<dyn DeleteTransaction>, IndexError> {
        self.delete_begins.fetch_add(1, Ordering::SeqCst);
        if self.fail_begin_delete.swap(false, Ordering::SeqCst) {
            return Err(IndexError::Unavailable("injected transaction failure".into()));
        }
        Ok(Box::new(InMemoryDeleteTransaction {
            rows: self.rows.clone(),
            image_id: image_id.to_string(),
            fail_commit: self.fail_commit.swap(false, Ordering::SeqCst),
        }))
    }
}

/// The staged deletion: the row is only removed at commit time, which is
/// when a real database makes the delete visible to other connections.
struct InMemoryDeleteTransaction {
    rows: Arc<DashMap<String, ImageRecord>>,
    image_id: String,
    fail_commit: bool,
}

#[async_trait]
impl DeleteTransaction for InMemoryDeleteTransaction {
    async fn commit(self: Box<Self>) -> Result<(), IndexError> {
        if self.fail_commit {
            return Err(IndexError::Unavailable("injected commit failure".into()));
        }
        self.rows.remove(&self.image_id);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), IndexError> {
        Ok(())
    }
}
