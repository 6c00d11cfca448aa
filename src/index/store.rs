use async_trait::async_trait;

use super::types::{ImageRecord, IndexError};

/// The seam between the coordinators and the system of record.
#[async_trait]
pub trait ImageIndex: Send + Sync {
    /// Persists one record. Rejects an already-used image id with
    /// [`IndexError::DuplicateId`].
    async fn insert_image(&self, record: &ImageRecord) -> Result<(), IndexError>;

    async fn find_image(&self, image_id: &str) -> Result<Option<ImageRecord>, IndexError>;

    /// All records, newest creation time first. No pagination.
    async fn list_images(&self) -> Result<Vec<ImageRecord>, IndexError>;

    /// Opens a transaction and deletes the row for `image_id` inside it
    /// without committing. The row stays visible to every other connection
    /// until [`DeleteTransaction::commit`]; [`DeleteTransaction::rollback`]
    /// restores it. The underlying connection is held until either is called,
    /// so the caller must settle the transaction promptly.
    async fn begin_delete(&self, image_id: &str) -> Result<Box<dyn DeleteTransaction>, IndexError>;
}

/// An open transaction holding one uncommitted row deletion.
#[async_trait]
pub trait DeleteTransaction: Send {
    async fn commit(self: Box<Self>) -> Result<(), IndexError>;

    async fn rollback(self: Box<Self>) -> Result<(), IndexError>;
}
