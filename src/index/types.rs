use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// The durable half of a stored image.
///
/// Created by the upload coordinator after a successful node transmit,
/// deleted by the delete coordinator. Invariant (eventual): a record exists
/// iff exactly one node holds the blob named by `path`, except during the
/// compensation window of a failed operation.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct ImageRecord {
    pub image_id: String,
    pub user_id: String,
    /// Display name: the original filename the client uploaded.
    pub image_name: String,
    /// Node-qualified download URL, e.g. `http://10.0.0.5:4001/download/{id}`.
    pub path: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    /// An insert collided with an existing image id. Ids are generated
    /// server-side per attempt, so hitting this means a real bug or a
    /// deliberately replayed id; either way the insert is rejected.
    #[error("image id {0} already exists")]
    DuplicateId(String),
    /// Injected failure from the in-memory implementation (tests only).
    #[error("index unavailable: {0}")]
    Unavailable(String),
}
