use axum::http::StatusCode;
use thiserror::Error;

use crate::index::IndexError;
use crate::node::client::NodeError;

/// Failure taxonomy for storage operations.
///
/// Every variant is scoped to a single operation; nothing here is fatal to
/// the process. The variants also encode what remote state exists when they
/// are raised, which is what the compensation logic keys off.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No `image` file part in the upload form. No side effects.
    #[error("please provide a file")]
    MissingImage,

    /// Zero-byte payload. Rejected before any network call.
    #[error("empty file provided")]
    EmptyImage,

    /// There was nothing to probe (no configured nodes reached the
    /// coordinator). Raised before any blob is sent.
    #[error("no storage node available")]
    NoNodeAvailable,

    /// The chosen node rejected the blob or was unreachable. No index row
    /// was created and no remote state exists, so nothing to compensate.
    #[error("upload to storage node {addr} failed")]
    Transmit {
        addr: String,
        #[source]
        source: NodeError,
    },

    /// The index insert failed after a successful transmit. By the time this
    /// is surfaced, one best-effort remote delete of the orphaned blob has
    /// been attempted.
    #[error("failed to record image {image_id}")]
    IndexWrite {
        image_id: String,
        #[source]
        source: IndexError,
    },

    /// No index row for the requested id.
    #[error("image not found in database")]
    NotFound,

    /// The stored path does not name a node address, so the owning node
    /// cannot be derived.
    #[error("stored path for image {0} is malformed")]
    MalformedPath(String),

    /// The remote blob delete failed; the index transaction was rolled back
    /// and the row preserved.
    #[error("delete on storage node {addr} failed")]
    RemoteDelete {
        addr: String,
        #[source]
        source: NodeError,
    },

    /// Index read or transaction failure outside the insert path.
    #[error("index error: {0}")]
    Index(#[from] IndexError),
}

impl StorageError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingImage | Self::EmptyImage => StatusCode::BAD_REQUEST,
            Self::NoNodeAvailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Transmit { .. } | Self::RemoteDelete { .. } => StatusCode::BAD_GATEWAY,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::IndexWrite { .. } | Self::MalformedPath(_) | Self::Index(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}
