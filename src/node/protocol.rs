//! Storage Node Wire Contract
//!
//! Endpoints and DTOs exposed by every storage node. The coordinator is a
//! client of this contract; the node side itself is an external collaborator
//! and is not implemented here (tests run against in-process stubs).

use serde::{Deserialize, Serialize};

// --- Node endpoints ---

/// Reports total/used/available bytes for the node's blob directory.
pub const ENDPOINT_CAPACITY: &str = "/get-available-storage";
/// Accepts a multipart upload (`id_image` text field + `image` file part).
pub const ENDPOINT_UPLOAD: &str = "/upload";
/// Serves the raw blob bytes for an image id.
pub const ENDPOINT_DOWNLOAD: &str = "/download";
/// Removes the blob for an image id.
pub const ENDPOINT_DELETE: &str = "/delete";

// --- Data Transfer Objects ---

/// Capacity snapshot returned by `GET /get-available-storage`.
///
/// The numbers are advisory: nodes compute `used` by summing file sizes on
/// disk, so concurrent writes can make a snapshot stale the moment it is
/// taken. Placement treats them as hints, not reservations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityReport {
    pub total_storage: u64,
    pub used_storage: u64,
    pub available_storage: u64,
}

/// Successful upload acknowledgment from a node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeUploadResponse {
    pub message: String,
    pub image: StoredImage,
}

/// Node-side description of a stored blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredImage {
    /// Echo of the `id_image` field the coordinator sent.
    pub id: String,
    /// On-disk filename (id plus the original extension).
    pub filename: String,
    #[serde(default)]
    pub original_name: Option<String>,
    #[serde(default)]
    pub mimetype: Option<String>,
    pub size: u64,
    #[serde(default)]
    pub path: Option<String>,
}

/// Error body nodes attach to non-2xx responses.
#[derive(Debug, Serialize, Deserialize)]
pub struct NodeErrorBody {
    pub error: String,
}

/// Acknowledgment body for a successful node-side delete.
#[derive(Debug, Serialize, Deserialize)]
pub struct NodeMessageBody {
    pub message: String,
}

/// Extracts the `host:port` part of a node-qualified URL such as
/// `http://10.0.0.5:4001/download/abc`. This is how the delete coordinator
/// recovers the owning node from an index record's stored path.
pub fn addr_from_url(url: &str) -> Option<&str> {
    let rest = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"))?;
    let end = rest.find('/').unwrap_or(rest.len());
    let addr = &rest[..end];
    if addr.is_empty() { None } else { Some(addr) }
}
