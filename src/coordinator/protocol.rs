//! Coordinator API Protocol
//!
//! DTOs for the coordinator's own HTTP surface. Upload responses use the
//! camelCase shape existing clients expect; list entries mirror the index
//! rows verbatim.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::placement::types::NodeProbe;

/// Body of a successful upload: `201 {"imageId": ..., "downloadUrl": ...}`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub image_id: String,
    pub download_url: String,
}

/// Generic message body for acknowledgments and errors.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageBody {
    pub message: String,
}

/// One entry of the image listing, newest first.
#[derive(Debug, Serialize, Deserialize)]
pub struct ImageListEntry {
    pub image_id: String,
    pub path: String,
    pub user_id: String,
}

/// Query parameters of the delete endpoint: `?imageId=...`.
#[derive(Debug, Deserialize)]
pub struct DeleteParams {
    #[serde(rename = "imageId")]
    pub image_id: String,
}

/// Capacity snapshot of the whole cluster, one entry per configured node.
#[derive(Debug, Serialize)]
pub struct StorageInfoResponse {
    pub timestamp: DateTime<Utc>,
    pub nodes: Vec<NodeStatus>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeStatus {
    pub addr: String,
    pub available: bool,
    pub total_storage: Option<u64>,
    pub used_storage: Option<u64>,
    pub available_storage: Option<u64>,
}

impl From<&NodeProbe> for NodeStatus {
    fn from(probe: &NodeProbe) -> Self {
        match probe.capacity() {
            Some(capacity) => Self {
                addr: probe.addr.clone(),
                available: true,
                total_storage: Some(capacity.total),
                used_storage: Some(capacity.used),
                available_storage: Some(capacity.available),
            },
            None => Self {
                addr: probe.addr.clone(),
                available: false,
                total_storage: None,
                used_storage: None,
                available_storage: None,
            },
        }
    }
}
