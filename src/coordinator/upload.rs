use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::error::StorageError;
use super::locks::IdLocks;
use crate::index::{ImageIndex, ImageRecord};
use crate::node::client::NodeClient;
use crate::node::protocol::ENDPOINT_DOWNLOAD;
use crate::placement::prober::CapacityProber;
use crate::placement::selector::NodeSelector;

/// Owner recorded when the upload form carries no user id.
pub const ANONYMOUS_USER: &str = "anonymous";

/// An inbound image, already extracted from the multipart form.
#[derive(Debug)]
pub struct IncomingImage {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub content_type: String,
    pub user_id: Option<String>,
}

/// What a successful upload returns to the client.
#[derive(Debug)]
pub struct UploadReceipt {
    pub image_id: String,
    pub download_url: String,
}

/// Runs the upload protocol: place, transmit, record, compensate.
pub struct UploadCoordinator<I> {
    index: Arc<I>,
    prober: Arc<CapacityProber>,
    selector: NodeSelector,
    node_client: Arc<NodeClient>,
    locks: Arc<IdLocks>,
}

impl<I: ImageIndex> UploadCoordinator<I> {
    pub fn new(
        index: Arc<I>,
        prober: Arc<CapacityProber>,
        selector: NodeSelector,
        node_client: Arc<NodeClient>,
        locks: Arc<IdLocks>,
    ) -> Self {
        Self {
            index,
            prober,
            selector,
            node_client,
            locks,
        }
    }

    /// The core protocol. Single-shot: no step is retried internally, and a
    /// caller retrying the whole operation gets a fresh image id, so repeats
    /// can never collide.
    ///
    /// Side effects by outcome:
    /// - validation or selection failure: none;
    /// - transmit failure: none;
    /// - index failure: one blob written, then one best-effort remote delete
    ///   (an orphan survives only if that cleanup also fails);
    /// - success: exactly one blob and one index row.
    pub async fn upload(&self, image: IncomingImage) -> Result<UploadReceipt, StorageError> {
        if image.bytes.is_empty() {
            return Err(StorageError::EmptyImage);
        }
        let user_id = image
            .user_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| ANONYMOUS_USER.to_string());

        let image_id = Uuid::new_v4().to_string();
        let _guard = self.locks.acquire(&image_id).await;

        let probes = self.prober.probe_all().await;
        if probes.is_empty() {
            return Err(StorageError::NoNodeAvailable);
        }
        let addr = self.selector.choose(&probes).to_string();

        let stored = self
            .node_client
            .upload_image(
                &addr,
                &image_id,
                &image.file_name,
                &image.content_type,
                image.bytes,
            )
            .await
            .map_err(|source| StorageError::Transmit {
                addr: addr.clone(),
                source,
            })?;
        tracing::info!(
            "stored image {} on node {} ({} bytes)",
            image_id,
            addr,
            stored.image.size
        );

        // The download URL comes from the node we chose and the id we
        // generated, never from anything the client supplied.
        let download_url = format!("http://{}{}/{}", addr, ENDPOINT_DOWNLOAD, image_id);
        let record = ImageRecord {
            image_id: image_id.clone(),
            user_id,
            image_name: image.file_name,
            path: download_url.clone(),
            created_at: Utc::now(),
        };

        if let Err(source) = self.index.insert_image(&record).await {
            // The blob is already on the node; remove it before surfacing
            // the index failure so the two halves stay in agreement.
            tracing::error!(
                "index insert for image {} failed ({}), removing blob from {}",
                image_id,
                source,
                addr
            );
            if let Err(cleanup) = self.node_client.delete_image(&addr, &image_id).await {
                // Best-effort only. The orphaned blob is now invisible to the
                // index and waits for an out-of-band reconciliation sweep.
                tracing::warn!(
                    "orphan cleanup for image {} on {} failed: {}",
                    image_id,
                    addr,
                    cleanup
                );
            }
            return Err(StorageError::IndexWrite { image_id, source });
        }

        Ok(UploadReceipt {
            image_id,
            download_url,
        })
    }
}
