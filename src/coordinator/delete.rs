use std::sync::Arc;

use super::error::StorageError;
use super::locks::IdLocks;
use crate::index::{DeleteTransaction, ImageIndex, ImageRecord};
use crate::node::client::NodeClient;
use crate::node::protocol::addr_from_url;

/// Runs the delete protocol: look up, stage the row delete, remove the blob,
/// then commit or roll back.
pub struct DeleteCoordinator<I> {
    index: Arc<I>,
    node_client: Arc<NodeClient>,
    locks: Arc<IdLocks>,
}

impl<I: ImageIndex> DeleteCoordinator<I> {
    pub fn new(index: Arc<I>, node_client: Arc<NodeClient>, locks: Arc<IdLocks>) -> Self {
        Self {
            index,
            node_client,
            locks,
        }
    }

    /// Removes the index row and the remote blob as one logical operation.
    ///
    /// The row is deleted inside an open transaction while the remote delete
    /// runs; the transaction commits only on a confirmed remote success, so
    /// there is no window where the row is gone but the blob's fate is
    /// unknown. The transaction's connection is pinned for the duration of
    /// the remote call, which the node client bounds with its timeout.
    pub async fn delete(&self, image_id: &str) -> Result<(), StorageError> {
        let _guard = self.locks.acquire(image_id).await;

        let Some(record) = self.index.find_image(image_id).await? else {
            return Err(StorageError::NotFound);
        };
        let addr = owning_node(&record)?.to_string();

        let tx = self.index.begin_delete(image_id).await?;
        match self.node_client.delete_image(&addr, image_id).await {
            Ok(()) => {
                tx.commit().await?;
                tracing::info!("deleted image {} from node {}", image_id, addr);
                Ok(())
            }
            Err(source) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::error!(
                        "rollback after failed remote delete of {}: {}",
                        image_id,
                        rollback_err
                    );
                }
                Err(StorageError::RemoteDelete { addr, source })
            }
        }
    }
}

/// Derives the owning node's address from the record's stored URL.
pub fn owning_node(record: &ImageRecord) -> Result<&str, StorageError> {
    addr_from_url(&record.path)
        .ok_or_else(|| StorageError::MalformedPath(record.image_id.clone()))
}
