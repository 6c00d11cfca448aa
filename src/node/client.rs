use std::time::Duration;

use reqwest::StatusCode;
use reqwest::multipart;
use thiserror::Error;

use super::protocol::{
    CapacityReport, ENDPOINT_CAPACITY, ENDPOINT_DELETE, ENDPOINT_DOWNLOAD, ENDPOINT_UPLOAD,
    NodeUploadResponse,
};

const FALLBACK_MIME: &str = "application/octet-stream";

/// Failure of a single call against a single node.
#[derive(Debug, Error)]
pub enum NodeError {
    /// Connection refused, DNS failure, timeout - the node never answered.
    #[error("request to node {addr} failed: {source}")]
    Transport {
        addr: String,
        #[source]
        source: reqwest::Error,
    },
    /// The node answered with a non-2xx status.
    #[error("node {addr} returned status {status}")]
    Status { addr: String, status: StatusCode },
    /// The node answered 2xx but the body did not parse.
    #[error("node {addr} sent a malformed response: {source}")]
    Malformed {
        addr: String,
        #[source]
        source: reqwest::Error,
    },
    /// The node does not hold a blob for the requested id.
    #[error("image not found on node {addr}")]
    NotFound { addr: String },
}

/// Shared HTTP client for the storage-node contract.
///
/// One instance is built at startup and handed to the prober and both
/// coordinators. Every call is single-shot: the per-call timeout converts a
/// slow node into a failure, and the caller decides what that failure means.
pub struct NodeClient {
    http: reqwest::Client,
    probe_timeout: Duration,
    transfer_timeout: Duration,
}

impl NodeClient {
    pub fn new(probe_timeout: Duration, transfer_timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            probe_timeout,
            transfer_timeout,
        }
    }

    /// `GET /get-available-storage` bounded by the probe timeout.
    pub async fn fetch_capacity(&self, addr: &str) -> Result<CapacityReport, NodeError> {
        let url = format!("http://{}{}", addr, ENDPOINT_CAPACITY);
        let response = self
            .http
            .get(url)
            .timeout(self.probe_timeout)
            .send()
            .await
            .map_err(|source| NodeError::Transport {
                addr: addr.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(NodeError::Status {
                addr: addr.to_string(),
                status: response.status(),
            });
        }

        response
            .json::<CapacityReport>()
            .await
            .map_err(|source| NodeError::Malformed {
                addr: addr.to_string(),
                source,
            })
    }

    /// `POST /upload` with the node's multipart form (`id_image` + `image`).
    pub async fn upload_image(
        &self,
        addr: &str,
        image_id: &str,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<NodeUploadResponse, NodeError> {
        // mime_str consumes the part on failure, so vet the type with a
        // throwaway part first and fall back rather than lose the payload.
        let mime = if multipart::Part::text(String::new())
            .mime_str(content_type)
            .is_ok()
        {
            content_type
        } else {
            FALLBACK_MIME
        };
        let part = multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime)
            .map_err(|source| NodeError::Malformed {
                addr: addr.to_string(),
                source,
            })?;
        let form = multipart::Form::new()
            .text("id_image", image_id.to_string())
            .part("image", part);

        let url = format!("http://{}{}", addr, ENDPOINT_UPLOAD);
        let response = self
            .http
            .post(url)
            .multipart(form)
            .timeout(self.transfer_timeout)
            .send()
            .await
            .map_err(|source| NodeError::Transport {
                addr: addr.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(NodeError::Status {
                addr: addr.to_string(),
                status: response.status(),
            });
        }

        response
            .json::<NodeUploadResponse>()
            .await
            .map_err(|source| NodeError::Malformed {
                addr: addr.to_string(),
                source,
            })
    }

    /// `GET /download/{id}`. Returns the blob bytes and the advertised
    /// content type, or `NotFound` on a node-side 404.
    pub async fn download_image(
        &self,
        addr: &str,
        image_id: &str,
    ) -> Result<(Vec<u8>, Option<String>), NodeError> {
        let url = format!("http://{}{}/{}", addr, ENDPOINT_DOWNLOAD, image_id);
        let response = self
            .http
            .get(url)
            .timeout(self.transfer_timeout)
            .send()
            .await
            .map_err(|source| NodeError::Transport {
                addr: addr.to_string(),
                source,
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(NodeError::NotFound {
                addr: addr.to_string(),
            });
        }
        if !response.status().is_success() {
            return Err(NodeError::Status {
                addr: addr.to_string(),
                status: response.status(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());
        let bytes = response
            .bytes()
            .await
            .map_err(|source| NodeError::Malformed {
                addr: addr.to_string(),
                source,
            })?;
        Ok((bytes.to_vec(), content_type))
    }

    /// `DELETE /delete/{id}`. A node-side 404 is reported as `NotFound`; the
    /// callers treat every error the same way (compensation logs it, the
    /// delete coordinator rolls back on it).
    pub async fn delete_image(&self, addr: &str, image_id: &str) -> Result<(), NodeError> {
        let url = format!("http://{}{}/{}", addr, ENDPOINT_DELETE, image_id);
        let response = self
            .http
            .delete(url)
            .timeout(self.transfer_timeout)
            .send()
            .await
            .map_err(|source| NodeError::Transport {
                addr: addr.to_string(),
                source,
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(NodeError::NotFound {
                addr: addr.to_string(),
            });
        }
        if !response.status().is_success() {
            return Err(NodeError::Status {
                addr: addr.to_string(),
                status: response.status(),
            });
        }
        Ok(())
    }
}
