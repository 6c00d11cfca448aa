//! In-process stub storage node used by tests.
//!
//! Implements the node wire contract on a real socket (`127.0.0.1:0`) so the
//! client, prober and coordinators are exercised over actual HTTP. Behavior
//! is scripted through shared flags, and call counters let tests assert which
//! remote operations an exercise did (or did not) perform.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use axum::extract::{Extension, Multipart, Path};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use dashmap::DashMap;

use crate::node::protocol::{
    CapacityReport, NodeErrorBody, NodeMessageBody, NodeUploadResponse, StoredImage,
};

#[derive(Clone)]
pub struct StubNodeState {
    pub total_storage: u64,
    pub used_base: u64,
    pub blobs: Arc<DashMap<String, Vec<u8>>>,
    pub capacity_calls: Arc<AtomicUsize>,
    pub upload_calls: Arc<AtomicUsize>,
    pub delete_calls: Arc<AtomicUsize>,
    pub fail_uploads: Arc<AtomicBool>,
    pub fail_deletes: Arc<AtomicBool>,
    pub hang_capacity: Arc<AtomicBool>,
}

impl StubNodeState {
    pub fn with_capacity(total_storage: u64, used_base: u64) -> Self {
        Self {
            total_storage,
            used_base,
            blobs: Arc::new(DashMap::new()),
            capacity_calls: Arc::new(AtomicUsize::new(0)),
            upload_calls: Arc::new(AtomicUsize::new(0)),
            delete_calls: Arc::new(AtomicUsize::new(0)),
            fail_uploads: Arc::new(AtomicBool::new(false)),
            fail_deletes: Arc::new(AtomicBool::new(false)),
            hang_capacity: Arc::new(AtomicBool::new(false)),
        }
    }

    fn used_storage(&self) -> u64 {
        let blob_bytes: u64 = self
            .blobs
            .iter()
            .map(|entry| entry.value().len() as u64)
            .sum();
        self.used_base + blob_bytes
    }
}

pub struct StubNode {
    pub addr: String,
    pub state: StubNodeState,
}

impl StubNode {
    pub fn capacity_calls(&self) -> usize {
        self.state.capacity_calls.load(Ordering::SeqCst)
    }

    pub fn upload_calls(&self) -> usize {
        self.state.upload_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.state.delete_calls.load(Ordering::SeqCst)
    }

    pub fn blob(&self, image_id: &str) -> Option<Vec<u8>> {
        self.state
            .blobs
            .get(image_id)
            .map(|blob| blob.value().clone())
    }
}

pub async fn spawn_stub_node(state: StubNodeState) -> StubNode {
    let app = Router::new()
        .route("/get-available-storage", get(capacity))
        .route("/upload", post(upload))
        .route("/download/:image_id", get(download))
        .route("/delete/:image_id", delete(remove))
        .layer(Extension(state.clone()));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    StubNode { addr, state }
}

/// An address nothing listens on: bind an ephemeral port, then drop it.
pub fn unreachable_addr() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);
    addr
}

async fn capacity(
    Extension(state): Extension<StubNodeState>,
) -> (StatusCode, Json<CapacityReport>) {
    if state.hang_capacity.load(Ordering::SeqCst) {
        tokio::time::sleep(Duration::from_secs(60)).await;
    }
    state.capacity_calls.fetch_add(1, Ordering::SeqCst);
    let used = state.used_storage();
    (
        StatusCode::OK,
        Json(CapacityReport {
            total_storage: state.total_storage,
            used_storage: used,
            available_storage: state.total_storage.saturating_sub(used),
        }),
    )
}

async fn upload(
    Extension(state): Extension<StubNodeState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<NodeUploadResponse>), (StatusCode, Json<NodeErrorBody>)> {
    state.upload_calls.fetch_add(1, Ordering::SeqCst);
    if state.fail_uploads.load(Ordering::SeqCst) {
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(NodeErrorBody {
                error: "disk failure".to_string(),
            }),
        ));
    }

    let mut image_id = None;
    let mut file_name = None;
    let mut mimetype = None;
    let mut bytes = None;
    while let Some(field) = multipart.next_field().await.map_err(|err| {
        (
            StatusCode::BAD_REQUEST,
            Json(NodeErrorBody {
                error: err.to_string(),
            }),
        )
    })? {
        match field.name() {
            Some("id_image") => image_id = field.text().await.ok(),
            Some("image") => {
                file_name = field.file_name().map(|name| name.to_string());
                mimetype = field.content_type().map(|mime| mime.to_string());
                bytes = field.bytes().await.ok().map(|data| data.to_vec());
            }
            _ => {}
        }
    }

    let (Some(image_id), Some(bytes)) = (image_id, bytes) else {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(NodeErrorBody {
                error: "No image file provided".to_string(),
            }),
        ));
    };

    let extension = file_name
        .as_deref()
        .and_then(|name| name.rsplit_once('.').map(|(_, ext)| ext.to_string()))
        .unwrap_or_else(|| "bin".to_string());
    let filename = format!("{}.{}", image_id, extension);
    let size = bytes.len() as u64;
    state.blobs.insert(image_id.clone(), bytes);

    Ok((
        StatusCode::CREATED,
        Json(NodeUploadResponse {
            message: "Image uploaded successfully".to_string(),
            image: StoredImage {
                id: image_id,
                filename: filename.clone(),
                original_name: file_name,
                mimetype,
                size,
                path: Some(format!("uploads/images/{}", filename)),
            },
        }),
    ))
}

async fn download(
    Extension(state): Extension<StubNodeState>,
    Path(image_id): Path<String>,
) -> Response {
    match state.blobs.get(&image_id) {
        Some(blob) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/octet-stream")],
            blob.value().clone(),
        )
            .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(NodeErrorBody {
                error: "Image not found".to_string(),
            }),
        )
            .into_response(),
    }
}

async fn remove(
    Extension(state): Extension<StubNodeState>,
    Path(image_id): Path<String>,
) -> Result<Json<NodeMessageBody>, (StatusCode, Json<NodeErrorBody>)> {
    state.delete_calls.fetch_add(1, Ordering::SeqCst);
    if state.fail_deletes.load(Ordering::SeqCst) {
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(NodeErrorBody {
                error: "disk failure".to_string(),
            }),
        ));
    }
    match state.blobs.remove(&image_id) {
        Some(_) => Ok(Json(NodeMessageBody {
            message: "Image deleted successfully".to_string(),
        })),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(NodeErrorBody {
                error: "Image not found".to_string(),
            }),
        )),
    }
}
