use std::sync::Arc;

use axum::extract::{Extension, Multipart, Path, Query};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;

use super::delete::{DeleteCoordinator, owning_node};
use super::error::StorageError;
use super::protocol::{
    DeleteParams, ImageListEntry, MessageBody, NodeStatus, StorageInfoResponse, UploadResponse,
};
use super::upload::{IncomingImage, UploadCoordinator};
use crate::index::ImageIndex;
use crate::node::client::{NodeClient, NodeError};
use crate::placement::prober::CapacityProber;

type ErrorBody = (StatusCode, Json<MessageBody>);

fn error_body(err: &StorageError) -> ErrorBody {
    (
        err.status(),
        Json(MessageBody {
            message: err.to_string(),
        }),
    )
}

fn bad_request(message: String) -> ErrorBody {
    (StatusCode::BAD_REQUEST, Json(MessageBody { message }))
}

pub async fn handle_upload<I>(
    Extension(coordinator): Extension<Arc<UploadCoordinator<I>>>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), ErrorBody>
where
    I: ImageIndex + 'static,
{
    let image = read_upload_form(multipart).await?;

    match coordinator.upload(image).await {
        Ok(receipt) => Ok((
            StatusCode::CREATED,
            Json(UploadResponse {
                image_id: receipt.image_id,
                download_url: receipt.download_url,
            }),
        )),
        Err(err) => {
            tracing::error!("upload failed: {}", err);
            Err(error_body(&err))
        }
    }
}

/// Pulls the `image` file part and the optional `id_user` field out of the
/// multipart form. A missing file part is the only hard failure here; the
/// coordinator validates the payload itself.
async fn read_upload_form(mut multipart: Multipart) -> Result<IncomingImage, ErrorBody> {
    let mut file = None;
    let mut user_id = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => return Err(bad_request(err.to_string())),
        };
        match field.name() {
            Some("image") => {
                let file_name = field
                    .file_name()
                    .map(|name| name.to_string())
                    .unwrap_or_else(|| "upload".to_string());
                let content_type = field
                    .content_type()
                    .map(|mime| mime.to_string())
                    .unwrap_or_else(|| "application/octet-stream".to_string());
                let bytes = match field.bytes().await {
                    Ok(bytes) => bytes.to_vec(),
                    Err(err) => return Err(bad_request(err.to_string())),
                };
                file = Some((file_name, content_type, bytes));
            }
            Some("id_user") => {
                user_id = field.text().await.ok();
            }
            _ => {}
        }
    }

    let Some((file_name, content_type, bytes)) = file else {
        return Err(error_body(&StorageError::MissingImage));
    };
    Ok(IncomingImage {
        bytes,
        file_name,
        content_type,
        user_id,
    })
}

pub async fn handle_delete<I>(
    Extension(coordinator): Extension<Arc<DeleteCoordinator<I>>>,
    Query(params): Query<DeleteParams>,
) -> (StatusCode, Json<MessageBody>)
where
    I: ImageIndex + 'static,
{
    match coordinator.delete(&params.image_id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(MessageBody {
                message: "Image deleted successfully".to_string(),
            }),
        ),
        Err(err) => {
            tracing::error!("delete of {} failed: {}", params.image_id, err);
            error_body(&err)
        }
    }
}

pub async fn handle_list_images<I>(
    Extension(index): Extension<Arc<I>>,
) -> Result<Json<Vec<ImageListEntry>>, ErrorBody>
where
    I: ImageIndex + 'static,
{
    match index.list_images().await {
        Ok(records) => Ok(Json(
            records
                .into_iter()
                .map(|record| ImageListEntry {
                    image_id: record.image_id,
                    path: record.path,
                    user_id: record.user_id,
                })
                .collect(),
        )),
        Err(err) => {
            tracing::error!("image listing failed: {}", err);
            Err(error_body(&StorageError::Index(err)))
        }
    }
}

/// Proxies the blob bytes from the owning node, so clients that cannot reach
/// the node network directly still get their image back.
pub async fn handle_download<I>(
    Extension(index): Extension<Arc<I>>,
    Extension(node_client): Extension<Arc<NodeClient>>,
    Path(image_id): Path<String>,
) -> Response
where
    I: ImageIndex + 'static,
{
    let record = match index.find_image(&image_id).await {
        Ok(Some(record)) => record,
        Ok(None) => return error_body(&StorageError::NotFound).into_response(),
        Err(err) => {
            tracing::error!("lookup of {} failed: {}", image_id, err);
            return error_body(&StorageError::Index(err)).into_response();
        }
    };
    let addr = match owning_node(&record) {
        Ok(addr) => addr.to_string(),
        Err(err) => return error_body(&err).into_response(),
    };

    match node_client.download_image(&addr, &image_id).await {
        Ok((bytes, content_type)) => {
            let content_type =
                content_type.unwrap_or_else(|| "application/octet-stream".to_string());
            ([(header::CONTENT_TYPE, content_type)], bytes).into_response()
        }
        Err(NodeError::NotFound { .. }) => {
            // Index row without a blob: the halves diverged.
            tracing::warn!("index references {} but node {} has no blob", image_id, addr);
            error_body(&StorageError::NotFound).into_response()
        }
        Err(err) => {
            tracing::error!("download of {} from {} failed: {}", image_id, addr, err);
            (
                StatusCode::BAD_GATEWAY,
                Json(MessageBody {
                    message: err.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// Runs a fresh probe round and reports the per-node snapshot.
pub async fn handle_storage_info(
    Extension(prober): Extension<Arc<CapacityProber>>,
) -> Json<StorageInfoResponse> {
    let probes = prober.probe_all().await;
    Json(StorageInfoResponse {
        timestamp: Utc::now(),
        nodes: probes.iter().map(NodeStatus::from).collect(),
    })
}

pub async fn handle_health() -> Json<MessageBody> {
    Json(MessageBody {
        message: "ok".to_string(),
    })
}
