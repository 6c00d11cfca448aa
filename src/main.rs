use axum::Json;
use axum::extract::{DefaultBodyLimit, Extension, Multipart, Path, Query};
use axum::http::StatusCode;
use axum::response::Response;
use axum::{
    Router,
    routing::{delete, get, post},
};
use image_cluster::config::AppConfig;
use image_cluster::coordinator::delete::DeleteCoordinator;
use image_cluster::coordinator::handlers::*;
use image_cluster::coordinator::locks::IdLocks;
use image_cluster::coordinator::protocol::{
    DeleteParams, ImageListEntry, MessageBody, UploadResponse,
};
use image_cluster::coordinator::upload::UploadCoordinator;
use image_cluster::describe::{DescriptionClient, handle_describe};
use image_cluster::index::mysql::MySqlImageIndex;
use image_cluster::node::client::NodeClient;
use image_cluster::placement::prober::CapacityProber;
use image_cluster::placement::selector::NodeSelector;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!(
        "Starting coordinator with {} storage node(s): {:?}",
        config.storage_nodes.len(),
        config.storage_nodes
    );

    // 1. Index store (lazy pools - the database may come up after us):
    let index = Arc::new(MySqlImageIndex::connect_lazy(
        &config.mysql_read_uri,
        &config.mysql_write_uri,
    )?);

    // 2. Node transport + placement:
    let node_client = Arc::new(NodeClient::new(
        config.probe_timeout,
        config.transfer_timeout,
    ));
    let prober = Arc::new(CapacityProber::new(
        config.storage_nodes.clone(),
        node_client.clone(),
    ));
    let selector = NodeSelector::new(config.fallback_node().to_string());

    // 3. Coordinators sharing one per-id lock registry:
    let locks = Arc::new(IdLocks::new());
    let upload_coordinator = Arc::new(UploadCoordinator::new(
        index.clone(),
        prober.clone(),
        selector,
        node_client.clone(),
        locks.clone(),
    ));
    let delete_coordinator = Arc::new(DeleteCoordinator::new(
        index.clone(),
        node_client.clone(),
        locks,
    ));

    // 4. HTTP Router:
    let app = Router::new()
        .route("/health", get(handle_health))
        .route("/api/storage/upload", post(upload_image_handler))
        .route("/api/storage/images", get(list_images_handler))
        .route("/api/storage/image/:image_id", get(download_image_handler))
        .route("/api/storage/image", delete(delete_image_handler))
        .route("/api/storage/info", get(handle_storage_info));

    let app = match &config.description_api_url {
        Some(url) => {
            tracing::info!("Captioning proxy enabled towards {}", url);
            let describe_client = Arc::new(DescriptionClient::new(
                url.clone(),
                config.transfer_timeout,
            ));
            app.route("/api/storage/describe", post(handle_describe))
                .layer(Extension(describe_client))
        }
        None => app,
    };

    let app = app
        .layer(Extension(upload_coordinator))
        .layer(Extension(delete_coordinator))
        .layer(Extension(index))
        .layer(Extension(node_client))
        .layer(Extension(prober))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes));

    // 5. Start HTTP server:
    tracing::info!("HTTP server listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// Concrete wrappers around the generic handlers, pinned to the MySQL index.

async fn upload_image_handler(
    coordinator: Extension<Arc<UploadCoordinator<MySqlImageIndex>>>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), (StatusCode, Json<MessageBody>)> {
    handle_upload::<MySqlImageIndex>(coordinator, multipart).await
}

async fn delete_image_handler(
    coordinator: Extension<Arc<DeleteCoordinator<MySqlImageIndex>>>,
    params: Query<DeleteParams>,
) -> (StatusCode, Json<MessageBody>) {
    handle_delete::<MySqlImageIndex>(coordinator, params).await
}

async fn list_images_handler(
    index: Extension<Arc<MySqlImageIndex>>,
) -> Result<Json<Vec<ImageListEntry>>, (StatusCode, Json<MessageBody>)> {
    handle_list_images::<MySqlImageIndex>(index).await
}

async fn download_image_handler(
    index: Extension<Arc<MySqlImageIndex>>,
    node_client: Extension<Arc<NodeClient>>,
    image_id: Path<String>,
) -> Response {
    handle_download::<MySqlImageIndex>(index, node_client, image_id).await
}
