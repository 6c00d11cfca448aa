//! Node Transport Tests
//!
//! Exercises the client against in-process stub nodes over real sockets:
//! capacity parsing, multipart round-trips, status mapping and timeouts.

use std::sync::atomic::Ordering;
use std::time::Duration;

use crate::node::client::{NodeClient, NodeError};
use crate::testutil::{StubNodeState, spawn_stub_node, unreachable_addr};

fn client() -> NodeClient {
    NodeClient::new(Duration::from_millis(500), Duration::from_secs(5))
}

#[tokio::test]
async fn fetch_capacity_parses_report() {
    let node = spawn_stub_node(StubNodeState::with_capacity(100, 40)).await;

    let report = client().fetch_capacity(&node.addr).await.unwrap();

    assert_eq!(report.total_storage, 100);
    assert_eq!(report.used_storage, 40);
    assert_eq!(report.available_storage, 60);
}

#[tokio::test]
async fn fetch_capacity_times_out_on_hanging_node() {
    let node = spawn_stub_node(StubNodeState::with_capacity(100, 0)).await;
    node.state.hang_capacity.store(true, Ordering::SeqCst);

    let err = client().fetch_capacity(&node.addr).await.unwrap_err();

    assert!(matches!(err, NodeError::Transport { .. }), "got {:?}", err);
}

#[tokio::test]
async fn fetch_capacity_fails_fast_on_unreachable_node() {
    let err = client().fetch_capacity(&unreachable_addr()).await.unwrap_err();

    assert!(matches!(err, NodeError::Transport { .. }), "got {:?}", err);
}

#[tokio::test]
async fn upload_round_trips_blob() {
    let node = spawn_stub_node(StubNodeState::with_capacity(1 << 20, 0)).await;
    let payload = vec![7u8; 2048];

    let response = client()
        .upload_image(&node.addr, "img-1", "cat.png", "image/png", payload.clone())
        .await
        .unwrap();

    assert_eq!(response.image.id, "img-1");
    assert_eq!(response.image.size, payload.len() as u64);
    assert_eq!(response.image.filename, "img-1.png");
    assert_eq!(node.blob("img-1").unwrap(), payload);
}

#[tokio::test]
async fn upload_maps_node_rejection_to_status_error() {
    let node = spawn_stub_node(StubNodeState::with_capacity(1 << 20, 0)).await;
    node.state.fail_uploads.store(true, Ordering::SeqCst);

    let err = client()
        .upload_image(&node.addr, "img-1", "cat.png", "image/png", vec![1, 2, 3])
        .await
        .unwrap_err();

    assert!(matches!(err, NodeError::Status { .. }), "got {:?}", err);
    assert!(node.blob("img-1").is_none());
}

#[tokio::test]
async fn download_returns_stored_bytes() {
    let node = spawn_stub_node(StubNodeState::with_capacity(1 << 20, 0)).await;
    let payload = b"raw image bytes".to_vec();
    node.state.blobs.insert("img-2".to_string(), payload.clone());

    let (bytes, content_type) = client().download_image(&node.addr, "img-2").await.unwrap();

    assert_eq!(bytes, payload);
    assert_eq!(content_type.as_deref(), Some("application/octet-stream"));
}

#[tokio::test]
async fn download_of_unknown_id_is_not_found() {
    let node = spawn_stub_node(StubNodeState::with_capacity(1 << 20, 0)).await;

    let err = client().download_image(&node.addr, "missing").await.unwrap_err();

    assert!(matches!(err, NodeError::NotFound { .. }), "got {:?}", err);
}

#[tokio::test]
async fn delete_removes_blob_and_reports_missing_ids() {
    let node = spawn_stub_node(StubNodeState::with_capacity(1 << 20, 0)).await;
    node.state.blobs.insert("img-3".to_string(), vec![9u8; 16]);

    client().delete_image(&node.addr, "img-3").await.unwrap();
    assert!(node.blob("img-3").is_none());

    let err = client().delete_image(&node.addr, "img-3").await.unwrap_err();
    assert!(matches!(err, NodeError::NotFound { .. }), "got {:?}", err);
}
