//! Tests for the delete and reset endpoints

use axum::http::StatusCode;
use registry_server::config::StorageBackend;
use registry_server::storage::{LocalObjectStore, ObjectStore};
use registry_server::JsMinifier;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;

mod common;
use common::{
    lodash_metadata, recording_server, test_config, test_server_with, FailingStore,
};

fn url_submission() -> Value {
    json!({
        "metadata": lodash_metadata(),
        "data": { "URL": "https://github.com/lodash/lodash" }
    })
}

#[tokio::test]
async fn test_delete_package() {
    let (server, store) = recording_server();

    let created: Value = server.post("/package").json(&url_submission()).await.json();
    let id = created["id"].as_str().unwrap();

    let response = server.delete(&format!("/package/{}", id)).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert!(body["message"].as_str().unwrap().contains(id));
    assert!(store.inner().is_empty().await);

    let response = server.delete(&format!("/package/{}", id)).await;
    response.assert_status_not_found();
}

#[tokio::test]
async fn test_delete_rejects_malformed_id() {
    let (server, store) = recording_server();

    let response = server.delete("/package/not-an-id").await;
    response.assert_status_bad_request();
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn test_reset_clears_every_package() {
    let (server, store) = recording_server();

    for _ in 0..3 {
        server
            .post("/package")
            .json(&url_submission())
            .await
            .assert_status(StatusCode::CREATED);
    }
    assert_eq!(store.inner().len().await, 3);

    let response = server.delete("/reset").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["deleted"], 3);
    assert!(store.inner().is_empty().await);

    let body: Value = server.delete("/reset").await.json();
    assert_eq!(body["deleted"], 0);
}

#[tokio::test]
async fn test_reset_storage_failure() {
    let server = test_server_with(test_config(), Arc::new(FailingStore), Arc::new(JsMinifier));

    let response = server.delete("/reset").await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_local_backend_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = test_config();
    config.storage.backend = StorageBackend::Local;
    config.storage.data_dir = temp_dir.path().to_path_buf();

    let store = Arc::new(LocalObjectStore::new(temp_dir.path()));
    let server = test_server_with(config, store.clone(), Arc::new(JsMinifier));

    let created: Value = server
        .post("/package")
        .json(&json!({
            "metadata": lodash_metadata(),
            "data": { "Content": "let answer = 42;" }
        }))
        .await
        .json();

    let key = created["key"].as_str().unwrap();
    assert!(created["location"].as_str().unwrap().starts_with("file://"));
    assert_eq!(
        std::fs::read(temp_dir.path().join(key)).unwrap(),
        b"let answer = 42;"
    );

    let body: Value = server.delete("/reset").await.json();
    assert_eq!(body["deleted"], 1);
    assert!(!store.object_exists(key).await.unwrap());
}
