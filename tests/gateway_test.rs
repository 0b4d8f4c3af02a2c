//! Upload Gateway Integration Tests
//!
//! Exercises the gateway end to end against `InMemoryStore`.

mod common;

use bytes::Bytes;
use common::{expected_url, store_config, TEST_BUCKET, TEST_PREFIX};
use s3_upload_gateway::store::{InMemoryStore, ObjectStore, StoreError};
use s3_upload_gateway::upload::file::FileSpool;
use s3_upload_gateway::upload::{UploadGateway, UploadedFile};
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};

fn gateway() -> (UploadGateway, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::with_bucket(TEST_BUCKET));
    let dyn_store: Arc<dyn ObjectStore> = store.clone();
    (UploadGateway::new(store_config(None), dyn_store), store)
}

#[tokio::test]
async fn test_upload_cat_png() {
    let (gateway, store) = gateway();
    let file = UploadedFile::from_bytes("cat.png", Bytes::from_static(b"\x89PNG"));

    let result = gateway.upload(&file, TEST_PREFIX).await;

    assert!(!result.is_error, "unexpected error: {}", result.error_message);
    assert_eq!(result.key, "test-go/cat.png");
    assert_eq!(
        result.url,
        "https://mybucket.s3-us-east-1.amazonaws.com/test-go/cat.png"
    );
    assert_eq!(
        store.object(TEST_BUCKET, "test-go/cat.png"),
        Some(Bytes::from_static(b"\x89PNG"))
    );
}

#[tokio::test]
async fn test_upload_exists_remove_exists() {
    let (gateway, store) = gateway();
    let file = UploadedFile::from_bytes("dog.jpg", Bytes::from("woof"));

    let result = gateway.upload(&file, TEST_PREFIX).await;
    assert!(!result.is_error);

    assert_ok!(gateway.file_exists(&result.key).await);
    assert_ok!(gateway.remove(&result.key).await);

    let err = assert_err!(gateway.file_exists(&result.key).await);
    assert!(err.is_not_found());
    assert_eq!(store.object_count(), 0);
}

#[tokio::test]
async fn test_file_exists_is_idempotent() {
    let (gateway, store) = gateway();
    let file = UploadedFile::from_bytes("a.txt", Bytes::from("a"));
    let key = gateway.upload(&file, TEST_PREFIX).await.key;

    for _ in 0..3 {
        assert_ok!(gateway.file_exists(&key).await);
    }
    for _ in 0..3 {
        assert!(gateway.file_exists("test-go/missing.txt").await.is_err());
    }
    assert_eq!(store.head_calls(), 6);
}

#[tokio::test]
async fn test_remove_missing_never_deletes() {
    let (gateway, store) = gateway();

    let err = assert_err!(gateway.remove("test-go/never-uploaded.png").await);

    assert!(err.is_not_found());
    assert_eq!(store.delete_calls(), 0);
}

#[tokio::test]
async fn test_upload_failure_reports_store_text() {
    let (gateway, store) = gateway();
    store.fail_puts_matching("broken");
    let file = UploadedFile::from_bytes("broken.png", Bytes::from("x"));

    let result = gateway.upload(&file, TEST_PREFIX).await;

    assert!(result.is_error);
    assert!(result.error_message.contains("test-go/broken.png"));
    assert!(result.key.is_empty());
    assert!(result.url.is_empty());
}

#[tokio::test]
async fn test_upload_spilled_file() {
    let (gateway, store) = gateway();
    let payload = common::random_payload(4096);

    let mut spool = FileSpool::new(512);
    for chunk in payload.chunks(1000) {
        spool.write(chunk).await.unwrap();
    }
    let file = UploadedFile::new("file", "big.bin", None, spool.finish().await.unwrap());
    assert!(file.is_on_disk());

    let result = gateway.upload(&file, TEST_PREFIX).await;

    assert!(!result.is_error, "unexpected error: {}", result.error_message);
    assert_eq!(result.url, expected_url("big.bin"));
    assert_eq!(store.object(TEST_BUCKET, "test-go/big.bin"), Some(payload));
}

#[tokio::test]
async fn test_health_check_tracks_reachability() {
    let (gateway, store) = gateway();

    assert_ok!(gateway.health_check().await);

    store.set_reachable(false);
    let err = assert_err!(gateway.health_check().await);
    assert!(matches!(err, StoreError::Service(_)));

    assert_eq!(store.list_buckets_calls(), 2);
    assert_eq!(store.put_calls(), 0);
    assert_eq!(store.head_calls(), 0);
    assert_eq!(store.delete_calls(), 0);
}

#[tokio::test]
async fn test_prefix_without_separator() {
    let (gateway, _store) = gateway();
    let file = UploadedFile::from_bytes("cat.png", Bytes::from("x"));

    let result = gateway.upload(&file, "raw").await;

    assert_eq!(result.key, "rawcat.png");
    assert_eq!(
        result.url,
        "https://mybucket.s3-us-east-1.amazonaws.com/rawcat.png"
    );
}
