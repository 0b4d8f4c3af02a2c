//! HTTP API End-to-End Tests
//!
//! Drives a live server over real TCP with multipart requests.

mod common;

use bytes::Bytes;
use common::{expected_url, test_config, TestEnv, TEST_BUCKET};
use serde_json::{json, Value};

#[tokio::test]
async fn test_ping() {
    let env = TestEnv::new().await;

    let response = env.client.get(env.url("/ping")).send().await.unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(
        response.json::<Value>().await.unwrap(),
        json!({"message": "pong"})
    );
}

#[tokio::test]
async fn test_single_opens_and_discards() {
    let env = TestEnv::new().await;

    let response = env
        .post_files("/single", &[("file", "cat.png", Bytes::from("meow"))])
        .await;

    assert_eq!(response.status(), 200);
    assert_eq!(response.json::<Value>().await.unwrap(), json!({"message": "OK"}));
    assert_eq!(env.store.put_calls(), 0);
}

#[tokio::test]
async fn test_single_missing_field_is_bad_request() {
    let env = TestEnv::new().await;

    let response = env
        .post_files("/single", &[("wrong", "cat.png", Bytes::from("meow"))])
        .await;

    assert_eq!(response.status(), 400);
    assert_eq!(response.text().await.unwrap(), "Bad request");
}

#[tokio::test]
async fn test_non_multipart_body_is_bad_request() {
    let env = TestEnv::new().await;

    for path in ["/single", "/multi", "/single-s3", "/multi-s3"] {
        let response = env
            .client
            .post(env.url(path))
            .header("Content-Type", "application/json")
            .body("{}")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400, "path {}", path);
    }
    assert_eq!(env.store.put_calls(), 0);
}

#[tokio::test]
async fn test_multi_opens_every_file() {
    let env = TestEnv::new().await;

    let response = env
        .post_files(
            "/multi",
            &[
                ("upload[]", "a.txt", Bytes::from("a")),
                ("upload[]", "b.txt", common::random_payload(4096)),
            ],
        )
        .await;

    assert_eq!(response.status(), 200);
    assert_eq!(response.json::<Value>().await.unwrap(), json!({"message": "OK"}));
    assert_eq!(env.store.put_calls(), 0);
}

#[tokio::test]
async fn test_single_s3_round_trip() {
    let env = TestEnv::new().await;

    let response = env
        .post_files("/single-s3", &[("file", "cat.png", Bytes::from("meow"))])
        .await;

    assert_eq!(response.status(), 200);
    assert_eq!(
        response.json::<Value>().await.unwrap(),
        json!({"message": "OK", "url": expected_url("cat.png")})
    );

    // Uploaded, verified, then removed
    assert_eq!(env.store.put_calls(), 1);
    assert_eq!(env.store.head_calls(), 2);
    assert_eq!(env.store.delete_calls(), 1);
    assert_eq!(env.store.object_count(), 0);
}

#[tokio::test]
async fn test_single_s3_large_file_spills() {
    let env = TestEnv::new().await;
    let payload = common::random_payload(64 * 1024);

    let response = env
        .post_files("/single-s3", &[("file", "big.bin", payload)])
        .await;

    assert_eq!(response.status(), 200);
    assert_eq!(env.store.put_calls(), 1);
}

#[tokio::test]
async fn test_single_s3_store_failure_returns_raw_text() {
    let env = TestEnv::new().await;
    env.store.fail_puts_matching("cat.png");

    let response = env
        .post_files("/single-s3", &[("file", "cat.png", Bytes::from("meow"))])
        .await;

    assert_eq!(response.status(), 500);
    let body = response.text().await.unwrap();
    assert!(body.contains("InternalError"), "got: {}", body);
    assert_eq!(env.store.delete_calls(), 0);
}

#[tokio::test]
async fn test_multi_s3_reports_per_file() {
    let env = TestEnv::new().await;
    env.store.fail_puts_matching("b.png");

    let response = env
        .post_files(
            "/multi-s3",
            &[
                ("upload[]", "a.png", Bytes::from("a")),
                ("upload[]", "b.png", Bytes::from("b")),
                ("upload[]", "c.png", Bytes::from("c")),
            ],
        )
        .await;

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "OK");

    let mut lists: Vec<String> = body["lists"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect();
    lists.sort();
    assert_eq!(
        lists,
        vec![
            "Failed to upload file: b.png".to_string(),
            expected_url("a.png"),
            expected_url("c.png"),
        ]
    );

    // Batch uploads are left in place
    assert!(env.store.object(TEST_BUCKET, "test-go/a.png").is_some());
    assert_eq!(env.store.delete_calls(), 0);
}

#[tokio::test]
async fn test_multi_s3_without_files() {
    let env = TestEnv::new().await;

    let form = reqwest::multipart::Form::new().text("note", "no files here");
    let response = env
        .client
        .post(env.url("/multi-s3"))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(
        response.json::<Value>().await.unwrap(),
        json!({"message": "OK", "lists": []})
    );
    assert_eq!(env.store.put_calls(), 0);
}

#[tokio::test]
async fn test_health_reflects_store() {
    let env = TestEnv::new().await;

    let response = env.client.get(env.url("/health")).send().await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.json::<Value>().await.unwrap(), json!({"status": "ok"}));

    env.store.set_reachable(false);
    let response = env.client.get(env.url("/health")).send().await.unwrap();
    assert_eq!(response.status(), 503);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "unavailable");
    assert!(body["error"].as_str().unwrap().contains("connection refused"));
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let env = TestEnv::new().await;

    env.post_files("/single-s3", &[("file", "m.txt", Bytes::from("m"))])
        .await;
    let response = env.client.get(env.url("/metrics")).send().await.unwrap();

    assert_eq!(response.status(), 200);
    let content_type = response.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.contains("text/plain"));
    let body = response.text().await.unwrap();
    assert!(body.contains("gateway_uploads_total"));
}

#[tokio::test]
async fn test_metrics_disabled() {
    let mut config = test_config();
    config.metrics.enabled = false;
    let env = TestEnv::with_config(config).await;

    let response = env.client.get(env.url("/metrics")).send().await.unwrap();

    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_unknown_path_and_wrong_method() {
    let env = TestEnv::new().await;

    let response = env.client.get(env.url("/nope")).send().await.unwrap();
    assert_eq!(response.status(), 404);

    let response = env.client.get(env.url("/single-s3")).send().await.unwrap();
    assert_eq!(response.status(), 405);
    assert_eq!(response.headers()["allow"], "POST");

    let response = env.client.post(env.url("/ping")).send().await.unwrap();
    assert_eq!(response.status(), 405);
    assert_eq!(response.headers()["allow"], "GET");
}

#[tokio::test]
async fn test_multi_s3_uses_last_filename_segment() {
    let env = TestEnv::new().await;

    let response = env
        .post_files(
            "/multi-s3",
            &[("upload[]", "../../etc/cat.png", Bytes::from("meow"))],
        )
        .await;

    assert_eq!(response.status(), 200);
    assert_eq!(
        response.json::<Value>().await.unwrap(),
        json!({"message": "OK", "lists": [expected_url("cat.png")]})
    );
    assert!(env.store.object(TEST_BUCKET, "test-go/cat.png").is_some());
    assert_eq!(env.store.object_count(), 1);
}

#[tokio::test]
async fn test_oversized_form_value_is_bad_request() {
    let env = TestEnv::new().await;

    let note = "n".repeat(11 * 1024 * 1024);
    let file = reqwest::multipart::Part::bytes(b"x".to_vec())
        .file_name("cat.png")
        .mime_str("application/octet-stream")
        .unwrap();
    let form = reqwest::multipart::Form::new()
        .text("note", note)
        .part("file", file);

    let response = env
        .client
        .post(env.url("/single"))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    assert_eq!(response.text().await.unwrap(), "Bad request");
}
