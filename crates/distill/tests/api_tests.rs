//! HTTP status codes and bodies against a real listener.

mod common;

use std::net::SocketAddr;
use std::time::Duration;

use serde_json::{json, Value};

use common::TestHarness;
use distill::{JobId, JobInput, JobStatus, JobStore, Worker};

async fn start(harness: &TestHarness) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = distill::api::router(harness.service());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn get(addr: SocketAddr, path: &str) -> (u16, Value) {
    let response = reqwest::get(format!("http://{}{}", addr, path)).await.unwrap();
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

async fn submit(addr: SocketAddr, body: Value) -> (u16, Value) {
    let response = reqwest::Client::new()
        .post(format!("http://{}/submit", addr))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn test_root_reports_ok() {
    let harness = TestHarness::new();
    let addr = start(&harness).await;
    assert_eq!(get(addr, "/").await, (200, json!({ "status": "ok" })));
}

#[tokio::test]
async fn test_submit_then_poll() {
    let harness = TestHarness::new();
    let addr = start(&harness).await;

    let (status, body) = submit(addr, json!({ "text": "hello world" })).await;
    assert_eq!(status, 200);
    assert_eq!(body["is_cached"], json!(false));
    let id = body["job_id"].as_i64().unwrap();

    assert_eq!(
        get(addr, &format!("/status/{}", id)).await,
        (200, json!({ "status": "todo" }))
    );
    let (status, body) = get(addr, &format!("/result/{}", id)).await;
    assert_eq!(status, 400);
    assert!(body["detail"].is_string());

    let worker = Worker::new(0, harness.store(), harness.processor(), Duration::from_millis(10));
    worker.run_once().await.unwrap();

    let (status, body) = get(addr, &format!("/result/{}", id)).await;
    assert_eq!(status, 200);
    assert_eq!(body["result"], json!("summary: hello world"));
    assert!(body["processing_time_ms"].is_u64());

    let (status, body) = submit(addr, json!({ "text": "hello world" })).await;
    assert_eq!(status, 200);
    assert_eq!(body["is_cached"], json!(true));
}

#[tokio::test]
async fn test_invalid_submissions_are_rejected() {
    let harness = TestHarness::new();
    let addr = start(&harness).await;

    for body in [
        json!({}),
        json!({ "text": "a", "url": "https://example.com/a.pdf" }),
        json!({ "url": "ftp://example.com/a.pdf" }),
        json!({ "url": "https://example.com/a.exe" }),
    ] {
        let (status, reply) = submit(addr, body.clone()).await;
        assert_eq!(status, 422, "body {} was accepted", body);
        assert!(reply["detail"].is_string());
    }
}

#[tokio::test]
async fn test_unknown_job_is_not_found() {
    let harness = TestHarness::new();
    let addr = start(&harness).await;

    assert_eq!(get(addr, "/status/9999").await.0, 404);
    assert_eq!(get(addr, "/result/9999").await.0, 404);
}

#[tokio::test]
async fn test_failed_job_result_is_unavailable() {
    let harness = TestHarness::new();
    let addr = start(&harness).await;
    let id: JobId = harness.store.create(&JobInput::from_text("t")).await.unwrap();
    harness.store.claim_next().await.unwrap();
    harness
        .store
        .set_result(id, JobStatus::Failed, "boom", Some(1))
        .await
        .unwrap();

    assert_eq!(
        get(addr, &format!("/status/{}", id)).await,
        (200, json!({ "status": "failed" }))
    );
    assert_eq!(get(addr, &format!("/result/{}", id)).await.0, 503);
}
