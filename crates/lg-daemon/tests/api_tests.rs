// SPDX-License-Identifier: MIT OR Apache-2.0
//! End-to-end HTTP tests over the route table: validation, cache admin,
//! linter registry, and job lifecycle on unknown ids. These exercise the
//! gateway without depending on any external linter binary being installed,
//! so they hold regardless of the host's toolchain.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use lg_cache::CacheService;
use lg_config::GatewayConfig;
use lg_daemon::{build_app, AppState};
use lg_jobs::JobManager;
use lg_store::Store;
use lg_workspace::WorkspaceManager;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tower::ServiceExt;

async fn test_state() -> Arc<AppState> {
    let store = Arc::new(Store::open(":memory:", 1).await.unwrap());
    let cache = Arc::new(CacheService::new(Arc::clone(&store), 3600));
    let tmp = tempfile::tempdir().unwrap();
    let workspace = Arc::new(WorkspaceManager::new(
        tmp.path().to_path_buf(),
        lg_workspace::Limits::default(),
    ));
    let config = GatewayConfig::default();
    let jobs = Arc::new(JobManager::new(
        Arc::clone(&store),
        Arc::clone(&cache),
        Arc::clone(&workspace),
        &config.jobs,
    ));
    Arc::new(AppState {
        store,
        cache,
        workspace,
        jobs,
        config: Arc::new(config),
        shutting_down: Arc::new(AtomicBool::new(false)),
    })
}

async fn json_request(
    app: axum::Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(b) => {
            builder = builder.header("content-type", "application/json");
            builder.body(Body::from(serde_json::to_vec(&b).unwrap())).unwrap()
        }
        None => builder.body(Body::empty()).unwrap(),
    };

    let resp = app.oneshot(request).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let value: serde_json::Value = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn health_reports_ok_when_not_shutting_down() {
    let app = build_app(test_state().await);
    let (status, json) = json_request(app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json.get("time").is_some());
}

#[tokio::test]
async fn health_reports_service_unavailable_during_shutdown() {
    let state = test_state().await;
    state
        .shutting_down
        .store(true, std::sync::atomic::Ordering::SeqCst);
    let app = build_app(state);
    let (status, json) = json_request(app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["error"]["code"], "SERVICE_UNAVAILABLE");
}

#[tokio::test]
async fn list_linters_returns_full_registry() {
    let app = build_app(test_state().await);
    let (status, json) = json_request(app, "GET", "/linters", None).await;
    assert_eq!(status, StatusCode::OK);
    let entries = json.as_array().expect("array body");
    assert!(!entries.is_empty());
    assert!(entries.iter().any(|e| e["id"] == "eslint" || e["id"] == "rustfmt"));
    for entry in entries {
        assert!(entry.get("available").is_some());
        assert!(entry.get("extensions").is_some());
    }
}

#[tokio::test]
async fn sync_lint_rejects_body_missing_content_and_archive() {
    let app = build_app(test_state().await);
    let (status, json) = json_request(
        app,
        "POST",
        "/eslint/json",
        Some(serde_json::json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn sync_lint_rejects_body_with_both_content_and_archive() {
    let app = build_app(test_state().await);
    let (status, json) = json_request(
        app,
        "POST",
        "/eslint/json",
        Some(serde_json::json!({"content": "x", "archive": "eA=="})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn sync_lint_rejects_unknown_linter() {
    let app = build_app(test_state().await);
    let (status, json) = json_request(
        app,
        "POST",
        "/not-a-real-linter/json",
        Some(serde_json::json!({"content": "x = 1"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "INVALID_PARAMETERS");
}

#[tokio::test]
async fn sync_lint_rejects_unknown_format() {
    let app = build_app(test_state().await);
    let (status, json) = json_request(
        app,
        "POST",
        "/eslint/yaml",
        Some(serde_json::json!({"content": "x = 1"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "INVALID_PARAMETERS");
}

#[tokio::test]
async fn sync_lint_rejects_content_over_the_workspace_limit() {
    let state = test_state().await;
    let mut config = (*state.config).clone();
    config.workspace.max_file_bytes = 8;
    let state = Arc::new(AppState {
        config: Arc::new(config),
        ..(*state).clone()
    });
    let app = build_app(Arc::clone(&state));

    let oversized = "x".repeat(64);
    let (status, json) = json_request(
        app,
        "POST",
        "/eslint/json",
        Some(serde_json::json!({"content": oversized, "filename": "a.js"})),
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(json["error"]["code"], "CONTENT_TOO_LARGE");

    // no orphaned cache entry from a rejected submission
    let stats = state.cache.stats().await;
    assert_eq!(stats.persisted_entries, 0);
}

#[tokio::test]
async fn sync_lint_via_url_rejects_invalid_encoding() {
    let app = build_app(test_state().await);
    let (status, json) = json_request(app, "GET", "/eslint/json/not-valid-base64!!!", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "INVALID_CONTENT_ENCODING");
}

#[tokio::test]
async fn submit_async_rejects_unknown_linter() {
    let app = build_app(test_state().await);
    let (status, json) = json_request(
        app,
        "POST",
        "/not-a-real-linter/json/async",
        Some(serde_json::json!({"content": "x"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "INVALID_PARAMETERS");
}

#[tokio::test]
async fn job_status_returns_not_found_for_unknown_id() {
    let app = build_app(test_state().await);
    let (status, json) = json_request(app, "GET", "/jobs/does-not-exist", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "JOB_NOT_FOUND");
}

#[tokio::test]
async fn cancel_job_returns_not_found_for_unknown_id() {
    let app = build_app(test_state().await);
    let (status, json) = json_request(app, "DELETE", "/jobs/does-not-exist", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "JOB_NOT_FOUND");
}

#[tokio::test]
async fn cache_stats_starts_empty_and_invalidate_is_idempotent() {
    let app = build_app(test_state().await);
    let (status, json) = json_request(app, "GET", "/cache/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["hits"], 0);
    assert_eq!(json["misses"], 0);

    let (status, json) = json_request(app.clone(), "DELETE", "/cache", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["invalidated"], 0);
}

#[tokio::test]
async fn metrics_reports_job_and_cache_counters() {
    let app = build_app(test_state().await);
    let (status, json) = json_request(app, "GET", "/metrics", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["jobs"]["pending"], 0);
    assert_eq!(json["cache"]["hits"], 0);
}

#[tokio::test]
async fn every_response_carries_a_request_id_header() {
    let app = build_app(test_state().await);
    let resp = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert!(resp.headers().get("x-request-id").is_some());
}
