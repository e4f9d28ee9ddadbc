// SPDX-License-Identifier: MIT OR Apache-2.0
//! HTTP gateway: wires the persistence store, cache service, workspace
//! manager, and job manager behind the route table clients actually call.
#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod middleware;

use axum::{
    extract::{Path as AxPath, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::Utc;
use lg_cache::{CacheService, CacheWrite};
use lg_config::GatewayConfig;
use lg_core::{hashing, CacheStatus, CancellationToken, LintOptions, OutputFormat};
use lg_error::{ErrorCode, LintError};
use lg_jobs::{JobManager, SubmitRequest};
use lg_store::{JobInput, Store};
use lg_workspace::WorkspaceManager;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub use middleware::{RateLimiter, RequestId, RequestLogger};

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Persistence store.
    pub store: Arc<Store>,
    /// Two-tier cache over lint results.
    pub cache: Arc<CacheService>,
    /// Sandboxed workspace materialization.
    pub workspace: Arc<WorkspaceManager>,
    /// Async job orchestration.
    pub jobs: Arc<JobManager>,
    /// Effective runtime configuration.
    pub config: Arc<GatewayConfig>,
    /// Flips to `true` once graceful shutdown has begun; new requests are
    /// rejected with `SERVICE_UNAVAILABLE` while draining in-flight work.
    pub shutting_down: Arc<AtomicBool>,
}

/// Unified API error wrapper: renders any [`LintError`] as the gateway's
/// `{success:false, error:{...}}` envelope with the code's mapped HTTP status.
pub struct ApiError(pub LintError);

impl From<LintError> for ApiError {
    fn from(err: LintError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.0.to_envelope())).into_response()
    }
}

/// Build the Axum router with every route the gateway exposes, wrapped in
/// the request-id, access-log, rate-limit, and CORS layers.
pub fn build_app(state: Arc<AppState>) -> Router {
    let rate_limiter = RateLimiter::new(
        state.config.rate_limit.max_requests,
        std::time::Duration::from_secs(state.config.rate_limit.window_secs),
    );
    let cors: CorsLayer = middleware::CorsConfig::permissive().to_cors_layer();

    Router::new()
        .route("/{linter}/{format}", post(sync_lint))
        .route("/{linter}/{format}/async", post(submit_async))
        .route("/{linter}/{format}/{encoded}", get(sync_lint_via_url))
        .route("/jobs/{id}", get(job_status))
        .route("/jobs/{id}", delete(cancel_job))
        .route("/linters", get(list_linters))
        .route("/cache", delete(invalidate_cache))
        .route("/cache/stats", get(cache_stats))
        .route("/metrics", get(metrics))
        .route("/health", get(health))
        .layer(axum::middleware::from_fn(
            middleware::request_id_middleware,
        ))
        .layer(axum::middleware::from_fn(RequestLogger::layer))
        .layer(rate_limiter.into_layer())
        .layer(cors)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request/response wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SyncLintBody {
    content: Option<String>,
    archive: Option<String>,
    filename: Option<String>,
    #[serde(default)]
    options: LintOptions,
}

#[derive(Debug, Serialize)]
struct SyncLintMetadata {
    linter: String,
    format: String,
    cache_hit: bool,
    execution_time_ms: u64,
    file_count: usize,
}

#[derive(Debug, Serialize)]
struct SubmitResponse {
    job_id: String,
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct CancelResponse {
    id: String,
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct LinterEntry {
    id: &'static str,
    extensions: &'static [&'static str],
    available: bool,
    version: Option<String>,
}

#[derive(Debug, Serialize)]
struct CacheStatsResponse {
    hits: u64,
    misses: u64,
    persisted_entries: i64,
}

#[derive(Debug, Serialize)]
struct InvalidateResponse {
    invalidated: u64,
}

#[derive(Debug, Serialize)]
struct MetricsResponse {
    jobs: lg_jobs::JobStats,
    cache: CacheStatsResponse,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    time: String,
}

// ---------------------------------------------------------------------------
// Sync lint: POST /{linter}/{format}, GET /{linter}/{format}/{encoded}
// ---------------------------------------------------------------------------

async fn sync_lint(
    State(state): State<Arc<AppState>>,
    AxPath((linter, format)): AxPath<(String, String)>,
    Json(body): Json<SyncLintBody>,
) -> Result<Response, ApiError> {
    let content = resolve_content(body.content, body.archive.as_deref())?;
    run_sync(&state, &linter, &format, content, body.filename, body.options).await
}

async fn sync_lint_via_url(
    State(state): State<Arc<AppState>>,
    AxPath((linter, format, encoded)): AxPath<(String, String, String)>,
) -> Result<Response, ApiError> {
    let text = lg_core::decode::decode_url_payload(&encoded).map_err(|e| {
        LintError::new(ErrorCode::InvalidContentEncoding, "failed to decode URL payload")
            .with_source(e)
    })?;
    run_sync(&state, &linter, &format, Content::Text(text), None, LintOptions::default()).await
}

enum Content {
    Text(String),
    Archive(String),
}

fn resolve_content(content: Option<String>, archive: Option<&str>) -> Result<Content, ApiError> {
    match (content, archive) {
        (Some(c), None) => Ok(Content::Text(c)),
        (None, Some(a)) => Ok(Content::Archive(a.to_string())),
        (None, None) => Err(LintError::new(
            ErrorCode::ValidationError,
            "request body must set exactly one of `content` or `archive`",
        )
        .into()),
        (Some(_), Some(_)) => Err(LintError::new(
            ErrorCode::ValidationError,
            "request body must set exactly one of `content` or `archive`, not both",
        )
        .into()),
    }
}

async fn run_sync(
    state: &AppState,
    linter: &str,
    format: &str,
    content: Content,
    filename: Option<String>,
    options: LintOptions,
) -> Result<Response, ApiError> {
    let output_format = OutputFormat::from_str(format).map_err(|_| {
        LintError::new(ErrorCode::InvalidParameters, format!("unsupported format '{format}'"))
    })?;
    if lg_runner::lookup(linter).is_none() {
        return Err(
            LintError::new(ErrorCode::InvalidParameters, format!("unknown linter '{linter}'")).into(),
        );
    }

    let canonical = options.canonicalize();
    let content_bytes = match &content {
        Content::Text(t) => t.as_bytes().to_vec(),
        Content::Archive(b64) => {
            use base64::Engine;
            base64::engine::general_purpose::STANDARD
                .decode(b64)
                .map_err(|e| {
                    LintError::new(ErrorCode::InvalidContentEncoding, "invalid base64 archive")
                        .with_source(e)
                })?
        }
    };
    let content_hash = hashing::content_hash(&content_bytes);
    let options_hash = hashing::options_hash(&canonical);
    let key = lg_cache::CacheKey {
        linter: linter.to_string(),
        format: format.to_string(),
        content_hash,
        options_hash,
    };

    if let Some(entry) = state.cache.get(&key).await {
        let result: lg_jobs::NormalizedResult = serde_json::from_str(&entry.payload)
            .map_err(|e| LintError::new(ErrorCode::InternalServerError, "cached payload corrupt").with_source(e))?;
        return render(linter, format, output_format, &result, true);
    }

    let workspace = match &content {
        Content::Text(t) => state
            .workspace
            .create_from_text(t, filename.as_deref())
            .map_err(workspace_error)?,
        Content::Archive(b64) => state
            .workspace
            .create_from_base64(b64)
            .map_err(workspace_error)?,
    };
    let workspace_root = workspace.root().to_path_buf();

    let run_result = lg_runner::run(
        linter,
        &state.workspace,
        &workspace_root,
        &canonical,
        CancellationToken::new(),
    )
    .await;

    if let Err(err) = state.workspace.cleanup(&workspace_root) {
        tracing::warn!(target: "lintgate.daemon", %err, "workspace cleanup failed");
    }

    let linter_result = run_result.map_err(runner_error)?;
    let normalized = lg_jobs::NormalizedResult::from(&linter_result);

    let status = if normalized.success {
        CacheStatus::Success
    } else {
        CacheStatus::Error
    };
    if let Ok(payload) = serde_json::to_string(&normalized) {
        if let Err(err) = state
            .cache
            .put(CacheWrite {
                key,
                status,
                payload,
                error_message: if normalized.success {
                    None
                } else {
                    Some("linter reported a non-successful run".to_string())
                },
                request_id: None,
            })
            .await
        {
            tracing::warn!(target: "lintgate.daemon", %err, "failed to persist cache entry");
        }
    }

    render(linter, format, output_format, &normalized, false)
}

fn render(
    linter: &str,
    format: &str,
    output_format: OutputFormat,
    result: &lg_jobs::NormalizedResult,
    cache_hit: bool,
) -> Result<Response, ApiError> {
    let metadata = SyncLintMetadata {
        linter: linter.to_string(),
        format: format.to_string(),
        cache_hit,
        execution_time_ms: result.execution_time_ms,
        file_count: result.file_count,
    };

    let body = match output_format {
        OutputFormat::Json => json!({
            "success": result.success,
            "issues": result.issues,
            "parsed_output": result.parsed_output,
            "metadata": metadata,
        }),
        OutputFormat::Text => json!({
            "success": result.success,
            "stdout": result.stdout,
            "stderr": result.stderr,
            "exit_code": result.exit_code,
            "metadata": metadata,
        }),
        OutputFormat::Sarif => {
            let sarif = lg_core::sarif::issues_to_sarif(linter, &result.issues);
            let mut value = serde_json::to_value(sarif)
                .map_err(|e| LintError::new(ErrorCode::InternalServerError, "SARIF encode failed").with_source(e))?;
            if let Some(obj) = value.as_object_mut() {
                obj.insert("metadata".to_string(), serde_json::to_value(metadata).unwrap_or(json!({})));
            }
            value
        }
    };

    Ok(Json(body).into_response())
}

fn workspace_error(err: lg_workspace::WorkspaceError) -> ApiError {
    use lg_workspace::WorkspaceError as WE;
    let code = match &err {
        WE::FileTooLarge { .. } | WE::WorkspaceTooLarge { .. } | WE::TooManyFiles { .. } => {
            ErrorCode::ContentTooLarge
        }
        WE::Base64(_) => ErrorCode::InvalidContentEncoding,
        WE::PathEscape { .. } | WE::BlockedDirectory { .. } | WE::NotRegularFile { .. } | WE::OutsideBase(_) => {
            ErrorCode::WorkspaceError
        }
        WE::Io(_) => ErrorCode::InternalServerError,
    };
    LintError::new(code, err.to_string()).with_source(err).into()
}

fn runner_error(err: lg_runner::RunnerError) -> ApiError {
    use lg_runner::RunnerError as RE;
    let code = match &err {
        RE::NotFound(_) => ErrorCode::LinterNotFound,
        RE::WorkspaceInvalid(_) | RE::NoSupportedFiles => ErrorCode::WorkspaceError,
        RE::Timeout(_) => ErrorCode::TimeoutError,
        RE::Cancelled => ErrorCode::ServiceUnavailable,
        RE::InvalidGlob(_) => ErrorCode::ValidationError,
        RE::Spawn(_) | RE::Io(_) => ErrorCode::LinterExecutionFailed,
    };
    LintError::new(code, err.to_string()).with_source(err).into()
}

// ---------------------------------------------------------------------------
// Async jobs: POST .../async, GET/DELETE /jobs/{id}
// ---------------------------------------------------------------------------

async fn submit_async(
    State(state): State<Arc<AppState>>,
    AxPath((linter, format)): AxPath<(String, String)>,
    Json(body): Json<SyncLintBody>,
) -> Result<Response, ApiError> {
    if OutputFormat::from_str(&format).is_err() {
        return Err(
            LintError::new(ErrorCode::InvalidParameters, format!("unsupported format '{format}'")).into(),
        );
    }
    if lg_runner::lookup(&linter).is_none() {
        return Err(
            LintError::new(ErrorCode::InvalidParameters, format!("unknown linter '{linter}'")).into(),
        );
    }
    let content = resolve_content(body.content, body.archive.as_deref())?;
    let input = match content {
        Content::Text(t) => JobInput::Text(t),
        Content::Archive(b64) => JobInput::Archive(b64),
    };

    let job_id = state
        .jobs
        .submit(SubmitRequest {
            linter,
            format,
            options: body.options,
            input,
            filename_hint: body.filename,
            request_id: None,
        })
        .await
        .map_err(jobs_error)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitResponse {
            job_id,
            status: "pending",
        }),
    )
        .into_response())
}

async fn job_status(
    State(state): State<Arc<AppState>>,
    AxPath(id): AxPath<String>,
) -> Result<Json<lg_jobs::JobSnapshot>, ApiError> {
    let snapshot = state
        .jobs
        .status(&id)
        .await
        .map_err(jobs_error)?
        .ok_or_else(|| LintError::new(ErrorCode::JobNotFound, format!("no job with id '{id}'")))?;
    Ok(Json(snapshot))
}

async fn cancel_job(
    State(state): State<Arc<AppState>>,
    AxPath(id): AxPath<String>,
) -> Result<Json<CancelResponse>, ApiError> {
    let cancelled = state.jobs.cancel(&id).await.map_err(jobs_error)?;
    if !cancelled {
        let exists = state.jobs.status(&id).await.map_err(jobs_error)?.is_some();
        if !exists {
            return Err(LintError::new(ErrorCode::JobNotFound, format!("no job with id '{id}'")).into());
        }
        return Err(LintError::new(
            ErrorCode::JobAlreadyCancelled,
            "job is already in a terminal state",
        )
        .into());
    }
    Ok(Json(CancelResponse {
        id,
        status: "cancelled",
    }))
}

fn jobs_error(err: lg_jobs::JobsError) -> ApiError {
    use lg_jobs::JobsError as JE;
    let code = match &err {
        JE::CapacityExceeded => ErrorCode::ServiceUnavailable,
        JE::Store(_) => ErrorCode::DatabaseError,
        JE::Serialization(_) => ErrorCode::InternalServerError,
    };
    LintError::new(code, err.to_string()).with_source(err).into()
}

// ---------------------------------------------------------------------------
// Registry, cache admin, metrics, health
// ---------------------------------------------------------------------------

async fn list_linters() -> Json<Vec<LinterEntry>> {
    let mut entries = Vec::new();
    for id in lg_runner::registry::list() {
        let config = lg_runner::lookup(id).expect("registry entry exists for listed id");
        let availability = lg_runner::availability::probe(config.executable).await;
        entries.push(LinterEntry {
            id,
            extensions: config.extensions,
            available: availability.available,
            version: availability.version,
        });
    }
    Json(entries)
}

async fn invalidate_cache(State(state): State<Arc<AppState>>) -> Result<Json<InvalidateResponse>, ApiError> {
    let invalidated = state.cache.invalidate_all().await?;
    Ok(Json(InvalidateResponse { invalidated }))
}

async fn cache_stats(State(state): State<Arc<AppState>>) -> Json<CacheStatsResponse> {
    let stats = state.cache.stats().await;
    Json(CacheStatsResponse {
        hits: stats.hits,
        misses: stats.misses,
        persisted_entries: stats.persisted_entries,
    })
}

async fn metrics(State(state): State<Arc<AppState>>) -> Result<Json<MetricsResponse>, ApiError> {
    let jobs = state.jobs.stats().await.map_err(jobs_error)?;
    let cache = state.cache.stats().await;
    Ok(Json(MetricsResponse {
        jobs,
        cache: CacheStatsResponse {
            hits: cache.hits,
            misses: cache.misses,
            persisted_entries: cache.persisted_entries,
        },
    }))
}

async fn health(State(state): State<Arc<AppState>>) -> Result<Json<HealthResponse>, ApiError> {
    if state.shutting_down.load(Ordering::SeqCst) {
        return Err(LintError::new(ErrorCode::ServiceUnavailable, "shutting down").into());
    }
    let degraded = state.store.job_status_counts().await.is_err();
    Ok(Json(HealthResponse {
        status: if degraded { "degraded" } else { "ok" },
        time: Utc::now().to_rfc3339(),
    }))
}
