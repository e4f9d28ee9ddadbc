// SPDX-License-Identifier: MIT OR Apache-2.0
//! Job Manager: the sole authority mutating asynchronous lint jobs. Owns
//! the pending/running/completed/failed/cancelled state machine, enforces
//! the concurrency cap, and drives each job through cache lookup,
//! workspace materialization, runner invocation, and cleanup.
#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod status;

pub use status::JobStatus;

use lg_cache::{CacheKey, CacheService, CacheWrite};
use lg_config::JobsConfig;
use lg_core::{CacheStatus, CancellationToken, Issue, LintOptions};
use lg_store::{JobInput, JobRow, NewJob, Store};
use lg_workspace::WorkspaceManager;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, RwLock, Semaphore};

/// Errors from job manager operations.
#[derive(Debug, thiserror::Error)]
pub enum JobsError {
    /// The concurrency cap was reached at submission time.
    #[error("job rejected: at concurrency capacity")]
    CapacityExceeded,
    /// Persistence store failure.
    #[error("store error: {0}")]
    Store(#[from] lg_store::StoreError),
    /// The options payload could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from a single job's processing pipeline (cache → workspace → runner).
#[derive(Debug, thiserror::Error)]
enum PipelineError {
    #[error("job was cancelled")]
    Cancelled,
    #[error("workspace error: {0}")]
    Workspace(#[from] lg_workspace::WorkspaceError),
    #[error("runner error: {0}")]
    Runner(#[from] lg_runner::RunnerError),
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A request to submit an asynchronous lint job.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    /// Linter identifier.
    pub linter: String,
    /// Requested output format.
    pub format: String,
    /// Lint options.
    pub options: LintOptions,
    /// Submission payload.
    pub input: JobInput,
    /// Optional filename hint (used for single-file text submissions).
    pub filename_hint: Option<String>,
    /// Correlation id of the originating HTTP request.
    pub request_id: Option<String>,
}

/// The normalized, format-independent result of a single lint run. This is
/// what gets cached and stored as a job's result payload; rendering into
/// `json`/`text`/`sarif` happens at the HTTP boundary on read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedResult {
    /// Whether the run is considered successful per the linter's exit-code policy.
    pub success: bool,
    /// Raw process exit code.
    pub exit_code: Option<i32>,
    /// Captured stdout.
    pub stdout: String,
    /// Captured stderr.
    pub stderr: String,
    /// Wall-clock execution time, in milliseconds.
    pub execution_time_ms: u64,
    /// Number of files the linter was invoked against.
    pub file_count: usize,
    /// Normalized issues extracted from the output.
    pub issues: Vec<Issue>,
    /// Best-effort parsed representation of stdout.
    pub parsed_output: Option<serde_json::Value>,
}

impl From<&lg_runner::LinterResult> for NormalizedResult {
    fn from(r: &lg_runner::LinterResult) -> Self {
        Self {
            success: r.success,
            exit_code: r.exit_code,
            stdout: r.stdout.clone(),
            stderr: r.stderr.clone(),
            execution_time_ms: r.execution_time_ms,
            file_count: r.file_count,
            issues: r.issues.clone(),
            parsed_output: r.parsed_output.clone(),
        }
    }
}

/// A point-in-time snapshot of a job, as returned by [`JobManager::status`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSnapshot {
    /// Job id.
    pub id: String,
    /// Linter identifier.
    pub linter: String,
    /// Output format.
    pub format: String,
    /// Current lifecycle status.
    pub status: JobStatus,
    /// Deserialized result payload, present once completed.
    pub result: Option<NormalizedResult>,
    /// Error message, present once failed or cancelled.
    pub error_message: Option<String>,
    /// Wall-clock execution time, once known.
    pub execution_time_ms: Option<u64>,
    /// Creation timestamp (RFC 3339).
    pub created_at: String,
    /// Start timestamp (RFC 3339), once running.
    pub started_at: Option<String>,
    /// Completion timestamp (RFC 3339), once terminal.
    pub completed_at: Option<String>,
}

impl JobSnapshot {
    fn from_row(row: JobRow) -> Result<Self, JobsError> {
        let result = row
            .result_payload
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;

        Ok(Self {
            id: row.id,
            linter: row.linter,
            format: row.format,
            status: row.status.into(),
            result,
            error_message: row.error_message,
            execution_time_ms: row.execution_time_ms.map(|ms| ms as u64),
            created_at: row.created_at.to_rfc3339(),
            started_at: row.started_at.map(|t| t.to_rfc3339()),
            completed_at: row.completed_at.map(|t| t.to_rfc3339()),
        })
    }
}

/// Aggregate job counts by status.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct JobStats {
    /// Jobs waiting to start.
    pub pending: u64,
    /// Jobs currently executing.
    pub running: u64,
    /// Jobs that finished successfully.
    pub completed: u64,
    /// Jobs that finished with an error.
    pub failed: u64,
    /// Jobs that were cancelled.
    pub cancelled: u64,
}

/// Lifecycle events published as jobs transition through terminal states.
#[derive(Debug, Clone)]
pub enum JobEvent {
    /// A job completed successfully.
    Completed(String),
    /// A job finished with an error.
    Failed(String),
    /// A job was cancelled.
    Cancelled(String),
    /// A job was aborted for exceeding its overall timeout.
    Timeout(String),
}

/// The Job Manager.
#[derive(Clone)]
pub struct JobManager {
    store: Arc<Store>,
    cache: Arc<CacheService>,
    workspace: Arc<WorkspaceManager>,
    semaphore: Arc<Semaphore>,
    tokens: Arc<RwLock<HashMap<String, CancellationToken>>>,
    events_tx: broadcast::Sender<JobEvent>,
    job_timeout: Duration,
}

impl JobManager {
    /// Build a job manager over shared store/cache/workspace handles.
    pub fn new(
        store: Arc<Store>,
        cache: Arc<CacheService>,
        workspace: Arc<WorkspaceManager>,
        config: &JobsConfig,
    ) -> Self {
        let (events_tx, _) = broadcast::channel(256);
        Self {
            store,
            cache,
            workspace,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_jobs.max(1) as usize)),
            tokens: Arc::new(RwLock::new(HashMap::new())),
            events_tx,
            job_timeout: Duration::from_millis(config.default_job_timeout_ms),
        }
    }

    /// Subscribe to lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.events_tx.subscribe()
    }

    /// Submit a job. Persists it as `pending` and immediately schedules
    /// background processing; does not block on that processing. Rejects
    /// synchronously if the concurrency cap has already been reached.
    pub async fn submit(&self, req: SubmitRequest) -> Result<String, JobsError> {
        let permit = match Arc::clone(&self.semaphore).try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => return Err(JobsError::CapacityExceeded),
        };

        let id = uuid::Uuid::new_v4().to_string();
        let options_json = serde_json::to_string(&req.options)?;

        self.store
            .create_job(NewJob {
                id: id.clone(),
                linter: req.linter.clone(),
                format: req.format.clone(),
                options: options_json,
                input: req.input.clone(),
                filename_hint: req.filename_hint.clone(),
                request_id: req.request_id.clone(),
            })
            .await?;

        let token = CancellationToken::new();
        self.tokens.write().await.insert(id.clone(), token.clone());

        let manager = self.clone();
        let job_id = id.clone();
        tokio::spawn(async move {
            manager.process(job_id, req, token, permit).await;
        });

        Ok(id)
    }

    /// Read-through status lookup.
    pub async fn status(&self, id: &str) -> Result<Option<JobSnapshot>, JobsError> {
        match self.store.get_job(id).await? {
            Some(row) => Ok(Some(JobSnapshot::from_row(row)?)),
            None => Ok(None),
        }
    }

    /// Cancel a job. Idempotent: cancelling an already-terminal or unknown
    /// job is a no-op returning `false`.
    pub async fn cancel(&self, id: &str) -> Result<bool, JobsError> {
        let row = match self.store.get_job(id).await? {
            Some(row) => row,
            None => return Ok(false),
        };
        let status: JobStatus = row.status.into();
        if status.is_terminal() {
            return Ok(false);
        }

        if let Some(token) = self.tokens.read().await.get(id) {
            token.cancel();
        }

        self.store
            .update_job_status(
                id,
                lg_store::JobStatus::Cancelled,
                None,
                Some("cancelled by request"),
                None,
            )
            .await?;
        let _ = self.events_tx.send(JobEvent::Cancelled(id.to_string()));

        Ok(true)
    }

    /// Aggregate counts by status.
    pub async fn stats(&self) -> Result<JobStats, JobsError> {
        let counts = self.store.job_status_counts().await?;
        Ok(JobStats {
            pending: counts.pending as u64,
            running: counts.running as u64,
            completed: counts.completed as u64,
            failed: counts.failed as u64,
            cancelled: counts.cancelled as u64,
        })
    }

    /// Sweep terminal jobs older than the store's configured retention window.
    pub async fn sweep_old_jobs(&self, retention_days: i64) -> Result<u64, JobsError> {
        Ok(self.store.cleanup_old_jobs(retention_days).await?)
    }

    async fn process(
        &self,
        id: String,
        req: SubmitRequest,
        token: CancellationToken,
        _permit: tokio::sync::OwnedSemaphorePermit,
    ) {
        if self
            .store
            .update_job_status(&id, lg_store::JobStatus::Running, None, None, None)
            .await
            .is_err()
        {
            self.tokens.write().await.remove(&id);
            return;
        }

        let start = Instant::now();
        let outcome: Result<NormalizedResult, JobOutcomeSignal> = tokio::select! {
            res = self.run_pipeline(&req, token.clone()) => res,
            _ = tokio::time::sleep(self.job_timeout) => Err(JobOutcomeSignal::Timeout),
            _ = token.cancelled() => Err(JobOutcomeSignal::Cancelled),
        };
        let execution_time_ms = start.elapsed().as_millis() as i64;

        self.finish(&id, outcome, execution_time_ms).await;
        self.tokens.write().await.remove(&id);
    }

    async fn finish(
        &self,
        id: &str,
        outcome: Result<NormalizedResult, JobOutcomeSignal>,
        execution_time_ms: i64,
    ) {
        // If `cancel()` already persisted a terminal state, don't clobber it.
        let already_terminal = matches!(
            self.store.get_job(id).await,
            Ok(Some(row)) if JobStatus::from(row.status).is_terminal()
        );

        match outcome {
            Ok(result) => {
                if already_terminal {
                    return;
                }
                let payload = match serde_json::to_string(&result) {
                    Ok(p) => p,
                    Err(e) => {
                        let _ = self
                            .store
                            .update_job_status(
                                id,
                                lg_store::JobStatus::Failed,
                                None,
                                Some(&format!("failed to serialize result: {e}")),
                                Some(execution_time_ms),
                            )
                            .await;
                        let _ = self.events_tx.send(JobEvent::Failed(id.to_string()));
                        return;
                    }
                };
                let _ = self
                    .store
                    .update_job_status(
                        id,
                        lg_store::JobStatus::Completed,
                        Some(&payload),
                        None,
                        Some(execution_time_ms),
                    )
                    .await;
                let _ = self.events_tx.send(JobEvent::Completed(id.to_string()));
            }
            Err(JobOutcomeSignal::Cancelled) | Err(JobOutcomeSignal::Pipeline(PipelineError::Cancelled)) => {
                if already_terminal {
                    return;
                }
                let _ = self
                    .store
                    .update_job_status(
                        id,
                        lg_store::JobStatus::Cancelled,
                        None,
                        Some("cancelled during execution"),
                        Some(execution_time_ms),
                    )
                    .await;
                let _ = self.events_tx.send(JobEvent::Cancelled(id.to_string()));
            }
            Err(JobOutcomeSignal::Timeout) => {
                if already_terminal {
                    return;
                }
                let _ = self
                    .store
                    .update_job_status(
                        id,
                        lg_store::JobStatus::Failed,
                        None,
                        Some("job exceeded overall timeout"),
                        Some(execution_time_ms),
                    )
                    .await;
                let _ = self.events_tx.send(JobEvent::Timeout(id.to_string()));
            }
            Err(JobOutcomeSignal::Pipeline(err)) => {
                if already_terminal {
                    return;
                }
                let _ = self
                    .store
                    .update_job_status(
                        id,
                        lg_store::JobStatus::Failed,
                        None,
                        Some(&err.to_string()),
                        Some(execution_time_ms),
                    )
                    .await;
                let _ = self.events_tx.send(JobEvent::Failed(id.to_string()));
            }
        }
    }

    async fn run_pipeline(
        &self,
        req: &SubmitRequest,
        token: CancellationToken,
    ) -> Result<NormalizedResult, JobOutcomeSignal> {
        self.run_pipeline_inner(req, token)
            .await
            .map_err(JobOutcomeSignal::Pipeline)
    }

    async fn run_pipeline_inner(
        &self,
        req: &SubmitRequest,
        token: CancellationToken,
    ) -> Result<NormalizedResult, PipelineError> {
        use base64::Engine;

        let canonical = req.options.canonicalize();
        let content_bytes = match &req.input {
            JobInput::Text(t) => t.as_bytes().to_vec(),
            JobInput::Archive(b64) => base64::engine::general_purpose::STANDARD.decode(b64)?,
        };
        let content_hash = lg_core::hashing::content_hash(&content_bytes);
        let options_hash = lg_core::hashing::options_hash(&canonical);

        let key = CacheKey {
            linter: req.linter.clone(),
            format: req.format.clone(),
            content_hash,
            options_hash,
        };

        if let Some(entry) = self.cache.get(&key).await {
            if let Ok(result) = serde_json::from_str::<NormalizedResult>(&entry.payload) {
                return Ok(result);
            }
        }

        if token.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let workspace = match &req.input {
            JobInput::Text(t) => self
                .workspace
                .create_from_text(t, req.filename_hint.as_deref())?,
            JobInput::Archive(b64) => self.workspace.create_from_base64(b64)?,
        };
        let workspace_root = workspace.root().to_path_buf();

        let run_result = lg_runner::run(
            &req.linter,
            &self.workspace,
            &workspace_root,
            &canonical,
            token,
        )
        .await;

        if let Err(err) = self.workspace.cleanup(&workspace_root) {
            tracing::warn!(target: "lintgate.jobs", %err, "workspace cleanup failed");
        }

        let linter_result = run_result?;
        let normalized = NormalizedResult::from(&linter_result);

        let status = if normalized.success {
            CacheStatus::Success
        } else {
            CacheStatus::Error
        };
        let payload = serde_json::to_string(&normalized)?;
        if let Err(err) = self
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
                request_id: req.request_id.clone(),
            })
            .await
        {
            tracing::warn!(target: "lintgate.jobs", %err, "failed to persist cache entry for job result");
        }

        Ok(normalized)
    }
}

enum JobOutcomeSignal {
    Cancelled,
    Timeout,
    Pipeline(PipelineError),
}
