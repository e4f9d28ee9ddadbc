// SPDX-License-Identifier: MIT OR Apache-2.0
//! Embedded SQLite persistence store.
//!
//! Backs three logical tables — `lint_results`, `lint_jobs`, `api_metrics` —
//! behind a small operation set. Every query uses `sqlx`'s native parameter
//! binding; no caller input is ever string-concatenated into SQL. Freshness
//! checks (`expires_at > now`) compare against `CURRENT_TIMESTAMP` evaluated
//! by SQLite itself, never a client-supplied timestamp.
#![deny(unsafe_code)]
#![warn(missing_docs)]

use chrono::{DateTime, Utc};
use lg_core::CacheStatus;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Row, Sqlite};
use std::str::FromStr;

/// Errors from persistence store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The underlying database returned an error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    /// The database migrations failed to apply.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// A row in the `lint_results` cache table.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheRow {
    /// Opaque row id.
    pub id: String,
    /// Linter identifier.
    pub linter: String,
    /// Output format this result was produced for.
    pub format: String,
    /// SHA-256 of the raw submission bytes.
    pub content_hash: String,
    /// SHA-256 of the canonicalized options.
    pub options_hash: String,
    /// Terminal status of the run that produced this entry.
    pub status: CacheStatus,
    /// Serialized result payload (JSON).
    pub payload: String,
    /// Error message, present when `status != Success`.
    pub error_message: Option<String>,
    /// Correlation id of the originating HTTP request.
    pub request_id: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Expiry timestamp; the entry is invalid once `now >= expires_at`.
    pub expires_at: DateTime<Utc>,
}

/// A new cache entry to be written (id and `created_at` are assigned by the store).
#[derive(Debug, Clone)]
pub struct NewCacheEntry {
    /// Linter identifier.
    pub linter: String,
    /// Output format.
    pub format: String,
    /// Content hash.
    pub content_hash: String,
    /// Options hash.
    pub options_hash: String,
    /// Terminal status.
    pub status: CacheStatus,
    /// Serialized result payload (JSON).
    pub payload: String,
    /// Error message, if any.
    pub error_message: Option<String>,
    /// Correlation id, if any.
    pub request_id: Option<String>,
    /// Time-to-live applied from the write instant.
    pub ttl: chrono::Duration,
}

/// Job lifecycle status, mirrored here as a plain string-backed enum so this
/// crate has no dependency on `lg-jobs` (which instead depends on this one).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    /// Accepted, not yet started.
    Pending,
    /// Currently executing.
    Running,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
    /// Cancelled by the caller or by shutdown.
    Cancelled,
}

impl JobStatus {
    fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl FromStr for JobStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(StoreError::Database(sqlx::Error::Decode(
                format!("unknown job status: {other}").into(),
            ))),
        }
    }
}

/// Either an inline text submission or a base64/archive blob, stored as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobInput {
    /// Raw source text.
    Text(String),
    /// Base64-encoded archive or raw bytes.
    Archive(String),
}

/// A row in the `lint_jobs` table.
#[derive(Debug, Clone)]
pub struct JobRow {
    /// Opaque job id.
    pub id: String,
    /// Linter identifier.
    pub linter: String,
    /// Output format.
    pub format: String,
    /// Canonical serialized options (JSON).
    pub options: String,
    /// The input payload.
    pub input: JobInput,
    /// Optional filename hint.
    pub filename_hint: Option<String>,
    /// Current lifecycle status.
    pub status: JobStatus,
    /// Serialized result payload, present iff `status == Completed`.
    pub result_payload: Option<String>,
    /// Error message, present iff `status` is `Failed` or `Cancelled`.
    pub error_message: Option<String>,
    /// Wall-clock execution time in milliseconds, once known.
    pub execution_time_ms: Option<i64>,
    /// Correlation id of the originating HTTP request.
    pub request_id: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// When processing began.
    pub started_at: Option<DateTime<Utc>>,
    /// When processing finished (any terminal status).
    pub completed_at: Option<DateTime<Utc>>,
}

/// A job to be created (id and `created_at` assigned by the store).
#[derive(Debug, Clone)]
pub struct NewJob {
    /// Unique job id supplied by the caller (the job manager owns id generation).
    pub id: String,
    /// Linter identifier.
    pub linter: String,
    /// Output format.
    pub format: String,
    /// Canonical serialized options (JSON).
    pub options: String,
    /// The input payload.
    pub input: JobInput,
    /// Optional filename hint.
    pub filename_hint: Option<String>,
    /// Correlation id, if any.
    pub request_id: Option<String>,
}

/// Count of jobs currently in each lifecycle status.
#[derive(Debug, Clone, Copy, Default)]
pub struct JobStatusCounts {
    /// Jobs waiting to start.
    pub pending: i64,
    /// Jobs currently executing.
    pub running: i64,
    /// Jobs that finished successfully.
    pub completed: i64,
    /// Jobs that finished with an error.
    pub failed: i64,
    /// Jobs that were cancelled.
    pub cancelled: i64,
}

/// A single recorded metric sample.
#[derive(Debug, Clone)]
pub struct Metric {
    /// Metric name, e.g. `"lint.requests"`.
    pub name: String,
    /// Numeric value.
    pub value: f64,
    /// Serialized label map (JSON), if any.
    pub labels: Option<String>,
    /// Correlation id, if any.
    pub request_id: Option<String>,
}

/// Handle to the embedded SQLite persistence store.
#[derive(Clone)]
pub struct Store {
    pool: Pool<Sqlite>,
}

impl Store {
    /// Open (creating if missing) the SQLite database at `path` and run
    /// pending migrations. `path` may be `:memory:` for ephemeral stores.
    pub async fn open(path: &str, max_connections: u32) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite://{path}"))
            .unwrap_or_else(|_| SqliteConnectOptions::new().filename(path))
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    // -- cache ---------------------------------------------------------

    /// Look up a non-expired cache entry by logical key. Returns `None` on
    /// miss or when the only matching row has already expired.
    pub async fn get_cache(
        &self,
        content_hash: &str,
        linter: &str,
        options_hash: &str,
    ) -> Result<Option<CacheRow>, StoreError> {
        let row = sqlx::query(
            "SELECT id, linter, format, content_hash, options_hash, status, payload, \
             error_message, request_id, created_at, expires_at \
             FROM lint_results \
             WHERE content_hash = ? AND linter = ? AND options_hash = ? \
               AND expires_at > CURRENT_TIMESTAMP \
             ORDER BY created_at DESC LIMIT 1",
        )
        .bind(content_hash)
        .bind(linter)
        .bind(options_hash)
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_cache_entry).transpose()
    }

    /// Insert a new cache entry (cache entries are append-only; superseding
    /// writes simply add a newer row with a later `created_at`).
    pub async fn put_cache(&self, entry: NewCacheEntry) -> Result<String, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        let expires_at = Utc::now() + entry.ttl;
        // Stored in SQLite's own `CURRENT_TIMESTAMP` text shape (space separator,
        // no offset), not RFC 3339 — BINARY collation must sort it the same way
        // SQLite's comparisons against `CURRENT_TIMESTAMP` do.
        let expires_at_text = expires_at.format("%Y-%m-%d %H:%M:%S").to_string();

        sqlx::query(
            "INSERT INTO lint_results \
             (id, linter, format, content_hash, options_hash, status, payload, \
              error_message, request_id, expires_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&entry.linter)
        .bind(&entry.format)
        .bind(&entry.content_hash)
        .bind(&entry.options_hash)
        .bind(cache_status_str(entry.status))
        .bind(&entry.payload)
        .bind(&entry.error_message)
        .bind(&entry.request_id)
        .bind(expires_at_text)
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    /// Delete every cache row. Returns the number of rows removed.
    pub async fn delete_cache_all(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM lint_results")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete cache rows for a given content hash, across all linters.
    pub async fn delete_cache_by_content(&self, content_hash: &str) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM lint_results WHERE content_hash = ?")
            .bind(content_hash)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete cache rows for a given linter, across all content.
    pub async fn delete_cache_by_linter(&self, linter: &str) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM lint_results WHERE linter = ?")
            .bind(linter)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete cache rows for a given `(content_hash, linter)` pair.
    pub async fn delete_cache_by_content_and_linter(
        &self,
        content_hash: &str,
        linter: &str,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM lint_results WHERE content_hash = ? AND linter = ?")
            .bind(content_hash)
            .bind(linter)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Remove every cache row whose `expires_at` has passed. The freshness
    /// check is evaluated by SQLite (`CURRENT_TIMESTAMP`), not the caller.
    pub async fn cleanup_expired_cache(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM lint_results WHERE expires_at <= CURRENT_TIMESTAMP")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Count non-expired cache rows, for administrative stats.
    pub async fn count_cache_entries(&self) -> Result<i64, StoreError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM lint_results WHERE expires_at > CURRENT_TIMESTAMP",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(row.try_get("n")?)
    }

    // -- jobs ------------------------------------------------------------

    /// Persist a newly submitted job in `pending` status.
    pub async fn create_job(&self, job: NewJob) -> Result<(), StoreError> {
        let (input_kind, input) = match &job.input {
            JobInput::Text(t) => ("text", t.clone()),
            JobInput::Archive(a) => ("archive", a.clone()),
        };

        sqlx::query(
            "INSERT INTO lint_jobs \
             (id, linter, format, options, input_kind, input, filename_hint, status, request_id) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&job.id)
        .bind(&job.linter)
        .bind(&job.format)
        .bind(&job.options)
        .bind(input_kind)
        .bind(&input)
        .bind(&job.filename_hint)
        .bind(JobStatus::Pending.as_str())
        .bind(&job.request_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Fetch a job by id.
    pub async fn get_job(&self, id: &str) -> Result<Option<JobRow>, StoreError> {
        let row = sqlx::query(
            "SELECT id, linter, format, options, input_kind, input, filename_hint, status, \
             result_payload, error_message, execution_time_ms, request_id, \
             created_at, started_at, completed_at \
             FROM lint_jobs WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_job).transpose()
    }

    /// Update a job's status and, where applicable, its result/error/duration.
    /// Marking a job `Running` also stamps `started_at`; marking it terminal
    /// also stamps `completed_at`.
    pub async fn update_job_status(
        &self,
        id: &str,
        status: JobStatus,
        result: Option<&str>,
        error: Option<&str>,
        duration_ms: Option<i64>,
    ) -> Result<(), StoreError> {
        let is_starting = matches!(status, JobStatus::Running);
        let is_terminal = matches!(
            status,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        );

        sqlx::query(
            "UPDATE lint_jobs SET \
               status = ?, \
               result_payload = COALESCE(?, result_payload), \
               error_message = COALESCE(?, error_message), \
               execution_time_ms = COALESCE(?, execution_time_ms), \
               started_at = CASE WHEN ? THEN CURRENT_TIMESTAMP ELSE started_at END, \
               completed_at = CASE WHEN ? THEN CURRENT_TIMESTAMP ELSE completed_at END \
             WHERE id = ?",
        )
        .bind(status.as_str())
        .bind(result)
        .bind(error)
        .bind(duration_ms)
        .bind(is_starting)
        .bind(is_terminal)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// List up to `limit` jobs still in `pending` status, oldest first.
    pub async fn list_pending_jobs(&self, limit: i64) -> Result<Vec<JobRow>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, linter, format, options, input_kind, input, filename_hint, status, \
             result_payload, error_message, execution_time_ms, request_id, \
             created_at, started_at, completed_at \
             FROM lint_jobs WHERE status = 'pending' ORDER BY created_at ASC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_job).collect()
    }

    /// Delete terminal jobs older than `older_than_days`. Returns the number
    /// of rows removed.
    pub async fn cleanup_old_jobs(&self, older_than_days: i64) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "DELETE FROM lint_jobs \
             WHERE status IN ('completed', 'failed', 'cancelled') \
               AND created_at <= datetime(CURRENT_TIMESTAMP, ? || ' days')",
        )
        .bind(format!("-{older_than_days}"))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Count jobs in each lifecycle status.
    pub async fn job_status_counts(&self) -> Result<JobStatusCounts, StoreError> {
        let rows = sqlx::query("SELECT status, COUNT(*) as n FROM lint_jobs GROUP BY status")
            .fetch_all(&self.pool)
            .await?;

        let mut counts = JobStatusCounts::default();
        for row in rows {
            let status: String = row.try_get("status")?;
            let n: i64 = row.try_get("n")?;
            match status.as_str() {
                "pending" => counts.pending = n,
                "running" => counts.running = n,
                "completed" => counts.completed = n,
                "failed" => counts.failed = n,
                "cancelled" => counts.cancelled = n,
                _ => {}
            }
        }
        Ok(counts)
    }

    // -- metrics ----------------------------------------------------------

    /// Best-effort metric write. Callers should log and continue on `Err`
    /// rather than fail the request that triggered the metric.
    pub async fn record_metric(&self, metric: Metric) -> Result<(), StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO api_metrics (id, name, value, labels, request_id) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&metric.name)
        .bind(metric.value)
        .bind(&metric.labels)
        .bind(&metric.request_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn cache_status_str(status: CacheStatus) -> &'static str {
    match status {
        CacheStatus::Success => "success",
        CacheStatus::Error => "error",
        CacheStatus::Timeout => "timeout",
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .map(|naive| naive.and_utc())
        })
        .map_err(|e| StoreError::Database(sqlx::Error::Decode(e.into())))
}

fn row_to_cache_entry(row: sqlx::sqlite::SqliteRow) -> Result<CacheRow, StoreError> {
    let status: String = row.try_get("status")?;
    let status = match status.as_str() {
        "success" => CacheStatus::Success,
        "error" => CacheStatus::Error,
        "timeout" => CacheStatus::Timeout,
        other => {
            return Err(StoreError::Database(sqlx::Error::Decode(
                format!("unknown cache status: {other}").into(),
            )))
        }
    };

    Ok(CacheRow {
        id: row.try_get("id")?,
        linter: row.try_get("linter")?,
        format: row.try_get("format")?,
        content_hash: row.try_get("content_hash")?,
        options_hash: row.try_get("options_hash")?,
        status,
        payload: row.try_get("payload")?,
        error_message: row.try_get("error_message")?,
        request_id: row.try_get("request_id")?,
        created_at: parse_timestamp(&row.try_get::<String, _>("created_at")?)?,
        expires_at: parse_timestamp(&row.try_get::<String, _>("expires_at")?)?,
    })
}

fn row_to_job(row: sqlx::sqlite::SqliteRow) -> Result<JobRow, StoreError> {
    let input_kind: String = row.try_get("input_kind")?;
    let input_raw: String = row.try_get("input")?;
    let input = match input_kind.as_str() {
        "text" => JobInput::Text(input_raw),
        "archive" => JobInput::Archive(input_raw),
        other => {
            return Err(StoreError::Database(sqlx::Error::Decode(
                format!("unknown input_kind: {other}").into(),
            )))
        }
    };

    let status: String = row.try_get("status")?;
    let started_at: Option<String> = row.try_get("started_at")?;
    let completed_at: Option<String> = row.try_get("completed_at")?;

    Ok(JobRow {
        id: row.try_get("id")?,
        linter: row.try_get("linter")?,
        format: row.try_get("format")?,
        options: row.try_get("options")?,
        input,
        filename_hint: row.try_get("filename_hint")?,
        status: status.parse()?,
        result_payload: row.try_get("result_payload")?,
        error_message: row.try_get("error_message")?,
        execution_time_ms: row.try_get("execution_time_ms")?,
        request_id: row.try_get("request_id")?,
        created_at: parse_timestamp(&row.try_get::<String, _>("created_at")?)?,
        started_at: started_at.map(|s| parse_timestamp(&s)).transpose()?,
        completed_at: completed_at.map(|s| parse_timestamp(&s)).transpose()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> Store {
        Store::open(":memory:", 1).await.expect("open in-memory store")
    }

    #[tokio::test]
    async fn cache_miss_on_empty_store() {
        let store = test_store().await;
        assert!(store.get_cache("h", "eslint", "oh").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn cache_write_then_read() {
        let store = test_store().await;
        store
            .put_cache(NewCacheEntry {
                linter: "eslint".into(),
                format: "json".into(),
                content_hash: "h1".into(),
                options_hash: "o1".into(),
                status: CacheStatus::Success,
                payload: "{\"issues\":[]}".into(),
                error_message: None,
                request_id: Some("req-1".into()),
                ttl: chrono::Duration::hours(1),
            })
            .await
            .unwrap();

        let entry = store.get_cache("h1", "eslint", "o1").await.unwrap().unwrap();
        assert_eq!(entry.status, CacheStatus::Success);
        assert_eq!(entry.payload, "{\"issues\":[]}");
        assert_eq!(entry.request_id.as_deref(), Some("req-1"));
    }

    #[tokio::test]
    async fn cache_entry_with_negative_ttl_is_immediately_expired() {
        let store = test_store().await;
        store
            .put_cache(NewCacheEntry {
                linter: "eslint".into(),
                format: "json".into(),
                content_hash: "h2".into(),
                options_hash: "o1".into(),
                status: CacheStatus::Success,
                payload: "{}".into(),
                error_message: None,
                request_id: None,
                ttl: chrono::Duration::seconds(-60),
            })
            .await
            .unwrap();

        assert!(store.get_cache("h2", "eslint", "o1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_cache_by_content_scopes_correctly() {
        let store = test_store().await;
        for (content, linter) in [("h1", "eslint"), ("h1", "pylint"), ("h2", "eslint")] {
            store
                .put_cache(NewCacheEntry {
                    linter: linter.into(),
                    format: "json".into(),
                    content_hash: content.into(),
                    options_hash: "o".into(),
                    status: CacheStatus::Success,
                    payload: "{}".into(),
                    error_message: None,
                    request_id: None,
                    ttl: chrono::Duration::hours(1),
                })
                .await
                .unwrap();
        }

        let deleted = store.delete_cache_by_content("h1").await.unwrap();
        assert_eq!(deleted, 2);
        assert!(store.get_cache("h1", "eslint", "o").await.unwrap().is_none());
        assert!(store.get_cache("h2", "eslint", "o").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn cleanup_expired_cache_removes_only_expired() {
        let store = test_store().await;
        store
            .put_cache(NewCacheEntry {
                linter: "eslint".into(),
                format: "json".into(),
                content_hash: "fresh".into(),
                options_hash: "o".into(),
                status: CacheStatus::Success,
                payload: "{}".into(),
                error_message: None,
                request_id: None,
                ttl: chrono::Duration::hours(1),
            })
            .await
            .unwrap();
        store
            .put_cache(NewCacheEntry {
                linter: "eslint".into(),
                format: "json".into(),
                content_hash: "stale".into(),
                options_hash: "o".into(),
                status: CacheStatus::Success,
                payload: "{}".into(),
                error_message: None,
                request_id: None,
                ttl: chrono::Duration::seconds(-1),
            })
            .await
            .unwrap();

        let removed = store.cleanup_expired_cache().await.unwrap();
        assert_eq!(removed, 1);
        assert!(store.get_cache("fresh", "eslint", "o").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn job_lifecycle() {
        let store = test_store().await;
        store
            .create_job(NewJob {
                id: "job-1".into(),
                linter: "pylint".into(),
                format: "json".into(),
                options: "{}".into(),
                input: JobInput::Text("import os\n".into()),
                filename_hint: None,
                request_id: Some("req-9".into()),
            })
            .await
            .unwrap();

        let job = store.get_job("job-1").await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.started_at.is_none());

        store
            .update_job_status("job-1", JobStatus::Running, None, None, None)
            .await
            .unwrap();
        let job = store.get_job("job-1").await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Running);
        assert!(job.started_at.is_some());
        assert!(job.completed_at.is_none());

        store
            .update_job_status(
                "job-1",
                JobStatus::Completed,
                Some("{\"issues\":[]}"),
                None,
                Some(42),
            )
            .await
            .unwrap();
        let job = store.get_job("job-1").await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.result_payload.as_deref(), Some("{\"issues\":[]}"));
        assert_eq!(job.execution_time_ms, Some(42));
        assert!(job.completed_at.is_some());
    }

    #[tokio::test]
    async fn list_pending_jobs_orders_oldest_first() {
        let store = test_store().await;
        for id in ["a", "b", "c"] {
            store
                .create_job(NewJob {
                    id: id.into(),
                    linter: "eslint".into(),
                    format: "json".into(),
                    options: "{}".into(),
                    input: JobInput::Text("x".into()),
                    filename_hint: None,
                    request_id: None,
                })
                .await
                .unwrap();
        }
        let pending = store.list_pending_jobs(10).await.unwrap();
        assert_eq!(pending.len(), 3);
        assert_eq!(pending[0].id, "a");
    }

    #[tokio::test]
    async fn get_missing_job_returns_none() {
        let store = test_store().await;
        assert!(store.get_job("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn record_metric_is_fire_and_forget() {
        let store = test_store().await;
        store
            .record_metric(Metric {
                name: "lint.requests".into(),
                value: 1.0,
                labels: Some("{\"linter\":\"eslint\"}".into()),
                request_id: Some("req-1".into()),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn job_status_counts_groups_by_status() {
        let store = test_store().await;
        store
            .create_job(NewJob {
                id: "a".into(),
                linter: "eslint".into(),
                format: "json".into(),
                options: "{}".into(),
                input: JobInput::Text("x".into()),
                filename_hint: None,
                request_id: None,
            })
            .await
            .unwrap();
        store
            .create_job(NewJob {
                id: "b".into(),
                linter: "eslint".into(),
                format: "json".into(),
                options: "{}".into(),
                input: JobInput::Text("x".into()),
                filename_hint: None,
                request_id: None,
            })
            .await
            .unwrap();
        store
            .update_job_status("b", JobStatus::Completed, Some("{}"), None, Some(10))
            .await
            .unwrap();

        let counts = store.job_status_counts().await.unwrap();
        assert_eq!(counts.pending, 1);
        assert_eq!(counts.completed, 1);
        assert_eq!(counts.running, 0);
    }
}
