// SPDX-License-Identifier: MIT OR Apache-2.0
//! Unified error taxonomy for the lint gateway.
//!
//! Every error that can cross a component boundary carries a stable,
//! machine-readable [`ErrorCode`], a human-readable message, an optional
//! cause, and arbitrary structured context. [`LintError`] is the single type
//! the HTTP layer needs to know how to render.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// ErrorCategory
// ---------------------------------------------------------------------------

/// Broad family an [`ErrorCode`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Malformed or out-of-range input.
    Validation,
    /// A resource limit (file size, workspace size, entry count) was exceeded.
    Resource,
    /// Caller exceeded the framing layer's rate limit.
    RateLimit,
    /// A subprocess or job exceeded its deadline.
    Timeout,
    /// Linter lookup or execution failure.
    Linter,
    /// Workspace materialization or validation failure.
    Workspace,
    /// Cache read/write failure.
    Cache,
    /// Persistence store unavailable or failed.
    Store,
    /// Job lookup or lifecycle conflict.
    Job,
    /// Catch-all for unexpected internal errors.
    Internal,
    /// The service is shutting down or otherwise unavailable.
    Service,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Validation => "validation",
            Self::Resource => "resource",
            Self::RateLimit => "rate_limit",
            Self::Timeout => "timeout",
            Self::Linter => "linter",
            Self::Workspace => "workspace",
            Self::Cache => "cache",
            Self::Store => "store",
            Self::Job => "job",
            Self::Internal => "internal",
            Self::Service => "service",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// ErrorCode
// ---------------------------------------------------------------------------

/// Machine-readable, stable error code. Matches the taxonomy table the
/// HTTP surface is specified against: each variant serializes to the
/// `SCREAMING_SNAKE_CASE` wire form and carries a fixed HTTP status class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Input shape/size/range rejected.
    ValidationError,
    /// Unknown linter or output format.
    InvalidParameters,
    /// Base64/DEFLATE decode of a URL-embedded payload failed.
    InvalidContentEncoding,
    /// The requested linter cannot produce the requested format.
    UnsupportedFormat,
    /// A file or workspace exceeded its configured size limit.
    ContentTooLarge,
    /// Rate limit exceeded at the framing layer (passthrough).
    RateLimitExceeded,
    /// A subprocess or job exceeded its timeout.
    TimeoutError,
    /// The requested linter executable is not registered or not installed.
    LinterNotFound,
    /// The linter process failed to spawn or its output could not be parsed.
    LinterExecutionFailed,
    /// Workspace path/size/validation violation.
    WorkspaceError,
    /// Cache write failed (result is still returned to the caller).
    CacheError,
    /// The persistence store is unavailable or a query failed.
    DatabaseError,
    /// No job exists with the requested id.
    JobNotFound,
    /// Cancellation was requested on a job already in a terminal state.
    JobAlreadyCancelled,
    /// Uncaught internal error.
    InternalServerError,
    /// The service is shutting down and is not accepting new work.
    ServiceUnavailable,
}

impl ErrorCode {
    /// The broad [`ErrorCategory`] this code belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ValidationError
            | Self::InvalidParameters
            | Self::InvalidContentEncoding
            | Self::UnsupportedFormat => ErrorCategory::Validation,
            Self::ContentTooLarge => ErrorCategory::Resource,
            Self::RateLimitExceeded => ErrorCategory::RateLimit,
            Self::TimeoutError => ErrorCategory::Timeout,
            Self::LinterNotFound | Self::LinterExecutionFailed => ErrorCategory::Linter,
            Self::WorkspaceError => ErrorCategory::Workspace,
            Self::CacheError => ErrorCategory::Cache,
            Self::DatabaseError => ErrorCategory::Store,
            Self::JobNotFound | Self::JobAlreadyCancelled => ErrorCategory::Job,
            Self::InternalServerError => ErrorCategory::Internal,
            Self::ServiceUnavailable => ErrorCategory::Service,
        }
    }

    /// Stable `&'static str` wire representation, e.g. `"VALIDATION_ERROR"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValidationError => "VALIDATION_ERROR",
            Self::InvalidParameters => "INVALID_PARAMETERS",
            Self::InvalidContentEncoding => "INVALID_CONTENT_ENCODING",
            Self::UnsupportedFormat => "UNSUPPORTED_FORMAT",
            Self::ContentTooLarge => "CONTENT_TOO_LARGE",
            Self::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            Self::TimeoutError => "TIMEOUT_ERROR",
            Self::LinterNotFound => "LINTER_NOT_FOUND",
            Self::LinterExecutionFailed => "LINTER_EXECUTION_FAILED",
            Self::WorkspaceError => "WORKSPACE_ERROR",
            Self::CacheError => "CACHE_ERROR",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::JobNotFound => "JOB_NOT_FOUND",
            Self::JobAlreadyCancelled => "JOB_ALREADY_CANCELLED",
            Self::InternalServerError => "INTERNAL_SERVER_ERROR",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
        }
    }

    /// HTTP status code this error maps to, per the taxonomy table.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::ValidationError
            | Self::InvalidParameters
            | Self::InvalidContentEncoding
            | Self::UnsupportedFormat => 400,
            Self::ContentTooLarge => 413,
            Self::RateLimitExceeded => 429,
            Self::TimeoutError => 408,
            Self::LinterNotFound | Self::LinterExecutionFailed | Self::WorkspaceError => 422,
            Self::CacheError | Self::DatabaseError | Self::InternalServerError => 500,
            Self::JobNotFound => 404,
            Self::JobAlreadyCancelled => 409,
            Self::ServiceUnavailable => 503,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// LintError
// ---------------------------------------------------------------------------

/// Unified error type for the lint gateway core.
///
/// # Examples
///
/// ```
/// use lg_error::{LintError, ErrorCode};
///
/// let err = LintError::new(ErrorCode::TimeoutError, "subprocess exceeded 30000ms")
///     .with_context("linter", "eslint")
///     .with_context("timeout_ms", 30_000);
/// assert_eq!(err.code.http_status(), 408);
/// ```
pub struct LintError {
    /// Machine-readable error code.
    pub code: ErrorCode,
    /// Human-readable description.
    pub message: String,
    /// Optional underlying cause.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    /// Arbitrary structured context for diagnostics.
    pub context: BTreeMap<String, serde_json::Value>,
    /// Correlation id from the inbound HTTP request, if any.
    pub request_id: Option<String>,
}

impl LintError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
            context: BTreeMap::new(),
            request_id: None,
        }
    }

    /// Attach a key-value pair to the diagnostic context. Serialization
    /// failures are silently dropped rather than propagated.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    /// Attach an underlying cause.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Attach the originating request's correlation id.
    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    /// Shorthand for `self.code.category()`.
    pub fn category(&self) -> ErrorCategory {
        self.code.category()
    }

    /// Render the wire-format error envelope:
    /// `{success:false, error:{code, message, details?, timestamp, request_id?}}`.
    pub fn to_envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            success: false,
            error: ErrorBody {
                code: self.code,
                message: self.message.clone(),
                details: if self.context.is_empty() {
                    None
                } else {
                    Some(self.context.clone())
                },
                timestamp: Utc::now().to_rfc3339(),
                request_id: self.request_id.clone(),
            },
        }
    }
}

impl fmt::Debug for LintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("LintError");
        d.field("code", &self.code);
        d.field("message", &self.message);
        if let Some(ref src) = self.source {
            d.field("source", &src.to_string());
        }
        if !self.context.is_empty() {
            d.field("context", &self.context);
        }
        d.finish()
    }
}

impl fmt::Display for LintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for LintError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

// ---------------------------------------------------------------------------
// Wire envelope
// ---------------------------------------------------------------------------

/// Error body inside the [`ErrorEnvelope`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
    /// Optional structured context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<BTreeMap<String, serde_json::Value>>,
    /// ISO-8601 UTC timestamp the error was produced.
    pub timestamp: String,
    /// Correlation id of the originating HTTP request, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Top-level error response envelope: `{success:false, error:{...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Always `false` for error responses.
    pub success: bool,
    /// The error body.
    pub error: ErrorBody,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const ALL_CODES: &[ErrorCode] = &[
        ErrorCode::ValidationError,
        ErrorCode::InvalidParameters,
        ErrorCode::InvalidContentEncoding,
        ErrorCode::UnsupportedFormat,
        ErrorCode::ContentTooLarge,
        ErrorCode::RateLimitExceeded,
        ErrorCode::TimeoutError,
        ErrorCode::LinterNotFound,
        ErrorCode::LinterExecutionFailed,
        ErrorCode::WorkspaceError,
        ErrorCode::CacheError,
        ErrorCode::DatabaseError,
        ErrorCode::JobNotFound,
        ErrorCode::JobAlreadyCancelled,
        ErrorCode::InternalServerError,
        ErrorCode::ServiceUnavailable,
    ];

    #[test]
    fn error_code_count() {
        assert_eq!(ALL_CODES.len(), 16);
    }

    #[test]
    fn all_codes_have_unique_wire_form() {
        let mut seen = HashSet::new();
        for code in ALL_CODES {
            assert!(seen.insert(code.as_str()), "duplicate: {code:?}");
        }
    }

    #[test]
    fn http_status_matches_taxonomy_table() {
        assert_eq!(ErrorCode::ValidationError.http_status(), 400);
        assert_eq!(ErrorCode::InvalidParameters.http_status(), 400);
        assert_eq!(ErrorCode::InvalidContentEncoding.http_status(), 400);
        assert_eq!(ErrorCode::UnsupportedFormat.http_status(), 400);
        assert_eq!(ErrorCode::ContentTooLarge.http_status(), 413);
        assert_eq!(ErrorCode::RateLimitExceeded.http_status(), 429);
        assert_eq!(ErrorCode::TimeoutError.http_status(), 408);
        assert_eq!(ErrorCode::LinterNotFound.http_status(), 422);
        assert_eq!(ErrorCode::LinterExecutionFailed.http_status(), 422);
        assert_eq!(ErrorCode::WorkspaceError.http_status(), 422);
        assert_eq!(ErrorCode::CacheError.http_status(), 500);
        assert_eq!(ErrorCode::DatabaseError.http_status(), 500);
        assert_eq!(ErrorCode::JobNotFound.http_status(), 404);
        assert_eq!(ErrorCode::JobAlreadyCancelled.http_status(), 409);
        assert_eq!(ErrorCode::InternalServerError.http_status(), 500);
        assert_eq!(ErrorCode::ServiceUnavailable.http_status(), 503);
    }

    #[test]
    fn serde_roundtrip() {
        for code in ALL_CODES {
            let json = serde_json::to_string(code).unwrap();
            let back: ErrorCode = serde_json::from_str(&json).unwrap();
            assert_eq!(*code, back);
        }
    }

    #[test]
    fn display_without_context() {
        let err = LintError::new(ErrorCode::JobNotFound, "no such job");
        assert_eq!(err.to_string(), "[JOB_NOT_FOUND] no such job");
    }

    #[test]
    fn envelope_omits_empty_details() {
        let err = LintError::new(ErrorCode::InternalServerError, "boom");
        let env = err.to_envelope();
        let json = serde_json::to_value(&env).unwrap();
        assert!(json["error"].get("details").is_none());
        assert_eq!(json["success"], false);
    }

    #[test]
    fn envelope_includes_context_as_details() {
        let err = LintError::new(ErrorCode::TimeoutError, "timed out")
            .with_context("timeout_ms", 30_000)
            .with_request_id("req-123");
        let env = err.to_envelope();
        assert_eq!(env.error.request_id.as_deref(), Some("req-123"));
        assert_eq!(
            env.error.details.as_ref().unwrap()["timeout_ms"],
            serde_json::json!(30_000)
        );
    }

    #[test]
    fn source_chain_preserved() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = LintError::new(ErrorCode::WorkspaceError, "stage failed").with_source(io_err);
        let src = std::error::Error::source(&err).unwrap();
        assert_eq!(src.to_string(), "gone");
    }

    #[test]
    fn category_grouping() {
        assert_eq!(ErrorCode::CacheError.category(), ErrorCategory::Cache);
        assert_eq!(ErrorCode::DatabaseError.category(), ErrorCategory::Store);
        assert_eq!(
            ErrorCode::JobAlreadyCancelled.category(),
            ErrorCategory::Job
        );
        assert_eq!(
            ErrorCode::ServiceUnavailable.category(),
            ErrorCategory::Service
        );
    }
}
