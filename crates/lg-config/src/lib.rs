// SPDX-License-Identifier: MIT OR Apache-2.0
//! Configuration loading, validation, and merging for the lint gateway core.
//!
//! [`GatewayConfig`] is the top-level runtime settings struct: workspace
//! limits, cache TTL, job concurrency, per-linter timeout defaults, and the
//! persistence store path. Values come from a TOML file overlaid with
//! environment variables.
#![deny(unsafe_code)]
#![warn(missing_docs)]

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during configuration loading or validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The requested configuration file was not found.
    #[error("config file not found: {path}")]
    FileNotFound {
        /// Path that was requested.
        path: String,
    },

    /// The file could not be parsed as valid TOML.
    #[error("failed to parse config: {reason}")]
    ParseError {
        /// Human-readable parse error detail.
        reason: String,
    },

    /// Semantic validation failed (one or more problems).
    #[error("config validation failed: {reasons:?}")]
    ValidationError {
        /// Individual validation failure messages.
        reasons: Vec<String>,
    },
}

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

/// Advisory-level issues that do not prevent operation but deserve attention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// A configured timeout is unusually large.
    LargeTimeout {
        /// Which setting this applies to.
        field: String,
        /// Timeout value in milliseconds.
        ms: u64,
    },
    /// A recommended optional field is missing.
    MissingOptionalField {
        /// Name of the missing field.
        field: String,
        /// Why it matters.
        hint: String,
    },
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWarning::LargeTimeout { field, ms } => {
                write!(f, "'{field}' has an unusually large timeout ({ms}ms)")
            }
            ConfigWarning::MissingOptionalField { field, hint } => {
                write!(f, "missing optional field '{field}': {hint}")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Config types
// ---------------------------------------------------------------------------

/// Top-level runtime configuration for the lint gateway core.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct GatewayConfig {
    /// Path to the SQLite database file backing the persistence store.
    /// `:memory:` is accepted for tests.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Base directory under which staged workspaces are created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_dir: Option<String>,

    /// Log level override (e.g. `"debug"`, `"info"`, `"warn"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log output format: `"text"` or `"json"`.
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Cache configuration.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Workspace limit configuration.
    #[serde(default)]
    pub workspace: WorkspaceLimits,

    /// Job manager configuration.
    #[serde(default)]
    pub jobs: JobsConfig,

    /// HTTP-framing rate limit configuration.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            workspace_dir: None,
            log_level: default_log_level(),
            log_format: default_log_format(),
            cache: CacheConfig::default(),
            workspace: WorkspaceLimits::default(),
            jobs: JobsConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

/// Sliding-window rate limit applied at the HTTP framing layer.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Maximum requests admitted per window.
    #[serde(default = "default_rate_limit_max_requests")]
    pub max_requests: u32,
    /// Window length, in seconds.
    #[serde(default = "default_rate_limit_window_secs")]
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_rate_limit_max_requests(),
            window_secs: default_rate_limit_window_secs(),
        }
    }
}

fn default_rate_limit_max_requests() -> u32 {
    120
}

fn default_rate_limit_window_secs() -> u64 {
    60
}

fn default_database_path() -> String {
    "lintgate.db".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

/// Cache TTL and sweep configuration.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct CacheConfig {
    /// Default time-to-live for cache entries, in seconds.
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,

    /// Interval between expired-entry sweeps, in seconds. `0` disables the
    /// periodic sweep (entries still expire lazily on read).
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

fn default_cache_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn default_sweep_interval_secs() -> u64 {
    600
}

/// Workspace size and count limits.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct WorkspaceLimits {
    /// Maximum size of a single file, in bytes.
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,

    /// Maximum aggregate workspace size, in bytes.
    #[serde(default = "default_max_total_bytes")]
    pub max_total_bytes: u64,

    /// Maximum number of files in a workspace.
    #[serde(default = "default_max_file_count")]
    pub max_file_count: u64,

    /// How long a materialized workspace may remain on disk before the
    /// expiry sweep removes it, in seconds.
    #[serde(default = "default_workspace_max_age_secs")]
    pub max_age_secs: u64,
}

impl Default for WorkspaceLimits {
    fn default() -> Self {
        Self {
            max_file_bytes: default_max_file_bytes(),
            max_total_bytes: default_max_total_bytes(),
            max_file_count: default_max_file_count(),
            max_age_secs: default_workspace_max_age_secs(),
        }
    }
}

fn default_max_file_bytes() -> u64 {
    10 * 1024 * 1024
}

fn default_max_total_bytes() -> u64 {
    500 * 1024 * 1024
}

fn default_max_file_count() -> u64 {
    10_000
}

fn default_workspace_max_age_secs() -> u64 {
    2 * 60 * 60
}

/// Job manager concurrency and timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct JobsConfig {
    /// Maximum number of jobs processed concurrently.
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: u32,

    /// Default per-job overall timeout, in milliseconds.
    #[serde(default = "default_job_timeout_ms")]
    pub default_job_timeout_ms: u64,

    /// Default per-subprocess timeout, in milliseconds.
    #[serde(default = "default_subprocess_timeout_ms")]
    pub default_subprocess_timeout_ms: u64,

    /// Age beyond which completed jobs are purged by the sweep, in days.
    #[serde(default = "default_job_retention_days")]
    pub retention_days: u32,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: default_max_concurrent_jobs(),
            default_job_timeout_ms: default_job_timeout_ms(),
            default_subprocess_timeout_ms: default_subprocess_timeout_ms(),
            retention_days: default_job_retention_days(),
        }
    }
}

fn default_max_concurrent_jobs() -> u32 {
    10
}

fn default_job_timeout_ms() -> u64 {
    300_000
}

fn default_subprocess_timeout_ms() -> u64 {
    30_000
}

fn default_job_retention_days() -> u32 {
    7
}

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const MIN_SUBPROCESS_TIMEOUT_MS: u64 = 1_000;
const MAX_SUBPROCESS_TIMEOUT_MS: u64 = 600_000;
const LARGE_JOB_TIMEOUT_THRESHOLD_MS: u64 = 3_600_000;
const VALID_LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];
const VALID_LOG_FORMATS: &[&str] = &["text", "json"];

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load a [`GatewayConfig`] from an optional TOML file path.
///
/// * If `path` is `Some`, reads and parses the file.
/// * If `path` is `None`, returns [`GatewayConfig::default()`].
///
/// Environment variable overrides are applied on top in both cases.
pub fn load_config(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    let mut config = match path {
        Some(p) => {
            let content = std::fs::read_to_string(p).map_err(|_| ConfigError::FileNotFound {
                path: p.display().to_string(),
            })?;
            parse_toml(&content)?
        }
        None => GatewayConfig::default(),
    };
    apply_env_overrides(&mut config);
    Ok(config)
}

/// Parse a TOML string into a [`GatewayConfig`].
pub fn parse_toml(content: &str) -> Result<GatewayConfig, ConfigError> {
    toml::from_str::<GatewayConfig>(content).map_err(|e| ConfigError::ParseError {
        reason: e.to_string(),
    })
}

/// Apply environment variable overrides.
///
/// Recognised variables:
/// - `LINTGATE_DATABASE_PATH`
/// - `LINTGATE_WORKSPACE_DIR`
/// - `LINTGATE_LOG_LEVEL`
/// - `LINTGATE_LOG_FORMAT`
pub fn apply_env_overrides(config: &mut GatewayConfig) {
    if let Ok(val) = std::env::var("LINTGATE_DATABASE_PATH") {
        config.database_path = val;
    }
    if let Ok(val) = std::env::var("LINTGATE_WORKSPACE_DIR") {
        config.workspace_dir = Some(val);
    }
    if let Ok(val) = std::env::var("LINTGATE_LOG_LEVEL") {
        config.log_level = val;
    }
    if let Ok(val) = std::env::var("LINTGATE_LOG_FORMAT") {
        config.log_format = val;
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a parsed configuration, returning advisory warnings.
///
/// Hard errors (out-of-range timeouts, unknown log level/format) are returned
/// as a [`ConfigError::ValidationError`]; soft issues come back as warnings.
pub fn validate_config(config: &GatewayConfig) -> Result<Vec<ConfigWarning>, ConfigError> {
    let mut errors: Vec<String> = Vec::new();
    let mut warnings: Vec<ConfigWarning> = Vec::new();

    if !VALID_LOG_LEVELS.contains(&config.log_level.as_str()) {
        errors.push(format!("invalid log_level '{}'", config.log_level));
    }
    if !VALID_LOG_FORMATS.contains(&config.log_format.as_str()) {
        errors.push(format!("invalid log_format '{}'", config.log_format));
    }

    let sub_timeout = config.jobs.default_subprocess_timeout_ms;
    if !(MIN_SUBPROCESS_TIMEOUT_MS..=MAX_SUBPROCESS_TIMEOUT_MS).contains(&sub_timeout) {
        errors.push(format!(
            "default_subprocess_timeout_ms {sub_timeout} out of range \
             ({MIN_SUBPROCESS_TIMEOUT_MS}..{MAX_SUBPROCESS_TIMEOUT_MS})"
        ));
    }

    if config.jobs.max_concurrent_jobs == 0 {
        errors.push("max_concurrent_jobs must be at least 1".into());
    }

    if config.jobs.default_job_timeout_ms > LARGE_JOB_TIMEOUT_THRESHOLD_MS {
        warnings.push(ConfigWarning::LargeTimeout {
            field: "jobs.default_job_timeout_ms".into(),
            ms: config.jobs.default_job_timeout_ms,
        });
    }

    if config.workspace_dir.is_none() {
        warnings.push(ConfigWarning::MissingOptionalField {
            field: "workspace_dir".into(),
            hint: "workspaces will be staged under the OS temp directory".into(),
        });
    }

    if errors.is_empty() {
        Ok(warnings)
    } else {
        Err(ConfigError::ValidationError { reasons: errors })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let cfg = GatewayConfig::default();
        let warnings = validate_config(&cfg).expect("default config should be valid");
        assert!(!warnings.is_empty());
    }

    #[test]
    fn default_config_has_sensible_defaults() {
        let cfg = GatewayConfig::default();
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.jobs.max_concurrent_jobs, 10);
        assert_eq!(cfg.jobs.default_job_timeout_ms, 300_000);
        assert_eq!(cfg.jobs.default_subprocess_timeout_ms, 30_000);
        assert_eq!(cfg.cache.ttl_secs, 86_400);
        assert_eq!(cfg.workspace.max_file_bytes, 10 * 1024 * 1024);
        assert_eq!(cfg.workspace.max_total_bytes, 500 * 1024 * 1024);
        assert_eq!(cfg.workspace.max_file_count, 10_000);
        assert_eq!(cfg.rate_limit.max_requests, 120);
        assert_eq!(cfg.rate_limit.window_secs, 60);
    }

    #[test]
    fn rate_limit_overrides_parse_from_toml() {
        let toml = r#"
            [rate_limit]
            max_requests = 30
            window_secs = 10
        "#;
        let cfg = parse_toml(toml).unwrap();
        assert_eq!(cfg.rate_limit.max_requests, 30);
        assert_eq!(cfg.rate_limit.window_secs, 10);
    }

    #[test]
    fn parse_valid_toml_string() {
        let toml = r#"
            database_path = "gw.db"
            log_level = "debug"

            [jobs]
            max_concurrent_jobs = 4
        "#;
        let cfg = parse_toml(toml).unwrap();
        assert_eq!(cfg.database_path, "gw.db");
        assert_eq!(cfg.log_level, "debug");
        assert_eq!(cfg.jobs.max_concurrent_jobs, 4);
        // untouched nested defaults still apply
        assert_eq!(cfg.jobs.default_job_timeout_ms, 300_000);
    }

    #[test]
    fn parse_invalid_toml_gives_parse_error() {
        let bad = "this is [not valid toml =";
        let err = parse_toml(bad).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn validation_catches_invalid_log_level() {
        let cfg = GatewayConfig {
            log_level: "verbose".into(),
            ..Default::default()
        };
        let err = validate_config(&cfg).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));
    }

    #[test]
    fn validation_catches_invalid_log_format() {
        let cfg = GatewayConfig {
            log_format: "xml".into(),
            ..Default::default()
        };
        let err = validate_config(&cfg).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));
    }

    #[test]
    fn validation_catches_subprocess_timeout_out_of_range() {
        let mut cfg = GatewayConfig::default();
        cfg.jobs.default_subprocess_timeout_ms = 500;
        let err = validate_config(&cfg).unwrap_err();
        match err {
            ConfigError::ValidationError { reasons } => {
                assert!(reasons.iter().any(|r| r.contains("out of range")));
            }
            other => panic!("expected ValidationError, got {other:?}"),
        }

        let mut cfg = GatewayConfig::default();
        cfg.jobs.default_subprocess_timeout_ms = 700_000;
        validate_config(&cfg).unwrap_err();
    }

    #[test]
    fn validation_catches_zero_concurrency() {
        let mut cfg = GatewayConfig::default();
        cfg.jobs.max_concurrent_jobs = 0;
        let err = validate_config(&cfg).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));
    }

    #[test]
    fn large_job_timeout_produces_warning() {
        let mut cfg = GatewayConfig::default();
        cfg.workspace_dir = Some("/tmp/ws".into());
        cfg.jobs.default_job_timeout_ms = 7_200_000;
        let warnings = validate_config(&cfg).unwrap();
        assert!(
            warnings
                .iter()
                .any(|w| matches!(w, ConfigWarning::LargeTimeout { .. }))
        );
    }

    #[test]
    fn empty_string_toml_parses_to_defaults() {
        let cfg = parse_toml("").unwrap();
        assert_eq!(cfg, GatewayConfig::default());
    }

    #[test]
    fn toml_roundtrip() {
        let cfg = GatewayConfig {
            workspace_dir: Some("/ws".into()),
            ..Default::default()
        };
        let serialized = toml::to_string(&cfg).unwrap();
        let deserialized: GatewayConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(cfg, deserialized);
    }

    #[test]
    fn load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lintgate.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "log_level = \"warn\"\ndatabase_path = \"x.db\"").unwrap();
        let cfg = load_config(Some(&path)).unwrap();
        assert_eq!(cfg.log_level, "warn");
        assert_eq!(cfg.database_path, "x.db");
    }

    #[test]
    fn load_missing_file_gives_file_not_found() {
        let err = load_config(Some(Path::new("/nonexistent/lintgate.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[test]
    fn load_none_returns_default() {
        let cfg = load_config(None).unwrap();
        assert_eq!(cfg.log_level, "info");
    }

    #[test]
    fn config_warning_display() {
        let w = ConfigWarning::LargeTimeout {
            field: "jobs.default_job_timeout_ms".into(),
            ms: 9999,
        };
        assert!(w.to_string().contains("9999"));

        let w = ConfigWarning::MissingOptionalField {
            field: "f".into(),
            hint: "h".into(),
        };
        assert!(w.to_string().contains('f'));
    }

    #[test]
    fn config_error_display() {
        let e = ConfigError::FileNotFound {
            path: "/foo".into(),
        };
        assert!(e.to_string().contains("/foo"));
    }
}
