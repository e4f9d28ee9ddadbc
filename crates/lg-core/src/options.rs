//! Lint options: the recognized request-level knobs and their
//! canonicalization for fingerprinting.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Log level passed through to the underlying tool where supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Most verbose.
    Debug,
    /// Default.
    Info,
    /// Warnings only.
    Warn,
    /// Errors only.
    Error,
}

impl Default for LogLevel {
    fn default() -> Self {
        Self::Info
    }
}

/// Recognized lint request options, all optional on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LintOptions {
    /// Lint every file in the workspace, not just files matched by the
    /// linter's extension filter.
    pub validate_all: bool,
    /// Glob patterns; files matching any are skipped.
    pub exclude_patterns: Vec<String>,
    /// Glob patterns; limits linting to files matching any, when non-empty.
    pub include_patterns: Vec<String>,
    /// Log level passed through to the tool where supported.
    pub log_level: LogLevel,
    /// Subprocess timeout in milliseconds (clamped to 1000..=600000).
    pub timeout: Option<u64>,
    /// Enable in-place fixes for tools that support it.
    pub fix: bool,
    /// Tool-specific configuration file path.
    pub config_file: String,
    /// Tool-specific rule overrides.
    pub rules: BTreeMap<String, serde_json::Value>,
}

impl Default for LintOptions {
    fn default() -> Self {
        Self {
            validate_all: false,
            exclude_patterns: Vec::new(),
            include_patterns: Vec::new(),
            log_level: LogLevel::default(),
            timeout: None,
            fix: false,
            config_file: String::new(),
            rules: BTreeMap::new(),
        }
    }
}

/// Minimum allowed subprocess timeout, in milliseconds.
pub const MIN_TIMEOUT_MS: u64 = 1_000;
/// Maximum allowed subprocess timeout, in milliseconds.
pub const MAX_TIMEOUT_MS: u64 = 600_000;
/// Timeout applied when the caller does not specify one.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

impl LintOptions {
    /// Effective subprocess timeout after applying the default and clamping
    /// to the allowed range.
    pub fn effective_timeout_ms(&self) -> u64 {
        self.timeout
            .unwrap_or(DEFAULT_TIMEOUT_MS)
            .clamp(MIN_TIMEOUT_MS, MAX_TIMEOUT_MS)
    }

    /// Canonicalize into a deterministic form: defaults filled in, arrays
    /// sorted, map keys ordered. Two option sets that mean the same thing
    /// produce the same canonical form regardless of field order or array
    /// order on the wire.
    pub fn canonicalize(&self) -> CanonicalOptions {
        let mut exclude_patterns = self.exclude_patterns.clone();
        exclude_patterns.sort();
        let mut include_patterns = self.include_patterns.clone();
        include_patterns.sort();

        CanonicalOptions {
            validate_all: self.validate_all,
            exclude_patterns,
            include_patterns,
            log_level: self.log_level,
            timeout_ms: self.effective_timeout_ms(),
            fix: self.fix,
            config_file: self.config_file.clone(),
            rules: self.rules.clone(),
        }
    }
}

/// Canonical, order-independent form of [`LintOptions`] used for hashing and
/// for deriving the runner's argv. `rules` is already a `BTreeMap`, so its
/// serialized key order is stable; `serde_json::to_string` on this struct is
/// the deterministic representation fed to the options hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalOptions {
    /// See [`LintOptions::validate_all`].
    pub validate_all: bool,
    /// Sorted copy of [`LintOptions::exclude_patterns`].
    pub exclude_patterns: Vec<String>,
    /// Sorted copy of [`LintOptions::include_patterns`].
    pub include_patterns: Vec<String>,
    /// See [`LintOptions::log_level`].
    pub log_level: LogLevel,
    /// Effective, clamped timeout.
    pub timeout_ms: u64,
    /// See [`LintOptions::fix`].
    pub fix: bool,
    /// See [`LintOptions::config_file`].
    pub config_file: String,
    /// See [`LintOptions::rules`].
    pub rules: BTreeMap<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_canonicalize_deterministically() {
        let a = LintOptions::default();
        let b = LintOptions::default();
        assert_eq!(a.canonicalize(), b.canonicalize());
    }

    #[test]
    fn pattern_order_does_not_affect_canonical_form() {
        let mut a = LintOptions::default();
        a.exclude_patterns = vec!["b/**".into(), "a/**".into()];
        let mut b = LintOptions::default();
        b.exclude_patterns = vec!["a/**".into(), "b/**".into()];
        assert_eq!(a.canonicalize(), b.canonicalize());
    }

    #[test]
    fn timeout_clamped_to_range() {
        let mut o = LintOptions::default();
        o.timeout = Some(10);
        assert_eq!(o.effective_timeout_ms(), MIN_TIMEOUT_MS);

        o.timeout = Some(10_000_000);
        assert_eq!(o.effective_timeout_ms(), MAX_TIMEOUT_MS);

        o.timeout = None;
        assert_eq!(o.effective_timeout_ms(), DEFAULT_TIMEOUT_MS);
    }

    #[test]
    fn missing_fields_deserialize_to_defaults() {
        let o: LintOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(o, LintOptions::default());
    }
}
