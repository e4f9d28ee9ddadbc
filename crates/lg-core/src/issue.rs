//! The normalized issue schema every linter-specific parser must produce.

use serde::{Deserialize, Serialize};

/// Severity of a normalized issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocks / fails the lint run.
    Error,
    /// Non-fatal concern.
    Warning,
    /// Informational.
    Info,
}

/// A suggested fix for an issue, when the tool reports one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fix {
    /// Human-readable description of the fix.
    pub description: String,
}

/// A single normalized linter finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    /// File path the issue applies to, relative to the workspace root.
    pub file: String,
    /// 1-based line number, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    /// 1-based column number, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    /// Rule identifier, if the tool reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
    /// Normalized severity.
    pub severity: Severity,
    /// Human-readable message.
    pub message: String,
    /// Name of the linter that produced this issue.
    pub source: String,
    /// Suggested fix, if available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix: Option<Fix>,
}

impl Issue {
    /// Construct an issue with only the required fields set.
    pub fn new(file: impl Into<String>, severity: Severity, message: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line: None,
            column: None,
            rule: None,
            severity,
            message: message.into(),
            source: source.into(),
            fix: None,
        }
    }
}
