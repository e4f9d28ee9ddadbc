// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shared domain types for the lint gateway: normalized issues, lint options
//! and their canonical hashing, SARIF export, and URL-payload decoding.
//!
//! This crate has no I/O — everything here is pure data and pure functions,
//! so `lg-cache`, `lg-runner`, `lg-store`, and `lg-daemon` can all depend on
//! it without pulling in persistence, subprocess, or HTTP machinery.
#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod cancel;
pub mod decode;
pub mod hashing;
pub mod issue;
pub mod options;
pub mod sarif;

pub use cancel::CancellationToken;
pub use issue::{Fix, Issue, Severity};
pub use options::{CanonicalOptions, LintOptions, LogLevel};

use serde::{Deserialize, Serialize};

/// Terminal status recorded for a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    /// The linter ran and produced a usable result.
    Success,
    /// The linter ran but reported a failure, or parsing failed.
    Error,
    /// The run was aborted by the timeout ladder.
    Timeout,
}

/// Output format requested for a lint operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Normalized issues plus parsed tool output.
    Json,
    /// Raw stdout/stderr plus exit code.
    Text,
    /// SARIF 2.1.0 wrapper around normalized issues.
    Sarif,
}

impl std::str::FromStr for OutputFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            "text" => Ok(Self::Text),
            "sarif" => Ok(Self::Sarif),
            _ => Err(()),
        }
    }
}
