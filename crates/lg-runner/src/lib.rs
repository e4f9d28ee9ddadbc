// SPDX-License-Identifier: MIT OR Apache-2.0
//! Linter Runner: looks up a tool's registry entry, spawns it as a
//! subprocess against a prepared workspace, enforces a timeout ladder, and
//! parses its output into normalized issues.
#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod availability;
pub mod parsers;
pub mod registry;

pub use registry::{lookup, LinterConfig};

use lg_core::{CancellationToken, CanonicalOptions, Issue};
use lg_glob::IncludeExcludeGlobs;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tokio::process::Command;

/// Grace period between sending a termination signal and escalating to a
/// kill signal.
pub const TERMINATION_GRACE: Duration = Duration::from_secs(5);

/// Errors from running a linter.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// The requested linter identifier has no registry entry.
    #[error("linter '{0}' is not registered")]
    NotFound(String),
    /// The workspace failed re-validation before execution.
    #[error("workspace invalid: {0}")]
    WorkspaceInvalid(String),
    /// No files in the workspace matched the linter's extensions and the
    /// caller's include/exclude patterns.
    #[error("no supported files found in workspace")]
    NoSupportedFiles,
    /// The subprocess did not exit within `timeout_ms` and was terminated.
    #[error("linter timed out after {0}ms")]
    Timeout(u64),
    /// Execution was aborted by an external cancellation signal.
    #[error("linter execution was cancelled")]
    Cancelled,
    /// The subprocess could not be spawned.
    #[error("failed to spawn linter process: {0}")]
    Spawn(std::io::Error),
    /// An I/O error occurred while communicating with the subprocess.
    #[error("I/O error during linter execution: {0}")]
    Io(#[from] std::io::Error),
    /// An include/exclude glob pattern failed to compile.
    #[error("invalid glob pattern: {0}")]
    InvalidGlob(String),
}

/// Outcome of running a single linter against a workspace.
#[derive(Debug, Clone)]
pub struct LinterResult {
    /// Whether the run is considered successful per the registry's exit-code policy.
    pub success: bool,
    /// Raw process exit code, if the process exited normally.
    pub exit_code: Option<i32>,
    /// Captured stdout.
    pub stdout: String,
    /// Captured stderr.
    pub stderr: String,
    /// Wall-clock execution time, in milliseconds.
    pub execution_time_ms: u64,
    /// Best-effort parsed representation of stdout (the JSON value if stdout was JSON).
    pub parsed_output: Option<serde_json::Value>,
    /// Number of files the linter was invoked against.
    pub file_count: usize,
    /// Normalized issues extracted from the output.
    pub issues: Vec<Issue>,
}

/// Enumerate workspace files matching `config`'s extensions and the
/// caller's include/exclude patterns, relative to `workspace_root`.
pub fn select_files(
    workspace_root: &Path,
    config: &LinterConfig,
    options: &CanonicalOptions,
) -> Result<Vec<PathBuf>, RunnerError> {
    let globs = IncludeExcludeGlobs::new(&options.include_patterns, &options.exclude_patterns)
        .map_err(|e| RunnerError::InvalidGlob(e.to_string()))?;

    let mut selected = Vec::new();
    for entry in walkdir::WalkDir::new(workspace_root).follow_links(false) {
        let entry = entry.map_err(|e| {
            RunnerError::Io(e.into_io_error().unwrap_or_else(|| std::io::Error::other("walk error")))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry.path().strip_prefix(workspace_root).unwrap_or(entry.path());

        if !options.validate_all {
            let matches_extension = rel
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|ext| {
                    let ext = ext.to_ascii_lowercase();
                    config.extensions.iter().any(|e| *e == ext)
                });
            if !matches_extension {
                continue;
            }
        }

        if !globs.decide_path(rel).is_allowed() {
            continue;
        }

        selected.push(rel.to_path_buf());
    }

    selected.sort();
    Ok(selected)
}

fn build_argv(config: &LinterConfig, options: &CanonicalOptions, files: &[PathBuf]) -> Vec<String> {
    let mut argv: Vec<String> = config.base_args.iter().map(|s| s.to_string()).collect();

    if options.fix {
        if let Some(flag) = config.fix_flag {
            argv.push(flag.to_string());
        }
    }
    if !options.config_file.is_empty() {
        if let Some(flag) = config.config_flag {
            argv.push(flag.to_string());
            argv.push(options.config_file.clone());
        }
    }

    for file in files {
        argv.push(file.display().to_string());
    }

    argv
}

/// Run `linter` against `workspace_root`. `workspace` is used to
/// re-validate the workspace before execution; `cancel` is observed both
/// before spawning and while the subprocess is running.
pub async fn run(
    linter: &str,
    workspace: &lg_workspace::WorkspaceManager,
    workspace_root: &Path,
    options: &CanonicalOptions,
    cancel: CancellationToken,
) -> Result<LinterResult, RunnerError> {
    let config = lookup(linter).ok_or_else(|| RunnerError::NotFound(linter.to_string()))?;

    let report = workspace
        .validate(workspace_root)
        .map_err(|e| RunnerError::WorkspaceInvalid(e.to_string()))?;
    if !report.valid {
        return Err(RunnerError::WorkspaceInvalid(report.errors.join("; ")));
    }

    let files = select_files(workspace_root, &config, options)?;
    if files.is_empty() {
        return Err(RunnerError::NoSupportedFiles);
    }

    if cancel.is_cancelled() {
        return Err(RunnerError::Cancelled);
    }

    let argv = build_argv(&config, options, &files);
    let timeout = Duration::from_millis(options.timeout_ms);

    let mut cmd = Command::new(config.executable);
    cmd.args(&argv)
        .current_dir(workspace_root)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .env_clear()
        .env("PATH", std::env::var("PATH").unwrap_or_default())
        .env("LINTGATE_WORKSPACE", workspace_root.display().to_string())
        .env("LINTGATE_RUN_MODE", if options.fix { "fix" } else { "check" });

    for (k, v) in config.env_additions {
        cmd.env(k, v);
    }
    if let Some(var) = config.log_level_env {
        cmd.env(var, format!("{:?}", options.log_level).to_uppercase());
    }

    let start = Instant::now();
    let mut child = cmd.spawn().map_err(RunnerError::Spawn)?;

    let pid = child.id();
    let result = tokio::select! {
        outcome = wait_with_output(&mut child) => outcome,
        _ = tokio::time::sleep(timeout) => {
            terminate(pid, &mut child).await;
            return Err(RunnerError::Timeout(options.timeout_ms));
        }
        _ = cancel.cancelled() => {
            terminate(pid, &mut child).await;
            return Err(RunnerError::Cancelled);
        }
    };

    let execution_time_ms = start.elapsed().as_millis() as u64;
    let (exit_code, stdout, stderr) = result?;

    let success = exit_code.is_some_and(|code| code <= config.max_ok_exit_code);
    let mut issues = parsers::parse_output(&stdout, config.json_parser, config.text_parser);
    // Parsers stamp `source` with their family label (e.g. "eslint-like"); the
    // registry key is the actual linter identity callers asked for, and several
    // distinct registry entries share one parser family.
    for issue in &mut issues {
        issue.source = linter.to_string();
    }
    let parsed_output = serde_json::from_str::<serde_json::Value>(&stdout).ok();

    Ok(LinterResult {
        success,
        exit_code,
        stdout,
        stderr,
        execution_time_ms,
        parsed_output,
        file_count: files.len(),
        issues,
    })
}

async fn wait_with_output(
    child: &mut tokio::process::Child,
) -> Result<(Option<i32>, String, String), RunnerError> {
    let mut stdout_buf = String::new();
    let mut stderr_buf = String::new();

    if let Some(mut stdout) = child.stdout.take() {
        stdout.read_to_string(&mut stdout_buf).await?;
    }
    if let Some(mut stderr) = child.stderr.take() {
        stderr.read_to_string(&mut stderr_buf).await?;
    }

    let status = child.wait().await?;
    Ok((status.code(), stdout_buf, stderr_buf))
}

/// TERM, wait out the grace period, then KILL if the process is still alive.
async fn terminate(pid: Option<u32>, child: &mut tokio::process::Child) {
    if let Some(pid) = pid {
        let nix_pid = nix::unistd::Pid::from_raw(pid as i32);
        if let Err(err) = nix::sys::signal::kill(nix_pid, nix::sys::signal::Signal::SIGTERM) {
            tracing::warn!(target: "lintgate.runner", %err, pid, "failed to send SIGTERM");
        }
    }

    let graceful = tokio::time::timeout(TERMINATION_GRACE, child.wait()).await;
    if graceful.is_err() {
        tracing::warn!(target: "lintgate.runner", pid, "grace period expired, sending SIGKILL");
        let _ = child.kill().await;
        let _ = child.wait().await;
    }
}
