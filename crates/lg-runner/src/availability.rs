//! Per-linter availability probing: `<exe> --version` with a 5s timeout,
//! cached for the process lifetime. This is the one piece of process-wide
//! global state in the runner, and it is deliberately narrow: a map built
//! lazily and never invalidated outside tests.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::sync::RwLock;

/// Timeout applied to an availability probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Result of probing a single linter's availability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Availability {
    /// Whether the executable was found and ran successfully.
    pub available: bool,
    /// Best-effort semver-ish substring extracted from the version output.
    pub version: Option<String>,
}

fn cache() -> &'static RwLock<HashMap<String, Availability>> {
    static CACHE: OnceLock<RwLock<HashMap<String, Availability>>> = OnceLock::new();
    CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Probe (or return the cached result for) a linter's availability.
pub async fn probe(linter: &str) -> Availability {
    if let Some(cached) = cache().read().await.get(linter) {
        return cached.clone();
    }

    let result = probe_uncached(linter).await;
    cache().write().await.insert(linter.to_string(), result.clone());
    result
}

async fn probe_uncached(executable: &str) -> Availability {
    let spawn = Command::new(executable)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn();

    let mut child = match spawn {
        Ok(child) => child,
        Err(_) => {
            return Availability {
                available: false,
                version: None,
            }
        }
    };

    let mut stdout_buf = String::new();
    if let Some(mut stdout) = child.stdout.take() {
        let _ = stdout.read_to_string(&mut stdout_buf).await;
    }

    let outcome = tokio::time::timeout(PROBE_TIMEOUT, child.wait()).await;
    match outcome {
        Ok(Ok(status)) if status.success() => Availability {
            available: true,
            version: extract_version(&stdout_buf),
        },
        _ => {
            let _ = child.kill().await;
            Availability {
                available: false,
                version: None,
            }
        }
    }
}

fn extract_version(output: &str) -> Option<String> {
    output.split_whitespace().find_map(|tok| {
        let trimmed = tok.trim_start_matches('v');
        let looks_semverish = trimmed.chars().next().is_some_and(|c| c.is_ascii_digit())
            && trimmed.contains('.');
        looks_semverish.then(|| trimmed.to_string())
    })
}

/// Remove every cached result. Test-only: production code never invalidates
/// the probe cache outside process restart.
#[cfg(test)]
pub async fn reset_for_test() {
    cache().write().await.clear();
}
