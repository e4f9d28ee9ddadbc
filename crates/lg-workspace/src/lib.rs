// SPDX-License-Identifier: MIT OR Apache-2.0
//! Workspace Manager: materializes a submission (inline text or a gzipped
//! tar archive) into a sandboxed directory, enforcing size, file count,
//! extension, and directory-name policies.
//!
//! A prepared workspace is a `TempDir`-backed value whose `Drop` cleans the
//! directory.
#![deny(unsafe_code)]
#![warn(missing_docs)]

use std::collections::HashSet;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

/// Errors from workspace operations. All map to `WorkspaceError` (422) or
/// `ContentTooLarge` (413) at the HTTP boundary.
#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    /// A single file exceeded the configured size limit.
    #[error("file '{path}' is {size} bytes, exceeding the {limit} byte limit")]
    FileTooLarge {
        /// Offending entry path.
        path: String,
        /// Actual size in bytes.
        size: u64,
        /// Configured limit in bytes.
        limit: u64,
    },
    /// The aggregate workspace size exceeded the configured limit.
    #[error("workspace size {size} bytes exceeds the {limit} byte limit")]
    WorkspaceTooLarge {
        /// Accumulated size in bytes.
        size: u64,
        /// Configured limit in bytes.
        limit: u64,
    },
    /// The workspace contains more files than the configured limit.
    #[error("workspace has {count} files, exceeding the {limit} file limit")]
    TooManyFiles {
        /// Observed file count.
        count: u64,
        /// Configured limit.
        limit: u64,
    },
    /// An archive entry's target path escapes the workspace root.
    #[error("archive entry '{path}' escapes the workspace root")]
    PathEscape {
        /// Offending entry path, as recorded in the archive.
        path: String,
    },
    /// An archive entry falls under a blocked directory name.
    #[error("archive entry '{path}' is under a blocked directory")]
    BlockedDirectory {
        /// Offending entry path.
        path: String,
    },
    /// An archive entry is not a regular file (e.g. symlink, device node).
    #[error("archive entry '{path}' is not a regular file")]
    NotRegularFile {
        /// Offending entry path.
        path: String,
    },
    /// The submission was not valid base64.
    #[error("invalid base64 input: {0}")]
    Base64(#[from] base64::DecodeError),
    /// An I/O operation failed while materializing or validating the workspace.
    #[error("workspace I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A cleanup or validation call targeted a path outside the managed base directory.
    #[error("path '{0}' is outside the workspace base directory")]
    OutsideBase(String),
}

/// Size, count, and policy limits governing workspace materialization.
#[derive(Debug, Clone)]
pub struct Limits {
    /// Maximum size of a single file, in bytes.
    pub max_file_bytes: u64,
    /// Maximum aggregate workspace size, in bytes.
    pub max_total_bytes: u64,
    /// Maximum number of files.
    pub max_file_count: u64,
    /// Allowed extensions, lowercase, without the leading dot. `"dockerfile"`
    /// is matched against the exact (case-insensitive) filename, not an
    /// extension.
    pub allowed_extensions: HashSet<String>,
    /// Directory names that may never be materialized, at any depth.
    pub blocked_dirs: HashSet<String>,
    /// Age beyond which a prepared workspace is eligible for the expiry sweep.
    pub max_age: Duration,
}

impl Default for Limits {
    fn default() -> Self {
        let allowed_extensions = [
            "js", "jsx", "ts", "tsx", "py", "go", "rb", "sh", "bash", "yaml", "yml", "json",
            "md", "markdown", "html", "htm", "css", "scss", "php", "c", "h", "cc", "cpp", "hpp",
            "java", "kt", "swift", "rs", "dockerfile", "txt",
        ]
        .into_iter()
        .map(String::from)
        .collect();

        let blocked_dirs = [
            "node_modules",
            ".git",
            ".svn",
            ".hg",
            "vendor",
            "dist",
            "build",
            "target",
            ".idea",
            ".vscode",
            "__pycache__",
            ".pytest_cache",
            "coverage",
            ".nyc_output",
        ]
        .into_iter()
        .map(String::from)
        .collect();

        Self {
            max_file_bytes: 10 * 1024 * 1024,
            max_total_bytes: 500 * 1024 * 1024,
            max_file_count: 10_000,
            allowed_extensions,
            blocked_dirs,
            max_age: Duration::from_secs(2 * 60 * 60),
        }
    }
}

impl Limits {
    fn extension_allowed(&self, path: &Path) -> bool {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        if name.eq_ignore_ascii_case("dockerfile") {
            return self.allowed_extensions.contains("dockerfile");
        }
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => self.allowed_extensions.contains(&ext.to_ascii_lowercase()),
            None => false,
        }
    }

    fn has_blocked_segment(&self, path: &Path) -> bool {
        path.components().any(|c| {
            c.as_os_str()
                .to_str()
                .is_some_and(|s| self.blocked_dirs.contains(s))
        })
    }
}

/// A materialized workspace directory. Cleaned up automatically on drop.
pub struct PreparedWorkspace {
    root: PathBuf,
    _temp: TempDir,
}

impl PreparedWorkspace {
    /// Absolute root path of the materialized workspace.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Enumerate every regular file under the workspace root, as paths
    /// relative to the root.
    pub fn list_files(&self) -> Result<Vec<PathBuf>, WorkspaceError> {
        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(&self.root).follow_links(false) {
            let entry = entry.map_err(|e| {
                WorkspaceError::Io(e.into_io_error().unwrap_or_else(|| {
                    std::io::Error::other("walkdir traversal error")
                }))
            })?;
            if entry.file_type().is_file() {
                if let Ok(rel) = entry.path().strip_prefix(&self.root) {
                    files.push(rel.to_path_buf());
                }
            }
        }
        Ok(files)
    }
}

/// Validation result for an existing workspace ([`WorkspaceManager::validate`]).
#[derive(Debug, Clone)]
pub struct ValidationReport {
    /// `true` iff `errors` is empty.
    pub valid: bool,
    /// Human-readable validation failures, if any.
    pub errors: Vec<String>,
}

/// Materializes submissions into sandboxed workspace directories.
pub struct WorkspaceManager {
    base_dir: PathBuf,
    limits: Limits,
}

impl WorkspaceManager {
    /// Create a manager rooted at `base_dir` (created if missing) with the
    /// given policy limits.
    pub fn new(base_dir: impl Into<PathBuf>, limits: Limits) -> Self {
        Self {
            base_dir: base_dir.into(),
            limits,
        }
    }

    /// The policy limits this manager enforces.
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// The base directory this manager materializes workspaces under.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Write a single text file into a fresh workspace.
    pub fn create_from_text(
        &self,
        content: &str,
        filename: Option<&str>,
    ) -> Result<PreparedWorkspace, WorkspaceError> {
        let size = content.len() as u64;
        if size > self.limits.max_file_bytes {
            return Err(WorkspaceError::FileTooLarge {
                path: filename.unwrap_or("code.txt").to_string(),
                size,
                limit: self.limits.max_file_bytes,
            });
        }

        let temp = self.new_tempdir()?;
        let root = temp.path().to_path_buf();
        let name = filename.unwrap_or("code.txt");
        std::fs::write(root.join(name), content)?;

        Ok(PreparedWorkspace { root, _temp: temp })
    }

    /// Dispatch on magic bytes: `1f 8b` (gzip) is treated as a gzipped tar
    /// archive; anything else is treated as UTF-8 text.
    pub fn create_from_bytes(&self, bytes: &[u8]) -> Result<PreparedWorkspace, WorkspaceError> {
        if bytes.len() >= 2 && bytes[0] == 0x1f && bytes[1] == 0x8b {
            self.create_from_archive(bytes)
        } else {
            let text = String::from_utf8_lossy(bytes);
            self.create_from_text(&text, None)
        }
    }

    /// Base64-decode, then dispatch as [`create_from_bytes`](Self::create_from_bytes).
    pub fn create_from_base64(&self, encoded: &str) -> Result<PreparedWorkspace, WorkspaceError> {
        use base64::Engine;
        let bytes = base64::engine::general_purpose::STANDARD.decode(encoded)?;
        self.create_from_bytes(&bytes)
    }

    fn create_from_archive(&self, gz_bytes: &[u8]) -> Result<PreparedWorkspace, WorkspaceError> {
        let temp = self.new_tempdir()?;
        let root = temp.path().to_path_buf();

        match self.extract_archive(gz_bytes, &root) {
            Ok(()) => Ok(PreparedWorkspace { root, _temp: temp }),
            Err(e) => {
                let _ = std::fs::remove_dir_all(&root);
                Err(e)
            }
        }
    }

    /// Stream a gzipped tar archive into `root`, validating every entry
    /// against the confinement/size/extension policy before writing any
    /// bytes. A hard violation aborts extraction; a soft violation (wrong
    /// extension on an otherwise-valid entry) is skipped silently.
    fn extract_archive(&self, gz_bytes: &[u8], root: &Path) -> Result<(), WorkspaceError> {
        let decoder = flate2::read::GzDecoder::new(gz_bytes);
        let mut archive = tar::Archive::new(decoder);
        let mut total: u64 = 0;
        let mut count: u64 = 0;

        for entry in archive.entries()? {
            let mut entry = entry?;
            let entry_path = entry.path()?.to_path_buf();
            let display_path = entry_path.display().to_string();

            let target = root.join(&entry_path);
            let normalized = normalize(&target);
            if !normalized.starts_with(normalize(root)) {
                return Err(WorkspaceError::PathEscape { path: display_path });
            }

            if self.limits.has_blocked_segment(&entry_path) {
                return Err(WorkspaceError::BlockedDirectory { path: display_path });
            }

            if !entry.header().entry_type().is_file() {
                return Err(WorkspaceError::NotRegularFile { path: display_path });
            }

            let size = entry.header().size()?;
            if size > self.limits.max_file_bytes {
                return Err(WorkspaceError::FileTooLarge {
                    path: display_path,
                    size,
                    limit: self.limits.max_file_bytes,
                });
            }
            total += size;
            if total > self.limits.max_total_bytes {
                return Err(WorkspaceError::WorkspaceTooLarge {
                    size: total,
                    limit: self.limits.max_total_bytes,
                });
            }

            if !self.limits.extension_allowed(&entry_path) {
                // Soft violation: skip silently, don't abort the whole extraction.
                continue;
            }

            count += 1;
            if count > self.limits.max_file_count {
                return Err(WorkspaceError::TooManyFiles {
                    count,
                    limit: self.limits.max_file_count,
                });
            }

            if let Some(parent) = normalized.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut buf = Vec::with_capacity(size as usize);
            entry.read_to_end(&mut buf)?;
            std::fs::write(&normalized, buf)?;
        }

        Ok(())
    }

    /// Re-check all invariants on an existing workspace directory.
    pub fn validate(&self, path: &Path) -> Result<ValidationReport, WorkspaceError> {
        let mut errors = Vec::new();
        let mut total: u64 = 0;
        let mut count: u64 = 0;

        for entry in walkdir::WalkDir::new(path).follow_links(false) {
            let entry = entry.map_err(|e| {
                WorkspaceError::Io(e.into_io_error().unwrap_or_else(|| {
                    std::io::Error::other("walkdir traversal error")
                }))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = entry.path().strip_prefix(path).unwrap_or(entry.path());
            if self.limits.has_blocked_segment(rel) {
                errors.push(format!("blocked directory in: {}", rel.display()));
                continue;
            }
            let size = entry.metadata()?.len();
            if size > self.limits.max_file_bytes {
                errors.push(format!("file too large: {} ({size} bytes)", rel.display()));
            }
            total += size;
            count += 1;
        }

        if total > self.limits.max_total_bytes {
            errors.push(format!("workspace too large: {total} bytes"));
        }
        if count > self.limits.max_file_count {
            errors.push(format!("too many files: {count}"));
        }

        Ok(ValidationReport {
            valid: errors.is_empty(),
            errors,
        })
    }

    /// Best-effort recursive removal. Refuses to remove any path outside
    /// the managed base directory.
    pub fn cleanup(&self, path: &Path) -> Result<(), WorkspaceError> {
        let normalized = normalize(path);
        if !normalized.starts_with(normalize(&self.base_dir)) {
            return Err(WorkspaceError::OutsideBase(path.display().to_string()));
        }
        if normalized.exists() {
            std::fs::remove_dir_all(&normalized)?;
        }
        Ok(())
    }

    /// Sweep workspaces under the base directory older than the configured
    /// max age. Returns the number removed.
    pub fn cleanup_expired(&self) -> Result<u64, WorkspaceError> {
        if !self.base_dir.exists() {
            return Ok(0);
        }
        let now = SystemTime::now();
        let mut removed = 0;

        for entry in std::fs::read_dir(&self.base_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let modified = entry.metadata()?.modified()?;
            let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
            if age > self.limits.max_age {
                std::fs::remove_dir_all(entry.path())?;
                removed += 1;
            }
        }

        Ok(removed)
    }

    fn new_tempdir(&self) -> Result<TempDir, WorkspaceError> {
        std::fs::create_dir_all(&self.base_dir)?;
        Ok(tempfile::Builder::new()
            .prefix("lintgate-ws-")
            .tempdir_in(&self.base_dir)?)
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            std::path::Component::ParentDir => {
                out.pop();
            }
            std::path::Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> (WorkspaceManager, TempDir) {
        let base = TempDir::new().unwrap();
        let mgr = WorkspaceManager::new(base.path(), Limits::default());
        (mgr, base)
    }

    #[test]
    fn create_from_text_writes_single_file() {
        let (mgr, _base) = manager();
        let ws = mgr.create_from_text("var x = 1;", None).unwrap();
        assert!(ws.root().join("code.txt").exists());
        assert_eq!(ws.list_files().unwrap().len(), 1);
    }

    #[test]
    fn create_from_text_uses_filename_hint() {
        let (mgr, _base) = manager();
        let ws = mgr.create_from_text("x = 1", Some("script.py")).unwrap();
        assert!(ws.root().join("script.py").exists());
    }

    #[test]
    fn create_from_text_rejects_oversized_content() {
        let (mgr, _base) = manager();
        let big = "a".repeat((Limits::default().max_file_bytes + 1) as usize);
        let err = mgr.create_from_text(&big, None).unwrap_err();
        assert!(matches!(err, WorkspaceError::FileTooLarge { .. }));
    }

    #[test]
    fn workspace_confinement_invariant() {
        let (mgr, _base) = manager();
        let ws = mgr.create_from_text("content", Some("a.txt")).unwrap();
        let normalized_root = normalize(ws.root());
        for file in ws.list_files().unwrap() {
            let full = normalize(&ws.root().join(&file));
            assert!(full.starts_with(&normalized_root));
        }
    }

    #[test]
    fn cleanup_refuses_paths_outside_base() {
        let (mgr, _base) = manager();
        let outside = std::env::temp_dir().join("definitely-not-a-workspace");
        let err = mgr.cleanup(&outside).unwrap_err();
        assert!(matches!(err, WorkspaceError::OutsideBase(_)));
    }

    #[test]
    fn cleanup_removes_workspace_under_base() {
        let (mgr, _base) = manager();
        let ws = mgr.create_from_text("x", None).unwrap();
        let root = ws.root().to_path_buf();
        mgr.cleanup(&root).unwrap();
        assert!(!root.exists());
    }

    #[test]
    fn validate_detects_blocked_directory() {
        let (mgr, _base) = manager();
        let ws = mgr.create_from_text("x", None).unwrap();
        std::fs::create_dir_all(ws.root().join("node_modules")).unwrap();
        std::fs::write(ws.root().join("node_modules/lib.js"), "x").unwrap();
        let report = mgr.validate(ws.root()).unwrap();
        assert!(!report.valid);
        assert!(report.errors.iter().any(|e| e.contains("blocked directory")));
    }

    #[test]
    fn invalid_base64_rejected() {
        let (mgr, _base) = manager();
        let err = mgr.create_from_base64("not base64 !!!").unwrap_err();
        assert!(matches!(err, WorkspaceError::Base64(_)));
    }

    #[test]
    fn gzip_magic_bytes_dispatch_to_archive_path() {
        let (mgr, _base) = manager();
        // Non-gzip bytes beginning differently fall through to text handling.
        let err = mgr.create_from_bytes(&[0x1f, 0x8b, 0x00, 0x00]);
        assert!(err.is_err());
    }

    #[test]
    fn archive_extraction_rejects_path_traversal() {
        let (mgr, _base) = manager();
        let mut tar_bytes = Vec::new();
        {
            let mut builder = tar::Builder::new(&mut tar_bytes);
            let data = b"evil";
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, "../../etc/passwd", &data[..])
                .unwrap();
            builder.finish().unwrap();
        }
        let mut gz = Vec::new();
        {
            let mut encoder =
                flate2::write::GzEncoder::new(&mut gz, flate2::Compression::default());
            std::io::Write::write_all(&mut encoder, &tar_bytes).unwrap();
            encoder.finish().unwrap();
        }

        let err = mgr.create_from_bytes(&gz).unwrap_err();
        assert!(matches!(err, WorkspaceError::PathEscape { .. }));
    }

    #[test]
    fn archive_extraction_skips_disallowed_extension_silently() {
        let (mgr, _base) = manager();
        let mut tar_bytes = Vec::new();
        {
            let mut builder = tar::Builder::new(&mut tar_bytes);
            let data = b"binary";
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, "firmware.bin", &data[..])
                .unwrap();
            builder.finish().unwrap();
        }
        let mut gz = Vec::new();
        {
            let mut encoder =
                flate2::write::GzEncoder::new(&mut gz, flate2::Compression::default());
            std::io::Write::write_all(&mut encoder, &tar_bytes).unwrap();
            encoder.finish().unwrap();
        }

        let ws = mgr.create_from_bytes(&gz).unwrap();
        assert!(ws.list_files().unwrap().is_empty());
    }
}
