//! Per-run temporary files.
//!
//! An [`ArtifactScope`] owns every file a single pipeline run creates. Names
//! combine the event id with a ULID so concurrent runs never share a path.
//! Files are removed by [`ArtifactScope::cleanup`] on every exit path; if a
//! scope is dropped without cleanup (task cancelled mid-run), `Drop` removes
//! whatever is left synchronously.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};

/// Failure to remove a temporary artifact. Logged, never shown to users.
#[derive(Debug, Error)]
#[error("failed to remove artifact {}: {source}", .path.display())]
pub struct CleanupError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

pub struct ArtifactScope {
    dir: PathBuf,
    prefix: String,
    paths: Vec<PathBuf>,
}

impl ArtifactScope {
    pub fn new(dir: impl Into<PathBuf>, event_id: &str) -> Self {
        Self {
            dir: dir.into(),
            prefix: format!(
                "{}-{}",
                sanitize(event_id),
                ulid::Ulid::new().to_string().to_lowercase()
            ),
            paths: Vec::new(),
        }
    }

    /// Reserve a path for `stage` with `extension`. The path is tracked for
    /// cleanup whether or not anything is ever written to it.
    pub fn path_for(&mut self, stage: &str, extension: &str) -> PathBuf {
        let path = self
            .dir
            .join(format!("{}-{}.{}", self.prefix, stage, extension));
        if !self.paths.contains(&path) {
            self.paths.push(path.clone());
        }
        path
    }

    /// Write `data` to a fresh tracked path and return it.
    pub async fn write(
        &mut self,
        stage: &str,
        extension: &str,
        data: &[u8],
    ) -> std::io::Result<PathBuf> {
        fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(stage, extension);
        fs::write(&path, data).await?;
        Ok(path)
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Remove every tracked file. Failures are logged and otherwise ignored.
    pub async fn cleanup(mut self) {
        for path in std::mem::take(&mut self.paths) {
            if let Err(e) = remove_artifact(&path).await {
                warn!(error = %e, "Artifact cleanup failed");
            }
        }
    }
}

impl Drop for ArtifactScope {
    fn drop(&mut self) {
        for path in self.paths.drain(..) {
            match std::fs::remove_file(&path) {
                Ok(()) => debug!(path = %path.display(), "Removed abandoned artifact"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!(
                    error = %CleanupError { path, source: e },
                    "Artifact cleanup failed"
                ),
            }
        }
    }
}

/// Remove one artifact. A file that was never created is not an error.
pub async fn remove_artifact(path: &Path) -> Result<(), CleanupError> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(CleanupError {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Keep event ids filesystem-safe.
fn sanitize(event_id: &str) -> String {
    let cleaned: String = event_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(64)
        .collect();
    if cleaned.is_empty() {
        "event".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn sanitize_replaces_separators() {
        assert_eq!(sanitize("-100123:77"), "-100123_77");
        assert_eq!(sanitize("cb:a/b"), "cb_a_b");
        assert_eq!(sanitize(""), "event");
    }

    #[test]
    fn same_event_gets_distinct_paths_per_scope() {
        let mut a = ArtifactScope::new("/tmp/parley", "1:1");
        let mut b = ArtifactScope::new("/tmp/parley", "1:1");
        assert_ne!(a.path_for("voice", "ogg"), b.path_for("voice", "ogg"));
    }

    #[test]
    fn path_for_is_stable_within_scope() {
        let mut scope = ArtifactScope::new("/tmp/parley", "1:1");
        let first = scope.path_for("speech", "mp3");
        let second = scope.path_for("speech", "mp3");
        assert_eq!(first, second);
        assert_eq!(scope.paths().len(), 1);
        let name = first.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("1_1-"));
        assert!(name.ends_with("-speech.mp3"));
    }

    #[tokio::test]
    async fn write_creates_directory_and_cleanup_removes() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("nested");
        let mut scope = ArtifactScope::new(&dir, "42:7");

        let written = scope.write("voice", "ogg", b"OggS").await.unwrap();
        let reserved = scope.path_for("voice", "wav");
        assert_eq!(fs::read(&written).await.unwrap(), b"OggS");
        assert!(!reserved.exists());

        scope.cleanup().await;
        assert!(!written.exists());
        assert!(dir.exists());
    }

    #[tokio::test]
    async fn drop_removes_leftovers() {
        let tmp = TempDir::new().unwrap();
        let path = {
            let mut scope = ArtifactScope::new(tmp.path(), "9:9");
            scope.write("doc", "pdf", b"%PDF").await.unwrap()
        };
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn remove_missing_artifact_is_ok() {
        let tmp = TempDir::new().unwrap();
        assert!(remove_artifact(&tmp.path().join("never")).await.is_ok());
    }

    #[tokio::test]
    async fn remove_directory_reports_cleanup_error() {
        let tmp = TempDir::new().unwrap();
        let err = remove_artifact(tmp.path()).await.unwrap_err();
        assert_eq!(err.path, tmp.path());
        assert!(err.to_string().contains("failed to remove artifact"));
    }
}
