//! Deploy sink implementations.

use crate::DeploySink;
use async_trait::async_trait;
use reel_core::{ReelError, ReelResult, SinkError};
use std::collections::HashMap;
use std::io::{ErrorKind, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};
use tempfile::NamedTempFile;

// ============================================================================
// MEMORY SINK
// ============================================================================

/// In-memory sink for tests and offline runs.
///
/// Counts writes and can be told to fail reads or writes.
#[derive(Debug, Default)]
pub struct MemorySink {
    files: RwLock<HashMap<String, String>>,
    writes: AtomicUsize,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file.
    pub fn with_file(self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.into(), content.into());
        self
    }

    /// Current contents of `path`, bypassing failure injection.
    pub fn contents(&self, path: &str) -> Option<String> {
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
    }

    /// Number of successful writes.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl DeploySink for MemorySink {
    async fn read(&self, path: &str) -> ReelResult<Option<String>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(ReelError::DeploySink(SinkError::ReadFailed {
                path: path.to_string(),
                reason: "injected read failure".to_string(),
            }));
        }
        Ok(self.contents(path))
    }

    async fn write(&self, path: &str, content: &str) -> ReelResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ReelError::DeploySink(SinkError::WriteFailed {
                path: path.to_string(),
                reason: "injected write failure".to_string(),
            }));
        }

        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_string(), content.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// DIRECTORY SINK
// ============================================================================

/// Sink writing into a local project directory, e.g. a dev server's checkout.
///
/// Logical paths are relative to the root; absolute paths and `..` are
/// rejected. Each write goes to its own uniquely named temporary sibling
/// which is then renamed into place, so the dev server never sees a
/// half-written file and concurrent writes never share a temp path.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> ReelResult<PathBuf> {
        let relative = Path::new(path);
        if path.trim().is_empty() {
            return Err(invalid_path(path, "path is empty"));
        }

        for component in relative.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                Component::ParentDir => return Err(invalid_path(path, "path escapes the root")),
                Component::RootDir | Component::Prefix(_) => {
                    return Err(invalid_path(path, "path must be relative"))
                }
            }
        }

        Ok(self.root.join(relative))
    }
}

fn invalid_path(path: &str, reason: &str) -> ReelError {
    ReelError::DeploySink(SinkError::InvalidPath {
        path: path.to_string(),
        reason: reason.to_string(),
    })
}

#[async_trait]
impl DeploySink for DirectorySink {
    async fn read(&self, path: &str) -> ReelResult<Option<String>> {
        let full = self.resolve(path)?;
        match tokio::fs::read_to_string(&full).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ReelError::DeploySink(SinkError::ReadFailed {
                path: path.to_string(),
                reason: e.to_string(),
            })),
        }
    }

    async fn write(&self, path: &str, content: &str) -> ReelResult<()> {
        let full = self.resolve(path)?;
        let write_failed = |e: std::io::Error| {
            ReelError::DeploySink(SinkError::WriteFailed {
                path: path.to_string(),
                reason: e.to_string(),
            })
        };

        let parent = full
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());
        tokio::fs::create_dir_all(&parent).await.map_err(write_failed)?;

        let bytes = content.as_bytes().to_vec();
        let target = full.clone();
        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let mut tmp = NamedTempFile::new_in(&parent)?;
            tmp.write_all(&bytes)?;
            tmp.persist(&target).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| std::io::Error::new(ErrorKind::Other, e))
        .and_then(|written| written)
        .map_err(write_failed)?;

        tracing::debug!(path = %full.display(), bytes = content.len(), "Deployed file");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_sink_roundtrip_counts_writes() {
        let sink = MemorySink::new();
        assert_eq!(sink.read("src/GameZone.js").await.unwrap(), None);

        sink.write("src/GameZone.js", "a").await.unwrap();
        sink.write("src/GameZone.js", "b").await.unwrap();

        assert_eq!(sink.read("src/GameZone.js").await.unwrap().as_deref(), Some("b"));
        assert_eq!(sink.write_count(), 2);
    }

    #[tokio::test]
    async fn test_memory_sink_failure_injection() {
        let sink = MemorySink::new().with_file("f", "seed");
        sink.set_fail_writes(true);
        sink.set_fail_reads(true);

        assert!(matches!(
            sink.write("f", "x").await,
            Err(ReelError::DeploySink(SinkError::WriteFailed { .. }))
        ));
        assert!(matches!(
            sink.read("f").await,
            Err(ReelError::DeploySink(SinkError::ReadFailed { .. }))
        ));
        assert_eq!(sink.contents("f").as_deref(), Some("seed"));
        assert_eq!(sink.write_count(), 0);
    }

    #[tokio::test]
    async fn test_directory_sink_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path());

        assert_eq!(sink.read("src/GameZone.js").await.unwrap(), None);
        sink.write("src/GameZone.js", "export default GameZone;").await.unwrap();

        let on_disk = std::fs::read_to_string(dir.path().join("src/GameZone.js")).unwrap();
        assert_eq!(on_disk, "export default GameZone;");
        assert_eq!(
            sink.read("src/GameZone.js").await.unwrap().as_deref(),
            Some("export default GameZone;")
        );
        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("src"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("GameZone.js")]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_directory_sink_concurrent_writes_all_land() {
        let dir = tempfile::tempdir().unwrap();
        let sink = std::sync::Arc::new(DirectorySink::new(dir.path()));

        for round in 0..25 {
            let writers: Vec<_> = (0..4)
                .map(|writer| {
                    let sink = sink.clone();
                    tokio::spawn(async move {
                        let content = format!("// round {} writer {}", round, writer);
                        sink.write("src/GameZone.js", &content).await
                    })
                })
                .collect();

            for writer in writers {
                writer.await.unwrap().unwrap();
            }

            let on_disk = sink.read("src/GameZone.js").await.unwrap().unwrap();
            assert!(on_disk.starts_with(&format!("// round {} writer ", round)));
        }

        let entries: Vec<_> = std::fs::read_dir(dir.path().join("src"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("GameZone.js")]);
    }

    #[tokio::test]
    async fn test_directory_sink_rejects_escaping_paths() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path());

        for path in ["../outside.js", "/etc/passwd", "src/../../x.js", ""] {
            assert!(
                matches!(
                    sink.write(path, "x").await,
                    Err(ReelError::DeploySink(SinkError::InvalidPath { .. }))
                ),
                "path {:?} should be rejected",
                path
            );
        }
    }
}
