//! File access to one remote session for the duration of a turn.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

use super::{PathGuard, PathLocks, RemoteError, RemoteFs, RemoteResult, SandboxFile, SessionConnector};
use crate::path;
use crate::transform::ContentTransformer;
use crate::vfs::DirEntry;

/// File operations against one sandbox session.
///
/// The session is resumed lazily on first use and the connection is shared
/// by every call in the turn. Reads and existence checks never fail: errors
/// are logged and reported as "absent". Writes report success as a bool.
pub struct RemoteFileAccess {
    session_id: String,
    connector: Arc<dyn SessionConnector>,
    connection: OnceCell<Arc<dyn RemoteFs>>,
    transformer: Arc<ContentTransformer>,
    locks: PathLocks,
    timeout: Duration,
}

impl std::fmt::Debug for RemoteFileAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteFileAccess")
            .field("session_id", &self.session_id)
            .field("connected", &self.connection.initialized())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl RemoteFileAccess {
    pub fn new(
        session_id: impl Into<String>,
        connector: Arc<dyn SessionConnector>,
        transformer: Arc<ContentTransformer>,
        locks: PathLocks,
        timeout: Duration,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            connector,
            connection: OnceCell::new(),
            transformer,
            locks,
            timeout,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Run `fut` under the configured timeout.
    async fn bounded<T>(
        &self,
        op: &'static str,
        fut: impl Future<Output = RemoteResult<T>>,
    ) -> RemoteResult<T> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| RemoteError::Timeout {
                op,
                secs: self.timeout.as_secs(),
            })?
    }

    /// The session's filesystem, resuming it on first use.
    async fn fs(&self) -> RemoteResult<&Arc<dyn RemoteFs>> {
        self.connection
            .get_or_try_init(|| async {
                tracing::debug!(session = %self.session_id, "resuming session");
                self.bounded("resume", self.connector.resume(&self.session_id))
                    .await
            })
            .await
    }

    /// Immediate children of a directory.
    pub async fn list(&self, dir: &str) -> RemoteResult<Vec<DirEntry>> {
        let dir = path::normalize(dir);
        let fs = self.fs().await?;
        self.bounded("readdir", fs.readdir(&dir)).await
    }

    /// Whether `file_path` exists, judged by listing its parent.
    pub async fn exists(&self, file_path: &str) -> bool {
        let normalized = path::normalize(file_path);
        let name = path::base_name(&normalized);
        if name.is_empty() {
            return false;
        }
        match self.list(&path::dir_name(&normalized)).await {
            Ok(entries) => entries.iter().any(|e| e.name == name),
            Err(e) => {
                if !e.is_not_found() {
                    tracing::warn!(session = %self.session_id, path = %normalized, error = %e, "existence check failed");
                }
                false
            }
        }
    }

    /// Read a file as bytes or text according to its classification.
    pub async fn read(&self, file_path: &str) -> Option<SandboxFile> {
        let normalized = path::normalize(file_path);
        match self.read_inner(&normalized).await {
            Ok(file) => Some(file),
            Err(e) => {
                tracing::warn!(session = %self.session_id, path = %normalized, error = %e, "read failed");
                None
            }
        }
    }

    async fn read_inner(&self, normalized: &str) -> RemoteResult<SandboxFile> {
        let fs = self.fs().await?;
        if path::classify(normalized).is_binary() {
            let content = self.bounded("read_file", fs.read_file(normalized)).await?;
            Ok(SandboxFile::Binary {
                path: normalized.to_string(),
                content,
            })
        } else {
            let content = self
                .bounded("read_text_file", fs.read_text_file(normalized))
                .await?;
            Ok(SandboxFile::Text {
                path: normalized.to_string(),
                content,
            })
        }
    }

    /// Write `content`, injecting element ids into JS/TS sources first.
    ///
    /// Content the transformer rejects is written as given.
    pub async fn write(&self, file_path: &str, content: &str) -> bool {
        let normalized = path::normalize(file_path);

        let content = if path::is_source_like(&normalized) {
            match self.transformer.process_for_write(&normalized, content).await {
                Ok(result) => result.new_content,
                Err(e) => {
                    tracing::warn!(path = %normalized, error = %e, "transform failed; writing original content");
                    content.to_string()
                }
            }
        } else {
            content.to_string()
        };

        match self.write_inner(&normalized, &content).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(session = %self.session_id, path = %normalized, error = %e, "write failed");
                false
            }
        }
    }

    async fn write_inner(&self, normalized: &str, content: &str) -> RemoteResult<()> {
        let fs = self.fs().await?;
        self.bounded("write_text_file", fs.write_text_file(normalized, content))
            .await
    }

    /// Per-path lock within this session.
    pub async fn lock(&self, file_path: &str) -> PathGuard {
        self.locks
            .lock(&self.session_id, &path::normalize(file_path))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransformConfig;
    use crate::remote::SessionRegistry;
    use crate::transform::IdentityFormatter;
    use crate::vfs::{MemoryBackend, VfsOps};
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn transformer() -> Arc<ContentTransformer> {
        Arc::new(ContentTransformer::new(
            TransformConfig::default(),
            Arc::new(IdentityFormatter),
        ))
    }

    fn access_with(backend: Arc<dyn VfsOps>) -> RemoteFileAccess {
        let registry = Arc::new(SessionRegistry::new());
        registry.mount("s1", backend);
        RemoteFileAccess::new(
            "s1",
            registry,
            transformer(),
            PathLocks::new(),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_write_read_exists() {
        let access = access_with(Arc::new(MemoryBackend::new()));

        assert!(!access.exists("/a/b.txt").await);
        assert!(access.write("/a/b.txt", "hello").await);
        assert!(access.exists("a//b.txt").await);

        let file = access.read("/a/./b.txt").await.unwrap();
        assert_eq!(
            file,
            SandboxFile::Text {
                path: "/a/b.txt".into(),
                content: "hello".into()
            }
        );
        assert_eq!(access.list("/a").await.unwrap(), vec![DirEntry::file("b.txt")]);
    }

    #[tokio::test]
    async fn test_binary_read() {
        let backend = Arc::new(MemoryBackend::new());
        backend
            .write_all(Path::new("logo.png"), &[0x89, 0x50, 0x4e, 0x47])
            .await
            .unwrap();
        let access = access_with(backend);

        let file = access.read("/logo.png").await.unwrap();
        assert!(file.is_binary());
        assert!(access.read("/missing.txt").await.is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinked_source_read_whole() {
        let dir = tempfile::TempDir::new().unwrap();
        let body = "export const title = \"a file reached through a symlink\";\n";
        std::fs::write(dir.path().join("real.txt"), body).unwrap();
        std::os::unix::fs::symlink("real.txt", dir.path().join("alias.txt")).unwrap();
        let access = access_with(Arc::new(crate::vfs::LocalBackend::new(dir.path())));

        assert_eq!(
            access.read("/alias.txt").await.unwrap(),
            SandboxFile::Text {
                path: "/alias.txt".into(),
                content: body.into()
            }
        );
    }

    #[tokio::test]
    async fn test_source_write_is_transformed() {
        let backend = Arc::new(MemoryBackend::new());
        let access = access_with(backend.clone());

        assert!(access.write("/app/page.tsx", "export default () => <div />;\n").await);
        let written = backend.read_all(Path::new("app/page.tsx")).await.unwrap();
        assert!(String::from_utf8(written).unwrap().contains("<div data-oid=\""));

        // Unparseable source is written verbatim.
        assert!(access.write("/app/bad.tsx", "<div>").await);
        let written = backend.read_all(Path::new("app/bad.tsx")).await.unwrap();
        assert_eq!(written, b"<div>");
    }

    #[tokio::test]
    async fn test_write_failure_reported() {
        let access = access_with(Arc::new(MemoryBackend::read_only()));
        assert!(!access.write("/x.txt", "x").await);
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let access = RemoteFileAccess::new(
            "ghost",
            Arc::new(SessionRegistry::new()),
            transformer(),
            PathLocks::new(),
            Duration::from_secs(5),
        );
        assert!(!access.exists("/a.txt").await);
        assert!(access.read("/a.txt").await.is_none());
        assert!(!access.write("/a.txt", "x").await);
        assert!(matches!(
            access.list("/").await,
            Err(RemoteError::Connect { .. })
        ));
    }

    struct CountingConnector {
        inner: SessionRegistry,
        resumes: AtomicUsize,
    }

    #[async_trait]
    impl SessionConnector for CountingConnector {
        async fn resume(&self, session_id: &str) -> RemoteResult<Arc<dyn RemoteFs>> {
            self.resumes.fetch_add(1, Ordering::SeqCst);
            self.inner.resume(session_id).await
        }
    }

    #[tokio::test]
    async fn test_connection_resumed_once() {
        let connector = Arc::new(CountingConnector {
            inner: SessionRegistry::new(),
            resumes: AtomicUsize::new(0),
        });
        connector.inner.mount("s1", Arc::new(MemoryBackend::new()));

        let access = RemoteFileAccess::new(
            "s1",
            connector.clone(),
            transformer(),
            PathLocks::new(),
            Duration::from_secs(5),
        );
        access.write("/a.txt", "a").await;
        access.read("/a.txt").await;
        access.exists("/a.txt").await;
        assert_eq!(connector.resumes.load(Ordering::SeqCst), 1);
    }

    struct StallingConnector;

    #[async_trait]
    impl SessionConnector for StallingConnector {
        async fn resume(&self, _session_id: &str) -> RemoteResult<Arc<dyn RemoteFs>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Err(RemoteError::connect("s", "unreachable"))
        }
    }

    #[tokio::test]
    async fn test_resume_timeout() {
        let access = RemoteFileAccess::new(
            "s1",
            Arc::new(StallingConnector),
            transformer(),
            PathLocks::new(),
            Duration::from_millis(20),
        );
        assert!(matches!(
            access.list("/").await,
            Err(RemoteError::Timeout { op: "resume", .. })
        ));
    }
}
