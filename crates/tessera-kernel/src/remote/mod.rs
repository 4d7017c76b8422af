//! Remote sandbox sessions.
//!
//! A session is resumed through a [`SessionConnector`] and yields a
//! [`RemoteFs`] handle. [`RemoteFileAccess`] wraps one session for one turn:
//! path normalization, classification, id injection on write, timeouts and
//! per-path locking all happen there.
//!
//! [`SessionRegistry`] is an in-process connector that mounts any
//! [`VfsOps`] backend as a session.

mod access;
mod error;
mod locks;

pub use access::RemoteFileAccess;
pub use error::{RemoteError, RemoteResult};
pub use locks::{PathGuard, PathLocks};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::path;
use crate::vfs::{DirEntry, VfsError, VfsOps};

/// Filesystem operations offered by a resumed session.
#[async_trait]
pub trait RemoteFs: Send + Sync {
    /// Immediate children of a directory.
    async fn readdir(&self, path: &str) -> RemoteResult<Vec<DirEntry>>;

    /// Raw file bytes.
    async fn read_file(&self, path: &str) -> RemoteResult<Vec<u8>>;

    /// File contents as UTF-8.
    async fn read_text_file(&self, path: &str) -> RemoteResult<String>;

    /// Replace (or create) a file with `content`.
    async fn write_text_file(&self, path: &str, content: &str) -> RemoteResult<()>;
}

/// Resumes sandbox sessions by id.
#[async_trait]
pub trait SessionConnector: Send + Sync {
    async fn resume(&self, session_id: &str) -> RemoteResult<Arc<dyn RemoteFs>>;
}

/// A file read from a session. Binary content stays bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SandboxFile {
    Text { path: String, content: String },
    Binary { path: String, content: Vec<u8> },
}

impl SandboxFile {
    pub fn path(&self) -> &str {
        match self {
            SandboxFile::Text { path, .. } | SandboxFile::Binary { path, .. } => path,
        }
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, SandboxFile::Binary { .. })
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            SandboxFile::Text { content, .. } => Some(content),
            SandboxFile::Binary { .. } => None,
        }
    }
}

/// [`RemoteFs`] over any [`VfsOps`] backend.
#[derive(Clone)]
pub struct VfsSession {
    backend: Arc<dyn VfsOps>,
}

impl VfsSession {
    pub fn new(backend: Arc<dyn VfsOps>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl RemoteFs for VfsSession {
    async fn readdir(&self, path: &str) -> RemoteResult<Vec<DirEntry>> {
        Ok(self.backend.readdir(Path::new(path)).await?)
    }

    async fn read_file(&self, path: &str) -> RemoteResult<Vec<u8>> {
        let attr = self.backend.getattr(Path::new(path)).await?;
        if attr.is_dir() {
            return Err(VfsError::is_a_directory(path).into());
        }
        Ok(self.backend.read_all(Path::new(path)).await?)
    }

    async fn read_text_file(&self, path: &str) -> RemoteResult<String> {
        let bytes = self.read_file(path).await?;
        String::from_utf8(bytes).map_err(|_| VfsError::InvalidUtf8(path.to_string()).into())
    }

    async fn write_text_file(&self, path: &str, content: &str) -> RemoteResult<()> {
        let parent = path::dir_name(path);
        if parent != "." && parent != "/" {
            self.backend.mkdir_all(Path::new(&parent)).await?;
        }
        self.backend
            .write_all(Path::new(path), content.as_bytes())
            .await?;
        Ok(())
    }
}

/// In-process [`SessionConnector`]: session ids mapped to mounted backends.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<dyn VfsOps>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount a backend under `session_id`, replacing any previous one.
    pub fn mount(&self, session_id: impl Into<String>, backend: Arc<dyn VfsOps>) {
        let session_id = session_id.into();
        tracing::debug!(session = %session_id, "mounting session");
        self.sessions.insert(session_id, backend);
    }

    pub fn unmount(&self, session_id: &str) -> bool {
        self.sessions.remove(session_id).is_some()
    }

    pub fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl SessionConnector for SessionRegistry {
    async fn resume(&self, session_id: &str) -> RemoteResult<Arc<dyn RemoteFs>> {
        let backend = self
            .sessions
            .get(session_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| RemoteError::connect(session_id, "no such session"))?;
        Ok(Arc::new(VfsSession::new(backend)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::MemoryBackend;

    #[tokio::test]
    async fn test_vfs_session_roundtrip() {
        let session = VfsSession::new(Arc::new(MemoryBackend::new()));
        session.write_text_file("/a/b/c.txt", "hello").await.unwrap();

        assert_eq!(session.read_text_file("/a/b/c.txt").await.unwrap(), "hello");
        assert_eq!(
            session.readdir("/a").await.unwrap(),
            vec![DirEntry::directory("b")]
        );
        assert!(session.read_file("/missing").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_read_text_rejects_invalid_utf8() {
        let backend = Arc::new(MemoryBackend::new());
        backend
            .write_all(Path::new("blob.txt"), &[0xff, 0xfe, 0x00])
            .await
            .unwrap();
        let session = VfsSession::new(backend);
        assert!(matches!(
            session.read_text_file("blob.txt").await,
            Err(RemoteError::Vfs(VfsError::InvalidUtf8(_)))
        ));
        assert_eq!(session.read_file("blob.txt").await.unwrap(), vec![0xff, 0xfe, 0x00]);
    }

    #[tokio::test]
    async fn test_registry_resume() {
        let registry = SessionRegistry::new();
        registry.mount("s1", Arc::new(MemoryBackend::new()));
        assert_eq!(registry.session_ids(), vec!["s1"]);

        assert!(registry.resume("s1").await.is_ok());
        assert!(matches!(
            registry.resume("nope").await,
            Err(RemoteError::Connect { .. })
        ));

        assert!(registry.unmount("s1"));
        assert!(registry.resume("s1").await.is_err());
    }

    #[test]
    fn test_sandbox_file_accessors() {
        let text = SandboxFile::Text {
            path: "/a.txt".into(),
            content: "hi".into(),
        };
        assert_eq!(text.path(), "/a.txt");
        assert_eq!(text.as_text(), Some("hi"));
        assert!(!text.is_binary());

        let bin = SandboxFile::Binary {
            path: "/a.png".into(),
            content: vec![1, 2],
        };
        assert!(bin.is_binary());
        assert_eq!(bin.as_text(), None);
    }
}
