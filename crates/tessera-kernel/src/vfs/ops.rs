//! VFS operations trait.
//!
//! Path-based operations (no inodes, explicit offset/size) so a backend can
//! sit on the far side of a session connection as easily as on local disk.

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

use super::VfsResult;
use super::types::{DirEntry, FileAttr};

/// Bytes requested per `read` call by [`VfsOps::read_all`].
pub const READ_CHUNK: u32 = 64 * 1024;

/// Core VFS operations trait.
///
/// Paths are relative to the backend's root; a leading `/` is ignored.
#[async_trait]
pub trait VfsOps: Send + Sync {
    /// Get file attributes.
    async fn getattr(&self, path: &Path) -> VfsResult<FileAttr>;

    /// Read directory entries, sorted by name.
    async fn readdir(&self, path: &Path) -> VfsResult<Vec<DirEntry>>;

    /// Read up to `size` bytes starting at `offset`.
    async fn read(&self, path: &Path, offset: u64, size: u32) -> VfsResult<Vec<u8>>;

    /// Write `data` at `offset`, returning the number of bytes written.
    async fn write(&self, path: &Path, offset: u64, data: &[u8]) -> VfsResult<u32>;

    /// Create a new empty file. Fails if the path exists.
    async fn create(&self, path: &Path, mode: u32) -> VfsResult<FileAttr>;

    /// Create a directory. Succeeds if it already exists as a directory.
    async fn mkdir(&self, path: &Path, mode: u32) -> VfsResult<FileAttr>;

    /// Truncate a file to the specified size.
    async fn truncate(&self, path: &Path, size: u64) -> VfsResult<()>;

    /// Returns true if this filesystem is read-only.
    fn read_only(&self) -> bool;

    /// Check if a path exists.
    async fn exists(&self, path: &Path) -> bool {
        self.getattr(path).await.is_ok()
    }

    /// Read the whole file, chunk by chunk until a short read.
    ///
    /// `getattr().size` is not trusted here: for a symlink it is the length
    /// of the link, not of what it points at.
    async fn read_all(&self, path: &Path) -> VfsResult<Vec<u8>> {
        let mut data = Vec::new();
        loop {
            let chunk = self.read(path, data.len() as u64, READ_CHUNK).await?;
            let short = chunk.len() < READ_CHUNK as usize;
            data.extend_from_slice(&chunk);
            if short {
                return Ok(data);
            }
        }
    }

    /// Truncate-or-create, then write the whole file.
    async fn write_all(&self, path: &Path, data: &[u8]) -> VfsResult<()> {
        if self.exists(path).await {
            self.truncate(path, 0).await?;
        } else {
            self.create(path, 0o644).await?;
        }
        self.write(path, 0, data).await?;
        Ok(())
    }

    /// Create `path` and every missing ancestor.
    async fn mkdir_all(&self, path: &Path) -> VfsResult<()> {
        let mut current = PathBuf::new();
        for component in path.components() {
            if let Component::Normal(segment) = component {
                current.push(segment);
                self.mkdir(&current, 0o755).await?;
            }
        }
        Ok(())
    }
}
