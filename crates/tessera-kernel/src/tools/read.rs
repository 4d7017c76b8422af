//! ReadFilesEngine: read several files in one call.

use std::sync::Arc;

use async_trait::async_trait;

use super::params::{self, ReadFilesParams};
use super::{ExecutionEngine, READ_FILES, ReadFileEntry, ToolContext, ToolOutput};
use crate::error::ToolResult;

pub struct ReadFilesEngine {
    ctx: Arc<ToolContext>,
}

impl ReadFilesEngine {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl ExecutionEngine for ReadFilesEngine {
    fn name(&self) -> &str {
        READ_FILES
    }

    fn description(&self) -> &str {
        "Read the contents of one or more files. Binary files are returned base64-encoded"
    }

    fn schema(&self) -> serde_json::Value {
        params::schema::<ReadFilesParams>()
    }

    /// Paths that cannot be read are left out of the result.
    #[tracing::instrument(skip(self, params), name = "engine.read_files")]
    async fn execute(&self, params: &str) -> ToolResult<ToolOutput> {
        let p: ReadFilesParams = params::parse(self.name(), params)?;
        let remote = self.ctx.require_remote(self.name())?;

        let mut files = Vec::with_capacity(p.paths.len());
        for path in &p.paths {
            match remote.read(path).await {
                Some(file) => files.push(ReadFileEntry::from(file)),
                None => tracing::debug!(path = %path, "skipping unreadable file"),
            }
        }
        Ok(ToolOutput::Files(files))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::ApplyDiffResponse;
    use crate::tools::ContentKind;
    use crate::tools::testing::{FakeDiff, context};
    use crate::vfs::{MemoryBackend, VfsOps};
    use std::path::Path;

    fn engine(backend: Arc<MemoryBackend>) -> ReadFilesEngine {
        ReadFilesEngine::new(context(
            backend,
            Arc::new(FakeDiff::answering(ApplyDiffResponse::default())),
        ))
    }

    #[tokio::test]
    async fn test_missing_paths_skipped() {
        let backend = Arc::new(MemoryBackend::new());
        backend.write_all(Path::new("a.txt"), b"alpha").await.unwrap();

        let out = engine(backend)
            .execute(r#"{"paths": ["/a.txt", "/missing.txt"]}"#)
            .await
            .unwrap();
        assert_eq!(
            out,
            ToolOutput::Files(vec![ReadFileEntry {
                path: "/a.txt".into(),
                content: "alpha".into(),
                kind: ContentKind::Text,
            }])
        );
    }

    #[tokio::test]
    async fn test_mixed_text_and_binary() {
        let backend = Arc::new(MemoryBackend::new());
        backend.write_all(Path::new("img/x.png"), &[1, 2, 3]).await.unwrap();
        backend.write_all(Path::new("x.md"), b"# x").await.unwrap();

        let out = engine(backend)
            .execute(r#"{"paths": ["img/x.png", "x.md"]}"#)
            .await
            .unwrap();
        let ToolOutput::Files(files) = out else {
            panic!("expected files");
        };
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].kind, ContentKind::Binary);
        assert_eq!(files[0].content, "AQID");
        assert_eq!(files[1].kind, ContentKind::Text);
    }
}
