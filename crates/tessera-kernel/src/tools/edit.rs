//! EditFileEngine: merge a snippet into an existing file via the diff service.

use std::sync::Arc;

use async_trait::async_trait;

use super::params::{self, EditFileParams};
use super::{EDIT_FILE, ExecutionEngine, ToolContext, ToolOutput};
use crate::diff::ApplyDiffRequest;
use crate::error::{ToolError, ToolResult};
use crate::path;
use crate::remote::SandboxFile;

pub struct EditFileEngine {
    ctx: Arc<ToolContext>,
}

impl EditFileEngine {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }

    async fn merge(&self, target: &str, original: String, p: &EditFileParams) -> ToolResult<String> {
        let request = ApplyDiffRequest {
            original_code: original,
            update_snippet: p.content.clone(),
            instruction: p.instruction.clone(),
        };
        let response = self
            .ctx
            .diff()
            .apply_diff(request)
            .await
            .map_err(|e| ToolError::DiffApplicationFailed(e.to_string()))?;

        if let Some(error) = response.error {
            return Err(ToolError::DiffApplicationFailed(error));
        }
        match response.result {
            Some(merged) if !merged.is_empty() => Ok(merged),
            _ => Err(ToolError::DiffApplicationFailed(format!(
                "no result for {}",
                target
            ))),
        }
    }
}

#[async_trait]
impl ExecutionEngine for EditFileEngine {
    fn name(&self) -> &str {
        EDIT_FILE
    }

    fn description(&self) -> &str {
        "Edit an existing file by describing the change and giving the updated code snippet"
    }

    fn schema(&self) -> serde_json::Value {
        params::schema::<EditFileParams>()
    }

    #[tracing::instrument(skip(self, params), name = "engine.edit_file")]
    async fn execute(&self, params: &str) -> ToolResult<ToolOutput> {
        let p: EditFileParams = params::parse(self.name(), params)?;
        let remote = self.ctx.require_remote(self.name())?;
        let target = path::normalize(&p.path);

        let _guard = remote.lock(&target).await;
        if !remote.exists(&target).await {
            return Err(ToolError::NotFound(target));
        }

        let original = match remote.read(&target).await {
            Some(SandboxFile::Text { content, .. }) => content,
            Some(SandboxFile::Binary { .. }) => {
                return Err(ToolError::UnsupportedBinaryEdit(target));
            }
            None => return Err(ToolError::ReadFailed(target)),
        };

        let merged = self.merge(&target, original, &p).await?;
        if !remote.write(&target, &merged).await {
            return Err(ToolError::WriteFailed(target));
        }

        tracing::info!(path = %target, "file edited");
        Ok(ToolOutput::message("File edited!"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::ApplyDiffResponse;
    use crate::tools::testing::{FakeDiff, context};
    use crate::vfs::{MemoryBackend, VfsOps};
    use std::path::Path;

    const ARGS: &str =
        r#"{"path": "/notes.md", "content": "- b", "instruction": "add item b"}"#;

    async fn seeded() -> Arc<MemoryBackend> {
        let backend = Arc::new(MemoryBackend::new());
        backend.write_all(Path::new("notes.md"), b"- a").await.unwrap();
        backend
    }

    #[tokio::test]
    async fn test_edit_applies_merged_result() {
        let backend = seeded().await;
        let diff = Arc::new(FakeDiff::answering(ApplyDiffResponse::ok("- a\n- b")));
        let engine = EditFileEngine::new(context(backend.clone(), diff.clone()));

        assert_eq!(
            engine.execute(ARGS).await.unwrap(),
            ToolOutput::message("File edited!")
        );
        assert_eq!(
            backend.read_all(Path::new("notes.md")).await.unwrap(),
            b"- a\n- b"
        );

        let calls = diff.calls.lock().unwrap();
        assert_eq!(calls[0].original_code, "- a");
        assert_eq!(calls[0].update_snippet, "- b");
        assert_eq!(calls[0].instruction, "add item b");
    }

    #[tokio::test]
    async fn test_missing_file() {
        let diff = Arc::new(FakeDiff::answering(ApplyDiffResponse::ok("x")));
        let engine = EditFileEngine::new(context(Arc::new(MemoryBackend::new()), diff.clone()));
        assert!(matches!(
            engine.execute(ARGS).await,
            Err(ToolError::NotFound(ref p)) if p == "/notes.md"
        ));
        assert_eq!(diff.call_count(), 0);
    }

    #[tokio::test]
    async fn test_binary_never_reaches_diff_service() {
        let backend = Arc::new(MemoryBackend::new());
        backend.write_all(Path::new("logo.png"), &[0x89, 0x50]).await.unwrap();
        let diff = Arc::new(FakeDiff::answering(ApplyDiffResponse::ok("x")));
        let engine = EditFileEngine::new(context(backend, diff.clone()));

        let err = engine
            .execute(r#"{"path": "/logo.png", "content": "x", "instruction": "y"}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::UnsupportedBinaryEdit(_)));
        assert_eq!(diff.call_count(), 0);
    }

    #[tokio::test]
    async fn test_diff_failures() {
        for diff in [
            FakeDiff::failing("service down"),
            FakeDiff::answering(ApplyDiffResponse::err("conflict")),
            FakeDiff::answering(ApplyDiffResponse::ok("")),
            FakeDiff::answering(ApplyDiffResponse::default()),
        ] {
            let backend = seeded().await;
            let engine = EditFileEngine::new(context(backend.clone(), Arc::new(diff)));
            assert!(matches!(
                engine.execute(ARGS).await,
                Err(ToolError::DiffApplicationFailed(_))
            ));
            assert_eq!(backend.read_all(Path::new("notes.md")).await.unwrap(), b"- a");
        }
    }

    #[tokio::test]
    async fn test_unreadable_file() {
        let backend = Arc::new(MemoryBackend::new());
        backend
            .write_all(Path::new("bad.txt"), &[0xff, 0xfe])
            .await
            .unwrap();
        let engine = EditFileEngine::new(context(
            backend,
            Arc::new(FakeDiff::answering(ApplyDiffResponse::ok("x"))),
        ));
        assert!(matches!(
            engine
                .execute(r#"{"path": "/bad.txt", "content": "x", "instruction": "y"}"#)
                .await,
            Err(ToolError::ReadFailed(_))
        ));
    }
}
