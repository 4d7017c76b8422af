//! ListFilesEngine: immediate children of a directory.

use std::sync::Arc;

use async_trait::async_trait;

use super::params::{self, ListFilesParams};
use super::{ExecutionEngine, LIST_FILES, ListEntry, ToolContext, ToolOutput};
use crate::error::ToolResult;

pub struct ListFilesEngine {
    ctx: Arc<ToolContext>,
}

impl ListFilesEngine {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl ExecutionEngine for ListFilesEngine {
    fn name(&self) -> &str {
        LIST_FILES
    }

    fn description(&self) -> &str {
        "List the files and directories directly inside a directory (not recursive)"
    }

    fn schema(&self) -> serde_json::Value {
        params::schema::<ListFilesParams>()
    }

    #[tracing::instrument(skip(self, params), name = "engine.list_files")]
    async fn execute(&self, params: &str) -> ToolResult<ToolOutput> {
        let p: ListFilesParams = params::parse(self.name(), params)?;
        let remote = self.ctx.require_remote(self.name())?;

        let entries = remote.list(&p.path).await?;
        Ok(ToolOutput::Entries(
            entries.into_iter().map(ListEntry::from).collect(),
        ))
    }
}
