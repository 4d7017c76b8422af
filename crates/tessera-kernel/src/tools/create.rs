//! CreateFileEngine: write a new file, refusing to overwrite.

use std::sync::Arc;

use async_trait::async_trait;

use super::params::{self, CreateFileParams};
use super::{CREATE_FILE, ExecutionEngine, ToolContext, ToolOutput};
use crate::error::{ToolError, ToolResult};
use crate::path;

pub struct CreateFileEngine {
    ctx: Arc<ToolContext>,
}

impl CreateFileEngine {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl ExecutionEngine for CreateFileEngine {
    fn name(&self) -> &str {
        CREATE_FILE
    }

    fn description(&self) -> &str {
        "Create a new file with the given content. Fails if the file already exists"
    }

    fn schema(&self) -> serde_json::Value {
        params::schema::<CreateFileParams>()
    }

    #[tracing::instrument(skip(self, params), name = "engine.create_file")]
    async fn execute(&self, params: &str) -> ToolResult<ToolOutput> {
        let p: CreateFileParams = params::parse(self.name(), params)?;
        let remote = self.ctx.require_remote(self.name())?;
        let target = path::normalize(&p.path);

        let _guard = remote.lock(&target).await;
        if remote.exists(&target).await {
            return Err(ToolError::AlreadyExists(target));
        }
        if !remote.write(&target, &p.content).await {
            return Err(ToolError::WriteFailed(target));
        }

        tracing::info!(path = %target, "file created");
        Ok(ToolOutput::message("File created"))
    }
}
