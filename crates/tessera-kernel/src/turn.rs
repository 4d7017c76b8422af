//! Turn orchestration: admission, tool calls, usage accounting.
//!
//! A [`ToolRuntime`] lives for the process. Each user turn goes through
//! [`ToolRuntime::begin_turn`], which checks identity and quota before any
//! tool can run, then binds the turn's provider to a fresh dispatcher.

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::TesseraConfig;
use crate::diff::DiffApplier;
use crate::dispatch::{ToolDispatcher, ToolInvocation};
use crate::error::{ToolError, ToolResult};
use crate::gate::{Identity, LimitCheck, QuotaGate, UsageKind};
use crate::llm::{LlmProvider, LlmStructuredGenerator, StructuredGenerator};
use crate::provider::{ExecutionTarget, ProviderContext};
use crate::remote::{PathLocks, RemoteFileAccess, SessionConnector};
use crate::repair::ToolCallRepairer;
use crate::tools::{ToolContext, ToolDefinition, ToolOutput};
use crate::transform::ContentTransformer;

pub use crate::tools::ChatMode;

/// What a caller asks to start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnRequest {
    pub identity: Option<Identity>,
    pub mode: ChatMode,
    pub provider: ProviderContext,
}

/// Long-lived collaborators shared by every turn.
pub struct ToolRuntime {
    connector: Arc<dyn SessionConnector>,
    transformer: Arc<ContentTransformer>,
    diff: Arc<dyn DiffApplier>,
    generator: Arc<dyn StructuredGenerator>,
    quota: Arc<dyn QuotaGate>,
    locks: PathLocks,
    config: TesseraConfig,
}

impl std::fmt::Debug for ToolRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRuntime")
            .field("config", &self.config)
            .field("locks", &self.locks.len())
            .finish_non_exhaustive()
    }
}

impl ToolRuntime {
    /// Build a runtime. The transformer is derived from `config.transform`.
    pub fn new(
        config: TesseraConfig,
        connector: Arc<dyn SessionConnector>,
        diff: Arc<dyn DiffApplier>,
        generator: Arc<dyn StructuredGenerator>,
        quota: Arc<dyn QuotaGate>,
    ) -> Self {
        let transformer = Arc::new(ContentTransformer::from_config(config.transform.clone()));
        Self {
            connector,
            transformer,
            diff,
            generator,
            quota,
            locks: PathLocks::new(),
            config,
        }
    }

    /// Build a runtime that repairs calls through `provider`, asking the
    /// model named by `config.repair.model`.
    pub fn with_llm(
        config: TesseraConfig,
        connector: Arc<dyn SessionConnector>,
        diff: Arc<dyn DiffApplier>,
        provider: Arc<dyn LlmProvider>,
        quota: Arc<dyn QuotaGate>,
    ) -> Self {
        let generator = Arc::new(LlmStructuredGenerator::from_config(provider, &config.repair));
        Self::new(config, connector, diff, generator, quota)
    }

    /// Replace the transformer, e.g. to plug in a custom formatter.
    pub fn with_transformer(mut self, transformer: Arc<ContentTransformer>) -> Self {
        self.transformer = transformer;
        self
    }

    pub fn config(&self) -> &TesseraConfig {
        &self.config
    }

    pub fn locks(&self) -> &PathLocks {
        &self.locks
    }

    /// Admit a turn. Fails before any tool runs when the caller is
    /// anonymous or over quota.
    #[tracing::instrument(skip(self, request), fields(mode = ?request.mode, provider = request.provider.name()))]
    pub async fn begin_turn(&self, request: TurnRequest) -> ToolResult<Turn> {
        let identity = request.identity.ok_or(ToolError::Unauthorized)?;

        let check = self.quota.check_limit(&identity).await.map_err(|e| {
            tracing::error!(user = %identity.user_id, error = %e, "quota check failed");
            ToolError::internal(e)
        })?;
        if let LimitCheck::Exceeded { period, usage } = check {
            tracing::info!(user = %identity.user_id, %period, "turn rejected: quota exceeded");
            return Err(ToolError::QuotaExceeded { period, usage });
        }

        let target = ExecutionTarget::resolve(&request.provider, |session_id| {
            RemoteFileAccess::new(
                session_id,
                self.connector.clone(),
                self.transformer.clone(),
                self.locks.clone(),
                self.config.remote.timeout(),
            )
        });
        if target.is_none() {
            tracing::debug!(provider = request.provider.name(), "no execution target for turn");
        }

        let ctx = Arc::new(ToolContext::new(request.provider, target, self.diff.clone()));
        let dispatcher = ToolDispatcher::for_mode(request.mode, &ctx);
        let repairer = ToolCallRepairer::new(self.generator.clone(), self.config.repair.max_attempts);

        Ok(Turn {
            identity,
            mode: request.mode,
            dispatcher,
            repairer,
            quota: self.quota.clone(),
        })
    }
}

/// An admitted turn.
pub struct Turn {
    identity: Identity,
    mode: ChatMode,
    dispatcher: ToolDispatcher,
    repairer: ToolCallRepairer,
    quota: Arc<dyn QuotaGate>,
}

impl std::fmt::Debug for Turn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Turn")
            .field("identity", &self.identity)
            .field("mode", &self.mode)
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

impl Turn {
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn mode(&self) -> ChatMode {
        self.mode
    }

    /// Tools to offer the model this turn.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.dispatcher.definitions()
    }

    pub fn tool_names(&self) -> &[String] {
        self.dispatcher.tool_names()
    }

    /// Run one call, repairing malformed arguments.
    #[tracing::instrument(skip(self, invocation), name = "turn.call", fields(tool = %invocation.name, call_id = %invocation.call_id))]
    pub async fn call(&self, invocation: ToolInvocation) -> ToolResult<ToolOutput> {
        let result = self.repairer.run(&self.dispatcher, invocation).await;
        if let Err(e) = &result {
            tracing::warn!(error = %e, status = e.status(), "tool call failed");
        }
        result
    }

    /// Run calls concurrently. Results come back in input order.
    pub async fn call_all(&self, invocations: Vec<ToolInvocation>) -> Vec<ToolResult<ToolOutput>> {
        join_all(invocations.into_iter().map(|call| self.call(call))).await
    }

    /// Close the turn. Edit turns count against the message quota; a failed
    /// increment is logged only.
    pub async fn finish(self) {
        if self.mode != ChatMode::Edit {
            return;
        }
        if let Err(e) = self.quota.increment(&self.identity, UsageKind::Message).await {
            tracing::error!(user = %self.identity.user_id, error = %e, "failed to record usage");
        }
    }
}
