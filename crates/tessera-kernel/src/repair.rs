//! Recovery from tool calls whose arguments don't match the tool's schema.
//!
//! ```text
//! Dispatched ──fail──▶ Failed ──NoSuchTool──▶ Aborted
//!     ▲                  │
//!     │            SchemaViolation
//!     │                  ▼
//!     └──── Repaired ◀── Repairing
//! ```
//!
//! An unknown tool name is never repaired. A schema violation triggers one
//! constrained-generation request per attempt, up to `max_attempts`; any
//! other failure is returned as is.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::dispatch::{ToolDispatcher, ToolInvocation};
use crate::error::{ToolError, ToolResult};
use crate::llm::StructuredGenerator;
use crate::tools::{ExecutionEngine, ToolOutput};

/// Why a dispatch failed, as far as repair is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NoSuchTool,
    SchemaViolation,
    Other,
}

impl FailureKind {
    pub fn of(error: &ToolError) -> Self {
        match error {
            ToolError::NoSuchTool { .. } => FailureKind::NoSuchTool,
            ToolError::SchemaViolation { .. } => FailureKind::SchemaViolation,
            _ => FailureKind::Other,
        }
    }
}

/// Where an invocation is in the repair cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum RepairState {
    Dispatched,
    Failed(FailureKind),
    Aborted,
    Repairing,
    Repaired,
}

/// Replacement arguments for a failed invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairedCall {
    pub original: ToolInvocation,
    pub corrected_arguments: String,
}

impl RepairedCall {
    /// The invocation to dispatch next.
    pub fn invocation(&self) -> ToolInvocation {
        self.original.with_arguments(self.corrected_arguments.clone())
    }
}

/// Prompt asking for corrected arguments.
pub fn repair_prompt(invocation: &ToolInvocation, schema: &serde_json::Value) -> String {
    format!(
        "The model tried to call the tool \"{}\" with the following arguments:\n{}\n\
         The tool accepts the following schema:\n{}\n\
         Please fix the arguments.",
        invocation.name, invocation.arguments, schema
    )
}

/// Dispatches with schema repair.
pub struct ToolCallRepairer {
    generator: Arc<dyn StructuredGenerator>,
    max_attempts: u32,
}

impl std::fmt::Debug for ToolCallRepairer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolCallRepairer")
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

impl ToolCallRepairer {
    pub fn new(generator: Arc<dyn StructuredGenerator>, max_attempts: u32) -> Self {
        Self {
            generator,
            max_attempts,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Ask the generator for arguments matching `engine`'s schema.
    pub async fn repair(
        &self,
        invocation: &ToolInvocation,
        engine: &dyn ExecutionEngine,
    ) -> ToolResult<RepairedCall> {
        let schema = engine.schema();
        let prompt = repair_prompt(invocation, &schema);

        let value = self
            .generator
            .generate_structured(&schema, &prompt)
            .await
            .map_err(|e| ToolError::RepairFailed {
                tool: invocation.name.clone(),
                message: e.to_string(),
            })?;

        if !value.is_object() {
            return Err(ToolError::RepairFailed {
                tool: invocation.name.clone(),
                message: format!("expected a JSON object, got {}", value),
            });
        }

        Ok(RepairedCall {
            original: invocation.clone(),
            corrected_arguments: value.to_string(),
        })
    }

    /// Dispatch `invocation`, repairing schema violations.
    #[tracing::instrument(skip_all, fields(tool = %invocation.name, call_id = %invocation.call_id))]
    pub async fn run(
        &self,
        dispatcher: &ToolDispatcher,
        invocation: ToolInvocation,
    ) -> ToolResult<ToolOutput> {
        let mut current = invocation;
        let mut attempts = 0u32;

        loop {
            tracing::debug!(state = ?RepairState::Dispatched, attempt = attempts);
            let err = match dispatcher.dispatch(&current).await {
                Ok(output) => return Ok(output),
                Err(err) => err,
            };

            let kind = FailureKind::of(&err);
            tracing::debug!(state = ?RepairState::Failed(kind), error = %err);

            match kind {
                FailureKind::NoSuchTool => {
                    tracing::warn!(state = ?RepairState::Aborted, error = %err, "not repairing unknown tool");
                    return Err(err);
                }
                FailureKind::Other => return Err(err),
                FailureKind::SchemaViolation if self.max_attempts == 0 => return Err(err),
                FailureKind::SchemaViolation if attempts >= self.max_attempts => {
                    return Err(ToolError::RepairExhausted {
                        tool: current.name,
                        attempts,
                        last_error: err.to_string(),
                    });
                }
                FailureKind::SchemaViolation => {}
            }

            attempts += 1;
            tracing::info!(state = ?RepairState::Repairing, attempt = attempts, error = %err);

            let engine = dispatcher.resolve(&current.name)?;
            let repaired = self.repair(&current, engine.as_ref()).await?;
            tracing::debug!(state = ?RepairState::Repaired, arguments = %repaired.corrected_arguments);

            current = repaired.invocation();
        }
    }
}
