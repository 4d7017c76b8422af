//! Routing tool invocations to engines.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{ToolError, ToolResult};
use crate::tools::{ChatMode, ExecutionEngine, ToolContext, ToolDefinition, ToolOutput, engines_for_mode};

/// One model-requested tool call. Arguments are the model's raw JSON text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub call_id: String,
    pub name: String,
    pub arguments: String,
}

impl ToolInvocation {
    pub fn new(
        call_id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    /// Same call, new argument text.
    pub fn with_arguments(&self, arguments: impl Into<String>) -> Self {
        Self {
            call_id: self.call_id.clone(),
            name: self.name.clone(),
            arguments: arguments.into(),
        }
    }
}

/// Immutable name → engine table for one turn.
pub struct ToolDispatcher {
    order: Vec<String>,
    engines: HashMap<String, Arc<dyn ExecutionEngine>>,
}

impl std::fmt::Debug for ToolDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDispatcher")
            .field("tools", &self.order)
            .finish()
    }
}

impl ToolDispatcher {
    /// Build from engines; later duplicates of a name are ignored.
    pub fn new(engines: Vec<Arc<dyn ExecutionEngine>>) -> Self {
        let mut order = Vec::with_capacity(engines.len());
        let mut table = HashMap::with_capacity(engines.len());
        for engine in engines {
            let name = engine.name().to_string();
            if table.contains_key(&name) {
                tracing::warn!(tool = %name, "duplicate tool name ignored");
                continue;
            }
            order.push(name.clone());
            table.insert(name, engine);
        }
        Self {
            order,
            engines: table,
        }
    }

    /// The tool set for `mode`, bound to a turn's context.
    pub fn for_mode(mode: ChatMode, ctx: &Arc<ToolContext>) -> Self {
        Self::new(engines_for_mode(mode, ctx))
    }

    pub fn tool_names(&self) -> &[String] {
        &self.order
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn ExecutionEngine>> {
        self.engines.get(name)
    }

    /// Definitions to offer the model, in order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.engines.get(name))
            .map(|engine| engine.definition())
            .collect()
    }

    /// Engine for `name`, or `NoSuchTool` listing what is available.
    pub fn resolve(&self, name: &str) -> ToolResult<&Arc<dyn ExecutionEngine>> {
        self.get(name).ok_or_else(|| ToolError::NoSuchTool {
            name: name.to_string(),
            available: self.order.clone(),
        })
    }

    /// Run one invocation. No repair.
    pub async fn dispatch(&self, invocation: &ToolInvocation) -> ToolResult<ToolOutput> {
        let engine = self.resolve(&invocation.name)?;
        tracing::debug!(tool = %invocation.name, call_id = %invocation.call_id, "dispatching");
        engine.execute(&invocation.arguments).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::unimplemented_context;

    #[tokio::test]
    async fn test_unknown_tool_lists_available() {
        let dispatcher = ToolDispatcher::for_mode(ChatMode::Ask, &unimplemented_context());
        let err = dispatcher
            .dispatch(&ToolInvocation::new("c1", "create_file", "{}"))
            .await
            .unwrap_err();
        match err {
            ToolError::NoSuchTool { name, available } => {
                assert_eq!(name, "create_file");
                assert_eq!(available, vec!["list_files", "read_files"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_unimplemented_provider_after_validation() {
        let dispatcher = ToolDispatcher::for_mode(ChatMode::Edit, &unimplemented_context());
        assert_eq!(dispatcher.tool_names().len(), 4);

        let err = dispatcher
            .dispatch(&ToolInvocation::new("c1", "edit_file", r#"{"path": "/a"}"#))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::SchemaViolation { .. }));

        let err = dispatcher
            .dispatch(&ToolInvocation::new(
                "c2",
                "edit_file",
                r#"{"path": "/a", "content": "b", "instruction": "c"}"#,
            ))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ToolError::UnimplementedProvider { ref tool, .. } if tool == "edit_file"
        ));
    }

    #[test]
    fn test_definitions_carry_schemas() {
        let dispatcher = ToolDispatcher::for_mode(ChatMode::Create, &unimplemented_context());
        let defs = dispatcher.definitions();
        assert_eq!(defs.len(), 4);
        assert_eq!(defs[2].name, "create_file");
        assert_eq!(defs[2].input_schema["type"], "object");
    }

    #[test]
    fn test_with_arguments_keeps_identity() {
        let call = ToolInvocation::new("c1", "list_files", "{}");
        let fixed = call.with_arguments(r#"{"path": "/"}"#);
        assert_eq!(fixed.call_id, "c1");
        assert_eq!(fixed.name, "list_files");
        assert_eq!(call.arguments, "{}");
    }
}
