//! Agent file tools.
//!
//! Four engines (`list_files`, `read_files`, `create_file`, `edit_file`)
//! share one [`ToolContext`] per turn: the provider the turn was started
//! with, the backend it resolved to, and the diff service.
//!
//! Every engine decodes its arguments before touching the provider, so a
//! malformed call is a [`ToolError::SchemaViolation`] whatever the backend.

mod create;
mod edit;
mod list;
pub mod params;
mod read;

pub use create::CreateFileEngine;
pub use edit::EditFileEngine;
pub use list::ListFilesEngine;
pub use read::ReadFilesEngine;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::diff::DiffApplier;
use crate::error::{ToolError, ToolResult};
use crate::provider::{ExecutionTarget, ProviderContext};
use crate::remote::{RemoteFileAccess, SandboxFile};
use crate::vfs::{DirEntry, FileType};

pub const LIST_FILES: &str = "list_files";
pub const READ_FILES: &str = "read_files";
pub const CREATE_FILE: &str = "create_file";
pub const EDIT_FILE: &str = "edit_file";

/// Kind of chat turn; decides which tools are offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatMode {
    Create,
    Ask,
    Edit,
}

impl ChatMode {
    /// Tool names offered in this mode. `Ask` is read-only.
    pub fn tool_names(self) -> &'static [&'static str] {
        match self {
            ChatMode::Ask => &[LIST_FILES, READ_FILES],
            ChatMode::Create | ChatMode::Edit => &[LIST_FILES, READ_FILES, CREATE_FILE, EDIT_FILE],
        }
    }
}

/// One entry of a `list_files` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

impl From<DirEntry> for ListEntry {
    fn from(entry: DirEntry) -> Self {
        let kind = match entry.kind {
            FileType::Directory => EntryKind::Directory,
            FileType::File | FileType::Symlink => EntryKind::File,
        };
        Self {
            path: entry.name,
            kind,
        }
    }
}

/// One entry of a `read_files` result. Binary content is base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadFileEntry {
    pub path: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: ContentKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Text,
    Binary,
}

impl From<SandboxFile> for ReadFileEntry {
    fn from(file: SandboxFile) -> Self {
        match file {
            SandboxFile::Text { path, content } => Self {
                path,
                content,
                kind: ContentKind::Text,
            },
            SandboxFile::Binary { path, content } => Self {
                path,
                content: BASE64.encode(content),
                kind: ContentKind::Binary,
            },
        }
    }
}

/// What a tool hands back to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolOutput {
    Entries(Vec<ListEntry>),
    Files(Vec<ReadFileEntry>),
    Message(String),
}

impl ToolOutput {
    pub fn message(text: impl Into<String>) -> Self {
        Self::Message(text.into())
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Name, description and argument schema, as offered to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// A tool the model can call.
#[async_trait]
pub trait ExecutionEngine: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema for the arguments.
    fn schema(&self) -> serde_json::Value;

    /// Run with raw JSON argument text.
    async fn execute(&self, params: &str) -> ToolResult<ToolOutput>;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.schema(),
        }
    }
}

/// Per-turn state shared by the engines.
pub struct ToolContext {
    provider: ProviderContext,
    target: Option<ExecutionTarget>,
    diff: Arc<dyn DiffApplier>,
}

impl std::fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolContext")
            .field("provider", &self.provider)
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

impl ToolContext {
    pub fn new(
        provider: ProviderContext,
        target: Option<ExecutionTarget>,
        diff: Arc<dyn DiffApplier>,
    ) -> Self {
        Self {
            provider,
            target,
            diff,
        }
    }

    pub fn provider(&self) -> &ProviderContext {
        &self.provider
    }

    /// The turn's session, or `UnimplementedProvider` naming `tool`.
    pub fn require_remote(&self, tool: &str) -> ToolResult<&RemoteFileAccess> {
        self.target
            .as_ref()
            .map(ExecutionTarget::remote_files)
            .ok_or_else(|| ToolError::unimplemented_provider(self.provider.name(), tool))
    }

    pub fn diff(&self) -> &Arc<dyn DiffApplier> {
        &self.diff
    }
}

/// Engines for `mode`, in offer order.
pub fn engines_for_mode(mode: ChatMode, ctx: &Arc<ToolContext>) -> Vec<Arc<dyn ExecutionEngine>> {
    mode.tool_names()
        .iter()
        .filter_map(|name| engine(name, ctx))
        .collect()
}

fn engine(name: &str, ctx: &Arc<ToolContext>) -> Option<Arc<dyn ExecutionEngine>> {
    let engine: Arc<dyn ExecutionEngine> = match name {
        LIST_FILES => Arc::new(ListFilesEngine::new(ctx.clone())),
        READ_FILES => Arc::new(ReadFilesEngine::new(ctx.clone())),
        CREATE_FILE => Arc::new(CreateFileEngine::new(ctx.clone())),
        EDIT_FILE => Arc::new(EditFileEngine::new(ctx.clone())),
        _ => return None,
    };
    Some(engine)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_tool_sets() {
        assert_eq!(ChatMode::Ask.tool_names(), &[LIST_FILES, READ_FILES]);
        assert_eq!(ChatMode::Edit.tool_names().len(), 4);
        assert_eq!(ChatMode::Create.tool_names(), ChatMode::Edit.tool_names());
    }

    #[test]
    fn test_list_entry_shape() {
        let entry = ListEntry::from(DirEntry::new("link", FileType::Symlink));
        assert_eq!(
            serde_json::to_string(&entry).unwrap(),
            r#"{"path":"link","type":"file"}"#
        );
    }

    #[test]
    fn test_binary_entries_are_base64() {
        let entry = ReadFileEntry::from(SandboxFile::Binary {
            path: "/a.png".into(),
            content: vec![0x89, 0x50, 0x4e, 0x47],
        });
        assert_eq!(entry.content, "iVBORw==");
        assert_eq!(entry.kind, ContentKind::Binary);
    }

    #[test]
    fn test_output_untagged() {
        assert_eq!(
            ToolOutput::message("File created").to_json(),
            serde_json::json!("File created")
        );
        let files = ToolOutput::Files(vec![ReadFileEntry {
            path: "/a.txt".into(),
            content: "hi".into(),
            kind: ContentKind::Text,
        }]);
        assert_eq!(
            files.to_json(),
            serde_json::json!([{"path": "/a.txt", "content": "hi", "type": "text"}])
        );
    }

    #[test]
    fn test_unimplemented_provider() {
        let ctx = testing::unimplemented_context();
        let err = ctx.require_remote(LIST_FILES).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unimplemented provider unimplemented for tool list_files"
        );
        assert_eq!(engines_for_mode(ChatMode::Ask, &ctx).len(), 2);
    }
}
