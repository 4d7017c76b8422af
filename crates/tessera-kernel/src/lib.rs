//! # tessera-kernel
//!
//! Tool execution for agents that edit projects living in remote sandboxes.
//!
//! A turn admits a caller ([`ToolRuntime::begin_turn`]), offers the mode's
//! tools to the model, and runs each requested call through a
//! [`ToolDispatcher`]:
//! - arguments are validated against the tool's schema, with one
//!   model-assisted repair when they don't fit
//! - the turn's provider resolves to a session on the remote filesystem
//! - source files written by the agent get stable per-element ids and,
//!   for the app's root layout, a preload script

pub mod config;
pub mod diff;
pub mod dispatch;
pub mod error;
pub mod gate;
pub mod llm;
pub mod path;
pub mod provider;
pub mod remote;
pub mod repair;
pub mod tools;
pub mod transform;
pub mod turn;
pub mod vfs;

pub use config::{ConfigError, FormatterConfig, RemoteConfig, RepairConfig, TesseraConfig, TransformConfig};
pub use diff::{ApplyDiffRequest, ApplyDiffResponse, DiffApplier};
pub use dispatch::{ToolDispatcher, ToolInvocation};
pub use error::{ToolError, ToolResult};
pub use gate::{Identity, LimitCheck, MemoryQuotaGate, QuotaGate, UsageKind, UsagePeriod, UsageSnapshot, UsageWindow};
pub use llm::{
    CompletionRequest, CompletionResponse, LlmError, LlmProvider, LlmResult, LlmStructuredGenerator,
    Message as LlmMessage, Role as LlmRole, StructuredGenerator, Usage as LlmUsage,
};
pub use path::{FileClass, RouterType};
pub use provider::{ExecutionTarget, ProviderContext};
pub use remote::{
    PathGuard, PathLocks, RemoteError, RemoteFileAccess, RemoteFs, RemoteResult, SandboxFile,
    SessionConnector, SessionRegistry, VfsSession,
};
pub use repair::{RepairState, RepairedCall, ToolCallRepairer};
pub use tools::{
    ChatMode, ExecutionEngine, ListEntry, ReadFileEntry, ToolContext, ToolDefinition, ToolOutput,
};
pub use transform::{
    CommandFormatter, ContentTransformer, FormatError, Formatter, IdentityFormatter, TransformError,
    TransformResult,
};
pub use turn::{ToolRuntime, Turn, TurnRequest};
pub use vfs::{
    DirEntry, FileAttr, FileType, VfsError, VfsOps, VfsResult,
    backends::{LocalBackend, MemoryBackend},
};
