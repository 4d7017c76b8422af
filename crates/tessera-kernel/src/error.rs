//! Turn-level error type.
//!
//! Everything a tool call or turn admission can fail with. [`ToolError::status`]
//! maps each variant onto an HTTP-style class so callers can tell "fix your
//! request" from "try again later".

use thiserror::Error;

use crate::gate::{UsagePeriod, UsageSnapshot};
use crate::remote::RemoteError;

#[derive(Debug, Error)]
pub enum ToolError {
    /// No authenticated caller.
    #[error("Unauthorized")]
    Unauthorized,

    /// Message quota exhausted for a window.
    #[error("Message limit exceeded ({period})")]
    QuotaExceeded {
        period: UsagePeriod,
        usage: UsageSnapshot,
    },

    /// The turn's provider has no execution backend.
    #[error("Unimplemented provider {provider} for tool {tool}")]
    UnimplementedProvider { provider: String, tool: String },

    #[error("File already exists: {0}")]
    AlreadyExists(String),

    #[error("File does not exist: {0}")]
    NotFound(String),

    #[error("Error reading file: {0}")]
    ReadFailed(String),

    #[error("Binary files are not supported for editing: {0}")]
    UnsupportedBinaryEdit(String),

    /// The diff service errored or returned nothing.
    #[error("Error applying code change: {0}")]
    DiffApplicationFailed(String),

    #[error("Error writing file: {0}")]
    WriteFailed(String),

    #[error(transparent)]
    Transport(#[from] RemoteError),

    #[error("Tool {name} not found. Available tools: {}", .available.join(", "))]
    NoSuchTool { name: String, available: Vec<String> },

    /// Arguments do not match the tool's schema.
    #[error("Invalid arguments for tool {tool}: {message}")]
    SchemaViolation { tool: String, message: String },

    #[error("Arguments for tool {tool} still invalid after {attempts} repair attempt(s): {last_error}")]
    RepairExhausted {
        tool: String,
        attempts: u32,
        last_error: String,
    },

    /// The structured generator could not produce replacement arguments.
    #[error("Failed to repair arguments for tool {tool}: {message}")]
    RepairFailed { tool: String, message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ToolError {
    pub fn schema_violation(tool: impl Into<String>, message: impl ToString) -> Self {
        Self::SchemaViolation {
            tool: tool.into(),
            message: message.to_string(),
        }
    }

    pub fn unimplemented_provider(provider: impl Into<String>, tool: impl Into<String>) -> Self {
        Self::UnimplementedProvider {
            provider: provider.into(),
            tool: tool.into(),
        }
    }

    pub fn internal(message: impl ToString) -> Self {
        Self::Internal(message.to_string())
    }

    /// HTTP-style status class.
    pub fn status(&self) -> u16 {
        match self {
            ToolError::Unauthorized => 401,
            ToolError::QuotaExceeded { .. } => 402,
            ToolError::NotFound(_) | ToolError::NoSuchTool { .. } => 404,
            ToolError::AlreadyExists(_) => 409,
            ToolError::UnsupportedBinaryEdit(_) => 415,
            ToolError::SchemaViolation { .. } | ToolError::RepairExhausted { .. } => 422,
            ToolError::UnimplementedProvider { .. } => 501,
            ToolError::ReadFailed(_)
            | ToolError::DiffApplicationFailed(_)
            | ToolError::WriteFailed(_)
            | ToolError::RepairFailed { .. } => 502,
            ToolError::Transport(RemoteError::Timeout { .. }) => 504,
            ToolError::Transport(_) => 503,
            ToolError::Internal(_) => 500,
        }
    }

    /// Whether the same request may succeed later.
    pub fn is_retryable(&self) -> bool {
        let status = self.status();
        status >= 500 && status != 501
    }

    /// Whether the caller must change the request.
    pub fn is_request_error(&self) -> bool {
        (400..500).contains(&self.status())
    }
}

/// Tool result type.
pub type ToolResult<T> = Result<T, ToolError>;
