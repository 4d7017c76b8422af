//! Diff application service interface.
//!
//! `edit_file` hands the current file, the model's update snippet and an
//! instruction to an external service that merges them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyDiffRequest {
    pub original_code: String,
    pub update_snippet: String,
    pub instruction: String,
}

/// Either merged code or an error message from the service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyDiffResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApplyDiffResponse {
    pub fn ok(result: impl Into<String>) -> Self {
        Self {
            result: Some(result.into()),
            error: None,
        }
    }

    pub fn err(error: impl Into<String>) -> Self {
        Self {
            result: None,
            error: Some(error.into()),
        }
    }
}

/// Merges an update snippet into existing code.
#[async_trait]
pub trait DiffApplier: Send + Sync {
    async fn apply_diff(&self, request: ApplyDiffRequest) -> anyhow::Result<ApplyDiffResponse>;
}
