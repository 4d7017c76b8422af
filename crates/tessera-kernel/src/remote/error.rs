//! Remote session errors.

use thiserror::Error;

use crate::vfs::VfsError;

/// Errors reaching or operating on a remote session.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The session could not be resumed.
    #[error("failed to resume session {session}: {message}")]
    Connect { session: String, message: String },

    /// The operation did not finish within the configured timeout.
    #[error("{op} timed out after {secs}s")]
    Timeout { op: &'static str, secs: u64 },

    /// The session's filesystem rejected the operation.
    #[error(transparent)]
    Vfs(#[from] VfsError),
}

impl RemoteError {
    pub fn connect(session: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connect {
            session: session.into(),
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::Vfs(e) if e.is_not_found())
    }
}

/// Remote result type.
pub type RemoteResult<T> = Result<T, RemoteError>;
