//! Transformer error types.

use thiserror::Error;

/// Failure from a [`Formatter`](super::Formatter).
#[derive(Debug, Error)]
pub enum FormatError {
    /// The formatter program could not be started.
    #[error("failed to spawn formatter {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The formatter exited non-zero.
    #[error("formatter exited with {code:?}: {stderr}")]
    Exit { code: Option<i32>, stderr: String },

    /// The formatter ran past its deadline.
    #[error("formatter timed out after {0}s")]
    Timeout(u64),

    /// Formatter output was not UTF-8.
    #[error("formatter produced invalid UTF-8")]
    InvalidOutput,

    #[error("formatter I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the content transformer.
#[derive(Debug, Error)]
pub enum TransformError {
    /// No grammar for this file.
    #[error("unsupported source file: {0}")]
    Unsupported(String),

    /// The grammar could not be loaded into the parser.
    #[error("language error: {0}")]
    Language(String),

    /// Content does not parse cleanly.
    #[error("parse failure in {path}: {message}")]
    Parse { path: String, message: String },

    /// Formatting failed.
    #[error("format failure in {path}: {source}")]
    Format {
        path: String,
        #[source]
        source: FormatError,
    },
}

impl TransformError {
    pub fn parse(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn format(path: impl Into<String>, source: FormatError) -> Self {
        Self::Format {
            path: path.into(),
            source,
        }
    }
}
