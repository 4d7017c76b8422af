//! Content transformation for JS/TS sources written to a sandbox.
//!
//! Three passes over a source file:
//!
//! 1. **Preload** - root layouts get a `<Script>` for the preload bundle
//!    as the last child of `<body>` (see [`preload`]).
//! 2. **Ids** - every named JSX tag gets a stable identifier attribute
//!    (see [`ids`]).
//! 3. **Format** - the result, changed or not, is run through a
//!    [`Formatter`] and kept only if it still parses.
//!
//! Edits are byte insertions into the original text, so everything the
//! passes don't touch stays exactly as written.

mod error;
mod format;
pub mod ids;
pub mod preload;
mod syntax;

pub use error::{FormatError, TransformError};
pub use format::{CommandFormatter, Formatter, IdentityFormatter};
pub use preload::PRELOAD_SCRIPT_ID;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::TransformConfig;
use crate::path;

/// Text to splice in at a byte offset of the original source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insertion {
    pub at: usize,
    pub text: String,
}

impl Insertion {
    pub fn new(at: usize, text: impl Into<String>) -> Self {
        Self {
            at,
            text: text.into(),
        }
    }
}

/// Apply insertions to `source`. Insertions at the same offset keep their
/// relative order.
pub fn apply_insertions(source: &str, mut insertions: Vec<Insertion>) -> String {
    insertions.sort_by_key(|i| i.at);
    let extra: usize = insertions.iter().map(|i| i.text.len()).sum();
    let mut out = String::with_capacity(source.len() + extra);
    let mut cursor = 0;
    for insertion in insertions {
        out.push_str(&source[cursor..insertion.at]);
        out.push_str(&insertion.text);
        cursor = insertion.at;
    }
    out.push_str(&source[cursor..]);
    out
}

/// Outcome of a transformation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformResult {
    /// Whether an id or the preload script was inserted. Formatting alone
    /// does not count.
    pub modified: bool,
    /// Content to write.
    pub new_content: String,
}

/// Injects identifiers (and the preload script for root layouts) into
/// JS/TS sources.
pub struct ContentTransformer {
    config: TransformConfig,
    formatter: Arc<dyn Formatter>,
}

impl std::fmt::Debug for ContentTransformer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentTransformer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ContentTransformer {
    pub fn new(config: TransformConfig, formatter: Arc<dyn Formatter>) -> Self {
        Self { config, formatter }
    }

    /// Build from config: a [`CommandFormatter`] when one is configured,
    /// [`IdentityFormatter`] otherwise.
    pub fn from_config(config: TransformConfig) -> Self {
        let formatter: Arc<dyn Formatter> = match &config.formatter {
            Some(fc) => Arc::new(CommandFormatter::from_config(fc)),
            None => Arc::new(IdentityFormatter),
        };
        Self::new(config, formatter)
    }

    pub fn config(&self) -> &TransformConfig {
        &self.config
    }

    /// Whether `path` is the project's root layout under the configured router.
    pub fn is_entry_file(&self, file_path: &str) -> bool {
        path::is_root_layout_file(file_path, self.config.router, &self.config.project_root)
    }

    /// Transform content bound for `file_path`, detecting the entry file from
    /// the router convention.
    pub async fn process_for_write(
        &self,
        file_path: &str,
        content: &str,
    ) -> Result<TransformResult, TransformError> {
        let is_entry = self.is_entry_file(file_path);
        self.transform(file_path, content, is_entry).await
    }

    /// Run the preload, id and format passes.
    ///
    /// Content that does not parse is a [`TransformError::Parse`]; callers
    /// write it verbatim.
    #[tracing::instrument(skip(self, content), fields(len = content.len()))]
    pub async fn transform(
        &self,
        file_path: &str,
        content: &str,
        is_entry_file: bool,
    ) -> Result<TransformResult, TransformError> {
        let first_pass = self.first_pass(file_path, content, is_entry_file)?;
        let modified = first_pass != content;

        let new_content = match self.formatter.format(file_path, &first_pass).await {
            Ok(formatted) => match syntax::parse(file_path, &formatted) {
                Ok(_) => formatted,
                Err(e) => {
                    tracing::warn!(path = %file_path, error = %e, "formatted output does not parse; keeping unformatted");
                    first_pass
                }
            },
            Err(e) => {
                let err = TransformError::format(file_path, e);
                tracing::warn!(error = %err, "keeping unformatted output");
                first_pass
            }
        };

        Ok(TransformResult {
            modified,
            new_content,
        })
    }

    /// Parse, inject the preload script when asked, then assign ids.
    fn first_pass(
        &self,
        file_path: &str,
        content: &str,
        is_entry_file: bool,
    ) -> Result<String, TransformError> {
        let tree = syntax::parse(file_path, content)?;

        let (source, tree) = if is_entry_file {
            let insertions = preload::plan(&tree, content, &self.config.preload_script_src);
            if insertions.is_empty() {
                (content.to_string(), tree)
            } else {
                let injected = apply_insertions(content, insertions);
                let reparsed = syntax::parse(file_path, &injected)?;
                (injected, reparsed)
            }
        } else {
            (content.to_string(), tree)
        };

        let insertions = ids::plan(&tree, &source, &self.config.id_attribute);
        if insertions.is_empty() {
            return Ok(source);
        }
        tracing::debug!(path = %file_path, count = insertions.len(), "assigning element ids");
        Ok(apply_insertions(&source, insertions))
    }
}
