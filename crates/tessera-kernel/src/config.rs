//! Runtime configuration.
//!
//! Loaded from TOML; every field has a default so an empty file (or no file
//! at all) yields a working runtime.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::path::RouterType;

/// Default attribute carrying per-element identifiers.
pub const DEFAULT_ID_ATTRIBUTE: &str = "data-oid";

/// Default preload script URL.
pub const DEFAULT_PRELOAD_SCRIPT_SRC: &str =
    "https://cdn.jsdelivr.net/gh/tessera-dev/preload@main/dist/index.js";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TesseraConfig {
    pub remote: RemoteConfig,
    pub transform: TransformConfig,
    pub repair: RepairConfig,
}

impl TesseraConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Load `path` when given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

/// Remote session settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Upper bound for any single remote operation, including resume.
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

impl RemoteConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Content transformer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    pub id_attribute: String,
    pub router: RouterType,
    pub project_root: String,
    pub preload_script_src: String,
    /// External formatter; identity when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatter: Option<FormatterConfig>,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            id_attribute: DEFAULT_ID_ATTRIBUTE.to_string(),
            router: RouterType::App,
            project_root: "/".to_string(),
            preload_script_src: DEFAULT_PRELOAD_SCRIPT_SRC.to_string(),
            formatter: None,
        }
    }
}

/// External formatter command. `{path}` in `args` is replaced with the file
/// path being formatted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatterConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_formatter_timeout")]
    pub timeout_secs: u64,
}

fn default_formatter_timeout() -> u64 {
    10
}

/// Tool-call repair settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairConfig {
    /// Repairs allowed per invocation before giving up.
    pub max_attempts: u32,
    /// Model name passed to the structured generator.
    pub model: String,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            model: "default".to_string(),
        }
    }
}
