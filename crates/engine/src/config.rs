//! Ingestion configuration
//!
//! ```toml
//! user = "morel"
//!
//! [backend]
//! kind = "relational"
//! path = "events.sqlite"
//! busy_timeout_ms = 2000
//! ```
//!
//! Every field is optional. The default is user `"default"` on a
//! memory-only document backend. Relative paths in a file are resolved
//! against the file's directory.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use stepline_storage::{DocumentAdapter, RelationalAdapter, RelationalOptions, StorageAdapter};
use thiserror::Error;
use tracing::info;

/// Default user scoping event keys
pub const DEFAULT_USER: &str = "default";

/// Default SQLite busy timeout
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("cannot read config {path}: {source}")]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Config text is not valid TOML for [`IngestConfig`]
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of its allowed range
    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Storage backend selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendConfig {
    /// Embedded document store
    Document {
        /// Snapshot file; memory-only when absent
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<PathBuf>,
    },
    /// SQLite database
    Relational {
        /// Database file; in-memory when absent
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<PathBuf>,
        /// Busy timeout in milliseconds
        #[serde(default = "default_busy_timeout_ms")]
        busy_timeout_ms: u64,
    },
}

fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Document { path: None }
    }
}

impl BackendConfig {
    /// Short backend name
    pub fn name(&self) -> &'static str {
        match self {
            BackendConfig::Document { .. } => "document",
            BackendConfig::Relational { .. } => "relational",
        }
    }

    /// Storage path, if any
    pub fn path(&self) -> Option<&Path> {
        match self {
            BackendConfig::Document { path } | BackendConfig::Relational { path, .. } => {
                path.as_deref()
            }
        }
    }

    /// Replace the storage path
    pub fn set_path(&mut self, new_path: Option<PathBuf>) {
        match self {
            BackendConfig::Document { path } | BackendConfig::Relational { path, .. } => {
                *path = new_path;
            }
        }
    }

    /// Open the configured adapter
    pub fn connect(&self) -> stepline_core::Result<Arc<dyn StorageAdapter>> {
        let adapter: Arc<dyn StorageAdapter> = match self {
            BackendConfig::Document { path: Some(path) } => Arc::new(DocumentAdapter::open(path)?),
            BackendConfig::Document { path: None } => Arc::new(DocumentAdapter::in_memory()),
            BackendConfig::Relational {
                path: Some(path),
                busy_timeout_ms,
            } => Arc::new(RelationalAdapter::open(
                path,
                RelationalOptions {
                    busy_timeout: Duration::from_millis(*busy_timeout_ms),
                },
            )?),
            BackendConfig::Relational { path: None, .. } => {
                Arc::new(RelationalAdapter::in_memory()?)
            }
        };
        info!(backend = self.name(), path = ?self.path(), "Storage connected");
        Ok(adapter)
    }

    fn rebase(&mut self, base: &Path) {
        let rebased = match self.path() {
            Some(path) if path.is_relative() => base.join(path),
            _ => return,
        };
        self.set_path(Some(rebased));
    }
}

/// Top-level ingestion configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IngestConfig {
    /// User that scopes every event key
    #[serde(default = "default_user")]
    pub user: String,
    /// Storage backend
    #[serde(default)]
    pub backend: BackendConfig,
}

fn default_user() -> String {
    DEFAULT_USER.to_string()
}

impl Default for IngestConfig {
    fn default() -> Self {
        IngestConfig {
            user: default_user(),
            backend: BackendConfig::default(),
        }
    }
}

impl IngestConfig {
    /// Parse and validate TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: IngestConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load, validate and rebase the config file at `path`
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&text)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        config.backend.rebase(base);
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.user.trim().is_empty() {
            return Err(ConfigError::Invalid("user must not be empty".into()));
        }
        Ok(())
    }
}
