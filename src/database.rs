//! Main entry point for Stepline.
//!
//! This module provides the `Stepline` struct, which owns one storage
//! adapter and the gateway that reconciles update batches into it.

use crate::error::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use stepline_core::{Event, RawUpdate};
use stepline_engine::{Applied, BackendConfig, BatchAck, Gateway, IngestConfig};
use stepline_storage::StorageAdapter;
use tracing::info;

/// A connected Stepline instance.
///
/// Create one with [`Stepline::open`] or [`Stepline::builder`]. Dropping it
/// releases the backend; [`close`](Stepline::close) does the same and
/// reports failures.
///
/// # Example
///
/// ```ignore
/// use stepline::prelude::*;
///
/// let db = Stepline::builder().user("morel").relational().in_memory().open()?;
/// let ack = db.submit(&[
///     RawUpdate::start("build", "42", 0, "init", 1000),
///     RawUpdate::end("build", "42", 1, 2000, "pass"),
/// ]);
/// assert!(ack.is_complete());
///
/// let event = db.event("build", "42")?.unwrap();
/// assert_eq!(event.result.as_deref(), Some("pass"));
/// db.close()?;
/// ```
pub struct Stepline {
    gateway: Gateway,
    config: IngestConfig,
}

impl Stepline {
    /// Connect the backend described by `config`.
    pub fn open(config: IngestConfig) -> Result<Self> {
        config.validate()?;
        let store = config.backend.connect()?;
        info!(user = %config.user, backend = store.backend(), "Opened Stepline");
        Ok(Stepline {
            gateway: Gateway::new(config.user.clone(), store),
            config,
        })
    }

    /// Load a TOML config file and connect its backend.
    pub fn open_config_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::open(IngestConfig::from_file(path)?)
    }

    /// Create a builder.
    ///
    /// Defaults to user `"default"` on a memory-only document backend.
    pub fn builder() -> SteplineBuilder {
        SteplineBuilder::new()
    }

    /// Apply a batch of updates in order.
    ///
    /// Failed updates are reported in the acknowledgement and do not stop
    /// the batch.
    pub fn submit(&self, batch: &[RawUpdate]) -> BatchAck {
        self.gateway.submit(batch)
    }

    /// Parse a JSON batch (array or single object) and apply it.
    pub fn submit_json(&self, text: &str) -> Result<BatchAck> {
        Ok(self.gateway.submit_json(text)?)
    }

    /// Apply a single update.
    pub fn apply(&self, update: &RawUpdate) -> Result<Applied> {
        Ok(self.gateway.reconciler().apply(update)?)
    }

    /// Read the reconciled event `(event_name, event_id)` for this user.
    pub fn event(&self, event_name: &str, event_id: &str) -> Result<Option<Event>> {
        let key = self.gateway.reconciler().event_key(event_name, event_id);
        Ok(self.store().get_event(&key)?)
    }

    /// Persist buffered state.
    pub fn flush(&self) -> Result<()> {
        Ok(self.store().flush()?)
    }

    /// Release the backend.
    ///
    /// Further operations fail with a retryable storage-unavailable error.
    /// Closing twice is a no-op.
    pub fn close(&self) -> Result<()> {
        self.store().disconnect()?;
        info!(backend = self.backend(), "Closed Stepline");
        Ok(())
    }

    /// User that scopes event keys.
    pub fn user(&self) -> &str {
        &self.config.user
    }

    /// Backend name.
    pub fn backend(&self) -> &'static str {
        self.store().backend()
    }

    /// The configuration this instance was opened with.
    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// The shared storage adapter.
    pub fn store(&self) -> &Arc<dyn StorageAdapter> {
        self.gateway.reconciler().store()
    }
}

impl std::fmt::Debug for Stepline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stepline")
            .field("user", &self.config.user)
            .field("backend", &self.config.backend)
            .finish()
    }
}

/// Builder for a [`Stepline`] instance.
///
/// # Example
///
/// ```ignore
/// // Persistent document store
/// let db = Stepline::builder()
///     .user("morel")
///     .document()
///     .path("./events.snap")
///     .open()?;
///
/// // Throwaway SQLite database for tests
/// let db = Stepline::builder().relational().in_memory().open()?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct SteplineBuilder {
    config: IngestConfig,
}

impl SteplineBuilder {
    /// Create a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration.
    pub fn from_config(config: IngestConfig) -> Self {
        SteplineBuilder { config }
    }

    /// Set the user that scopes event keys.
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.config.user = user.into();
        self
    }

    /// Use the embedded document store, keeping any configured path.
    pub fn document(mut self) -> Self {
        let path = self.current_path();
        self.config.backend = BackendConfig::Document { path };
        self
    }

    /// Use SQLite, keeping any configured path.
    pub fn relational(mut self) -> Self {
        let path = self.current_path();
        let busy_timeout_ms = match self.config.backend {
            BackendConfig::Relational {
                busy_timeout_ms, ..
            } => busy_timeout_ms,
            BackendConfig::Document { .. } => stepline_engine::config::DEFAULT_BUSY_TIMEOUT_MS,
        };
        self.config.backend = BackendConfig::Relational {
            path,
            busy_timeout_ms,
        };
        self
    }

    /// Persist to `path` (snapshot file or SQLite database).
    pub fn path(mut self, path: impl AsRef<Path>) -> Self {
        self.config
            .backend
            .set_path(Some(path.as_ref().to_path_buf()));
        self
    }

    /// Keep everything in memory.
    pub fn in_memory(mut self) -> Self {
        self.config.backend.set_path(None);
        self
    }

    /// SQLite busy timeout; switches to the relational backend.
    pub fn busy_timeout_ms(self, millis: u64) -> Self {
        let mut builder = self.relational();
        if let BackendConfig::Relational {
            busy_timeout_ms, ..
        } = &mut builder.config.backend
        {
            *busy_timeout_ms = millis;
        }
        builder
    }

    /// The configuration built so far.
    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Connect.
    pub fn open(self) -> Result<Stepline> {
        Stepline::open(self.config)
    }

    fn current_path(&self) -> Option<PathBuf> {
        self.config.backend.path().map(Path::to_path_buf)
    }
}
