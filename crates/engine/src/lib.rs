//! Reconciliation engine for Stepline
//!
//! - [`Reconciler`]: the four-kind update protocol, written once against
//!   [`StorageAdapter`](stepline_storage::StorageAdapter)
//! - [`Gateway`]: batch intake with per-update failure isolation
//! - [`IngestConfig`]: user and backend selection, loaded from TOML

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod gateway;
pub mod reconciler;

pub use config::{BackendConfig, ConfigError, IngestConfig};
pub use gateway::{parse_batch, BatchAck, FailedUpdate, Gateway};
pub use reconciler::{Applied, Reconciler};
