//! # Stepline
//!
//! Telemetry reconciliation for traced executions.
//!
//! Clients describe an execution as a stream of small updates (`start`,
//! `step`, `label`, `end`) that may arrive out of order, more than once and
//! concurrently. Stepline folds them into one [`Event`] holding its
//! [`Step`]s and their [`Label`]s, on either an embedded document store or
//! SQLite, with identical results.
//!
//! ## Quick Start
//!
//! ```ignore
//! use stepline::prelude::*;
//!
//! let db = Stepline::builder().user("morel").open()?;
//!
//! db.submit(&[
//!     RawUpdate::label("build", "42", 1, "compile", "os", "linux"),
//!     RawUpdate::step("build", "42", 1, "compile", 2000),
//!     RawUpdate::start("build", "42", 0, "init", 1000),
//!     RawUpdate::end("build", "42", 2, 3000, "pass"),
//! ]);
//!
//! let event = db.event("build", "42")?.unwrap();
//! assert_eq!(event.step(1).unwrap().timestamp, 2000);
//! db.close()?;
//! ```
//!
//! ## Crates
//!
//! - `stepline-core`: updates, records, keys, errors
//! - `stepline-storage`: the storage adapter trait and both backends
//! - `stepline-engine`: reconciler, gateway, configuration

#![warn(missing_docs)]

mod database;
mod error;

pub mod prelude;

// Re-export main entry points
pub use database::{Stepline, SteplineBuilder};
pub use error::{Error, Result};

// Re-export the layers underneath
pub use stepline_core::{
    ErrorKind, Event, EventKey, Label, LabelKey, LabelWrite, RawUpdate, Step, StepKey, UpdateKind,
    END_STEP_NAME, MAX_TIMESTAMP, PLACEHOLDER_TIMESTAMP,
};
pub use stepline_engine::{
    Applied, BackendConfig, BatchAck, ConfigError, FailedUpdate, Gateway, IngestConfig,
    Reconciler,
};
pub use stepline_storage::{DocumentAdapter, RelationalAdapter, RelationalOptions, StorageAdapter};
