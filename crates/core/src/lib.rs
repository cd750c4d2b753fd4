//! Core types for Stepline
//!
//! This crate defines the vocabulary shared by the storage adapters, the
//! reconciler and the facade:
//! - [`RawUpdate`] / [`UpdateKind`]: what arrives from clients
//! - [`Event`], [`Step`], [`Label`]: the reconciled record
//! - [`EventKey`], [`StepKey`], [`LabelKey`]: composite identifiers
//! - [`Error`] / [`ErrorKind`]: the failure taxonomy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod keys;
pub mod model;
pub mod update;

pub use error::{Error, ErrorKind, Result};
pub use keys::{EventKey, LabelKey, StepKey};
pub use model::{Event, Label, LabelWrite, Step, MAX_TIMESTAMP, PLACEHOLDER_TIMESTAMP};
pub use update::{RawUpdate, UpdateKind, END_STEP_NAME};
