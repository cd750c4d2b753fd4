//! Storage layer for Stepline
//!
//! This crate implements the [`StorageAdapter`] capability over two
//! structurally different engines:
//! - [`DocumentAdapter`]: one JSON document per event, steps and labels
//!   embedded as arrays, patched atomically per document
//! - [`RelationalAdapter`]: `events`, `steps` and `labels` tables in SQLite,
//!   written with conflict-tolerant inserts
//!
//! Both adapters read back into the same [`stepline_core::Event`] values,
//! so the reconciler above them cannot tell them apart.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapter;
pub mod document;
pub mod relational;

pub use adapter::StorageAdapter;
pub use document::{DocumentAdapter, DocumentStore};
pub use relational::{RelationalAdapter, RelationalOptions};
