//! Document backend
//!
//! One JSON document per event. Steps and labels are embedded arrays, and
//! every adapter operation is a single closure over one document.

mod adapter;
pub mod path;
pub mod snapshot;
mod store;

pub use adapter::DocumentAdapter;
pub use store::DocumentStore;
