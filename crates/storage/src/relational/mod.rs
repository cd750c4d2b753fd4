//! Relational backend
//!
//! `events`, `steps` and `labels` tables in SQLite, related by foreign key.

mod adapter;
pub mod schema;
pub mod time;

pub use adapter::{RelationalAdapter, RelationalOptions};
