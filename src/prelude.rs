//! Convenient imports for Stepline.
//!
//! ```ignore
//! use stepline::prelude::*;
//!
//! let db = Stepline::builder().relational().in_memory().open()?;
//! db.apply(&RawUpdate::step("build", "42", 1, "compile", 2000))?;
//! ```

// Main entry point
pub use crate::database::{Stepline, SteplineBuilder};

// Error handling
pub use crate::error::{Error, Result};

// Updates and records
pub use stepline_core::{Event, Label, RawUpdate, Step, UpdateKind};

// Ingestion
pub use stepline_engine::{BackendConfig, BatchAck, IngestConfig};
