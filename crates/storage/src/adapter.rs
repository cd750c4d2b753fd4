//! The storage capability consumed by the reconciler
//!
//! Each operation is atomic on its own. No operation spans another: a crash
//! between `ensure_event` and `ensure_step` leaves an event without steps,
//! which a replay of the same update completes.

use std::sync::Arc;
use stepline_core::{Event, EventKey, LabelWrite, Result, Step, StepKey};

/// Get-or-create and field-patch primitives over events, steps and labels
///
/// # Contract
///
/// - `ensure_*` operations are idempotent and safe when several callers race
///   on the same key: exactly one record is created.
/// - Patch-only operations fail with `NotFound` when their parent is absent.
/// - After [`disconnect`](StorageAdapter::disconnect) every operation fails
///   with `StorageUnavailable`.
pub trait StorageAdapter: Send + Sync {
    /// Short backend name for logs
    fn backend(&self) -> &'static str;

    /// Create the event if absent; no-op if present
    fn ensure_event(&self, key: &EventKey, name: &str) -> Result<()>;

    /// Set the event's creation time
    fn set_event_creation_time(&self, key: &EventKey, timestamp: i64) -> Result<()>;

    /// Set the event's result, replacing any previous one
    fn set_event_result(&self, key: &EventKey, result: &str) -> Result<()>;

    /// Create the step if absent, or upgrade a placeholder timestamp
    ///
    /// A step that already carries a concrete timestamp is left untouched.
    fn ensure_step(&self, step: &StepKey, timestamp: i64) -> Result<()>;

    /// Read a step by `(event, number)`
    fn get_step(&self, step: &StepKey) -> Result<Option<Step>>;

    /// Append the label if absent, overwrite its value if present
    fn upsert_label(&self, step: &StepKey, key: &str, value: &str) -> Result<LabelWrite>;

    /// Read a whole event with its steps and labels
    fn get_event(&self, key: &EventKey) -> Result<Option<Event>>;

    /// Persist buffered state, if the backend buffers any
    fn flush(&self) -> Result<()>;

    /// Release the underlying engine; idempotent
    fn disconnect(&self) -> Result<()>;
}

impl<S: StorageAdapter + ?Sized> StorageAdapter for Arc<S> {
    fn backend(&self) -> &'static str {
        (**self).backend()
    }

    fn ensure_event(&self, key: &EventKey, name: &str) -> Result<()> {
        (**self).ensure_event(key, name)
    }

    fn set_event_creation_time(&self, key: &EventKey, timestamp: i64) -> Result<()> {
        (**self).set_event_creation_time(key, timestamp)
    }

    fn set_event_result(&self, key: &EventKey, result: &str) -> Result<()> {
        (**self).set_event_result(key, result)
    }

    fn ensure_step(&self, step: &StepKey, timestamp: i64) -> Result<()> {
        (**self).ensure_step(step, timestamp)
    }

    fn get_step(&self, step: &StepKey) -> Result<Option<Step>> {
        (**self).get_step(step)
    }

    fn upsert_label(&self, step: &StepKey, key: &str, value: &str) -> Result<LabelWrite> {
        (**self).upsert_label(step, key, value)
    }

    fn get_event(&self, key: &EventKey) -> Result<Option<Event>> {
        (**self).get_event(key)
    }

    fn flush(&self) -> Result<()> {
        (**self).flush()
    }

    fn disconnect(&self) -> Result<()> {
        (**self).disconnect()
    }
}
