//! The reconciliation protocol
//!
//! Maps each [`RawUpdate`] onto a short sequence of idempotent storage
//! operations. Every step is a get-or-create or a field patch, so the
//! protocol tolerates out-of-order and repeated delivery:
//!
//! | Kind | Storage operations |
//! |------|--------------------|
//! | start | ensure_event, ensure_step(ts), set_event_creation_time(ts) if ts is concrete |
//! | step | ensure_event, ensure_step(ts) |
//! | label | ensure_event, ensure_step(placeholder), get_step, upsert_label |
//! | end | ensure_event, ensure_step("end", ts), set_event_result |
//!
//! Timestamps are normalized and range-checked before the first write, so a
//! rejected update leaves no trace on either backend.
//!
//! The operations of one update are not a transaction. If one fails, the
//! ones before it stay applied; replaying the update completes it.

use std::sync::Arc;
use stepline_core::model::normalize_timestamp;
use stepline_core::{
    Error, EventKey, LabelWrite, RawUpdate, Result, StepKey, UpdateKind, END_STEP_NAME,
    PLACEHOLDER_TIMESTAMP,
};
use stepline_storage::StorageAdapter;
use tracing::debug;

/// Outcome of applying one update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    /// Kind of the applied update
    pub kind: UpdateKind,
    /// Event the update landed on
    pub event: EventKey,
    /// Label outcome, for label updates
    pub label: Option<LabelWrite>,
}

/// Applies updates for one user against a shared storage adapter
///
/// Holds no mutable state; clones share the adapter.
pub struct Reconciler<S: StorageAdapter + ?Sized = dyn StorageAdapter> {
    user: String,
    store: Arc<S>,
}

impl<S: StorageAdapter + ?Sized> Reconciler<S> {
    /// Create a reconciler scoping every event key to `user`
    pub fn new(user: impl Into<String>, store: Arc<S>) -> Self {
        Reconciler {
            user: user.into(),
            store,
        }
    }

    /// User that scopes event keys
    pub fn user(&self) -> &str {
        &self.user
    }

    /// The storage adapter
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Key of the event `(event_name, event_id)` for this reconciler's user
    pub fn event_key(&self, event_name: &str, event_id: &str) -> EventKey {
        EventKey::new(&self.user, event_name, event_id)
    }

    /// Apply one update
    ///
    /// # Errors
    ///
    /// - [`Error::UnsupportedUpdateType`] for an unknown `updateType`;
    ///   nothing is written.
    /// - [`Error::InvalidTimestamp`] for a start, step or end timestamp
    ///   past [`stepline_core::MAX_TIMESTAMP`]; nothing is written.
    /// - [`Error::NotFound`] if a label's step vanished between creation and
    ///   lookup, which the adapters never allow in practice.
    /// - Any error of the underlying storage operation.
    pub fn apply(&self, update: &RawUpdate) -> Result<Applied> {
        let kind = update.kind()?;
        let event = self.event_key(&update.event_name, &update.event_id);
        let timestamp = match kind {
            UpdateKind::Label => PLACEHOLDER_TIMESTAMP,
            _ => normalize_timestamp(update.timestamp)?,
        };

        self.store.ensure_event(&event, &update.event_name)?;

        let label = match kind {
            UpdateKind::Start => {
                let step = StepKey::new(&event, &update.step_name, update.step_number);
                self.store.ensure_step(&step, timestamp)?;
                if timestamp != PLACEHOLDER_TIMESTAMP {
                    self.store.set_event_creation_time(&event, timestamp)?;
                }
                None
            }
            UpdateKind::Step => {
                let step = StepKey::new(&event, &update.step_name, update.step_number);
                self.store.ensure_step(&step, timestamp)?;
                None
            }
            UpdateKind::Label => Some(self.apply_label(&event, update)?),
            UpdateKind::End => {
                let step = StepKey::new(&event, END_STEP_NAME, update.step_number);
                self.store.ensure_step(&step, timestamp)?;
                self.store.set_event_result(&event, &update.result)?;
                None
            }
        };

        debug!(
            backend = self.store.backend(),
            kind = %kind,
            event = %event,
            step = update.step_number,
            "Applied update"
        );
        Ok(Applied { kind, event, label })
    }

    fn apply_label(&self, event: &EventKey, update: &RawUpdate) -> Result<LabelWrite> {
        let step = StepKey::new(event, &update.step_name, update.step_number);
        self.store.ensure_step(&step, PLACEHOLDER_TIMESTAMP)?;
        if self.store.get_step(&step)?.is_none() {
            return Err(Error::NotFound(format!(
                "step {} of event {}",
                step.number(),
                event
            )));
        }

        let write = self
            .store
            .upsert_label(&step, &update.label_key, &update.label_val)?;
        if write == LabelWrite::Overwritten {
            debug!(step = %step, key = %update.label_key, "Overwrote label value");
        }
        Ok(write)
    }
}

impl<S: StorageAdapter + ?Sized> Clone for Reconciler<S> {
    fn clone(&self) -> Self {
        Reconciler {
            user: self.user.clone(),
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: StorageAdapter + ?Sized> std::fmt::Debug for Reconciler<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("user", &self.user)
            .field("backend", &self.store.backend())
            .finish()
    }
}
