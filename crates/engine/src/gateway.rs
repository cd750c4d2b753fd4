//! Batch ingestion
//!
//! The gateway accepts a batch of raw updates and applies them one by one,
//! in order. A failing update is logged and recorded in the acknowledgement;
//! it never stops the rest of the batch.

use crate::reconciler::Reconciler;
use serde::Serialize;
use std::sync::Arc;
use stepline_core::{Error, ErrorKind, RawUpdate, Result};
use stepline_storage::StorageAdapter;
use tracing::{info, warn};

/// Per-batch acknowledgement
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchAck {
    /// Number of updates in the batch
    pub received: usize,
    /// Number of updates applied without error
    pub applied: usize,
    /// Updates that failed, in batch order
    pub failed: Vec<FailedUpdate>,
}

impl BatchAck {
    /// Check if every update was applied
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// One rejected update
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedUpdate {
    /// Position in the batch
    pub index: usize,
    /// Failure category
    pub kind: ErrorKind,
    /// Error message
    pub message: String,
}

/// Entry point for update batches
pub struct Gateway<S: StorageAdapter + ?Sized = dyn StorageAdapter> {
    reconciler: Reconciler<S>,
}

impl<S: StorageAdapter + ?Sized> Gateway<S> {
    /// Create a gateway for `user` over `store`
    pub fn new(user: impl Into<String>, store: Arc<S>) -> Self {
        Self::with_reconciler(Reconciler::new(user, store))
    }

    /// Create a gateway around an existing reconciler
    pub fn with_reconciler(reconciler: Reconciler<S>) -> Self {
        Gateway { reconciler }
    }

    /// The reconciler updates are applied with
    pub fn reconciler(&self) -> &Reconciler<S> {
        &self.reconciler
    }

    /// Apply every update of `batch` in order
    pub fn submit(&self, batch: &[RawUpdate]) -> BatchAck {
        let mut ack = BatchAck {
            received: batch.len(),
            ..BatchAck::default()
        };
        for (index, update) in batch.iter().enumerate() {
            match self.reconciler.apply(update) {
                Ok(_) => ack.applied += 1,
                Err(e) => {
                    warn!(index, update = %update, error = %e, "Failed to apply update");
                    ack.failed.push(FailedUpdate {
                        index,
                        kind: e.kind(),
                        message: e.to_string(),
                    });
                }
            }
        }
        info!(
            received = ack.received,
            applied = ack.applied,
            failed = ack.failed.len(),
            "Processed batch"
        );
        ack
    }

    /// Parse a JSON batch and apply it
    ///
    /// Accepts either an array of updates or a single update object.
    pub fn submit_json(&self, text: &str) -> Result<BatchAck> {
        let batch = parse_batch(text)?;
        Ok(self.submit(&batch))
    }
}

impl<S: StorageAdapter + ?Sized> std::fmt::Debug for Gateway<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("reconciler", &self.reconciler)
            .finish()
    }
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum WireBatch {
    Many(Vec<RawUpdate>),
    One(RawUpdate),
}

/// Parse a JSON array of updates, or a single update object
pub fn parse_batch(text: &str) -> Result<Vec<RawUpdate>> {
    let batch: WireBatch = serde_json::from_str(text)
        .map_err(|e| Error::Serialization(format!("invalid update batch: {}", e)))?;
    Ok(match batch {
        WireBatch::Many(updates) => updates,
        WireBatch::One(update) => vec![update],
    })
}
