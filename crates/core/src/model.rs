//! Reconciled record types
//!
//! An [`Event`] owns an ordered list of [`Step`]s, each of which owns an
//! ordered list of [`Label`]s. Both adapters read their storage back into
//! these types, so equality of two `Event`s is equality of what was stored.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Timestamp of a step that exists but was never explicitly timestamped
///
/// A label update that arrives before its step creates the step with this
/// value. The step's own update later replaces it; a concrete timestamp is
/// never replaced.
pub const PLACEHOLDER_TIMESTAMP: i64 = -1;

/// Latest storable timestamp: `9999-12-31T23:59:59.999Z` as milliseconds
/// after the reference epoch `2001-01-01T00:00:00Z`
pub const MAX_TIMESTAMP: i64 = 252_423_993_599_999;

/// Map a client timestamp onto the stored domain
///
/// Zero and negative values mean "no timestamp" (an omitted wire field
/// decodes to 0) and collapse to [`PLACEHOLDER_TIMESTAMP`].
///
/// # Errors
///
/// [`Error::InvalidTimestamp`] above [`MAX_TIMESTAMP`].
pub fn normalize_timestamp(timestamp: i64) -> Result<i64> {
    match timestamp {
        t if t <= 0 => Ok(PLACEHOLDER_TIMESTAMP),
        t if t > MAX_TIMESTAMP => Err(Error::InvalidTimestamp(t)),
        t => Ok(t),
    }
}

/// A traced execution unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Composite event key
    pub id: String,
    /// Event name
    pub name: String,
    /// Result, set by the `end` update
    pub result: Option<String>,
    /// Creation time, set by the `start` update
    pub creation_time: Option<i64>,
    /// Steps in insertion order
    pub steps: Vec<Step>,
}

impl Event {
    /// Step with the given number
    pub fn step(&self, number: i64) -> Option<&Step> {
        self.steps.iter().find(|s| s.number == number)
    }
}

/// A phase within an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    /// Name given by the update that created the step
    pub name: String,
    /// Number, unique within the event
    pub number: i64,
    /// Milliseconds relative to the reference epoch, or [`PLACEHOLDER_TIMESTAMP`]
    pub timestamp: i64,
    /// Labels in insertion order, unique by key
    pub labels: Vec<Label>,
}

impl Step {
    /// Label with the given key
    pub fn label(&self, key: &str) -> Option<&Label> {
        self.labels.iter().find(|l| l.key == key)
    }

    /// Check if the step was created by a label and never timestamped
    pub fn is_placeholder(&self) -> bool {
        self.timestamp == PLACEHOLDER_TIMESTAMP
    }
}

/// A key/value annotation on a step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    /// Label key
    pub key: String,
    /// Label value
    pub value: String,
}

impl Label {
    /// Create a label
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Label {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Outcome of a label upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelWrite {
    /// The step had no label with this key
    Inserted,
    /// An existing label's value was replaced
    Overwritten,
}
