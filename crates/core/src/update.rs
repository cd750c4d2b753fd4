//! Raw updates as sent by clients
//!
//! A [`RawUpdate`] is one fragment of an event's trace. Clients send them in
//! batches, possibly out of order and possibly more than once. Only
//! `updateType` is required on the wire; every other field falls back to its
//! default and is ignored by update kinds that do not use it.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Step name reserved for the terminal marker written by `end` updates
///
/// Client step names must not use it. This is a contract on the input and
/// is not enforced.
pub const END_STEP_NAME: &str = "end";

/// The four update kinds of the reconciliation protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateKind {
    /// Opens the event: a step plus the event's creation time
    Start,
    /// A timestamped step
    Step,
    /// A key/value annotation on a step
    Label,
    /// Closes the event: the terminal step plus the event result
    End,
}

impl UpdateKind {
    /// Wire name of this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateKind::Start => "start",
            UpdateKind::Step => "step",
            UpdateKind::Label => "label",
            UpdateKind::End => "end",
        }
    }
}

impl fmt::Display for UpdateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UpdateKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(UpdateKind::Start),
            "step" => Ok(UpdateKind::Step),
            "label" => Ok(UpdateKind::Label),
            "end" => Ok(UpdateKind::End),
            other => Err(Error::UnsupportedUpdateType(other.to_string())),
        }
    }
}

/// One telemetry fragment as received from a client
///
/// `update_type` stays a string so that a malformed update still
/// deserializes and can be rejected per item instead of failing the batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawUpdate {
    /// Event name chosen by the client
    pub event_name: String,
    /// Client-generated event instance id
    pub event_id: String,
    /// One of `start`, `step`, `label`, `end`
    pub update_type: String,
    /// Milliseconds relative to the reference epoch
    pub timestamp: i64,
    /// Step number, unique within the event
    pub step_number: i64,
    /// Step name
    pub step_name: String,
    /// Label key (label updates)
    pub label_key: String,
    /// Label value (label updates)
    pub label_val: String,
    /// Event result (end updates)
    pub result: String,
}

impl RawUpdate {
    /// Parse the update kind
    ///
    /// Fails with [`Error::UnsupportedUpdateType`] for anything other than
    /// the four protocol kinds.
    pub fn kind(&self) -> Result<UpdateKind, Error> {
        self.update_type.parse()
    }

    /// Build a `start` update
    pub fn start(
        event_name: &str,
        event_id: &str,
        step_number: i64,
        step_name: &str,
        timestamp: i64,
    ) -> Self {
        RawUpdate {
            event_name: event_name.to_string(),
            event_id: event_id.to_string(),
            update_type: UpdateKind::Start.as_str().to_string(),
            timestamp,
            step_number,
            step_name: step_name.to_string(),
            ..Default::default()
        }
    }

    /// Build a `step` update
    pub fn step(
        event_name: &str,
        event_id: &str,
        step_number: i64,
        step_name: &str,
        timestamp: i64,
    ) -> Self {
        RawUpdate {
            update_type: UpdateKind::Step.as_str().to_string(),
            ..Self::start(event_name, event_id, step_number, step_name, timestamp)
        }
    }

    /// Build a `label` update
    pub fn label(
        event_name: &str,
        event_id: &str,
        step_number: i64,
        step_name: &str,
        key: &str,
        value: &str,
    ) -> Self {
        RawUpdate {
            event_name: event_name.to_string(),
            event_id: event_id.to_string(),
            update_type: UpdateKind::Label.as_str().to_string(),
            step_number,
            step_name: step_name.to_string(),
            label_key: key.to_string(),
            label_val: value.to_string(),
            ..Default::default()
        }
    }

    /// Build an `end` update
    pub fn end(
        event_name: &str,
        event_id: &str,
        step_number: i64,
        timestamp: i64,
        result: &str,
    ) -> Self {
        RawUpdate {
            event_name: event_name.to_string(),
            event_id: event_id.to_string(),
            update_type: UpdateKind::End.as_str().to_string(),
            timestamp,
            step_number,
            result: result.to_string(),
            ..Default::default()
        }
    }
}

impl fmt::Display for RawUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            Ok(UpdateKind::Start) | Ok(UpdateKind::Step) => write!(
                f,
                "{}{{name: {}, number: {}, event: {}/{}, timestamp: {}}}",
                self.update_type,
                self.step_name,
                self.step_number,
                self.event_name,
                self.event_id,
                self.timestamp
            ),
            Ok(UpdateKind::Label) => write!(
                f,
                "label{{{}={}, step: {}#{}, event: {}/{}}}",
                self.label_key,
                self.label_val,
                self.step_name,
                self.step_number,
                self.event_name,
                self.event_id
            ),
            Ok(UpdateKind::End) => write!(
                f,
                "end{{result: {}, number: {}, event: {}/{}, timestamp: {}}}",
                self.result, self.step_number, self.event_name, self.event_id, self.timestamp
            ),
            Err(_) => write!(f, "unsupported{{updateType: {:?}}}", self.update_type),
        }
    }
}
