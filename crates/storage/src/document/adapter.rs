//! [`StorageAdapter`] over the embedded document store
//!
//! Event document shape:
//!
//! ```text
//! { _id, name, result, creationTime,
//!   steps: [ { name, number, timestamp, labels: [ { key, val } ] } ] }
//! ```
//!
//! Steps are addressed by `number`, labels by `key`. Each operation runs as
//! one [`DocumentStore::update_one`] closure, so a step check and the push
//! that follows it cannot interleave with another writer.

use super::path::{self, DocPath};
use super::store::DocumentStore;
use crate::adapter::StorageAdapter;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;
use stepline_core::{
    Error, Event, EventKey, Label, LabelWrite, Result, Step, StepKey, PLACEHOLDER_TIMESTAMP,
};
use tracing::{debug, error, info};

/// Document-backed storage adapter
#[derive(Debug)]
pub struct DocumentAdapter {
    store: DocumentStore,
}

impl DocumentAdapter {
    /// Adapter over a memory-only store
    pub fn in_memory() -> Self {
        Self::with_store(DocumentStore::in_memory())
    }

    /// Adapter over a store persisted at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let store = DocumentStore::open(path)?;
        info!(path = ?store.path(), "Connected document backend");
        Ok(Self::with_store(store))
    }

    /// Adapter over an existing store
    pub fn with_store(store: DocumentStore) -> Self {
        DocumentAdapter { store }
    }

    /// The underlying store
    pub fn store(&self) -> &DocumentStore {
        &self.store
    }
}

fn steps() -> DocPath {
    DocPath::root().field("steps")
}

fn step_at(number: i64) -> DocPath {
    steps().matching("number", number)
}

fn event_missing(key: &EventKey) -> Error {
    Error::NotFound(format!("event {}", key))
}

fn step_missing(step: &StepKey) -> Error {
    Error::NotFound(format!("step {} of event {}", step.number(), step.event()))
}

impl StorageAdapter for DocumentAdapter {
    fn backend(&self) -> &'static str {
        "document"
    }

    fn ensure_event(&self, key: &EventKey, name: &str) -> Result<()> {
        let doc = path::object([
            ("_id", json!(key.as_str())),
            ("name", json!(name)),
            ("result", Value::Null),
            ("creationTime", Value::Null),
            ("steps", json!([])),
        ]);
        if self.store.insert_if_absent(key.as_str(), doc)? {
            debug!(event = %key, "Created event document");
        }
        Ok(())
    }

    fn set_event_creation_time(&self, key: &EventKey, timestamp: i64) -> Result<()> {
        let field = DocPath::root().field("creationTime");
        self.store
            .update_one(key.as_str(), |doc| {
                path::set(doc, &field, &json!(timestamp));
                Ok(())
            })?
            .ok_or_else(|| event_missing(key))
    }

    fn set_event_result(&self, key: &EventKey, result: &str) -> Result<()> {
        let field = DocPath::root().field("result");
        self.store
            .update_one(key.as_str(), |doc| {
                path::set(doc, &field, &json!(result));
                Ok(())
            })?
            .ok_or_else(|| event_missing(key))
    }

    fn ensure_step(&self, step: &StepKey, timestamp: i64) -> Result<()> {
        let at = step_at(step.number());
        let stamp = at.clone().field("timestamp");
        self.store
            .update_one(step.event().as_str(), |doc| {
                if path::count(doc, &at) == 0 {
                    let record = path::object([
                        ("name", json!(step.name())),
                        ("number", json!(step.number())),
                        ("timestamp", json!(timestamp)),
                        ("labels", json!([])),
                    ]);
                    path::push(doc, &steps(), &record);
                    debug!(step = %step, timestamp, "Appended step");
                    return Ok(());
                }
                let placeholder = json!(PLACEHOLDER_TIMESTAMP);
                if timestamp != PLACEHOLDER_TIMESTAMP
                    && path::get(doc, &stamp).first() == Some(&&placeholder)
                {
                    path::set(doc, &stamp, &json!(timestamp));
                    debug!(step = %step, timestamp, "Upgraded placeholder timestamp");
                }
                Ok(())
            })?
            .ok_or_else(|| event_missing(step.event()))
    }

    fn get_step(&self, step: &StepKey) -> Result<Option<Step>> {
        let Some(doc) = self.store.find_one(step.event().as_str())? else {
            return Ok(None);
        };
        match path::get(&doc, &step_at(step.number())).first() {
            Some(found) => {
                let stored: StoredStep = serde_json::from_value((*found).clone())?;
                Ok(Some(stored.into()))
            }
            None => Ok(None),
        }
    }

    fn upsert_label(&self, step: &StepKey, key: &str, value: &str) -> Result<LabelWrite> {
        let at = step_at(step.number());
        let labels = at.clone().field("labels");
        let val = labels.clone().matching("key", key).field("val");
        self.store
            .update_one(step.event().as_str(), |doc| {
                if path::count(doc, &at) == 0 {
                    return Err(step_missing(step));
                }
                if path::set(doc, &val, &json!(value)) > 0 {
                    return Ok(LabelWrite::Overwritten);
                }
                let label = path::object([("key", json!(key)), ("val", json!(value))]);
                path::push(doc, &labels, &label);
                Ok(LabelWrite::Inserted)
            })?
            .ok_or_else(|| event_missing(step.event()))
    }

    fn get_event(&self, key: &EventKey) -> Result<Option<Event>> {
        match self.store.find_one(key.as_str())? {
            Some(doc) => {
                let stored: StoredEvent = serde_json::from_value(doc)?;
                Ok(Some(stored.into()))
            }
            None => Ok(None),
        }
    }

    fn flush(&self) -> Result<()> {
        self.store.flush()
    }

    fn disconnect(&self) -> Result<()> {
        if self.store.is_open() {
            self.store.close()?;
            info!(path = ?self.store.path(), "Disconnected document backend");
        }
        Ok(())
    }
}

impl Drop for DocumentAdapter {
    fn drop(&mut self) {
        if let Err(e) = self.disconnect() {
            error!(error = %e, "Failed to release document backend");
        }
    }
}

// ============================================================================
// Stored shapes
// ============================================================================

#[derive(Deserialize)]
struct StoredEvent {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    result: Option<String>,
    #[serde(rename = "creationTime")]
    creation_time: Option<i64>,
    #[serde(default)]
    steps: Vec<StoredStep>,
}

#[derive(Deserialize)]
struct StoredStep {
    name: String,
    number: i64,
    timestamp: i64,
    #[serde(default)]
    labels: Vec<StoredLabel>,
}

#[derive(Deserialize)]
struct StoredLabel {
    key: String,
    val: String,
}

impl From<StoredEvent> for Event {
    fn from(stored: StoredEvent) -> Self {
        Event {
            id: stored.id,
            name: stored.name,
            result: stored.result,
            creation_time: stored.creation_time,
            steps: stored.steps.into_iter().map(Step::from).collect(),
        }
    }
}

impl From<StoredStep> for Step {
    fn from(stored: StoredStep) -> Self {
        Step {
            name: stored.name,
            number: stored.number,
            timestamp: stored.timestamp,
            labels: stored
                .labels
                .into_iter()
                .map(|l| Label::new(l.key, l.val))
                .collect(),
        }
    }
}
