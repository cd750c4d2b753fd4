//! Embedded document store
//!
//! A single collection of JSON documents keyed by `_id`.
//!
//! # Design
//!
//! - DashMap: sharded by document id, lock-free reads
//! - Per-document atomicity: [`DocumentStore::update_one`] runs its closure
//!   on a draft copy while holding the document's shard lock and swaps the
//!   draft in only if the closure succeeds
//! - Durability: optional snapshot file, loaded on open and rewritten on
//!   [`flush`](DocumentStore::flush) and [`close`](DocumentStore::close)
//!
//! # Thread Safety
//!
//! All operations take `&self`. Two updates of the same document are
//! serialized by the shard lock; updates of different documents proceed in
//! parallel unless they hash to the same shard. Writers hold a shared gate
//! that `close` takes exclusively, so every write acknowledged before
//! `close` returns is in the final snapshot.

use super::snapshot;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use stepline_core::{Error, Result};
use tracing::info;

/// Sharded, optionally persistent collection of JSON documents
pub struct DocumentStore {
    /// Documents by id
    docs: DashMap<String, Value>,
    /// Snapshot file; `None` for a memory-only store
    path: Option<PathBuf>,
    /// Cleared by `close`
    open: AtomicBool,
    /// Shared by writers, exclusive while closing
    gate: RwLock<()>,
    /// Serializes snapshot writers
    flush_lock: Mutex<()>,
}

impl DocumentStore {
    /// Create a memory-only store
    pub fn in_memory() -> Self {
        Self {
            docs: DashMap::new(),
            path: None,
            open: AtomicBool::new(true),
            gate: RwLock::new(()),
            flush_lock: Mutex::new(()),
        }
    }

    /// Open a store backed by the snapshot file at `path`
    ///
    /// A missing file yields an empty store; the file is created on the
    /// first flush. A damaged file fails with [`Error::Corruption`].
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let docs = DashMap::new();
        if let Some(loaded) = snapshot::read(&path)? {
            info!(path = %path.display(), documents = loaded.len(), "Loaded document snapshot");
            for (id, doc) in loaded {
                docs.insert(id, doc);
            }
        }
        Ok(Self {
            docs,
            path: Some(path),
            open: AtomicBool::new(true),
            gate: RwLock::new(()),
            flush_lock: Mutex::new(()),
        })
    }

    /// Snapshot file path, if persistent
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Check if the store accepts operations
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Number of documents
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    /// Check if the store holds no documents
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(Error::StorageUnavailable("document store is closed".into()))
        }
    }

    // ========================================================================
    // Document Operations
    // ========================================================================

    /// Insert `doc` under `id` unless a document with that id exists
    ///
    /// Returns `true` if this call inserted the document. Concurrent callers
    /// racing on the same id see exactly one `true`.
    pub fn insert_if_absent(&self, id: &str, doc: Value) -> Result<bool> {
        let _gate = self.gate.read();
        self.ensure_open()?;
        match self.docs.entry(id.to_string()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(doc);
                Ok(true)
            }
        }
    }

    /// Clone of the document stored under `id`
    pub fn find_one(&self, id: &str) -> Result<Option<Value>> {
        self.ensure_open()?;
        Ok(self.docs.get(id).map(|doc| doc.value().clone()))
    }

    /// Atomically modify the document stored under `id`
    ///
    /// `f` receives a draft copy. If it returns `Ok`, the draft replaces the
    /// stored document; if it returns `Err`, the stored document is left
    /// untouched and the error is returned. Returns `Ok(None)` when no
    /// document exists under `id`.
    pub fn update_one<T>(
        &self,
        id: &str,
        f: impl FnOnce(&mut Value) -> Result<T>,
    ) -> Result<Option<T>> {
        let _gate = self.gate.read();
        self.ensure_open()?;
        let Some(mut doc) = self.docs.get_mut(id) else {
            return Ok(None);
        };
        let mut draft = doc.value().clone();
        let out = f(&mut draft)?;
        *doc = draft;
        Ok(Some(out))
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Write a snapshot of every document, if the store is persistent
    pub fn flush(&self) -> Result<()> {
        self.ensure_open()?;
        self.write_snapshot()
    }

    /// Stop accepting operations and flush
    ///
    /// Waits for in-flight writes to finish before the snapshot is taken.
    /// Closing an already closed store is a no-op.
    pub fn close(&self) -> Result<()> {
        {
            let _gate = self.gate.write();
            if !self.open.swap(false, Ordering::AcqRel) {
                return Ok(());
            }
        }
        self.write_snapshot()
    }

    fn write_snapshot(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let _guard = self.flush_lock.lock();
        let mut docs: Vec<(String, Value)> = self
            .docs
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        docs.sort_by(|(a, _), (b, _)| a.cmp(b));
        snapshot::write(path, &docs)?;
        info!(path = %path.display(), documents = docs.len(), "Wrote document snapshot");
        Ok(())
    }
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore")
            .field("documents", &self.len())
            .field("path", &self.path)
            .field("open", &self.is_open())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Arc, Barrier};
    use std::thread;

    #[test]
    fn test_insert_if_absent() {
        let store = DocumentStore::in_memory();
        assert!(store.insert_if_absent("a", json!({"n": 1})).unwrap());
        assert!(!store.insert_if_absent("a", json!({"n": 2})).unwrap());
        assert_eq!(store.find_one("a").unwrap().unwrap()["n"], 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_find_missing() {
        let store = DocumentStore::in_memory();
        assert!(store.find_one("nope").unwrap().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_update_one_applies_on_success() {
        let store = DocumentStore::in_memory();
        store.insert_if_absent("a", json!({"n": 1})).unwrap();
        let out = store
            .update_one("a", |doc| {
                doc["n"] = json!(2);
                Ok("done")
            })
            .unwrap();
        assert_eq!(out, Some("done"));
        assert_eq!(store.find_one("a").unwrap().unwrap()["n"], 2);
    }

    #[test]
    fn test_update_one_discards_draft_on_error() {
        let store = DocumentStore::in_memory();
        store.insert_if_absent("a", json!({"n": 1})).unwrap();
        let err = store
            .update_one("a", |doc| -> Result<()> {
                doc["n"] = json!(99);
                Err(Error::NotFound("step".into()))
            })
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(store.find_one("a").unwrap().unwrap()["n"], 1);
    }

    #[test]
    fn test_update_one_missing_document() {
        let store = DocumentStore::in_memory();
        let out = store.update_one("a", |_| Ok(())).unwrap();
        assert!(out.is_none());
    }

    #[test]
    fn test_closed_store_rejects_operations() {
        let store = DocumentStore::in_memory();
        store.close().unwrap();
        store.close().unwrap();
        let err = store.find_one("a").unwrap_err();
        assert!(err.is_retryable());
        assert!(store.insert_if_absent("a", json!({})).is_err());
    }

    #[test]
    fn test_concurrent_insert_if_absent_single_winner() {
        let store = Arc::new(DocumentStore::in_memory());
        const THREADS: usize = 8;
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|i| {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    store.insert_if_absent("race", json!({ "winner": i })).unwrap()
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|inserted| *inserted)
            .count();
        assert_eq!(winners, 1);
    }

    #[test]
    fn test_concurrent_updates_are_serialized() {
        let store = Arc::new(DocumentStore::in_memory());
        store.insert_if_absent("counter", json!({"n": 0})).unwrap();

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..100 {
                        store
                            .update_one("counter", |doc| {
                                let n = doc["n"].as_i64().unwrap_or(0);
                                doc["n"] = json!(n + 1);
                                Ok(())
                            })
                            .unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(store.find_one("counter").unwrap().unwrap()["n"], 1000);
    }

    #[test]
    fn test_reopen_from_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docs.snap");

        {
            let store = DocumentStore::open(&path).unwrap();
            store.insert_if_absent("a", json!({"n": 1})).unwrap();
            store.insert_if_absent("b", json!({"n": 2})).unwrap();
            store.close().unwrap();
        }

        let store = DocumentStore::open(&path).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.find_one("b").unwrap().unwrap()["n"], 2);
        assert_eq!(store.path(), Some(path.as_path()));
    }

    #[test]
    fn test_close_keeps_every_acknowledged_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docs.snap");
        let store = Arc::new(DocumentStore::open(&path).unwrap());
        store.insert_if_absent("log", json!({"n": []})).unwrap();

        const WRITERS: usize = 4;
        let barrier = Arc::new(Barrier::new(WRITERS + 1));
        let handles: Vec<_> = (0..WRITERS)
            .map(|w| {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    let mut acked = 0usize;
                    for i in 0..10_000 {
                        let pushed = store.update_one("log", |doc| {
                            if let Some(items) = doc["n"].as_array_mut() {
                                items.push(json!(w * 10_000 + i));
                            }
                            Ok(())
                        });
                        match pushed {
                            Ok(_) => acked += 1,
                            Err(e) => {
                                assert!(e.is_retryable());
                                break;
                            }
                        }
                    }
                    acked
                })
            })
            .collect();

        barrier.wait();
        thread::yield_now();
        store.close().unwrap();
        let acked: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

        let reopened = DocumentStore::open(&path).unwrap();
        let doc = reopened.find_one("log").unwrap().unwrap();
        assert_eq!(doc["n"].as_array().unwrap().len(), acked);
    }

    #[test]
    fn test_open_rejects_corrupted_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docs.snap");
        std::fs::write(&path, b"definitely not a snapshot file").unwrap();

        let err = DocumentStore::open(&path).unwrap_err();
        assert!(matches!(err, Error::Corruption(_)));
    }
}
