//! Testing utilities for the Knock-Knock workspace
//!
//! Shared fixtures, a switchable failing backend and a recording observer.

#![allow(missing_docs)]

use chrono::{DateTime, Utc};
use knock_model::{Door, Record, RecordFields, Territory};
use knock_store::{
    CanvassStore, Dataset, MemoryBackend, PersistenceError, QueryResult, StorageBackend,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Fixed instant `secs` seconds after the epoch
pub fn at(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap()
}

/// Backend whose commits can be made to fail on demand
///
/// Clones share the failure switch, so a test can keep one clone and hand
/// the other to the store.
#[derive(Debug, Clone, Default)]
pub struct FailingBackend {
    inner: MemoryBackend,
    failing: Arc<AtomicBool>,
    commits: Arc<AtomicUsize>,
}

impl FailingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_commits(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Successful commits so far
    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }
}

impl StorageBackend for FailingBackend {
    fn load(&self) -> Result<Dataset, PersistenceError> {
        self.inner.load()
    }

    fn commit(&self, dataset: &Dataset) -> Result<(), PersistenceError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PersistenceError::Unavailable("injected failure".to_string()));
        }
        self.inner.commit(dataset)?;
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

/// Store backed by a [`FailingBackend`] the test keeps a handle to
pub fn failing_store() -> (CanvassStore, FailingBackend) {
    let backend = FailingBackend::new();
    let store = CanvassStore::with_backend(Box::new(backend.clone())).unwrap();
    (store, backend)
}

/// Observer that keeps every result it receives
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    seen: Arc<Mutex<Vec<QueryResult>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Callback to hand to [`CanvassStore::subscribe`]
    pub fn observer(&self) -> impl Fn(&QueryResult) + Send + Sync + 'static {
        let seen = Arc::clone(&self.seen);
        move |result| seen.lock().push(result.clone())
    }

    pub fn count(&self) -> usize {
        self.seen.lock().len()
    }

    pub fn last(&self) -> Option<QueryResult> {
        self.seen.lock().last().cloned()
    }

    pub fn all(&self) -> Vec<QueryResult> {
        self.seen.lock().clone()
    }
}

/// Ids of the canvassing fixture built by [`seeded_store`]
#[derive(Debug, Clone)]
pub struct Seed {
    pub territory: Territory,
    pub record: Record,
    pub door: Door,
}

/// Territory "D2D-50" holding "123 Main St" with door "4B"
pub fn seed(store: &CanvassStore) -> Seed {
    let territory = store.create_territory("D2D-50").unwrap();
    let record = store
        .create_record(
            RecordFields::new("123 Main St")
                .with_city("Springfield")
                .in_territory(territory.id),
        )
        .unwrap();
    let door = store.create_door(record.id, "4B").unwrap();
    Seed {
        territory,
        record,
        door,
    }
}

/// In-memory store with the [`seed`] fixture
pub fn seeded_store() -> (CanvassStore, Seed) {
    let store = CanvassStore::in_memory();
    let seed = seed(&store);
    (store, seed)
}
