//! Live query observation
//!
//! Each subscription remembers the last result it delivered. After a commit
//! the store asks the registry for pending deliveries: every subscribed
//! query is re-run and observers whose result changed receive the full new
//! result. Deliveries are dispatched by the store once the state lock is
//! released.
//!
//! Every commit gets a sequence number while the state lock is held, so
//! sequence order is commit order. A subscription never receives a result
//! older than one it already received, even when two threads dispatch
//! concurrently.

use crate::dataset::Dataset;
use crate::query::{LiveQuery, QueryResult};
use parking_lot::{Mutex, ReentrantMutex};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Callback receiving full query results
pub type Observer = Arc<dyn Fn(&QueryResult) + Send + Sync>;

/// Subscription identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

struct Entry {
    id: SubscriptionId,
    query: LiveQuery,
    observer: Observer,
    last: QueryResult,
    /// Sequence of the newest result handed to the observer
    delivered: Arc<AtomicU64>,
}

/// A result waiting to be handed to its observer
pub(crate) struct Delivery {
    id: SubscriptionId,
    seq: u64,
    observer: Observer,
    delivered: Arc<AtomicU64>,
    result: QueryResult,
}

impl Delivery {
    fn new(entry: &Entry, seq: u64, result: QueryResult) -> Self {
        Self {
            id: entry.id,
            seq,
            observer: Arc::clone(&entry.observer),
            delivered: Arc::clone(&entry.delivered),
            result,
        }
    }

    /// Call the observer unless a newer result already reached it
    ///
    /// Must run under the registry's dispatch gate.
    fn deliver(self) {
        if self.delivered.load(Ordering::Acquire) > self.seq {
            tracing::trace!(subscription = %self.id, seq = self.seq, "dropping superseded result");
            return;
        }
        self.delivered.store(self.seq, Ordering::Release);
        tracing::trace!(subscription = %self.id, seq = self.seq, rows = self.result.len(), "delivering query result");
        (self.observer)(&self.result);
    }
}

/// Registered observers
#[derive(Default)]
pub(crate) struct ObserverRegistry {
    entries: Mutex<Vec<Entry>>,
    next_id: AtomicU64,
    /// Last commit sequence handed out
    commits: AtomicU64,
    /// Held while observers run; re-entrant so observers may mutate the store
    gate: ReentrantMutex<()>,
}

impl ObserverRegistry {
    /// Register an observer and build its initial delivery
    ///
    /// Must be called with the store's state lock held so the initial result
    /// is stamped with the commit it was computed from.
    pub(crate) fn register(
        &self,
        query: LiveQuery,
        observer: Observer,
        initial: QueryResult,
    ) -> (SubscriptionId, Delivery) {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let seq = self.commits.load(Ordering::Acquire);
        let entry = Entry {
            id,
            query,
            observer,
            last: initial.clone(),
            delivered: Arc::new(AtomicU64::new(0)),
        };
        let delivery = Delivery::new(&entry, seq, initial);
        self.entries.lock().push(entry);
        (id, delivery)
    }

    pub(crate) fn remove(&self, id: SubscriptionId) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|e| e.id != id);
        entries.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Re-run every subscribed query and collect the changed results
    ///
    /// Must be called with the store's state lock held, once per commit.
    pub(crate) fn pending(&self, dataset: &Dataset) -> Vec<Delivery> {
        let seq = self.commits.fetch_add(1, Ordering::AcqRel) + 1;

        let mut entries = self.entries.lock();
        if entries.is_empty() {
            return Vec::new();
        }

        let mut evaluated: HashMap<LiveQuery, QueryResult> = HashMap::new();
        let mut deliveries = Vec::new();

        for entry in entries.iter_mut() {
            let query = entry.query;
            let result = evaluated
                .entry(query)
                .or_insert_with(|| query.evaluate(dataset));

            if *result != entry.last {
                entry.last = result.clone();
                deliveries.push(Delivery::new(entry, seq, result.clone()));
            }
        }

        tracing::debug!(
            seq,
            subscriptions = entries.len(),
            changed = deliveries.len(),
            "re-ran live queries"
        );
        deliveries
    }

    /// Hand results to their observers
    ///
    /// Must be called without the state lock held.
    pub(crate) fn dispatch(&self, deliveries: Vec<Delivery>) {
        if deliveries.is_empty() {
            return;
        }
        let _gate = self.gate.lock();
        for delivery in deliveries {
            delivery.deliver();
        }
    }
}

impl fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("subscriptions", &self.len())
            .field("commits", &self.commits.load(Ordering::Relaxed))
            .finish()
    }
}

/// Handle to a live query subscription
///
/// Dropping the handle stops delivery; call [`Subscription::detach`] to keep
/// the observer registered for the lifetime of the store.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: SubscriptionId,
    registry: Option<Weak<ObserverRegistry>>,
}

impl Subscription {
    pub(crate) fn new(id: SubscriptionId, registry: &Arc<ObserverRegistry>) -> Self {
        Self {
            id,
            registry: Some(Arc::downgrade(registry)),
        }
    }

    /// Subscription identifier
    #[inline]
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Keep the observer registered after this handle goes away
    ///
    /// The returned id can still be passed to
    /// [`CanvassStore::unsubscribe`](crate::CanvassStore::unsubscribe).
    pub fn detach(mut self) -> SubscriptionId {
        self.registry = None;
        self.id
    }

    /// Stop delivery now
    ///
    /// Returns `false` if the store is gone or the subscription was already
    /// removed.
    pub fn cancel(mut self) -> bool {
        self.release()
    }

    fn release(&mut self) -> bool {
        self.registry
            .take()
            .and_then(|weak| weak.upgrade())
            .is_some_and(|registry| registry.remove(self.id))
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("attached", &self.registry.is_some())
            .finish()
    }
}
