//! The canvassing store
//!
//! [`CanvassStore`] is the single writer for all four entity tables.
//!
//! # Mutation protocol
//! 1. Lock the live dataset and stage a copy
//! 2. Validate and apply the change to the copy
//! 3. Commit the copy through the backend
//! 4. Swap the copy in and collect observer deliveries
//! 5. Release the lock, dispatch results in commit order, then return
//!
//! Any failure before step 4 leaves the live state and the observers
//! untouched.

use crate::backend::{self, MemoryBackend, StorageBackend};
use crate::config::StoreConfig;
use crate::dataset::{Dataset, StoreStats};
use crate::error::{EntityKind, StoreError};
use crate::observe::{Observer, ObserverRegistry, Subscription, SubscriptionId};
use crate::query::{LiveQuery, QueryResult, RecordScope};
use chrono::{DateTime, Utc};
use knock_model::{
    Door, DoorGrouping, DoorId, Record, RecordFields, RecordId, Territory, TerritoryId, Visit,
    VisitId, VisitSymbol,
};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Single-writer canvassing store
#[derive(Debug)]
pub struct CanvassStore {
    /// Live committed state
    state: Mutex<Dataset>,
    /// Durable home of the state
    backend: Box<dyn StorageBackend>,
    /// Live query subscriptions
    observers: Arc<ObserverRegistry>,
}

impl CanvassStore {
    /// Create store with nothing persisted
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            state: Mutex::new(Dataset::new()),
            backend: Box::new(MemoryBackend::new()),
            observers: Arc::new(ObserverRegistry::default()),
        }
    }

    /// Create store on top of `backend`, loading its current dataset
    ///
    /// # Errors
    /// Returns [`StoreError::Persistence`] if the backend cannot load.
    pub fn with_backend(backend: Box<dyn StorageBackend>) -> StoreResult<Self> {
        let dataset = backend.load()?;
        info!(backend = backend.name(), stats = ?dataset.stats(), "opened canvass store");
        Ok(Self {
            state: Mutex::new(dataset),
            backend,
            observers: Arc::new(ObserverRegistry::default()),
        })
    }

    /// Create store from configuration
    ///
    /// Does not install a tracing subscriber; see
    /// [`init_tracing`](crate::telemetry::init_tracing).
    ///
    /// # Errors
    /// Returns [`StoreError::Persistence`] if the configured backend cannot
    /// load.
    pub fn open(config: &StoreConfig) -> StoreResult<Self> {
        Self::with_backend(backend::from_config(&config.storage))
    }

    /// Read a TOML configuration file and open the store it describes
    ///
    /// # Errors
    /// - [`StoreError::Config`] if the file cannot be read or parsed
    /// - [`StoreError::Persistence`] if the configured backend cannot load
    pub fn open_config_file(path: impl AsRef<std::path::Path>) -> StoreResult<Self> {
        let config = StoreConfig::load(path)?;
        Self::open(&config)
    }

    /// Name of the active backend
    #[inline]
    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    // ==================================================================
    // Queries
    // ==================================================================

    /// Territories by name
    #[must_use]
    pub fn list_territories(&self) -> Vec<Territory> {
        self.state.lock().list_territories()
    }

    /// Records in `scope` by street name, ties in insertion order
    ///
    /// An unknown territory yields an empty listing.
    #[must_use]
    pub fn list_records(&self, scope: RecordScope) -> Vec<Record> {
        self.state.lock().list_records(scope)
    }

    /// Records of `territory`, or unassigned records for `None`
    #[must_use]
    pub fn list_records_in(&self, territory: Option<TerritoryId>) -> Vec<Record> {
        self.list_records(territory.into())
    }

    /// Doors of `record` in natural label order
    #[must_use]
    pub fn list_doors(&self, record: RecordId) -> Vec<Door> {
        self.state.lock().list_doors(record)
    }

    /// Visits of `door`, oldest first
    #[must_use]
    pub fn list_visits(&self, door: DoorId) -> Vec<Visit> {
        self.state.lock().list_visits(door)
    }

    /// Most recent visit of `door`
    #[must_use]
    pub fn latest_visit(&self, door: DoorId) -> Option<Visit> {
        self.state.lock().latest_visit(door)
    }

    /// Section `doors` by the symbol of their latest visit
    ///
    /// Input order is kept inside each section.
    #[must_use]
    pub fn group_doors_by_latest_visit_symbol(&self, doors: &[Door]) -> DoorGrouping {
        self.state.lock().group_doors(doors)
    }

    /// Doors of `record`, sectioned by latest visit
    #[must_use]
    pub fn door_sections(&self, record: RecordId) -> DoorGrouping {
        self.state.lock().door_sections(record)
    }

    /// Number of records assigned to `territory`
    #[must_use]
    pub fn record_count(&self, territory: TerritoryId) -> usize {
        self.state.lock().record_count(territory)
    }

    /// Territory by id
    #[must_use]
    pub fn territory(&self, id: TerritoryId) -> Option<Territory> {
        self.state.lock().territory(id).cloned()
    }

    /// Record by id
    #[must_use]
    pub fn record(&self, id: RecordId) -> Option<Record> {
        self.state.lock().record(id).cloned()
    }

    /// Door by id
    #[must_use]
    pub fn door(&self, id: DoorId) -> Option<Door> {
        self.state.lock().door(id).cloned()
    }

    /// Visit by id
    #[must_use]
    pub fn visit(&self, id: VisitId) -> Option<Visit> {
        self.state.lock().visit(id).cloned()
    }

    /// Entity counts
    #[must_use]
    pub fn stats(&self) -> StoreStats {
        self.state.lock().stats()
    }

    /// Run a query once
    #[must_use]
    pub fn query(&self, query: LiveQuery) -> QueryResult {
        query.evaluate(&self.state.lock())
    }

    // ==================================================================
    // Territories
    // ==================================================================

    /// Create a territory
    ///
    /// # Errors
    /// - [`StoreError::Validation`] for a blank name
    /// - [`StoreError::Persistence`] if the commit fails
    #[instrument(skip(self))]
    pub fn create_territory(&self, name: &str) -> StoreResult<Territory> {
        let territory = self.mutate(|ds, now| {
            let territory = Territory::create(name, now)?;
            ds.territories.insert(territory.id, territory.clone());
            Ok(territory)
        })?;
        info!(territory = %territory.id, name = %territory.name, "created territory");
        Ok(territory)
    }

    /// Rename a territory
    ///
    /// # Errors
    /// - [`StoreError::NotFound`] for an unknown id
    /// - [`StoreError::Validation`] for a blank name
    /// - [`StoreError::Persistence`] if the commit fails
    #[instrument(skip(self))]
    pub fn update_territory(&self, id: TerritoryId, name: &str) -> StoreResult<Territory> {
        self.mutate(|ds, now| {
            let territory = ds
                .territories
                .get_mut(&id)
                .ok_or_else(|| StoreError::not_found(EntityKind::Territory, id))?;
            territory.rename(name, now)?;
            Ok(territory.clone())
        })
    }

    /// Delete a territory; its records become unassigned
    ///
    /// Returns `false` without committing when the id is unknown.
    ///
    /// # Errors
    /// Returns [`StoreError::Persistence`] if the commit fails.
    #[instrument(skip(self))]
    pub fn delete_territory(&self, id: TerritoryId) -> StoreResult<bool> {
        let removed = self.mutate_if(|ds, now| Ok(ds.remove_territory(id, now)))?;
        match removed {
            Some(removed) => {
                info!(territory = %id, unassigned = removed.records, "deleted territory");
                Ok(true)
            }
            None => {
                debug!(territory = %id, "territory already gone");
                Ok(false)
            }
        }
    }

    // ==================================================================
    // Records
    // ==================================================================

    /// Create a record
    ///
    /// # Errors
    /// - [`StoreError::NotFound`] if `fields.territory` names an unknown
    ///   territory
    /// - [`StoreError::Validation`] for a blank street name
    /// - [`StoreError::Persistence`] if the commit fails
    #[instrument(skip(self, fields), fields(street = %fields.street_name))]
    pub fn create_record(&self, fields: RecordFields) -> StoreResult<Record> {
        let record = self.mutate(|ds, now| {
            ensure_territory(ds, fields.territory)?;
            log_dropped_apartment(&fields);
            let record = Record::create(fields, now)?;
            ds.records.insert(record.id, record.clone());
            Ok(record)
        })?;
        info!(record = %record.id, territory = ?record.territory, "created record");
        Ok(record)
    }

    /// Replace every editable field of a record, including its territory
    ///
    /// # Errors
    /// - [`StoreError::NotFound`] for an unknown record or territory
    /// - [`StoreError::Validation`] for a blank street name
    /// - [`StoreError::Persistence`] if the commit fails
    #[instrument(skip(self, fields))]
    pub fn update_record(&self, id: RecordId, fields: RecordFields) -> StoreResult<Record> {
        self.mutate(|ds, now| {
            ensure_territory(ds, fields.territory)?;
            log_dropped_apartment(&fields);
            let record = ds
                .records
                .get_mut(&id)
                .ok_or_else(|| StoreError::not_found(EntityKind::Record, id))?;
            record.apply(fields, now)?;
            Ok(record.clone())
        })
    }

    /// Move a record to another territory, or to unassigned
    ///
    /// # Errors
    /// - [`StoreError::NotFound`] for an unknown record or territory
    /// - [`StoreError::Persistence`] if the commit fails
    #[instrument(skip(self))]
    pub fn assign_record(
        &self,
        id: RecordId,
        territory: Option<TerritoryId>,
    ) -> StoreResult<Record> {
        self.mutate(|ds, now| {
            ensure_territory(ds, territory)?;
            let record = ds
                .records
                .get_mut(&id)
                .ok_or_else(|| StoreError::not_found(EntityKind::Record, id))?;
            record.assign(territory, now);
            Ok(record.clone())
        })
    }

    /// Delete a record together with its doors and their visits
    ///
    /// Returns `false` without committing when the id is unknown.
    ///
    /// # Errors
    /// Returns [`StoreError::Persistence`] if the commit fails.
    #[instrument(skip(self))]
    pub fn delete_record(&self, id: RecordId) -> StoreResult<bool> {
        let removed = self.mutate_if(|ds, _| Ok(ds.remove_record(id)))?;
        match removed {
            Some(removed) => {
                info!(record = %id, "deleted record");
                debug!(doors = removed.doors, visits = removed.visits, "cascaded record delete");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // ==================================================================
    // Doors
    // ==================================================================

    /// Add a door to a record
    ///
    /// # Errors
    /// - [`StoreError::NotFound`] for an unknown record
    /// - [`StoreError::Validation`] for a blank number
    /// - [`StoreError::Persistence`] if the commit fails
    #[instrument(skip(self))]
    pub fn create_door(&self, record: RecordId, number: &str) -> StoreResult<Door> {
        let door = self.mutate(|ds, now| {
            if ds.record(record).is_none() {
                return Err(StoreError::not_found(EntityKind::Record, record));
            }
            let door = Door::create(record, number, now)?;
            ds.doors.insert(door.id, door.clone());
            Ok(door)
        })?;
        info!(door = %door.id, record = %record, number = %door.number, "created door");
        Ok(door)
    }

    /// Relabel a door
    ///
    /// # Errors
    /// - [`StoreError::NotFound`] for an unknown door
    /// - [`StoreError::Validation`] for a blank number
    /// - [`StoreError::Persistence`] if the commit fails
    #[instrument(skip(self))]
    pub fn update_door(&self, id: DoorId, number: &str) -> StoreResult<Door> {
        self.mutate(|ds, now| {
            let door = ds
                .doors
                .get_mut(&id)
                .ok_or_else(|| StoreError::not_found(EntityKind::Door, id))?;
            door.renumber(number, now)?;
            Ok(door.clone())
        })
    }

    /// Delete a door together with its visits
    ///
    /// Returns `false` without committing when the id is unknown.
    ///
    /// # Errors
    /// Returns [`StoreError::Persistence`] if the commit fails.
    #[instrument(skip(self))]
    pub fn delete_door(&self, id: DoorId) -> StoreResult<bool> {
        let removed = self.mutate_if(|ds, _| Ok(ds.remove_door(id)))?;
        match removed {
            Some(removed) => {
                info!(door = %id, "deleted door");
                debug!(visits = removed.visits, "cascaded door delete");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // ==================================================================
    // Visits
    // ==================================================================

    /// Log a visit happening now
    ///
    /// # Errors
    /// - [`StoreError::NotFound`] for an unknown door
    /// - [`StoreError::Persistence`] if the commit fails
    pub fn record_visit(&self, door: DoorId, symbol: VisitSymbol) -> StoreResult<Visit> {
        self.record_visit_at(door, symbol, Utc::now())
    }

    /// Log a visit at an explicit time
    ///
    /// # Errors
    /// - [`StoreError::NotFound`] for an unknown door
    /// - [`StoreError::Persistence`] if the commit fails
    #[instrument(skip(self))]
    pub fn record_visit_at(
        &self,
        door: DoorId,
        symbol: VisitSymbol,
        timestamp: DateTime<Utc>,
    ) -> StoreResult<Visit> {
        let visit = self.mutate(|ds, _| {
            if ds.door(door).is_none() {
                return Err(StoreError::not_found(EntityKind::Door, door));
            }
            let visit = Visit::new(door, symbol, timestamp);
            ds.visits.insert(visit.id, visit.clone());
            Ok(visit)
        })?;
        info!(visit = %visit.id, door = %door, symbol = %symbol, "recorded visit");
        Ok(visit)
    }

    // ==================================================================
    // Observation
    // ==================================================================

    /// Observe a query
    ///
    /// `observer` receives the current result before this call returns,
    /// then the full new result after every commit that changes it.
    /// Observers run without any store lock held and may query the store.
    /// Results reach each observer in commit order; when commits race, an
    /// observer may skip an intermediate result but never ends up behind
    /// the committed state.
    pub fn subscribe<F>(&self, query: LiveQuery, observer: F) -> Subscription
    where
        F: Fn(&QueryResult) + Send + Sync + 'static,
    {
        let observer: Observer = Arc::new(observer);

        let (id, initial) = {
            // lock order: state, then registry
            let state = self.state.lock();
            let initial = query.evaluate(&state);
            self.observers.register(query, observer, initial)
        };

        debug!(subscription = %id, ?query, "subscribed");
        self.observers.dispatch(vec![initial]);
        Subscription::new(id, &self.observers)
    }

    /// Observe a record listing
    pub fn subscribe_records<F>(&self, scope: RecordScope, observer: F) -> Subscription
    where
        F: Fn(&[Record]) + Send + Sync + 'static,
    {
        self.subscribe(LiveQuery::Records(scope), move |result| {
            if let Some(records) = result.as_records() {
                observer(records);
            }
        })
    }

    /// Observe the territory listing
    pub fn subscribe_territories<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&[Territory]) + Send + Sync + 'static,
    {
        self.subscribe(LiveQuery::Territories, move |result| {
            if let Some(territories) = result.as_territories() {
                observer(territories);
            }
        })
    }

    /// Observe the sectioned doors of a record
    pub fn subscribe_door_sections<F>(&self, record: RecordId, observer: F) -> Subscription
    where
        F: Fn(&DoorGrouping) + Send + Sync + 'static,
    {
        self.subscribe(LiveQuery::DoorSections(record), move |result| {
            if let Some(grouping) = result.as_door_sections() {
                observer(grouping);
            }
        })
    }

    /// Stop a detached subscription
    ///
    /// Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.observers.remove(id)
    }

    /// Number of registered subscriptions
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.observers.len()
    }

    // ==================================================================
    // Commit machinery
    // ==================================================================

    /// Apply a change that always modifies the dataset
    fn mutate<T>(
        &self,
        apply: impl FnOnce(&mut Dataset, DateTime<Utc>) -> StoreResult<T>,
    ) -> StoreResult<T> {
        self.transact(|ds, now| apply(ds, now).map(|out| (out, true)))
    }

    /// Apply a change where `None` means nothing was touched
    fn mutate_if<T>(
        &self,
        apply: impl FnOnce(&mut Dataset, DateTime<Utc>) -> StoreResult<Option<T>>,
    ) -> StoreResult<Option<T>> {
        self.transact(|ds, now| {
            apply(ds, now).map(|out| {
                let changed = out.is_some();
                (out, changed)
            })
        })
    }

    /// Stage, apply, commit, swap, notify
    ///
    /// `apply` reports whether it changed the staged copy; unchanged copies
    /// are neither committed nor observed.
    fn transact<T>(
        &self,
        apply: impl FnOnce(&mut Dataset, DateTime<Utc>) -> StoreResult<(T, bool)>,
    ) -> StoreResult<T> {
        let (out, deliveries) = {
            let mut state = self.state.lock();
            let mut staged = state.clone();

            let (out, changed) = apply(&mut staged, Utc::now())?;
            if !changed {
                return Ok(out);
            }

            if let Err(e) = self.backend.commit(&staged) {
                warn!(backend = self.backend.name(), error = %e, "commit failed, state unchanged");
                return Err(e.into());
            }

            *state = staged;
            let deliveries = self.observers.pending(&state);
            (out, deliveries)
        };

        self.observers.dispatch(deliveries);
        Ok(out)
    }
}

impl Default for CanvassStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

fn ensure_territory(ds: &Dataset, territory: Option<TerritoryId>) -> StoreResult<()> {
    match territory {
        Some(id) if ds.territory(id).is_none() => {
            Err(StoreError::not_found(EntityKind::Territory, id))
        }
        _ => Ok(()),
    }
}

fn log_dropped_apartment(fields: &RecordFields) {
    if fields.drops_apartment_number() {
        debug!(
            record_type = %fields.record_type,
            "apartment number ignored for non-apartment record"
        );
    }
}
