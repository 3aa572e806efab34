//! In-memory tables and their serialized form
//!
//! Tables are insertion-ordered; insertion order breaks ties in every
//! listing, so it is preserved across persistence round-trips.

use crate::error::{EntityKind, PersistenceError};
use crate::query::RecordScope;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use knock_model::{
    group_by_latest_visit, latest_visit, sort_doors, sort_records, sort_territories, sort_visits,
    Door, DoorGrouping, DoorId, Record, RecordId, Territory, TerritoryId, Visit, VisitId,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Current on-disk format version
pub const FORMAT_VERSION: u32 = 1;

/// All four tables
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    pub(crate) territories: IndexMap<TerritoryId, Territory>,
    pub(crate) records: IndexMap<RecordId, Record>,
    pub(crate) doors: IndexMap<DoorId, Door>,
    pub(crate) visits: IndexMap<VisitId, Visit>,
}

/// Entity counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    /// Number of territories
    pub territories: usize,
    /// Number of records
    pub records: usize,
    /// Number of doors
    pub doors: usize,
    /// Number of visits
    pub visits: usize,
}

/// What a cascading delete removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Removed {
    pub(crate) records: usize,
    pub(crate) doors: usize,
    pub(crate) visits: usize,
}

impl Dataset {
    /// Empty dataset
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Entity counts
    #[must_use]
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            territories: self.territories.len(),
            records: self.records.len(),
            doors: self.doors.len(),
            visits: self.visits.len(),
        }
    }

    /// Whether every table is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.territories.is_empty()
            && self.records.is_empty()
            && self.doors.is_empty()
            && self.visits.is_empty()
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub(crate) fn territory(&self, id: TerritoryId) -> Option<&Territory> {
        self.territories.get(&id)
    }

    pub(crate) fn record(&self, id: RecordId) -> Option<&Record> {
        self.records.get(&id)
    }

    pub(crate) fn door(&self, id: DoorId) -> Option<&Door> {
        self.doors.get(&id)
    }

    pub(crate) fn visit(&self, id: VisitId) -> Option<&Visit> {
        self.visits.get(&id)
    }

    pub(crate) fn list_territories(&self) -> Vec<Territory> {
        let mut territories: Vec<Territory> = self.territories.values().cloned().collect();
        sort_territories(&mut territories);
        territories
    }

    pub(crate) fn list_records(&self, scope: RecordScope) -> Vec<Record> {
        let mut records: Vec<Record> = self
            .records
            .values()
            .filter(|r| scope.matches(r))
            .cloned()
            .collect();
        sort_records(&mut records);
        records
    }

    pub(crate) fn list_doors(&self, record: RecordId) -> Vec<Door> {
        let mut doors: Vec<Door> = self
            .doors
            .values()
            .filter(|d| d.record == record)
            .cloned()
            .collect();
        sort_doors(&mut doors);
        doors
    }

    pub(crate) fn list_visits(&self, door: DoorId) -> Vec<Visit> {
        let mut visits: Vec<Visit> = self.visits_of(door).cloned().collect();
        sort_visits(&mut visits);
        visits
    }

    pub(crate) fn latest_visit(&self, door: DoorId) -> Option<Visit> {
        latest_visit(self.visits_of(door)).cloned()
    }

    pub(crate) fn record_count(&self, territory: TerritoryId) -> usize {
        self.records
            .values()
            .filter(|r| r.territory == Some(territory))
            .count()
    }

    pub(crate) fn group_doors(&self, doors: &[Door]) -> DoorGrouping {
        let wanted: HashSet<DoorId> = doors.iter().map(|d| d.id).collect();
        let visits: Vec<Visit> = self
            .visits
            .values()
            .filter(|v| wanted.contains(&v.door))
            .cloned()
            .collect();
        group_by_latest_visit(doors, &visits)
    }

    pub(crate) fn door_sections(&self, record: RecordId) -> DoorGrouping {
        let doors = self.list_doors(record);
        self.group_doors(&doors)
    }

    fn visits_of(&self, door: DoorId) -> impl Iterator<Item = &Visit> {
        self.visits.values().filter(move |v| v.door == door)
    }

    // ------------------------------------------------------------------
    // Removals
    // ------------------------------------------------------------------

    /// Remove a territory; its records become unassigned
    pub(crate) fn remove_territory(&mut self, id: TerritoryId, at: DateTime<Utc>) -> Option<Removed> {
        self.territories.shift_remove(&id)?;

        let mut orphaned = 0;
        for record in self.records.values_mut() {
            if record.territory == Some(id) {
                record.assign(None, at);
                orphaned += 1;
            }
        }

        Some(Removed {
            records: orphaned,
            ..Removed::default()
        })
    }

    /// Remove a record with its doors and their visits
    pub(crate) fn remove_record(&mut self, id: RecordId) -> Option<Removed> {
        self.records.shift_remove(&id)?;

        let doomed: Vec<DoorId> = self
            .doors
            .values()
            .filter(|d| d.record == id)
            .map(|d| d.id)
            .collect();

        let visits_before = self.visits.len();
        self.visits.retain(|_, v| !doomed.contains(&v.door));
        self.doors.retain(|_, d| d.record != id);

        Some(Removed {
            records: 1,
            doors: doomed.len(),
            visits: visits_before - self.visits.len(),
        })
    }

    /// Remove a door with its visits
    pub(crate) fn remove_door(&mut self, id: DoorId) -> Option<Removed> {
        self.doors.shift_remove(&id)?;

        let visits_before = self.visits.len();
        self.visits.retain(|_, v| v.door != id);

        Some(Removed {
            doors: 1,
            visits: visits_before - self.visits.len(),
            ..Removed::default()
        })
    }

    // ------------------------------------------------------------------
    // Serialized form
    // ------------------------------------------------------------------

    /// Serializable snapshot in table insertion order
    #[must_use]
    pub fn to_document(&self) -> DatasetDocument {
        DatasetDocument {
            format_version: FORMAT_VERSION,
            territories: self.territories.values().cloned().collect(),
            records: self.records.values().cloned().collect(),
            doors: self.doors.values().cloned().collect(),
            visits: self.visits.values().cloned().collect(),
        }
    }

    /// Rebuild tables from a snapshot
    ///
    /// # Errors
    /// - [`PersistenceError::UnsupportedVersion`] for a foreign format version
    /// - [`PersistenceError::DanglingReference`] if a record, door or visit
    ///   points at a parent missing from the snapshot
    pub fn from_document(doc: DatasetDocument) -> Result<Self, PersistenceError> {
        if doc.format_version != FORMAT_VERSION {
            return Err(PersistenceError::UnsupportedVersion {
                found: doc.format_version,
                expected: FORMAT_VERSION,
            });
        }

        let dataset = Self {
            territories: doc.territories.into_iter().map(|t| (t.id, t)).collect(),
            records: doc.records.into_iter().map(|r| (r.id, r)).collect(),
            doors: doc.doors.into_iter().map(|d| (d.id, d)).collect(),
            visits: doc.visits.into_iter().map(|v| (v.id, v)).collect(),
        };
        dataset.check_references()?;
        Ok(dataset)
    }

    /// Every child must point at a stored parent
    fn check_references(&self) -> Result<(), PersistenceError> {
        for record in self.records.values() {
            if let Some(territory) = record.territory {
                if !self.territories.contains_key(&territory) {
                    return Err(PersistenceError::dangling(
                        EntityKind::Record,
                        record.id,
                        EntityKind::Territory,
                        territory,
                    ));
                }
            }
        }
        for door in self.doors.values() {
            if !self.records.contains_key(&door.record) {
                return Err(PersistenceError::dangling(
                    EntityKind::Door,
                    door.id,
                    EntityKind::Record,
                    door.record,
                ));
            }
        }
        for visit in self.visits.values() {
            if !self.doors.contains_key(&visit.door) {
                return Err(PersistenceError::dangling(
                    EntityKind::Visit,
                    visit.id,
                    EntityKind::Door,
                    visit.door,
                ));
            }
        }
        Ok(())
    }
}

/// On-disk representation of a [`Dataset`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetDocument {
    /// Format version, see [`FORMAT_VERSION`]
    pub format_version: u32,
    /// Territories in insertion order
    #[serde(default)]
    pub territories: Vec<Territory>,
    /// Records in insertion order
    #[serde(default)]
    pub records: Vec<Record>,
    /// Doors in insertion order
    #[serde(default)]
    pub doors: Vec<Door>,
    /// Visits in insertion order
    #[serde(default)]
    pub visits: Vec<Visit>,
}
