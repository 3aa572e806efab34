//! Query descriptions
//!
//! A [`LiveQuery`] names one of the listings the store can produce; the
//! observation layer re-runs it after every commit.

use crate::dataset::Dataset;
use knock_model::{Door, DoorGrouping, DoorId, Record, RecordId, Territory, TerritoryId, Visit};

/// Territory filter of a record listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordScope {
    /// Records assigned to this territory
    Territory(TerritoryId),
    /// Records with no territory
    Unassigned,
}

impl RecordScope {
    /// Whether `record` falls inside this scope
    #[inline]
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            RecordScope::Territory(id) => record.territory == Some(*id),
            RecordScope::Unassigned => record.territory.is_none(),
        }
    }
}

impl From<Option<TerritoryId>> for RecordScope {
    fn from(territory: Option<TerritoryId>) -> Self {
        territory.map_or(RecordScope::Unassigned, RecordScope::Territory)
    }
}

/// Observable listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiveQuery {
    /// All territories by name
    Territories,
    /// Records of a scope by street name
    Records(RecordScope),
    /// Doors of a record in natural order
    Doors(RecordId),
    /// Doors of a record sectioned by latest visit
    DoorSections(RecordId),
    /// Visits of a door, oldest first
    Visits(DoorId),
}

impl LiveQuery {
    /// Run against a dataset
    #[must_use]
    pub fn evaluate(&self, dataset: &Dataset) -> QueryResult {
        match *self {
            LiveQuery::Territories => QueryResult::Territories(dataset.list_territories()),
            LiveQuery::Records(scope) => QueryResult::Records(dataset.list_records(scope)),
            LiveQuery::Doors(record) => QueryResult::Doors(dataset.list_doors(record)),
            LiveQuery::DoorSections(record) => {
                QueryResult::DoorSections(dataset.door_sections(record))
            }
            LiveQuery::Visits(door) => QueryResult::Visits(dataset.list_visits(door)),
        }
    }
}

/// Full ordered result of a [`LiveQuery`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryResult {
    /// Result of [`LiveQuery::Territories`]
    Territories(Vec<Territory>),
    /// Result of [`LiveQuery::Records`]
    Records(Vec<Record>),
    /// Result of [`LiveQuery::Doors`]
    Doors(Vec<Door>),
    /// Result of [`LiveQuery::DoorSections`]
    DoorSections(DoorGrouping),
    /// Result of [`LiveQuery::Visits`]
    Visits(Vec<Visit>),
}

impl QueryResult {
    /// Territories, if this is a territory listing
    #[must_use]
    pub fn as_territories(&self) -> Option<&[Territory]> {
        match self {
            QueryResult::Territories(v) => Some(v),
            _ => None,
        }
    }

    /// Records, if this is a record listing
    #[must_use]
    pub fn as_records(&self) -> Option<&[Record]> {
        match self {
            QueryResult::Records(v) => Some(v),
            _ => None,
        }
    }

    /// Doors, if this is a door listing
    #[must_use]
    pub fn as_doors(&self) -> Option<&[Door]> {
        match self {
            QueryResult::Doors(v) => Some(v),
            _ => None,
        }
    }

    /// Sections, if this is a sectioned door listing
    #[must_use]
    pub fn as_door_sections(&self) -> Option<&DoorGrouping> {
        match self {
            QueryResult::DoorSections(g) => Some(g),
            _ => None,
        }
    }

    /// Visits, if this is a visit listing
    #[must_use]
    pub fn as_visits(&self) -> Option<&[Visit]> {
        match self {
            QueryResult::Visits(v) => Some(v),
            _ => None,
        }
    }

    /// Number of rows (doors for sectioned listings)
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            QueryResult::Territories(v) => v.len(),
            QueryResult::Records(v) => v.len(),
            QueryResult::Doors(v) => v.len(),
            QueryResult::DoorSections(g) => g.door_count(),
            QueryResult::Visits(v) => v.len(),
        }
    }

    /// Whether the result has no rows
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use knock_model::RecordFields;

    #[test]
    fn scope_from_option() {
        let id = TerritoryId::new();
        assert_eq!(RecordScope::from(Some(id)), RecordScope::Territory(id));
        assert_eq!(RecordScope::from(None), RecordScope::Unassigned);
    }

    #[test]
    fn scope_matches() {
        let id = TerritoryId::new();
        let assigned = Record::create(RecordFields::new("1 Oak").in_territory(id), Utc::now())
            .unwrap();
        let loose = Record::create(RecordFields::new("2 Oak"), Utc::now()).unwrap();

        assert!(RecordScope::Territory(id).matches(&assigned));
        assert!(!RecordScope::Territory(id).matches(&loose));
        assert!(RecordScope::Unassigned.matches(&loose));
        assert!(!RecordScope::Unassigned.matches(&assigned));
    }

    #[test]
    fn unknown_ids_evaluate_empty() {
        let ds = Dataset::new();
        assert!(LiveQuery::Doors(RecordId::new()).evaluate(&ds).is_empty());
        assert!(LiveQuery::Visits(DoorId::new()).evaluate(&ds).is_empty());

        let sections = LiveQuery::DoorSections(RecordId::new()).evaluate(&ds);
        assert_eq!(sections.as_door_sections().unwrap().sections.len(), 5);
        assert!(sections.is_empty());
    }

    #[test]
    fn accessors_match_variant() {
        let result = LiveQuery::Territories.evaluate(&Dataset::new());
        assert!(result.as_territories().is_some());
        assert!(result.as_records().is_none());
    }
}
