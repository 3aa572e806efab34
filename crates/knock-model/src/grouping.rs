//! Door sectioning by latest visit
//!
//! The doors screen shows one section per [`VisitSymbol`], in the fixed
//! [`VisitSymbol::ALL`] order, plus the doors that were never visited.

use crate::entity::{Door, Visit};
use crate::ids::DoorId;
use crate::symbol::VisitSymbol;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Latest visit of a sequence
///
/// Greatest timestamp wins; on a tie the visit that comes last wins, so
/// pass visits in insertion order.
#[must_use]
pub fn latest_visit<'a, I>(visits: I) -> Option<&'a Visit>
where
    I: IntoIterator<Item = &'a Visit>,
{
    visits.into_iter().fold(None, |best, visit| match best {
        Some(current) if current.timestamp > visit.timestamp => Some(current),
        _ => Some(visit),
    })
}

/// Doors sharing one latest-visit symbol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoorSection {
    /// Section key
    pub symbol: VisitSymbol,
    /// Doors in input order
    pub doors: Vec<Door>,
}

/// Doors split into visit-symbol sections
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoorGrouping {
    /// Exactly one section per symbol, in [`VisitSymbol::ALL`] order
    pub sections: Vec<DoorSection>,
    /// Doors without any visit
    pub ungrouped: Vec<Door>,
}

impl DoorGrouping {
    /// Five empty sections and no ungrouped doors
    #[must_use]
    pub fn empty() -> Self {
        Self {
            sections: VisitSymbol::ALL
                .iter()
                .map(|&symbol| DoorSection {
                    symbol,
                    doors: Vec::new(),
                })
                .collect(),
            ungrouped: Vec::new(),
        }
    }

    /// Doors whose latest visit carries `symbol`
    ///
    /// Empty when the grouping has no section for `symbol`.
    #[must_use]
    pub fn section(&self, symbol: VisitSymbol) -> &[Door] {
        self.sections
            .iter()
            .find(|section| section.symbol == symbol)
            .map(|section| section.doors.as_slice())
            .unwrap_or_default()
    }

    /// Section a door landed in; `None` for ungrouped or unknown doors
    #[must_use]
    pub fn symbol_of(&self, door: DoorId) -> Option<VisitSymbol> {
        self.sections
            .iter()
            .find(|section| section.doors.iter().any(|d| d.id == door))
            .map(|section| section.symbol)
    }

    /// Total number of doors across sections and the ungrouped bucket
    #[must_use]
    pub fn door_count(&self) -> usize {
        self.ungrouped.len() + self.sections.iter().map(|s| s.doors.len()).sum::<usize>()
    }
}

impl Default for DoorGrouping {
    fn default() -> Self {
        Self::empty()
    }
}

/// Group `doors` by the symbol of their latest visit
///
/// `visits` may contain visits of other doors; they are ignored. Within each
/// bucket the order of `doors` is preserved.
#[must_use]
pub fn group_by_latest_visit(doors: &[Door], visits: &[Visit]) -> DoorGrouping {
    let mut latest: HashMap<DoorId, &Visit> = HashMap::with_capacity(doors.len());
    for visit in visits {
        match latest.get(&visit.door) {
            Some(current) if current.timestamp > visit.timestamp => {}
            _ => {
                latest.insert(visit.door, visit);
            }
        }
    }

    let mut grouping = DoorGrouping::empty();
    for door in doors {
        match latest.get(&door.id) {
            Some(visit) => grouping.sections[visit.symbol.section_index()]
                .doors
                .push(door.clone()),
            None => grouping.ungrouped.push(door.clone()),
        }
    }
    grouping
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::RecordId;
    use chrono::{DateTime, Utc};

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn door(record: RecordId, number: &str) -> Door {
        Door::create(record, number, at(0)).unwrap()
    }

    #[test]
    fn empty_grouping_has_five_sections() {
        let grouping = DoorGrouping::empty();
        let symbols: Vec<_> = grouping.sections.iter().map(|s| s.symbol).collect();
        assert_eq!(symbols, VisitSymbol::ALL.to_vec());
        assert_eq!(grouping.door_count(), 0);
    }

    #[test]
    fn latest_visit_wins() {
        let record = RecordId::new();
        let d = door(record, "4B");
        let visits = vec![
            Visit::new(d.id, VisitSymbol::Busy, at(1)),
            Visit::new(d.id, VisitSymbol::NotAtHome, at(2)),
        ];

        let grouping = group_by_latest_visit(std::slice::from_ref(&d), &visits);
        assert_eq!(grouping.section(VisitSymbol::NotAtHome), &[d.clone()]);
        assert!(grouping.section(VisitSymbol::Busy).is_empty());
        assert_eq!(grouping.symbol_of(d.id), Some(VisitSymbol::NotAtHome));
    }

    #[test]
    fn out_of_order_insertion_uses_timestamp() {
        let record = RecordId::new();
        let d = door(record, "1");
        let visits = vec![
            Visit::new(d.id, VisitSymbol::CallAgain, at(10)),
            Visit::new(d.id, VisitSymbol::Other, at(5)),
        ];

        let grouping = group_by_latest_visit(std::slice::from_ref(&d), &visits);
        assert_eq!(grouping.symbol_of(d.id), Some(VisitSymbol::CallAgain));
    }

    #[test]
    fn timestamp_tie_goes_to_last_inserted() {
        let record = RecordId::new();
        let d = door(record, "1");
        let visits = vec![
            Visit::new(d.id, VisitSymbol::Busy, at(3)),
            Visit::new(d.id, VisitSymbol::NotInterested, at(3)),
        ];

        assert_eq!(
            latest_visit(&visits).map(|v| v.symbol),
            Some(VisitSymbol::NotInterested)
        );
        let grouping = group_by_latest_visit(std::slice::from_ref(&d), &visits);
        assert_eq!(grouping.symbol_of(d.id), Some(VisitSymbol::NotInterested));
    }

    #[test]
    fn unvisited_doors_are_ungrouped_in_order() {
        let record = RecordId::new();
        let doors = vec![door(record, "1"), door(record, "2"), door(record, "3")];
        let visits = vec![Visit::new(doors[1].id, VisitSymbol::Busy, at(1))];

        let grouping = group_by_latest_visit(&doors, &visits);
        assert_eq!(grouping.ungrouped, vec![doors[0].clone(), doors[2].clone()]);
        assert_eq!(grouping.section(VisitSymbol::Busy), &[doors[1].clone()]);
        assert_eq!(grouping.door_count(), 3);
    }

    #[test]
    fn section_preserves_input_order() {
        let record = RecordId::new();
        let doors = vec![door(record, "10"), door(record, "2")];
        let visits = vec![
            Visit::new(doors[1].id, VisitSymbol::Other, at(1)),
            Visit::new(doors[0].id, VisitSymbol::Other, at(2)),
        ];

        let grouping = group_by_latest_visit(&doors, &visits);
        let labels: Vec<_> = grouping
            .section(VisitSymbol::Other)
            .iter()
            .map(|d| d.number.as_str())
            .collect();
        assert_eq!(labels, vec!["10", "2"]);
    }

    #[test]
    fn latest_visit_of_nothing() {
        assert!(latest_visit(std::iter::empty()).is_none());
    }

    #[test]
    fn section_lookup_tolerates_missing_sections() {
        let record = RecordId::new();
        let d = door(record, "7");
        let grouping = DoorGrouping {
            sections: vec![DoorSection {
                symbol: VisitSymbol::Other,
                doors: vec![d.clone()],
            }],
            ungrouped: Vec::new(),
        };

        assert!(grouping.section(VisitSymbol::NotAtHome).is_empty());
        assert_eq!(grouping.section(VisitSymbol::Other), &[d]);
    }
}
