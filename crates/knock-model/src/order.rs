//! Listing orders
//!
//! All sorts are stable so entities that compare equal keep their insertion
//! order.

use crate::entity::{Door, Record, Territory, Visit};
use std::cmp::Ordering;

/// Natural (alphanumeric) comparison for door labels
///
/// Runs of ASCII digits compare by numeric value, everything else compares
/// by character, so `"2" < "10"` and `"4A" < "4B" < "12"`. Labels that only
/// differ in leading zeros fall back to plain string order, which keeps the
/// ordering total.
#[must_use]
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = Chunks::new(a);
    let mut right = Chunks::new(b);

    loop {
        match (left.next(), right.next()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) => match compare_chunks(l, r) {
                Ordering::Equal => {}
                ord => return ord,
            },
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Chunk<'a> {
    Digits(&'a str),
    Text(&'a str),
}

/// Splits a label into alternating digit and non-digit runs
struct Chunks<'a> {
    rest: &'a str,
}

impl<'a> Chunks<'a> {
    fn new(s: &'a str) -> Self {
        Self { rest: s }
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = Chunk<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let first = self.rest.chars().next()?;
        let digits = first.is_ascii_digit();
        let end = self
            .rest
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit() != digits)
            .map_or(self.rest.len(), |(i, _)| i);

        let (head, tail) = self.rest.split_at(end);
        self.rest = tail;
        Some(if digits {
            Chunk::Digits(head)
        } else {
            Chunk::Text(head)
        })
    }
}

fn compare_chunks(l: Chunk<'_>, r: Chunk<'_>) -> Ordering {
    match (l, r) {
        (Chunk::Digits(l), Chunk::Digits(r)) => {
            let l = l.trim_start_matches('0');
            let r = r.trim_start_matches('0');
            l.len().cmp(&r.len()).then_with(|| l.cmp(r))
        }
        (Chunk::Digits(_), Chunk::Text(_)) => Ordering::Less,
        (Chunk::Text(_), Chunk::Digits(_)) => Ordering::Greater,
        (Chunk::Text(l), Chunk::Text(r)) => l.cmp(r),
    }
}

/// Sort records by street name
pub fn sort_records(records: &mut [Record]) {
    records.sort_by(|a, b| a.street_name.cmp(&b.street_name));
}

/// Sort doors by label in natural order
pub fn sort_doors(doors: &mut [Door]) {
    doors.sort_by(|a, b| natural_cmp(&a.number, &b.number));
}

/// Sort territories by name
pub fn sort_territories(territories: &mut [Territory]) {
    territories.sort_by(|a, b| a.name.cmp(&b.name));
}

/// Sort visits oldest first
pub fn sort_visits(visits: &mut [Visit]) {
    visits.sort_by_key(|v| v.timestamp);
}
