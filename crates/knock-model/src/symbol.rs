//! Record types and visit symbols
//!
//! [`VisitSymbol`] classifies the outcome of a visit and doubles as the
//! section key on the doors screen. [`RecordType`] classifies an address.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a visit
///
/// Raw codes are stable and match the stored representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisitSymbol {
    /// Nobody answered
    NotAtHome,
    /// Someone answered but could not talk
    Busy,
    /// Householder asked for a return visit
    CallAgain,
    /// Householder declined
    NotInterested,
    /// Anything else
    Other,
}

impl VisitSymbol {
    /// Fixed section order for grouped door listings
    pub const ALL: [VisitSymbol; 5] = [
        VisitSymbol::NotAtHome,
        VisitSymbol::Busy,
        VisitSymbol::CallAgain,
        VisitSymbol::NotInterested,
        VisitSymbol::Other,
    ];

    /// Stored raw code
    #[inline]
    #[must_use]
    pub fn code(self) -> i16 {
        match self {
            VisitSymbol::NotAtHome => 0,
            VisitSymbol::Busy => 1,
            VisitSymbol::CallAgain => 2,
            VisitSymbol::NotInterested => 3,
            VisitSymbol::Other => 4,
        }
    }

    /// Position of this symbol within [`VisitSymbol::ALL`]
    #[inline]
    #[must_use]
    pub fn section_index(self) -> usize {
        // codes are assigned in section order
        self.code() as usize
    }

    /// Section header text
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            VisitSymbol::NotAtHome => "Not-at-Homes",
            VisitSymbol::Busy => "Busy",
            VisitSymbol::CallAgain => "Call Again",
            VisitSymbol::NotInterested => "Not Interested",
            VisitSymbol::Other => "Other",
        }
    }
}

impl fmt::Display for VisitSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Raw code outside the known symbol range
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown visit symbol code: {0}")]
pub struct UnknownSymbolCode(pub i16);

impl TryFrom<i16> for VisitSymbol {
    type Error = UnknownSymbolCode;

    fn try_from(code: i16) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(VisitSymbol::NotAtHome),
            1 => Ok(VisitSymbol::Busy),
            2 => Ok(VisitSymbol::CallAgain),
            3 => Ok(VisitSymbol::NotInterested),
            4 => Ok(VisitSymbol::Other),
            other => Err(UnknownSymbolCode(other)),
        }
    }
}

/// Kind of address a record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    /// Single-family house
    #[default]
    House,
    /// Apartment building; doors are units
    Apartment,
    /// Business premises
    Business,
    /// Anything else
    Other,
}

impl RecordType {
    /// Short tag shown next to a record
    #[must_use]
    pub fn abbreviation(self) -> &'static str {
        match self {
            RecordType::House => "HSE",
            RecordType::Apartment => "APT",
            RecordType::Business => "BUS",
            RecordType::Other => "OTH",
        }
    }

    /// Human-readable name
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            RecordType::House => "House",
            RecordType::Apartment => "Apartment",
            RecordType::Business => "Business",
            RecordType::Other => "Other",
        }
    }

    /// Whether records of this type carry an apartment number
    #[inline]
    #[must_use]
    pub fn has_apartment_number(self) -> bool {
        matches!(self, RecordType::Apartment)
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
