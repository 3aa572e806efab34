//! Knock-Knock Model
//!
//! Typed entities for door-to-door canvassing.
//!
//! # Overview
//!
//! - **Territory**: named grouping of records
//! - **Record**: an address, optionally assigned to one territory
//! - **Door**: a visitable entry point at a record
//! - **Visit**: a timestamped outcome logged against a door
//!
//! The crate also provides the orderings the listings rely on
//! ([`natural_cmp`] for door labels) and the pure
//! [`group_by_latest_visit`] sectioning used by the doors screen.
//!
//! # Example
//!
//! ```rust
//! use knock_model::{natural_cmp, VisitSymbol};
//! use std::cmp::Ordering;
//!
//! assert_eq!(natural_cmp("2", "10"), Ordering::Less);
//! assert_eq!(VisitSymbol::ALL[0], VisitSymbol::NotAtHome);
//! ```

#![warn(missing_docs)]

pub mod entity;
pub mod grouping;
pub mod ids;
pub mod order;
pub mod symbol;
pub mod validation;

// Re-exports
pub use entity::{Door, Record, RecordFields, Territory, Visit};
pub use grouping::{group_by_latest_visit, latest_visit, DoorGrouping, DoorSection};
pub use ids::{DoorId, RecordId, TerritoryId, VisitId};
pub use order::{natural_cmp, sort_doors, sort_records, sort_territories, sort_visits};
pub use symbol::{RecordType, UnknownSymbolCode, VisitSymbol};
pub use validation::ValidationError;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the canvassing model
    pub use crate::{
        Door, DoorGrouping, DoorId, Record, RecordFields, RecordId, RecordType, Territory,
        TerritoryId, Visit, VisitId, VisitSymbol,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
