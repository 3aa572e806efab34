//! Canvassing entities
//!
//! Ownership is strictly hierarchical:
//! Territory (0..1) -> Record -> Door -> Visit.
//! Entities only hold the id of their parent; the store owns the tables.

use crate::ids::{DoorId, RecordId, TerritoryId, VisitId};
use crate::symbol::{RecordType, VisitSymbol};
use crate::validation::{optional, required, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Named grouping of records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Territory {
    /// Identifier
    pub id: TerritoryId,
    /// Display name
    pub name: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl Territory {
    /// Create a territory with a validated name
    ///
    /// # Errors
    /// Returns [`ValidationError::EmptyField`] for a blank name.
    pub fn create(name: &str, at: DateTime<Utc>) -> Result<Self, ValidationError> {
        Ok(Self {
            id: TerritoryId::new(),
            name: required("name", name)?,
            created_at: at,
            updated_at: at,
        })
    }

    /// Rename in place
    ///
    /// # Errors
    /// Returns [`ValidationError::EmptyField`] for a blank name; `self` is
    /// left untouched in that case.
    pub fn rename(&mut self, name: &str, at: DateTime<Utc>) -> Result<(), ValidationError> {
        self.name = required("name", name)?;
        self.updated_at = at;
        Ok(())
    }
}

/// Editable fields of a [`Record`]
///
/// Used both for creation and for full updates.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RecordFields {
    /// Street address line
    pub street_name: String,
    /// City, may be empty
    pub city: String,
    /// State or region, may be empty
    pub state: String,
    /// Unit number; only kept for apartments
    pub apartment_number: Option<String>,
    /// Kind of address
    pub record_type: RecordType,
    /// Owning territory, `None` for unassigned
    pub territory: Option<TerritoryId>,
}

impl RecordFields {
    /// Fields for an unassigned house at `street_name`
    #[inline]
    #[must_use]
    pub fn new(street_name: impl Into<String>) -> Self {
        Self {
            street_name: street_name.into(),
            ..Self::default()
        }
    }

    /// With city
    #[inline]
    #[must_use]
    pub fn with_city(mut self, city: impl Into<String>) -> Self {
        self.city = city.into();
        self
    }

    /// With state
    #[inline]
    #[must_use]
    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = state.into();
        self
    }

    /// With record type
    #[inline]
    #[must_use]
    pub fn with_type(mut self, record_type: RecordType) -> Self {
        self.record_type = record_type;
        self
    }

    /// With apartment number
    #[inline]
    #[must_use]
    pub fn with_apartment_number(mut self, number: impl Into<String>) -> Self {
        self.apartment_number = Some(number.into());
        self
    }

    /// Assigned to a territory
    #[inline]
    #[must_use]
    pub fn in_territory(mut self, territory: TerritoryId) -> Self {
        self.territory = Some(territory);
        self
    }

    /// Whether normalisation will discard the apartment number
    #[inline]
    #[must_use]
    pub fn drops_apartment_number(&self) -> bool {
        self.apartment_number.is_some() && !self.record_type.has_apartment_number()
    }

    /// Trim every field and enforce the record invariants
    ///
    /// The apartment number is cleared unless the type is
    /// [`RecordType::Apartment`].
    ///
    /// # Errors
    /// Returns [`ValidationError::EmptyField`] for a blank street name.
    pub fn normalized(self) -> Result<Self, ValidationError> {
        let apartment_number = if self.record_type.has_apartment_number() {
            optional(self.apartment_number.as_deref())
        } else {
            None
        };

        Ok(Self {
            street_name: required("street_name", &self.street_name)?,
            city: self.city.trim().to_string(),
            state: self.state.trim().to_string(),
            apartment_number,
            record_type: self.record_type,
            territory: self.territory,
        })
    }
}

/// Address entry; the unit of canvassing assignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Identifier
    pub id: RecordId,
    /// Owning territory, `None` for unassigned
    pub territory: Option<TerritoryId>,
    /// Street address line
    pub street_name: String,
    /// City
    pub city: String,
    /// State or region
    pub state: String,
    /// Unit number for apartments
    pub apartment_number: Option<String>,
    /// Kind of address
    pub record_type: RecordType,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl Record {
    /// Create a record from validated fields
    ///
    /// # Errors
    /// Returns [`ValidationError`] when the fields do not normalise.
    pub fn create(fields: RecordFields, at: DateTime<Utc>) -> Result<Self, ValidationError> {
        let fields = fields.normalized()?;
        Ok(Self {
            id: RecordId::new(),
            territory: fields.territory,
            street_name: fields.street_name,
            city: fields.city,
            state: fields.state,
            apartment_number: fields.apartment_number,
            record_type: fields.record_type,
            created_at: at,
            updated_at: at,
        })
    }

    /// Replace every editable field
    ///
    /// # Errors
    /// Returns [`ValidationError`] when the fields do not normalise; `self`
    /// is left untouched in that case.
    pub fn apply(&mut self, fields: RecordFields, at: DateTime<Utc>) -> Result<(), ValidationError> {
        let fields = fields.normalized()?;
        self.territory = fields.territory;
        self.street_name = fields.street_name;
        self.city = fields.city;
        self.state = fields.state;
        self.apartment_number = fields.apartment_number;
        self.record_type = fields.record_type;
        self.updated_at = at;
        Ok(())
    }

    /// Move to another territory, or to unassigned
    pub fn assign(&mut self, territory: Option<TerritoryId>, at: DateTime<Utc>) {
        self.territory = territory;
        self.updated_at = at;
    }

    /// Current editable fields
    #[must_use]
    pub fn fields(&self) -> RecordFields {
        RecordFields {
            street_name: self.street_name.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            apartment_number: self.apartment_number.clone(),
            record_type: self.record_type,
            territory: self.territory,
        }
    }

    /// Whether the record belongs to no territory
    #[inline]
    #[must_use]
    pub fn is_unassigned(&self) -> bool {
        self.territory.is_none()
    }
}

/// Physical door at a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Door {
    /// Identifier
    pub id: DoorId,
    /// Owning record
    pub record: RecordId,
    /// Door label, e.g. a unit number
    pub number: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl Door {
    /// Create a door with a validated label
    ///
    /// # Errors
    /// Returns [`ValidationError::EmptyField`] for a blank number.
    pub fn create(record: RecordId, number: &str, at: DateTime<Utc>) -> Result<Self, ValidationError> {
        Ok(Self {
            id: DoorId::new(),
            record,
            number: required("number", number)?,
            created_at: at,
            updated_at: at,
        })
    }

    /// Relabel in place
    ///
    /// # Errors
    /// Returns [`ValidationError::EmptyField`] for a blank number.
    pub fn renumber(&mut self, number: &str, at: DateTime<Utc>) -> Result<(), ValidationError> {
        self.number = required("number", number)?;
        self.updated_at = at;
        Ok(())
    }
}

/// Logged outcome for a door
///
/// Visits are append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visit {
    /// Identifier
    pub id: VisitId,
    /// Visited door
    pub door: DoorId,
    /// Outcome
    pub symbol: VisitSymbol,
    /// When the visit happened
    pub timestamp: DateTime<Utc>,
}

impl Visit {
    /// New visit for `door`
    #[inline]
    #[must_use]
    pub fn new(door: DoorId, symbol: VisitSymbol, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: VisitId::new(),
            door,
            symbol,
            timestamp,
        }
    }
}
