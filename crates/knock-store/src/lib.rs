//! Knock-Knock Store
//!
//! Single-writer store for canvassing data:
//! - Validated create/update/delete of territories, records, doors and visits
//! - Cascading deletes (record -> doors -> visits) and territory unassignment
//! - Sorted listings and latest-visit door sections
//! - Live queries re-delivered after every commit that changes them
//! - All-or-nothing commits through a pluggable [`StorageBackend`]
//!
//! # Example
//!
//! ```rust
//! use knock_store::{CanvassStore, RecordScope};
//! use knock_model::{RecordFields, VisitSymbol};
//!
//! # fn main() -> Result<(), knock_store::StoreError> {
//! let store = CanvassStore::in_memory();
//! let territory = store.create_territory("D2D-50")?;
//! let record = store.create_record(RecordFields::new("123 Main St").in_territory(territory.id))?;
//! let door = store.create_door(record.id, "4B")?;
//! store.record_visit(door.id, VisitSymbol::Busy)?;
//!
//! assert_eq!(store.list_records(RecordScope::Territory(territory.id)).len(), 1);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

pub mod backend;
pub mod config;
pub mod dataset;
pub mod error;
pub mod observe;
pub mod query;
pub mod store;
pub mod telemetry;

// Re-exports for convenience
pub use backend::{JsonFileBackend, MemoryBackend, StorageBackend};
pub use config::{LoggingConfig, StorageConfig, StoreConfig};
pub use dataset::{Dataset, DatasetDocument, StoreStats, FORMAT_VERSION};
pub use error::{ConfigError, EntityKind, PersistenceError, StoreError};
pub use observe::{Observer, Subscription, SubscriptionId};
pub use query::{LiveQuery, QueryResult, RecordScope};
pub use store::{CanvassStore, StoreResult};
pub use telemetry::init_tracing;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the store
    pub use crate::{
        CanvassStore, LiveQuery, QueryResult, RecordScope, StoreConfig, StoreError, Subscription,
    };
    pub use knock_model::prelude::*;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
