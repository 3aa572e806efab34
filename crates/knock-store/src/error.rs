//! Error types for the canvassing store
//!
//! Provides error handling for:
//! - References to entities that do not exist
//! - Field validation failures
//! - Backend load/commit failures
//! - Configuration loading

use knock_model::ValidationError;
use std::fmt;
use std::path::PathBuf;

/// Main store error type
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Referenced entity does not exist
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Kind of the missing entity
        kind: EntityKind,
        /// Requested id
        id: String,
    },

    /// Input rejected before any state change
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Backend could not load or commit
    #[error("persistence failure: {0}")]
    Persistence(#[from] PersistenceError),

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl StoreError {
    /// Create not-found error
    #[inline]
    pub fn not_found(kind: EntityKind, id: impl fmt::Display) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Check if error is a missing reference
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if error is a validation failure
    #[inline]
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if error came from the backend
    #[inline]
    #[must_use]
    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }
}

/// Entity kinds, for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// Territory
    Territory,
    /// Record
    Record,
    /// Door
    Door,
    /// Visit
    Visit,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntityKind::Territory => "territory",
            EntityKind::Record => "record",
            EntityKind::Door => "door",
            EntityKind::Visit => "visit",
        })
    }
}

/// Backend errors
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// IO error on the backing file
    #[error("io error on {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Dataset could not be serialized
    #[error("encode failed: {0}")]
    Encode(String),

    /// Backing file is not a valid dataset
    #[error("decode failed for {path}: {message}")]
    Decode {
        /// File involved
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// Backing file was written by an incompatible format
    #[error("unsupported format version {found} (expected {expected})")]
    UnsupportedVersion {
        /// Version found in the file
        found: u32,
        /// Version this build reads
        expected: u32,
    },

    /// Backend refused the operation
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// Stored entity points at a parent that is not stored
    #[error("{kind} {id} references missing {parent} {parent_id}")]
    DanglingReference {
        /// Kind of the referencing entity
        kind: EntityKind,
        /// Referencing entity
        id: String,
        /// Kind of the missing parent
        parent: EntityKind,
        /// Missing parent id
        parent_id: String,
    },
}

impl PersistenceError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create dangling-reference error
    pub fn dangling(
        kind: EntityKind,
        id: impl fmt::Display,
        parent: EntityKind,
        parent_id: impl fmt::Display,
    ) -> Self {
        Self::DanglingReference {
            kind,
            id: id.to_string(),
            parent,
            parent_id: parent_id.to_string(),
        }
    }

    /// Create decode error for path
    pub fn decode_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Decode {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("io error reading {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// TOML did not match the schema
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Log filter directive did not parse
    #[error("invalid log filter '{filter}': {message}")]
    LogFilter {
        /// Offending directive
        filter: String,
        /// Parser message
        message: String,
    },
}
