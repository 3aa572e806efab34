//! Persistence backends
//!
//! The store stages every mutation on a copy of the dataset and hands the
//! copy to [`StorageBackend::commit`]. Only when the commit succeeds does
//! the copy replace the live state.

use crate::config::StorageConfig;
use crate::dataset::{Dataset, DatasetDocument};
use crate::error::PersistenceError;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Durable home of a [`Dataset`]
pub trait StorageBackend: Send + Sync + fmt::Debug {
    /// Load the stored dataset; an empty store yields an empty dataset
    ///
    /// # Errors
    /// Returns [`PersistenceError`] if stored data cannot be read.
    fn load(&self) -> Result<Dataset, PersistenceError>;

    /// Durably replace the stored dataset with `dataset`
    ///
    /// Must be all-or-nothing: on error the previously stored dataset is
    /// still the one `load` returns.
    ///
    /// # Errors
    /// Returns [`PersistenceError`] if the dataset could not be stored.
    fn commit(&self, dataset: &Dataset) -> Result<(), PersistenceError>;

    /// Backend name for diagnostics
    fn name(&self) -> &'static str;
}

/// Build the backend selected by `config`
#[must_use]
pub fn from_config(config: &StorageConfig) -> Box<dyn StorageBackend> {
    match config {
        StorageConfig::Memory => Box::new(MemoryBackend::new()),
        StorageConfig::JsonFile { path } => Box::new(JsonFileBackend::new(path)),
    }
}

/// Backend that keeps nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryBackend;

impl MemoryBackend {
    /// Create memory backend
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl StorageBackend for MemoryBackend {
    fn load(&self) -> Result<Dataset, PersistenceError> {
        Ok(Dataset::new())
    }

    fn commit(&self, _dataset: &Dataset) -> Result<(), PersistenceError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Single JSON document on disk
///
/// Commits write a temporary file in the same directory and rename it over
/// the target, so readers never observe a half-written document.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    /// Backend storing its document at `path`
    #[inline]
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Document location
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn directory(&self) -> &Path {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }
}

impl StorageBackend for JsonFileBackend {
    fn load(&self) -> Result<Dataset, PersistenceError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no dataset on disk, starting empty");
                return Ok(Dataset::new());
            }
            Err(e) => return Err(PersistenceError::io_error(&self.path, e)),
        };

        let doc: DatasetDocument = serde_json::from_slice(&bytes)
            .map_err(|e| PersistenceError::decode_error(&self.path, e.to_string()))?;
        let dataset = Dataset::from_document(doc)?;

        tracing::debug!(path = %self.path.display(), stats = ?dataset.stats(), "loaded dataset");
        Ok(dataset)
    }

    fn commit(&self, dataset: &Dataset) -> Result<(), PersistenceError> {
        let bytes = serde_json::to_vec_pretty(&dataset.to_document())
            .map_err(|e| PersistenceError::Encode(e.to_string()))?;

        let dir = self.directory();
        std::fs::create_dir_all(dir).map_err(|e| PersistenceError::io_error(dir, e))?;

        let mut staged = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| PersistenceError::io_error(dir, e))?;
        staged
            .write_all(&bytes)
            .and_then(|()| staged.as_file().sync_all())
            .map_err(|e| PersistenceError::io_error(staged.path(), e))?;
        staged
            .persist(&self.path)
            .map_err(|e| PersistenceError::io_error(&self.path, e.error))?;

        Ok(())
    }

    fn name(&self) -> &'static str {
        "json_file"
    }
}
