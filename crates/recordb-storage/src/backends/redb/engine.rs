//! The redb-backed substrate.
//!
//! Redb admits one write transaction at a time, so commits here never
//! conflict; a second writer waits in [`begin_write`](StorageEngine::begin_write)
//! until the first one finishes.

use std::path::Path;

use redb::backends::InMemoryBackend;
use redb::{Builder, Database};
use tracing::debug;

use crate::engine::{StorageEngine, StorageError, StorageResult};

use super::transaction::RedbTransaction;

/// Tuning for a [`RedbEngine`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RedbConfig {
    /// Page cache size in bytes; `None` keeps redb's default.
    pub cache_size: Option<usize>,
}

impl RedbConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the page cache size.
    #[must_use]
    pub const fn cache_size(mut self, bytes: usize) -> Self {
        self.cache_size = Some(bytes);
        self
    }

    fn builder(self) -> Builder {
        let mut builder = Database::builder();
        if let Some(bytes) = self.cache_size {
            builder.set_cache_size(bytes);
        }
        builder
    }
}

/// A durable, single-writer substrate stored in one redb file.
pub struct RedbEngine {
    db: Database,
}

impl RedbEngine {
    /// Open the database file at `path`, creating it if missing.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Open`] if the file cannot be opened or created.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        Self::open_with_config(path, RedbConfig::default())
    }

    /// Like [`open`](Self::open), with explicit tuning.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Open`] if the file cannot be opened or created.
    pub fn open_with_config(path: impl AsRef<Path>, config: RedbConfig) -> StorageResult<Self> {
        let path = path.as_ref();
        let db = config.builder().create(path).map_err(open_error)?;
        debug!(path = %path.display(), cache_size = ?config.cache_size, "opened redb substrate");
        Ok(Self { db })
    }

    /// A database held entirely in memory and lost on drop.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Open`] if redb cannot initialize the backend.
    pub fn in_memory() -> StorageResult<Self> {
        let db = RedbConfig::default()
            .builder()
            .create_with_backend(InMemoryBackend::new())
            .map_err(open_error)?;
        Ok(Self { db })
    }
}

fn open_error(err: redb::DatabaseError) -> StorageError {
    StorageError::Open(err.to_string())
}

fn unavailable(err: redb::TransactionError) -> StorageError {
    StorageError::Unavailable(err.to_string())
}

impl StorageEngine for RedbEngine {
    type Transaction<'a> = RedbTransaction;

    fn begin_read(&self) -> StorageResult<Self::Transaction<'_>> {
        self.db.begin_read().map(RedbTransaction::new_read).map_err(unavailable)
    }

    fn begin_write(&self) -> StorageResult<Self::Transaction<'_>> {
        self.db.begin_write().map(RedbTransaction::new_write).map_err(unavailable)
    }
}
