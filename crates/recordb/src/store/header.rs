//! The store header: format and metadata versions of a store's data.

use recordb_core::encoding::FORMAT_VERSION;
use recordb_core::{printable, MetaData};
use recordb_storage::Transaction;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Persisted under `subspace ++ 0x00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct StoreHeader {
    pub format_version: u8,
    pub metadata_version: u32,
}

impl StoreHeader {
    pub(crate) fn for_metadata(metadata: &MetaData) -> Self {
        Self { format_version: FORMAT_VERSION, metadata_version: metadata.version() }
    }

    pub(crate) fn load<T: Transaction>(tx: &T, key: &[u8]) -> Result<Option<Self>> {
        let Some(bytes) = tx.get(key)? else {
            return Ok(None);
        };
        bincode::deserialize(&bytes).map(Some).map_err(|e| {
            Error::CorruptPayload(format!("store header at {}: {e}", printable(key)))
        })
    }

    pub(crate) fn save<T: Transaction>(&self, tx: &mut T, key: &[u8]) -> Result<()> {
        let bytes = bincode::serialize(self)
            .map_err(|e| Error::CorruptPayload(format!("store header: {e}")))?;
        tx.put(key, &bytes)?;
        Ok(())
    }

    /// Check a stored header against the catalog, upgrading it if the catalog is newer.
    ///
    /// A read-only transaction accepts an older header as is; the next write
    /// transaction that opens the store performs the upgrade.
    pub(crate) fn reconcile<T: Transaction>(
        self,
        tx: &mut T,
        key: &[u8],
        metadata: &MetaData,
    ) -> Result<()> {
        if self.format_version > FORMAT_VERSION {
            return Err(Error::Schema(format!(
                "store format version {} is newer than supported version {FORMAT_VERSION}",
                self.format_version
            )));
        }
        if self.metadata_version > metadata.version() {
            return Err(Error::Schema(format!(
                "store metadata version {} is newer than catalog version {}",
                self.metadata_version,
                metadata.version()
            )));
        }
        let current = Self::for_metadata(metadata);
        if current != self && tx.is_read_only() {
            debug!(
                stored = self.metadata_version,
                catalog = current.metadata_version,
                "leaving older record store header for a write transaction"
            );
        } else if current != self {
            info!(
                from = self.metadata_version,
                to = current.metadata_version,
                subspace = %printable(key),
                "upgrading record store header"
            );
            current.save(tx, key)?;
        }
        Ok(())
    }
}
