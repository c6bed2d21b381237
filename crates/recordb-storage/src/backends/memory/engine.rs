//! Memory engine and its shared commit state.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::trace;

use crate::engine::{StorageEngine, StorageError, StorageResult};

use super::transaction::{KeyRange, MemoryTransaction};

/// Default cap on the bytes a single transaction may write (10 MB).
const DEFAULT_MAX_TRANSACTION_BYTES: usize = 10 * 1024 * 1024;

/// Default transaction lifetime.
const DEFAULT_TRANSACTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration options for the memory engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryConfig {
    /// Maximum total size of keys and values written by one transaction.
    pub max_transaction_bytes: usize,
    /// Maximum time between begin and the last read or commit.
    pub transaction_timeout: Duration,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_transaction_bytes: DEFAULT_MAX_TRANSACTION_BYTES,
            transaction_timeout: DEFAULT_TRANSACTION_TIMEOUT,
        }
    }
}

impl MemoryConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the transaction size limit.
    #[must_use]
    pub const fn max_transaction_bytes(mut self, bytes: usize) -> Self {
        self.max_transaction_bytes = bytes;
        self
    }

    /// Set the transaction time limit.
    #[must_use]
    pub const fn transaction_timeout(mut self, timeout: Duration) -> Self {
        self.transaction_timeout = timeout;
        self
    }
}

/// A commit failure to inject into an upcoming commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Fail with [`StorageError::Conflict`].
    Conflict,
    /// Fail with [`StorageError::Unavailable`].
    Unavailable,
    /// Fail with [`StorageError::LimitExceeded`].
    LimitExceeded,
}

impl Fault {
    fn into_error(self) -> StorageError {
        match self {
            Self::Conflict => StorageError::Conflict("injected conflict".into()),
            Self::Unavailable => StorageError::Unavailable("injected outage".into()),
            Self::LimitExceeded => StorageError::LimitExceeded("injected limit".into()),
        }
    }
}

pub(crate) type Snapshot = Arc<BTreeMap<Vec<u8>, Vec<u8>>>;

/// What one committed transaction wrote.
#[derive(Debug)]
struct CommitRecord {
    version: u64,
    keys: Vec<Vec<u8>>,
    cleared: Vec<KeyRange>,
}

impl CommitRecord {
    fn touches(&self, range: &KeyRange) -> bool {
        self.keys.iter().any(|k| range.contains(k)) || self.cleared.iter().any(|c| c.intersects(range))
    }
}

#[derive(Debug, Default)]
struct State {
    data: Snapshot,
    version: u64,
    log: Vec<CommitRecord>,
    /// Read versions of open transactions, with counts.
    active: BTreeMap<u64, usize>,
    faults: VecDeque<Fault>,
}

impl State {
    fn prune_log(&mut self) {
        match self.active.keys().next().copied() {
            Some(oldest) => self.log.retain(|c| c.version > oldest),
            None => self.log.clear(),
        }
    }
}

/// The staged effects of a transaction, handed to [`Shared::commit`].
pub(crate) struct CommitRequest<'a> {
    pub read_version: u64,
    pub reads: &'a [KeyRange],
    pub writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
    pub cleared: Vec<KeyRange>,
}

#[derive(Debug, Default)]
pub(crate) struct Shared {
    state: Mutex<State>,
    pub(crate) config: MemoryConfig,
}

impl Shared {
    pub(crate) fn begin(&self) -> (u64, Snapshot) {
        let mut state = self.state.lock();
        let version = state.version;
        *state.active.entry(version).or_insert(0) += 1;
        (version, Arc::clone(&state.data))
    }

    pub(crate) fn end(&self, read_version: u64) {
        let mut state = self.state.lock();
        if let Some(count) = state.active.get_mut(&read_version) {
            *count -= 1;
            if *count == 0 {
                state.active.remove(&read_version);
            }
        }
        state.prune_log();
    }

    pub(crate) fn commit(&self, request: CommitRequest<'_>) -> StorageResult<()> {
        let mut state = self.state.lock();

        if let Some(fault) = state.faults.pop_front() {
            return Err(fault.into_error());
        }

        for record in state.log.iter().filter(|c| c.version > request.read_version) {
            if let Some(range) = request.reads.iter().find(|r| record.touches(r)) {
                return Err(StorageError::Conflict(format!(
                    "read range {range} was written at version {}",
                    record.version
                )));
            }
        }

        if request.writes.is_empty() && request.cleared.is_empty() {
            return Ok(());
        }

        let data = Arc::make_mut(&mut state.data);
        for range in &request.cleared {
            let doomed: Vec<Vec<u8>> = data
                .range::<[u8], _>(range.bounds())
                .map(|(k, _)| k.clone())
                .collect();
            for key in doomed {
                data.remove(&key);
            }
        }
        let mut keys = Vec::with_capacity(request.writes.len());
        for (key, value) in request.writes {
            match value {
                Some(value) => {
                    data.insert(key.clone(), value);
                }
                None => {
                    data.remove(&key);
                }
            }
            keys.push(key);
        }

        state.version += 1;
        let version = state.version;
        trace!(version, keys = keys.len(), cleared = request.cleared.len(), "memory commit");
        state.log.push(CommitRecord { version, keys, cleared: request.cleared });
        state.prune_log();
        Ok(())
    }
}

/// An in-memory substrate with optimistic concurrency control.
///
/// Cloning the engine yields another handle to the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryEngine {
    shared: Arc<Shared>,
}

impl MemoryEngine {
    /// Create an empty engine with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty engine with custom configuration.
    #[must_use]
    pub fn with_config(config: MemoryConfig) -> Self {
        Self { shared: Arc::new(Shared { state: Mutex::default(), config }) }
    }

    /// The engine configuration.
    #[must_use]
    pub fn config(&self) -> MemoryConfig {
        self.shared.config
    }

    /// Make an upcoming commit fail with `fault`. Faults are consumed in order.
    pub fn inject_fault(&self, fault: Fault) {
        self.shared.state.lock().faults.push_back(fault);
    }

    /// Number of committed keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.state.lock().data.len()
    }

    /// Whether the engine holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The current committed version; incremented by every commit that writes.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.shared.state.lock().version
    }
}

impl StorageEngine for MemoryEngine {
    type Transaction<'a> = MemoryTransaction;

    fn begin_read(&self) -> StorageResult<Self::Transaction<'_>> {
        Ok(MemoryTransaction::new(Arc::clone(&self.shared), true))
    }

    fn begin_write(&self) -> StorageResult<Self::Transaction<'_>> {
        Ok(MemoryTransaction::new(Arc::clone(&self.shared), false))
    }
}
