//! Retrying execution of units of work.
//!
//! A [`TransactionRunner`] opens a substrate transaction, hands it to a unit
//! of work, and commits. When the attempt fails with a retryable error the
//! transaction is discarded and the unit of work runs again in a fresh one:
//!
//! ```text
//! Idle ──▶ Open ──▶ Committed
//!           │ ▲
//!           │ └── retryable failure (conflict, substrate unavailable)
//!           └───▶ Aborted (any other error, cancellation, or attempts exhausted)
//! ```
//!
//! A unit of work may therefore run more than once and must not have side
//! effects outside the transaction it is given.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use recordb_storage::{StorageEngine, Transaction};
use tracing::{debug, warn};

use crate::config::RunnerConfig;
use crate::error::{Error, Result};

/// A shared flag that asks a running unit of work to stop.
///
/// Cancellation is observed before each attempt and immediately before
/// commit; an attempt in progress is never interrupted halfway.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Every clone of this token observes it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Runs units of work against a storage engine, retrying on conflicts.
///
/// # Example
///
/// ```
/// use recordb::{MemoryEngine, TransactionRunner, Transaction};
///
/// let runner = TransactionRunner::new(MemoryEngine::new());
/// runner.run(|tx| {
///     tx.put(b"greeting", b"hello")?;
///     Ok(())
/// })?;
/// let value = runner.read(|tx| Ok(tx.get(b"greeting")?))?;
/// assert_eq!(value, Some(b"hello".to_vec()));
/// # Ok::<(), recordb::Error>(())
/// ```
#[derive(Debug)]
pub struct TransactionRunner<E> {
    engine: E,
    config: RunnerConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Read,
    Write,
}

impl<E: StorageEngine> TransactionRunner<E> {
    /// Create a runner with the default configuration.
    pub fn new(engine: E) -> Self {
        Self::with_config(engine, RunnerConfig::default())
    }

    /// Create a runner with the given configuration.
    pub const fn with_config(engine: E, config: RunnerConfig) -> Self {
        Self { engine, config }
    }

    /// The underlying engine.
    pub const fn engine(&self) -> &E {
        &self.engine
    }

    /// The runner configuration.
    pub const fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run `f` in a read-write transaction and commit it.
    ///
    /// # Errors
    ///
    /// Returns the first non-retryable error unchanged, or
    /// [`Error::RetriesExhausted`] once every attempt failed with a retryable one.
    pub fn run<'e, T, F>(&'e self, f: F) -> Result<T>
    where
        F: FnMut(&mut E::Transaction<'e>) -> Result<T>,
    {
        self.execute(Mode::Write, None, f)
    }

    /// Like [`run`](Self::run), but stops with [`Error::Cancelled`] once
    /// `token` is cancelled.
    ///
    /// # Errors
    ///
    /// As [`run`](Self::run), plus [`Error::Cancelled`].
    pub fn run_with_cancel<'e, T, F>(&'e self, token: &CancellationToken, f: F) -> Result<T>
    where
        F: FnMut(&mut E::Transaction<'e>) -> Result<T>,
    {
        self.execute(Mode::Write, Some(token), f)
    }

    /// Run `f` in a read-only transaction.
    ///
    /// # Errors
    ///
    /// As [`run`](Self::run). Writes from `f` fail with a read-only storage error.
    pub fn read<'e, T, F>(&'e self, f: F) -> Result<T>
    where
        F: FnMut(&mut E::Transaction<'e>) -> Result<T>,
    {
        self.execute(Mode::Read, None, f)
    }

    fn execute<'e, T, F>(&'e self, mode: Mode, token: Option<&CancellationToken>, mut f: F) -> Result<T>
    where
        F: FnMut(&mut E::Transaction<'e>) -> Result<T>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let cancelled = || token.is_some_and(CancellationToken::is_cancelled);
        let mut attempt = 0;

        loop {
            if cancelled() {
                debug!(attempt, "transaction cancelled before attempt");
                return Err(Error::Cancelled);
            }
            attempt += 1;

            match self.attempt(mode, &cancelled, &mut f) {
                Ok(value) => {
                    debug!(attempt, ?mode, "transaction committed");
                    return Ok(value);
                }
                Err(e) if e.is_retryable() => {
                    if attempt >= max_attempts {
                        warn!(attempts = attempt, error = %e, "transaction retries exhausted");
                        return Err(Error::RetriesExhausted { attempts: attempt, last: Box::new(e) });
                    }
                    let delay = self.config.backoff(attempt);
                    warn!(attempt, ?delay, error = %e, "retrying transaction");
                    if !delay.is_zero() {
                        thread::sleep(delay);
                    }
                }
                Err(e) => {
                    debug!(attempt, error = %e, "transaction aborted");
                    return Err(e);
                }
            }
        }
    }

    fn attempt<'e, T, F>(&'e self, mode: Mode, cancelled: &dyn Fn() -> bool, f: &mut F) -> Result<T>
    where
        F: FnMut(&mut E::Transaction<'e>) -> Result<T>,
    {
        let mut tx = match mode {
            Mode::Read => self.engine.begin_read()?,
            Mode::Write => self.engine.begin_write()?,
        };

        let value = match f(&mut tx) {
            Ok(value) => value,
            Err(e) => {
                discard(tx);
                return Err(e);
            }
        };

        if cancelled() {
            debug!("transaction cancelled before commit");
            discard(tx);
            return Err(Error::Cancelled);
        }

        tx.commit()?;
        Ok(value)
    }
}

fn discard<T: Transaction>(tx: T) {
    if let Err(e) = tx.rollback() {
        warn!(error = %e, "rollback failed");
    }
}
