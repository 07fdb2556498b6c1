//! In-memory counter stores
//!
//! - [`InMemoryCounterStore`]: `HashMap`-backed store with atomic increments
//! - [`FailingCounterStore`]: every call fails, for error-path tests
//! - [`NonAtomicCounterStore`]: read-then-write store that loses updates under
//!   concurrency; a negative control for race tests

use chrono::{DateTime, Utc};
use seqid_core::environment::{Clock, SystemClock};
use seqid_core::store::StoreFuture;
use seqid_core::{CounterRecord, CounterStore, EntityCode, PersistenceError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

type Counters = HashMap<EntityCode, CounterRecord>;

fn lock(counters: &Mutex<Counters>) -> Result<MutexGuard<'_, Counters>, PersistenceError> {
    counters
        .lock()
        .map_err(|_| PersistenceError::Database("counter map lock poisoned".to_string()))
}

fn sorted(counters: &Counters) -> Vec<CounterRecord> {
    let mut records: Vec<_> = counters.values().cloned().collect();
    records.sort_by(|a, b| a.code.cmp(&b.code));
    records
}

/// In-memory counter store for fast, deterministic testing.
///
/// Each increment runs inside one critical section, which gives it the same
/// read-modify-write atomicity the `PostgreSQL` upsert has.
///
/// # Example
///
/// ```
/// use seqid_core::{CounterStore, EntityCode};
/// use seqid_testing::InMemoryCounterStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = InMemoryCounterStore::new();
/// let code = EntityCode::new("US")?;
///
/// assert_eq!(store.increment(&code, 1).await?, 1);
/// assert_eq!(store.increment(&code, 1).await?, 2);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct InMemoryCounterStore {
    counters: Arc<Mutex<Counters>>,
    clock: Arc<dyn Clock>,
    increments: Arc<AtomicUsize>,
}

impl InMemoryCounterStore {
    /// Create an empty store using the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty store that stamps `created_at` from `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            counters: Arc::new(Mutex::new(HashMap::new())),
            clock,
            increments: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Set the counter for `code` to `seq`, as if `seq` IDs had been issued.
    ///
    /// Test setup only; lets a test start near a boundary such as 99 999.
    ///
    /// # Errors
    ///
    /// Returns `Database` if the internal lock is poisoned.
    pub fn seed(&self, code: &EntityCode, seq: u64) -> Result<(), PersistenceError> {
        let now = self.clock.now();
        lock(&self.counters)?
            .entry(code.clone())
            .and_modify(|record| record.seq = seq)
            .or_insert_with(|| CounterRecord::new(code.clone(), seq, now));
        Ok(())
    }

    /// Number of `increment` calls made so far.
    #[must_use]
    pub fn increment_calls(&self) -> usize {
        self.increments.load(Ordering::SeqCst)
    }

    /// Number of counters in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.counters).map_or(0, |c| c.len())
    }

    /// Check if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryCounterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryCounterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCounterStore")
            .field("counters", &self.len())
            .finish_non_exhaustive()
    }
}

impl CounterStore for InMemoryCounterStore {
    fn increment<'a>(&'a self, code: &'a EntityCode, by: u64) -> StoreFuture<'a, u64> {
        Box::pin(async move {
            self.increments.fetch_add(1, Ordering::SeqCst);
            let now: DateTime<Utc> = self.clock.now();

            let mut counters = lock(&self.counters)?;
            let current = counters.get(code).map_or(0, |r| r.seq);
            let next = current
                .checked_add(by)
                .ok_or_else(|| PersistenceError::Overflow { code: code.clone() })?;

            counters
                .entry(code.clone())
                .and_modify(|record| record.seq = next)
                .or_insert_with(|| CounterRecord::new(code.clone(), next, now));
            Ok(next)
        })
    }

    fn load<'a>(&'a self, code: &'a EntityCode) -> StoreFuture<'a, Option<CounterRecord>> {
        Box::pin(async move { Ok(lock(&self.counters)?.get(code).cloned()) })
    }

    fn list(&self) -> StoreFuture<'_, Vec<CounterRecord>> {
        Box::pin(async move { Ok(sorted(&*lock(&self.counters)?)) })
    }
}

/// Counter store whose every call fails with a `Database` error.
///
/// Counts attempts so tests can assert the allocator does not retry.
#[derive(Debug, Clone)]
pub struct FailingCounterStore {
    message: String,
    attempts: Arc<AtomicUsize>,
}

impl FailingCounterStore {
    /// Create a store that fails with `message`.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            attempts: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of calls made so far.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn fail<T>(&self) -> Result<T, PersistenceError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(PersistenceError::Database(self.message.clone()))
    }
}

impl CounterStore for FailingCounterStore {
    fn increment<'a>(&'a self, _code: &'a EntityCode, _by: u64) -> StoreFuture<'a, u64> {
        Box::pin(async move { self.fail() })
    }

    fn load<'a>(&'a self, _code: &'a EntityCode) -> StoreFuture<'a, Option<CounterRecord>> {
        Box::pin(async move { self.fail() })
    }

    fn list(&self) -> StoreFuture<'_, Vec<CounterRecord>> {
        Box::pin(async move { self.fail() })
    }
}

/// Read-then-write counter store. **Loses updates under concurrency.**
///
/// Reads the counter, yields to the scheduler, then writes `read + by`. Two
/// callers that interleave both write the same value and receive the same
/// sequence number. Race tests run against it to prove they can detect the
/// duplicate IDs a non-atomic store produces.
#[derive(Clone, Default)]
pub struct NonAtomicCounterStore {
    inner: InMemoryCounterStore,
}

impl NonAtomicCounterStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CounterStore for NonAtomicCounterStore {
    fn increment<'a>(&'a self, code: &'a EntityCode, by: u64) -> StoreFuture<'a, u64> {
        Box::pin(async move {
            let current = self.inner.load(code).await?.map_or(0, |r| r.seq);
            tokio::task::yield_now().await;
            let next = current
                .checked_add(by)
                .ok_or_else(|| PersistenceError::Overflow { code: code.clone() })?;
            self.inner.seed(code, next)?;
            Ok(next)
        })
    }

    fn load<'a>(&'a self, code: &'a EntityCode) -> StoreFuture<'a, Option<CounterRecord>> {
        self.inner.load(code)
    }

    fn list(&self) -> StoreFuture<'_, Vec<CounterRecord>> {
        self.inner.list()
    }
}
