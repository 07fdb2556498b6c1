//! The ID allocator.
//!
//! Every entity-creation path calls [`IdAllocator`] once before inserting its row.
//! Each call performs exactly one atomic increment against the [`CounterStore`] and
//! formats the value it gets back. There is no retry, no cache, and no fallback
//! numbering: if the store fails, the allocation fails.
//!
//! # Gaps
//!
//! A sequence number is consumed the moment the store returns it. If the caller then
//! aborts (validation failure, rolled-back insert) the number is never reissued and
//! the code's sequence has a gap. There is no release operation.

use crate::code::{EntityCode, ParseEntityCodeError};
use crate::id::{AllocatedId, DEFAULT_MIN_WIDTH, MAX_WIDTH};
use crate::kind::EntityKind;
use crate::record::CounterRecord;
use crate::store::{CounterStore, PersistenceError};
use std::sync::Arc;
use thiserror::Error;

/// Most IDs a single [`IdAllocator::allocate_batch`] call may request.
pub const MAX_BATCH: u64 = 10_000;

/// Errors returned to callers of the allocator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllocationError {
    /// The code is not 2-6 uppercase ASCII letters.
    #[error("Invalid entity code: {0}")]
    InvalidCode(#[from] ParseEntityCodeError),

    /// The counter store could not complete the increment.
    ///
    /// Entity creation must be aborted. A retry must request a fresh allocation.
    #[error("Failed to allocate ID: {0}")]
    Persistence(#[from] PersistenceError),

    /// A batch allocation asked for zero IDs.
    #[error("Batch allocation requires a count of at least 1")]
    EmptyBatch,

    /// A batch allocation asked for more than [`MAX_BATCH`] IDs.
    #[error("Batch of {requested} IDs exceeds the limit of {max}")]
    BatchTooLarge {
        /// The requested count.
        requested: u64,
        /// The largest accepted count.
        max: u64,
    },
}

/// Allocates human-readable sequential IDs such as `US00001`.
///
/// Cheap to clone; clones share the same store.
///
/// # Example
///
/// ```ignore
/// use seqid_core::{EntityKind, IdAllocator};
///
/// let allocator = IdAllocator::new(store);
///
/// let user_id = allocator.allocate_kind(EntityKind::User).await?;   // "US00001"
/// let event_id = allocator.allocate("EV").await?;                   // "EV00001"
/// let tickets = allocator.allocate_batch("GT", 3).await?;           // GT00001..GT00003
/// ```
#[derive(Clone)]
pub struct IdAllocator {
    store: Arc<dyn CounterStore>,
    min_width: usize,
}

impl IdAllocator {
    /// Create an allocator over `store` with the default 5-digit minimum width.
    #[must_use]
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self {
            store,
            min_width: DEFAULT_MIN_WIDTH,
        }
    }

    /// Set the minimum number of digits in the numeric part, clamped to `1..=MAX_WIDTH`.
    #[must_use]
    pub fn with_min_width(mut self, min_width: usize) -> Self {
        self.min_width = min_width.clamp(1, MAX_WIDTH);
        self
    }

    /// The minimum number of digits in the numeric part.
    #[must_use]
    pub const fn min_width(&self) -> usize {
        self.min_width
    }

    /// Allocate the next ID for `code`.
    ///
    /// A code that has never been used starts at 1; no registration is needed.
    ///
    /// # Errors
    ///
    /// - `InvalidCode`: `code` is not 2-6 uppercase ASCII letters
    /// - `Persistence`: the counter store failed
    pub async fn allocate(&self, code: &str) -> Result<AllocatedId, AllocationError> {
        let code = EntityCode::new(code)?;
        self.allocate_code(&code).await
    }

    /// Allocate the next ID for a registered entity kind.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the counter store failed.
    pub async fn allocate_kind(&self, kind: EntityKind) -> Result<AllocatedId, AllocationError> {
        self.allocate_code(&kind.entity_code()).await
    }

    /// Allocate the next ID for an already validated code.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the counter store failed.
    pub async fn allocate_code(&self, code: &EntityCode) -> Result<AllocatedId, AllocationError> {
        let seq = self
            .store
            .increment(code, 1)
            .await
            .map_err(|e| failed(code, e))?;

        metrics::counter!("seqid.allocated", "kind" => kind_label(code)).increment(1);
        let id = AllocatedId::new(code.clone(), seq, self.min_width);
        tracing::debug!(code = %code, seq, id = %id, "ID allocated");

        Ok(id)
    }

    /// Allocate `count` consecutive IDs for `code` in one store round trip.
    ///
    /// The IDs are returned in ascending order.
    ///
    /// # Errors
    ///
    /// - `InvalidCode`: `code` is not 2-6 uppercase ASCII letters
    /// - `EmptyBatch`: `count` is zero
    /// - `BatchTooLarge`: `count` exceeds [`MAX_BATCH`]
    /// - `Persistence`: the counter store failed
    pub async fn allocate_batch(
        &self,
        code: &str,
        count: u64,
    ) -> Result<Vec<AllocatedId>, AllocationError> {
        let code = EntityCode::new(code)?;
        if count == 0 {
            return Err(AllocationError::EmptyBatch);
        }
        if count > MAX_BATCH {
            return Err(AllocationError::BatchTooLarge {
                requested: count,
                max: MAX_BATCH,
            });
        }

        let last = self
            .store
            .increment(&code, count)
            .await
            .map_err(|e| failed(&code, e))?;

        // The store created or advanced the counter by `count`, so `last >= count`.
        let Some(first) = last.checked_sub(count).map(|before| before + 1) else {
            let error = PersistenceError::CorruptCounter {
                code: code.clone(),
                value: i64::try_from(last).unwrap_or(i64::MAX),
            };
            return Err(failed(&code, error));
        };

        metrics::counter!("seqid.allocated", "kind" => kind_label(&code)).increment(count);
        tracing::debug!(code = %code, first, last, "ID batch allocated");

        Ok((first..=last)
            .map(|seq| AllocatedId::new(code.clone(), seq, self.min_width))
            .collect())
    }

    /// The last sequence number issued for `code`, or 0 if none has been.
    ///
    /// Informational only. Never derive a new ID from this value; another caller
    /// may allocate between the read and any later use.
    ///
    /// # Errors
    ///
    /// - `InvalidCode`: `code` is not 2-6 uppercase ASCII letters
    /// - `Persistence`: the counter store failed
    pub async fn peek(&self, code: &str) -> Result<u64, AllocationError> {
        let code = EntityCode::new(code)?;
        let record = self.store.load(&code).await?;
        Ok(record.map_or(0, |r| r.seq))
    }

    /// Every counter in the store, ordered by code.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the counter store failed.
    pub async fn counters(&self) -> Result<Vec<CounterRecord>, AllocationError> {
        Ok(self.store.list().await?)
    }
}

impl std::fmt::Debug for IdAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdAllocator")
            .field("min_width", &self.min_width)
            .finish_non_exhaustive()
    }
}

/// Metric label for `code`: the registered kind name, or `other`.
fn kind_label(code: &EntityCode) -> &'static str {
    EntityKind::from_code(code.as_str()).map_or("other", EntityKind::name)
}

fn failed(code: &EntityCode, error: PersistenceError) -> AllocationError {
    metrics::counter!("seqid.allocation_failed", "kind" => kind_label(code)).increment(1);
    tracing::error!(code = %code, error = %error, "ID allocation failed");
    AllocationError::Persistence(error)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::store::StoreFuture;
    use chrono::Utc;
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts calls so tests can check one allocation is one increment.
    #[derive(Default)]
    struct CountingStore {
        counters: Mutex<BTreeMap<EntityCode, CounterRecord>>,
        increments: AtomicUsize,
        fail: bool,
    }

    impl CounterStore for CountingStore {
        fn increment<'a>(&'a self, code: &'a EntityCode, by: u64) -> StoreFuture<'a, u64> {
            Box::pin(async move {
                self.increments.fetch_add(1, Ordering::SeqCst);
                if self.fail {
                    return Err(PersistenceError::Database("store offline".to_string()));
                }
                let mut counters = self.counters.lock().unwrap();
                let record = counters
                    .entry(code.clone())
                    .or_insert_with(|| CounterRecord::new(code.clone(), 0, Utc::now()));
                record.seq += by;
                Ok(record.seq)
            })
        }

        fn load<'a>(&'a self, code: &'a EntityCode) -> StoreFuture<'a, Option<CounterRecord>> {
            Box::pin(async move { Ok(self.counters.lock().unwrap().get(code).cloned()) })
        }

        fn list(&self) -> StoreFuture<'_, Vec<CounterRecord>> {
            Box::pin(async move { Ok(self.counters.lock().unwrap().values().cloned().collect()) })
        }
    }

    fn allocator() -> (Arc<CountingStore>, IdAllocator) {
        let store = Arc::new(CountingStore::default());
        (store.clone(), IdAllocator::new(store))
    }

    #[tokio::test]
    async fn first_allocation_is_one() {
        let (_, allocator) = allocator();
        let id = allocator.allocate("US").await.unwrap();
        assert_eq!(id.as_str(), "US00001");
        assert_eq!(id.seq(), 1);
    }

    #[tokio::test]
    async fn each_allocation_is_one_increment() {
        let (store, allocator) = allocator();
        for _ in 0..3 {
            allocator.allocate("EV").await.unwrap();
        }
        assert_eq!(store.increments.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn allocate_kind_uses_registry_code() {
        let (_, allocator) = allocator();
        let id = allocator.allocate_kind(EntityKind::Blog).await.unwrap();
        assert_eq!(id.as_str(), "BL00001");
    }

    #[tokio::test]
    async fn invalid_code_never_touches_the_store() {
        let (store, allocator) = allocator();
        let result = allocator.allocate("us").await;
        assert!(matches!(result, Err(AllocationError::InvalidCode(_))));
        assert_eq!(store.increments.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn store_failure_surfaces_as_persistence_error() {
        let store = Arc::new(CountingStore {
            fail: true,
            ..CountingStore::default()
        });
        let allocator = IdAllocator::new(store.clone());

        let result = allocator.allocate("US").await;
        assert_eq!(
            result,
            Err(AllocationError::Persistence(PersistenceError::Database(
                "store offline".to_string()
            )))
        );
        // No retry.
        assert_eq!(store.increments.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn batch_is_contiguous_and_one_round_trip() {
        let (store, allocator) = allocator();
        allocator.allocate("GT").await.unwrap();

        let batch = allocator.allocate_batch("GT", 3).await.unwrap();
        let ids: Vec<_> = batch.iter().map(AllocatedId::as_str).collect();
        assert_eq!(ids, ["GT00002", "GT00003", "GT00004"]);
        assert_eq!(store.increments.load(Ordering::SeqCst), 2);

        let next = allocator.allocate("GT").await.unwrap();
        assert_eq!(next.seq(), 5);
    }

    #[tokio::test]
    async fn empty_batch_is_rejected() {
        let (store, allocator) = allocator();
        assert_eq!(
            allocator.allocate_batch("GT", 0).await,
            Err(AllocationError::EmptyBatch)
        );
        assert_eq!(store.increments.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn oversized_batch_never_touches_the_store() {
        let (store, allocator) = allocator();
        assert_eq!(
            allocator.allocate_batch("GT", MAX_BATCH + 1).await,
            Err(AllocationError::BatchTooLarge {
                requested: MAX_BATCH + 1,
                max: MAX_BATCH,
            })
        );
        assert!(matches!(
            allocator.allocate_batch("GT", 1 << 40).await,
            Err(AllocationError::BatchTooLarge { .. })
        ));
        assert_eq!(store.increments.load(Ordering::SeqCst), 0);
        assert_eq!(allocator.peek("GT").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn batch_at_the_limit_is_allowed() {
        let (_, allocator) = allocator();
        let batch = allocator.allocate_batch("GT", MAX_BATCH).await.unwrap();
        assert_eq!(batch.len(), 10_000);
        assert_eq!(batch.last().map(AllocatedId::seq), Some(MAX_BATCH));
    }

    #[tokio::test]
    async fn peek_does_not_allocate() {
        let (_, allocator) = allocator();
        assert_eq!(allocator.peek("HB").await.unwrap(), 0);

        allocator.allocate("HB").await.unwrap();
        assert_eq!(allocator.peek("HB").await.unwrap(), 1);
        assert_eq!(allocator.peek("HB").await.unwrap(), 1);

        assert_eq!(allocator.allocate("HB").await.unwrap().seq(), 2);
    }

    #[tokio::test]
    async fn custom_min_width() {
        let (_, allocator) = allocator();
        let allocator = allocator.with_min_width(3);
        assert_eq!(allocator.allocate("CT").await.unwrap().as_str(), "CT001");

        let clamped = allocator.with_min_width(0);
        assert_eq!(clamped.min_width(), 1);
        assert_eq!(clamped.allocate("CT").await.unwrap().as_str(), "CT2");
    }

    #[tokio::test]
    async fn oversized_min_width_is_clamped() {
        let (store, allocator) = allocator();
        let allocator = allocator.with_min_width(70_000);
        assert_eq!(allocator.min_width(), MAX_WIDTH);

        let id = allocator.allocate("CT").await.unwrap();
        assert_eq!(id.as_str(), "CT00000000000000000001");
        assert_eq!(store.increments.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn metric_labels_are_bounded_to_registered_kinds() {
        assert_eq!(kind_label(&EntityKind::User.entity_code()), "user");
        assert_eq!(kind_label(&EntityCode::new("ZZZ").unwrap()), "other");
        assert_eq!(kind_label(&EntityCode::new("QQ").unwrap()), "other");
    }

    #[tokio::test]
    async fn counters_lists_every_code() {
        let (_, allocator) = allocator();
        allocator.allocate("US").await.unwrap();
        allocator.allocate("EV").await.unwrap();
        allocator.allocate("EV").await.unwrap();

        let counters = allocator.counters().await.unwrap();
        let summary: Vec<_> = counters.iter().map(|r| (r.code.as_str(), r.seq)).collect();
        assert_eq!(summary, [("EV", 2), ("US", 1)]);
    }
}
