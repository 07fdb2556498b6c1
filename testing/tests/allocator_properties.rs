//! Allocation guarantees exercised against the in-memory stores.

#![allow(clippy::unwrap_used)] // Tests can unwrap
#![allow(clippy::expect_used)] // Tests can expect

use futures::future::join_all;
use proptest::prelude::*;
use seqid_core::{AllocatedId, AllocationError, EntityCode, EntityKind, IdAllocator, PersistenceError};
use seqid_testing::helpers::init_tracing;
use seqid_testing::properties::{entity_code, entity_kind};
use seqid_testing::{FailingCounterStore, InMemoryCounterStore, NonAtomicCounterStore};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

fn allocator_over(store: &InMemoryCounterStore) -> IdAllocator {
    IdAllocator::new(Arc::new(store.clone()))
}

/// Spawn `workers` tasks that each allocate `per_worker` IDs for `code`.
async fn allocate_concurrently(
    allocator: &IdAllocator,
    code: &'static str,
    workers: usize,
    per_worker: usize,
) -> Vec<AllocatedId> {
    let handles: Vec<_> = (0..workers)
        .map(|_| {
            let allocator = allocator.clone();
            tokio::spawn(async move {
                let mut ids = Vec::with_capacity(per_worker);
                for _ in 0..per_worker {
                    ids.push(allocator.allocate(code).await.expect("allocation failed"));
                }
                ids
            })
        })
        .collect();

    let mut all = Vec::with_capacity(workers * per_worker);
    for handle in handles {
        all.extend(handle.await.expect("worker panicked"));
    }
    all
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_allocations_are_unique_and_contiguous() {
    init_tracing();
    let store = InMemoryCounterStore::new();
    let allocator = allocator_over(&store);

    let ids = allocate_concurrently(&allocator, "US", 32, 50).await;

    let strings: HashSet<_> = ids.iter().map(AllocatedId::as_str).collect();
    assert_eq!(strings.len(), ids.len(), "duplicate ID issued");

    let seqs: BTreeSet<_> = ids.iter().map(AllocatedId::seq).collect();
    let expected: BTreeSet<_> = (1..=1600).collect();
    assert_eq!(seqs, expected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_allocations_continue_from_existing_counter() {
    let store = InMemoryCounterStore::new();
    store.seed(&EntityCode::new("EV").unwrap(), 41).unwrap();
    let allocator = allocator_over(&store);

    let ids = allocate_concurrently(&allocator, "EV", 10, 10).await;

    let seqs: BTreeSet<_> = ids.iter().map(AllocatedId::seq).collect();
    assert_eq!(seqs, (42..=141).collect::<BTreeSet<u64>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn codes_do_not_influence_each_other() {
    let store = InMemoryCounterStore::new();
    let allocator = allocator_over(&store);

    let (users, events) = tokio::join!(
        allocate_concurrently(&allocator, "US", 8, 25),
        allocate_concurrently(&allocator, "EV", 4, 10),
    );

    let user_seqs: BTreeSet<_> = users.iter().map(AllocatedId::seq).collect();
    let event_seqs: BTreeSet<_> = events.iter().map(AllocatedId::seq).collect();
    assert_eq!(user_seqs, (1..=200).collect::<BTreeSet<u64>>());
    assert_eq!(event_seqs, (1..=40).collect::<BTreeSet<u64>>());
    assert!(users.iter().all(|id| id.as_str().starts_with("US")));
    assert!(events.iter().all(|id| id.as_str().starts_with("EV")));
}

#[tokio::test]
async fn sequential_allocations_step_by_one() {
    let store = InMemoryCounterStore::new();
    let allocator = allocator_over(&store);

    let mut previous = 0;
    for _ in 0..20 {
        let id = allocator.allocate("BL").await.unwrap();
        assert_eq!(id.seq(), previous + 1);
        previous = id.seq();
    }
}

#[tokio::test]
async fn formatting_at_the_width_boundaries() {
    let store = InMemoryCounterStore::new();
    let allocator = allocator_over(&store);
    let us = EntityCode::new("US").unwrap();

    assert_eq!(allocator.allocate("US").await.unwrap().as_str(), "US00001");

    store.seed(&us, 14).unwrap();
    assert_eq!(allocator.allocate("US").await.unwrap().as_str(), "US00015");

    store.seed(&us, 99_998).unwrap();
    assert_eq!(allocator.allocate("US").await.unwrap().as_str(), "US99999");
    assert_eq!(allocator.allocate("US").await.unwrap().as_str(), "US100000");
}

#[tokio::test]
async fn unseen_code_starts_at_one_without_registration() {
    let store = InMemoryCounterStore::new();
    let allocator = allocator_over(&store);

    allocator.allocate("US").await.unwrap();
    allocator.allocate("US").await.unwrap();

    let fresh = allocator.allocate("ZQX").await.unwrap();
    assert_eq!(fresh.as_str(), "ZQX00001");
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn discarded_ids_leave_gaps() {
    let store = InMemoryCounterStore::new();
    let allocator = allocator_over(&store);

    let kept = allocator.allocate_kind(EntityKind::Advert).await.unwrap();
    // Caller fails validation after allocating and drops the ID.
    let _discarded = allocator.allocate_kind(EntityKind::Advert).await.unwrap();
    let next = allocator.allocate_kind(EntityKind::Advert).await.unwrap();

    assert_eq!(kept.as_str(), "AD00001");
    assert_eq!(next.as_str(), "AD00003");
}

#[tokio::test]
async fn persistence_failure_is_surfaced_without_retry() {
    let store = Arc::new(FailingCounterStore::new("connection refused"));
    let allocator = IdAllocator::new(store.clone());

    let result = allocator.allocate_kind(EntityKind::User).await;

    assert_eq!(
        result,
        Err(AllocationError::Persistence(PersistenceError::Database(
            "connection refused".to_string()
        )))
    );
    assert_eq!(store.attempts(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_batches_never_overlap() {
    let store = InMemoryCounterStore::new();
    let allocator = allocator_over(&store);

    let batches = join_all((0..16).map(|_| {
        let allocator = allocator.clone();
        tokio::spawn(async move { allocator.allocate_batch("GT", 5).await.unwrap() })
    }))
    .await;

    let mut seqs = BTreeSet::new();
    for batch in batches {
        let batch = batch.expect("worker panicked");
        let first = batch[0].seq();
        for (offset, id) in batch.iter().enumerate() {
            assert_eq!(id.seq(), first + offset as u64, "batch is not contiguous");
            assert!(seqs.insert(id.seq()), "{id} issued twice");
        }
    }
    assert_eq!(seqs, (1..=80).collect::<BTreeSet<u64>>());
    assert_eq!(store.increment_calls(), 16);
}

/// Negative control: the race test must catch a store that reads then writes.
#[tokio::test]
async fn race_detector_catches_non_atomic_store() {
    let allocator = IdAllocator::new(Arc::new(NonAtomicCounterStore::new()));

    let results = join_all((0..10).map(|_| allocator.allocate("US"))).await;
    let ids: Vec<_> = results.into_iter().map(Result::unwrap).collect();

    let distinct: HashSet<_> = ids.iter().map(AllocatedId::as_str).collect();
    assert!(
        distinct.len() < ids.len(),
        "read-then-write store should have issued duplicates"
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn no_lost_updates_for_any_code_and_worker_count(
        code in entity_code(),
        workers in 1usize..24,
        per_worker in 1usize..20,
    ) {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(4)
            .enable_all()
            .build()
            .unwrap();

        let store = InMemoryCounterStore::new();
        let allocator = allocator_over(&store);

        let ids = runtime.block_on(async {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    let allocator = allocator.clone();
                    let code = code.clone();
                    tokio::spawn(async move {
                        let mut ids = Vec::new();
                        for _ in 0..per_worker {
                            ids.push(allocator.allocate_code(&code).await.unwrap());
                        }
                        ids
                    })
                })
                .collect();
            let mut all = Vec::new();
            for handle in handles {
                all.extend(handle.await.unwrap());
            }
            all
        });

        let total = workers * per_worker;
        let distinct: HashSet<_> = ids.iter().map(|id| id.as_str().to_string()).collect();
        prop_assert_eq!(distinct.len(), total);

        let seqs: BTreeSet<_> = ids.iter().map(AllocatedId::seq).collect();
        prop_assert_eq!(seqs, (1..=total as u64).collect::<BTreeSet<_>>());
    }

    #[test]
    fn registered_kinds_format_with_their_code(kind in entity_kind(), warmup in 0u64..200) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let store = InMemoryCounterStore::new();
        store.seed(&kind.entity_code(), warmup).unwrap();
        let allocator = allocator_over(&store);

        let id = runtime.block_on(allocator.allocate_kind(kind)).unwrap();

        prop_assert_eq!(id.code().as_str(), kind.code());
        prop_assert_eq!(id.seq(), warmup + 1);
        prop_assert_eq!(id.as_str(), format!("{}{:05}", kind.code(), warmup + 1));
    }
}
