//! Counter store trait and related types.
//!
//! This module defines the one piece of shared mutable state in the system: a durable
//! map from entity code to the last sequence number issued for it.
//!
//! # Design
//!
//! The trait exposes increment-and-get as a single operation on purpose. Implementations
//! must perform it as one indivisible step against the backing store (for example one
//! `INSERT ... ON CONFLICT DO UPDATE ... RETURNING` statement). A read followed by a
//! separate write admits a lost update: two callers read the same value, both add one,
//! and both hand out the same identifier.
//!
//! Mutual exclusion must come from the store itself. An application-level lock only
//! covers one process, and the allocator runs in many.
//!
//! # Implementations
//!
//! - `PostgresCounterStore` (in `seqid-postgres` crate): Production implementation
//! - `InMemoryCounterStore` (in `seqid-testing` crate): Fast, deterministic testing

use crate::code::EntityCode;
use crate::record::CounterRecord;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Boxed future returned by [`CounterStore`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, PersistenceError>> + Send + 'a>>;

/// Errors raised by a counter store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    /// The store could not be reached or the statement failed.
    #[error("Database error: {0}")]
    Database(String),

    /// The store returned a value that cannot be a sequence number.
    #[error("Corrupt counter for {code}: stored value {value}")]
    CorruptCounter {
        /// The counter's code.
        code: EntityCode,
        /// The offending stored value.
        value: i64,
    },

    /// The increment would exceed the range the store can represent.
    #[error("Counter for {code} overflowed")]
    Overflow {
        /// The counter's code.
        code: EntityCode,
    },
}

/// Durable, shared counter table keyed by entity code.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; one store is shared by every request
/// handler in the process.
///
/// # Dyn Compatibility
///
/// Methods return boxed futures instead of using `async fn` so the store can be
/// held as `Arc<dyn CounterStore>`.
pub trait CounterStore: Send + Sync {
    /// Atomically add `by` to the counter for `code` and return the new value.
    ///
    /// A missing counter is created with value `by`, as if it had been `0`.
    /// Concurrent calls for the same code are serialized by the store, so N calls
    /// with `by = 1` starting from `k` return exactly `k+1 ..= k+N`.
    ///
    /// Callers must pass `by >= 1`.
    ///
    /// # Errors
    ///
    /// - `Database`: the store is unreachable or the write failed
    /// - `Overflow`: the new value does not fit the store's integer type
    /// - `CorruptCounter`: the store returned a non-positive value
    fn increment<'a>(&'a self, code: &'a EntityCode, by: u64) -> StoreFuture<'a, u64>;

    /// Read the counter for `code` without changing it.
    ///
    /// Returns `None` if nothing has been allocated under `code` yet.
    ///
    /// # Errors
    ///
    /// - `Database`: the store is unreachable or the query failed
    /// - `CorruptCounter`: the stored value is not a valid sequence number
    fn load<'a>(&'a self, code: &'a EntityCode) -> StoreFuture<'a, Option<CounterRecord>>;

    /// Read every counter, ordered by code.
    ///
    /// # Errors
    ///
    /// - `Database`: the store is unreachable or the query failed
    /// - `CorruptCounter`: a stored value is not a valid sequence number
    fn list(&self) -> StoreFuture<'_, Vec<CounterRecord>>;
}
