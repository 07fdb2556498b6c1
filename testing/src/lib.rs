//! # seqid Testing
//!
//! Testing utilities for code that allocates IDs.
//!
//! This crate provides:
//! - In-memory counter stores (atomic, failing, and a deliberately non-atomic control)
//! - A fixed clock for deterministic `created_at` values
//! - proptest strategies for codes and entity kinds
//! - A tracing initializer for test output
//!
//! ## Example
//!
//! ```
//! use seqid_core::IdAllocator;
//! use seqid_testing::InMemoryCounterStore;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let allocator = IdAllocator::new(Arc::new(InMemoryCounterStore::new()));
//! let id = allocator.allocate("US").await?;
//! assert_eq!(id.as_str(), "US00001");
//! # Ok(())
//! # }
//! ```

pub mod counter_mocks;

/// Mock implementations for testing.
pub mod mocks {
    use chrono::{DateTime, Utc};
    use seqid_core::environment::Clock;

    pub use crate::counter_mocks::{
        FailingCounterStore, InMemoryCounterStore, NonAtomicCounterStore,
    };

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use seqid_testing::mocks::FixedClock;
    /// use seqid_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Test helpers and utilities.
pub mod helpers {
    /// Install a `tracing` subscriber that writes through the test harness.
    ///
    /// Honours `RUST_LOG`; safe to call from every test.
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use proptest::prelude::*;
    use proptest::sample::select;
    use seqid_core::{EntityCode, EntityKind};

    /// Any well-formed entity code, registered or not.
    pub fn entity_code() -> impl Strategy<Value = EntityCode> {
        "[A-Z]{2,6}".prop_filter_map("valid entity code", |s| EntityCode::new(&s).ok())
    }

    /// Any registered entity kind.
    pub fn entity_kind() -> impl Strategy<Value = EntityKind> {
        select(EntityKind::ALL)
    }
}

// Re-export commonly used items
pub use counter_mocks::{FailingCounterStore, InMemoryCounterStore, NonAtomicCounterStore};
pub use mocks::{FixedClock, test_clock};
