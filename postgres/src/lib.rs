//! `PostgreSQL` counter store for seqid.
//!
//! This crate provides the production [`CounterStore`](seqid_core::CounterStore)
//! implementation. Each allocation is a single
//! `INSERT ... ON CONFLICT DO UPDATE ... RETURNING` statement, so the counter row is
//! created and advanced atomically no matter how many processes share the database.
//!
//! - Lazy counter creation (no pre-seeding of codes)
//! - Embedded `sqlx` migration for the `id_counters` table
//! - Connection pooling configured from the environment
//!
//! # Example
//!
//! ```no_run
//! use seqid_postgres::{PostgresConfig, PostgresCounterStore};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = PostgresCounterStore::connect(&PostgresConfig::from_env()).await?;
//!     store.migrate().await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod store;

pub use config::PostgresConfig;
pub use store::PostgresCounterStore;
