//! # seqid Core
//!
//! Human-readable sequential identifiers for domain entities.
//!
//! Every entity in the platform (user, event, blog, advert, ...) gets a compact
//! prefixed identifier such as `US00001` or `EV00042`. The numeric part comes from
//! a per-code counter that lives in a durable store and is advanced with a single
//! atomic increment-and-get, so concurrent requests across processes never receive
//! the same identifier.
//!
//! ## Core Concepts
//!
//! - **`EntityCode`**: validated 2-6 letter uppercase prefix (`US`, `EV`, `LPD`)
//! - **`EntityKind`**: typed registry of the platform's entity kinds and their codes
//! - **`CounterStore`**: durable store exposing an atomic increment primitive
//! - **`IdAllocator`**: turns one increment into one formatted `AllocatedId`
//!
//! ## Example
//!
//! ```ignore
//! use seqid_core::{EntityKind, IdAllocator};
//! use std::sync::Arc;
//!
//! async fn register_user(store: Arc<dyn seqid_core::CounterStore>) -> Result<(), Box<dyn std::error::Error>> {
//!     let allocator = IdAllocator::new(store);
//!
//!     let id = allocator.allocate_kind(EntityKind::User).await?;
//!     assert!(id.as_str().starts_with("US"));
//!
//!     // insert the user row with `id` ...
//!     Ok(())
//! }
//! ```

pub mod allocator;
pub mod code;
pub mod environment;
pub mod id;
pub mod kind;
pub mod record;
pub mod store;

// Re-export commonly used types
pub use allocator::{AllocationError, IdAllocator, MAX_BATCH};
pub use chrono::{DateTime, Utc};
pub use code::{EntityCode, ParseEntityCodeError};
pub use id::{AllocatedId, DEFAULT_MIN_WIDTH, MAX_WIDTH, ParseAllocatedIdError, format_id};
pub use kind::{EntityKind, UnknownEntityKind};
pub use record::CounterRecord;
pub use store::{CounterStore, PersistenceError};
