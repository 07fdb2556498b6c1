//! Persisted counter state.

use crate::code::EntityCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of the counter table: the last sequence number issued for a code.
///
/// A record is created by the first allocation for its code, advanced in place by
/// every later one, and never deleted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterRecord {
    /// Counter key.
    pub code: EntityCode,
    /// Last sequence number handed out. Always at least 1.
    pub seq: u64,
    /// When the first allocation for this code happened.
    pub created_at: DateTime<Utc>,
}

impl CounterRecord {
    /// Create a record.
    #[must_use]
    pub const fn new(code: EntityCode, seq: u64, created_at: DateTime<Utc>) -> Self {
        Self {
            code,
            seq,
            created_at,
        }
    }
}
