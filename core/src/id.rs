//! Formatted identifiers handed out by the allocator.

use crate::code::{EntityCode, ParseEntityCodeError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Minimum number of digits in the numeric part of an identifier.
pub const DEFAULT_MIN_WIDTH: usize = 5;

/// Largest accepted minimum width: the number of digits in `u64::MAX`.
pub const MAX_WIDTH: usize = 20;

/// Render `code` followed by `seq`, zero-padded to at least `min_width` digits.
///
/// The width is a minimum, not a cap: once `seq` needs more digits the numeric
/// part grows instead of being truncated. `min_width` is capped at [`MAX_WIDTH`].
///
/// # Examples
///
/// ```
/// use seqid_core::format_id;
///
/// assert_eq!(format_id("US", 1, 5), "US00001");
/// assert_eq!(format_id("US", 99_999, 5), "US99999");
/// assert_eq!(format_id("US", 100_000, 5), "US100000");
/// ```
#[must_use]
pub fn format_id(code: &str, seq: u64, min_width: usize) -> String {
    let width = min_width.min(MAX_WIDTH);
    format!("{code}{seq:0>width$}")
}

/// Error returned when a string cannot be decoded into an [`AllocatedId`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseAllocatedIdError {
    /// The letters before the digits are not a valid entity code.
    #[error("Invalid ID prefix: {0}")]
    Prefix(#[from] ParseEntityCodeError),

    /// No digits follow the prefix, or a non-digit appears among them.
    #[error("ID {0:?} has no numeric part")]
    MissingDigits(String),

    /// The numeric part does not fit in a `u64`.
    #[error("ID {0:?} has an out-of-range sequence number")]
    OutOfRange(String),

    /// Sequences start at 1, so `0` is never issued.
    #[error("ID {0:?} has sequence number 0")]
    Zero(String),
}

/// An identifier issued by the allocator, e.g. `EV00042`.
///
/// Keeps the code and sequence number it was built from alongside the
/// formatted string, so callers can store the string and tests can compare
/// the numbers.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AllocatedId {
    code: EntityCode,
    seq: u64,
    value: String,
}

impl AllocatedId {
    /// Build an identifier from its parts.
    #[must_use]
    pub fn new(code: EntityCode, seq: u64, min_width: usize) -> Self {
        let value = format_id(code.as_str(), seq, min_width);
        Self { code, seq, value }
    }

    /// Decode an identifier string into code and sequence number.
    ///
    /// The original text is kept as-is, so `US1` and `US00001` decode to the
    /// same code and sequence but stay distinct values.
    ///
    /// # Errors
    ///
    /// Returns [`ParseAllocatedIdError`] if the prefix is not a valid code, the
    /// numeric part is missing or malformed, or the sequence is zero.
    pub fn parse(s: &str) -> Result<Self, ParseAllocatedIdError> {
        let split = s
            .find(|c: char| !c.is_ascii_uppercase())
            .unwrap_or(s.len());
        let (prefix, digits) = s.split_at(split);

        let code = EntityCode::new(prefix)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseAllocatedIdError::MissingDigits(s.to_string()));
        }
        let seq: u64 = digits
            .parse()
            .map_err(|_| ParseAllocatedIdError::OutOfRange(s.to_string()))?;
        if seq == 0 {
            return Err(ParseAllocatedIdError::Zero(s.to_string()));
        }

        Ok(Self {
            code,
            seq,
            value: s.to_string(),
        })
    }

    /// The entity code this identifier was issued under.
    #[must_use]
    pub const fn code(&self) -> &EntityCode {
        &self.code
    }

    /// The sequence number embedded in the identifier.
    #[must_use]
    pub const fn seq(&self) -> u64 {
        self.seq
    }

    /// The formatted identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Convert into the formatted `String`.
    #[must_use]
    pub fn into_string(self) -> String {
        self.value
    }
}

impl fmt::Display for AllocatedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl FromStr for AllocatedId {
    type Err = ParseAllocatedIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for AllocatedId {
    type Error = ParseAllocatedIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<AllocatedId> for String {
    fn from(id: AllocatedId) -> Self {
        id.into_string()
    }
}

impl AsRef<str> for AllocatedId {
    fn as_ref(&self) -> &str {
        &self.value
    }
}
