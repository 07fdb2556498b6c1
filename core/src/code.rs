//! Entity-type codes used as ID prefixes and counter keys.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Shortest accepted code.
pub const MIN_CODE_LEN: usize = 2;

/// Longest accepted code.
pub const MAX_CODE_LEN: usize = 6;

/// Error returned when a string is not a valid entity code.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseEntityCodeError {
    /// The input was empty.
    #[error("Entity code cannot be empty")]
    Empty,

    /// The input length is outside `MIN_CODE_LEN..=MAX_CODE_LEN`.
    #[error("Entity code {code:?} must be {MIN_CODE_LEN}-{MAX_CODE_LEN} letters, got {len}")]
    Length {
        /// The rejected input.
        code: String,
        /// Its length in bytes.
        len: usize,
    },

    /// The input contains something other than `A`-`Z`.
    #[error("Entity code {0:?} must contain only uppercase ASCII letters")]
    Charset(String),
}

/// Validated entity-type code, e.g. `US` for users or `EV` for events.
///
/// A code is 2-6 uppercase ASCII letters. It is both the prefix of every
/// identifier issued for that entity type and the key of its counter row.
///
/// Unlike `EntityKind`, any well-formed code is accepted here: an unknown code
/// simply starts a fresh counter at 1.
///
/// # Examples
///
/// ```
/// use seqid_core::EntityCode;
///
/// let code = EntityCode::new("EV").unwrap();
/// assert_eq!(code.as_str(), "EV");
///
/// assert!(EntityCode::new("ev").is_err());
/// assert!(EntityCode::new("E").is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityCode(String);

impl EntityCode {
    /// Validate and wrap a code.
    ///
    /// # Errors
    ///
    /// Returns [`ParseEntityCodeError`] if `code` is empty, has the wrong length,
    /// or contains anything other than `A`-`Z`.
    pub fn new(code: &str) -> Result<Self, ParseEntityCodeError> {
        validate(code)?;
        Ok(Self(code.to_string()))
    }

    /// Wrap a code from the compile-time registry without re-validating it.
    pub(crate) fn from_registry(code: &'static str) -> Self {
        Self(code.to_string())
    }

    /// Get the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert into the inner `String`.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

fn validate(code: &str) -> Result<(), ParseEntityCodeError> {
    if code.is_empty() {
        return Err(ParseEntityCodeError::Empty);
    }
    if !code.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(ParseEntityCodeError::Charset(code.to_string()));
    }
    let len = code.len();
    if !(MIN_CODE_LEN..=MAX_CODE_LEN).contains(&len) {
        return Err(ParseEntityCodeError::Length {
            code: code.to_string(),
            len,
        });
    }
    Ok(())
}

impl fmt::Display for EntityCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for EntityCode {
    type Err = ParseEntityCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for EntityCode {
    type Error = ParseEntityCodeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        validate(&s)?;
        Ok(Self(s))
    }
}

impl From<EntityCode> for String {
    fn from(code: EntityCode) -> Self {
        code.0
    }
}

impl AsRef<str> for EntityCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
