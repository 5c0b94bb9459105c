//! Bind key identifier type.
//!
//! A [`BindKey`] names a secondary database connection. The primary
//! connection has no key; everywhere in this crate it is spelled
//! `Option<BindKey>::None`.

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Logical name routing a model to a specific database connection.
///
/// # Examples
///
/// ```
/// use bindery_binds::BindKey;
///
/// let key = BindKey::new("reporting");
/// assert_eq!(key.as_str(), "reporting");
/// assert_eq!(key.to_string(), "reporting");
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BindKey(String);

impl BindKey {
    /// Creates a bind key from the given string.
    ///
    /// Use [`BindKey::parse`] when the input comes from outside the program
    /// and may be empty.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Creates a bind key, rejecting empty strings.
    pub fn parse(key: impl Into<String>) -> Result<Self, ConfigError> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(ConfigError::EmptyBindKey);
        }
        Ok(Self(key))
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BindKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BindKey({:?})", self.0)
    }
}

impl fmt::Display for BindKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BindKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<&str> for BindKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for BindKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl AsRef<str> for BindKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for BindKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Formats an optional bind key for log output.
pub(crate) fn display_bind(bind: Option<&BindKey>) -> &str {
    bind.map(BindKey::as_str).unwrap_or("<default>")
}
