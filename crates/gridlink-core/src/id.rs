//! Globally addressable entity identifiers.
//!
//! Every entity in the grid (a service, an executor, a single task) is
//! named by an [`EntityId`]: a URL-like locator that is globally unique and
//! immutable once assigned. Service and executor identifiers are supplied
//! by callers (they name logical entities that may not exist yet); task
//! identifiers are minted by the task stream on append via [`EntityId::child`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// A globally unique, dereferenceable locator for a grid entity.
///
/// The shape is `scheme://authority/path`. Identifiers are opaque to the
/// store and the stream beyond equality; nothing in this crate ever
/// dereferences one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Parses and validates an identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidId`] if the value is not of the form
    /// `scheme://authority[/path]`, or contains whitespace or control
    /// characters.
    pub fn parse(value: impl Into<String>) -> Result<Self> {
        let value = value.into();

        if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(Error::InvalidId {
                message: format!("identifier contains whitespace or control characters: {value:?}"),
            });
        }

        let Some((scheme, rest)) = value.split_once("://") else {
            return Err(Error::InvalidId {
                message: format!("identifier is missing a scheme: {value}"),
            });
        };

        let valid_scheme = scheme
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic())
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.');
        if !valid_scheme {
            return Err(Error::InvalidId {
                message: format!("identifier has an invalid scheme: {value}"),
            });
        }

        if rest.is_empty() || rest.starts_with('/') {
            return Err(Error::InvalidId {
                message: format!("identifier is missing an authority: {value}"),
            });
        }

        Ok(Self(value))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Mints a sub-locator by appending `/segment`.
    ///
    /// The task stream uses this to derive task identifiers from their
    /// target: `grid://a/services/web/tasks/<id>` under `grid://a/services/web`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidId`] if `segment` is empty, absolute, or
    /// contains whitespace or control characters.
    pub fn child(&self, segment: &str) -> Result<Self> {
        if segment.is_empty() || segment.starts_with('/') {
            return Err(Error::InvalidId {
                message: format!("child segment must be a non-empty relative path: {segment:?}"),
            });
        }
        if segment.split('/').any(|s| s.is_empty() || s == "." || s == "..") {
            return Err(Error::InvalidId {
                message: format!("child segment contains empty or traversal components: {segment}"),
            });
        }
        Self::parse(format!("{}/{}", self.0.trim_end_matches('/'), segment))
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for EntityId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
