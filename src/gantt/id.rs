//! Item identifiers.
//!
//! Ids arrive either as JSON integers (durable, server-assigned) or as
//! strings. A string starting with [`TEMP_ID_PREFIX`] is a placeholder the
//! Gantt widget mints before the server has seen the item.
//!
//! Every id comparison in the crate goes through [`ItemId::key`], so `1` and
//! `"1"` name the same item.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Scheme prefix marking a client-generated placeholder id.
pub const TEMP_ID_PREFIX: &str = "temp://";

/// A task, link or user identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemId {
    /// A numeric id.
    Number(i64),
    /// A textual id, possibly temporary.
    Text(String),
}

impl ItemId {
    /// The root parent id.
    pub const ROOT: Self = Self::Number(0);

    /// The string key used for all id comparisons.
    #[must_use]
    pub fn key(&self) -> String {
        self.to_string()
    }

    /// The numeric value, if this id is a number.
    #[must_use]
    pub const fn as_number(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }

    /// Whether this is a client placeholder id.
    #[must_use]
    pub fn is_temporary(&self) -> bool {
        matches!(self, Self::Text(text) if is_temporary_key(text))
    }

    /// Whether this id points at the root (`0` or `"0"`).
    #[must_use]
    pub fn is_root(&self) -> bool {
        match self {
            Self::Number(n) => *n == 0,
            Self::Text(text) => text == "0",
        }
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

impl From<i64> for ItemId {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Check whether a raw id string (e.g. a path segment) is a placeholder.
#[must_use]
pub fn is_temporary_key(key: &str) -> bool {
    key.starts_with(TEMP_ID_PREFIX)
}

/// The next free numeric id: one past the largest numeric id, or `1`.
///
/// Textual ids are ignored, as are negative numbers.
pub fn next_numeric_id<'a>(ids: impl IntoIterator<Item = &'a ItemId>) -> i64 {
    ids.into_iter().filter_map(ItemId::as_number).fold(0, i64::max) + 1
}
