//! Request body schemas.
//!
//! Each endpoint accepts a small closed set of body shapes. Anything else is
//! rejected with [`Error::InvalidPayload`] instead of being coerced.

use crate::error::{Error, Result};
use crate::gantt::models::{Link, TaskEntry, User};
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Body of `POST /api/tasks` (and `PUT /api/tasks/:id`, which only accepts
/// the single form).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TasksPayload {
    /// Replace the whole collection.
    Replace(Vec<TaskEntry>),
    /// A single task, bare or wrapped.
    Single(TaskEntry),
}

/// A single link, bare or nested under `link`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LinkEntry {
    /// `{ "link": { ... } }`
    Wrapped {
        /// The wrapped link.
        link: Link,
    },
    /// A bare link.
    Bare(Link),
}

impl LinkEntry {
    /// Unwrap into the link.
    #[must_use]
    pub fn into_link(self) -> Link {
        match self {
            Self::Wrapped { link } | Self::Bare(link) => link,
        }
    }
}

/// Body of `POST /api/links`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LinksPayload {
    /// Replace the whole collection.
    Replace(Vec<Link>),
    /// A single link.
    Single(LinkEntry),
}

/// Body of `POST /api/users`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum UsersPayload {
    /// A bare list.
    List(Vec<User>),
    /// `{ "users": [...] }`; a missing key means an empty list.
    Wrapped {
        /// The users.
        #[serde(default)]
        users: Vec<User>,
    },
}

impl UsersPayload {
    /// The users, whichever shape they came in.
    #[must_use]
    pub fn into_users(self) -> Vec<User> {
        match self {
            Self::List(users) | Self::Wrapped { users } => users,
        }
    }
}

/// Body of `POST /auth/login`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LoginRequest {
    /// Plain-text password; missing means empty.
    #[serde(default)]
    pub password: String,
}

/// Parse a JSON request body.
///
/// # Errors
///
/// Returns [`Error::InvalidPayload`] carrying the serde message if the body
/// is not JSON or matches no accepted shape.
pub fn parse<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| Error::InvalidPayload(e.to_string()))
}
