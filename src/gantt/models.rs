//! Record types for the Gantt store.
//!
//! Every record keeps the fields it does not model in a flattened `extra`
//! map, so whatever the Gantt widget attaches to a task or link survives a
//! round trip through the server untouched.

use crate::gantt::id::ItemId;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A normalized task, as persisted.
///
/// Only the fields the store interprets are typed. Everything else (`text`,
/// `type`, `progress`, `assigned`, `duration`, ...) stays in `extra` exactly
/// as the client sent it, whatever its JSON shape.
///
/// `start` and `end` are canonical timestamps (see [`crate::gantt::dates`]);
/// they are absent rather than null when unknown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Task id. Numeric once persisted; may still be a `temp://` placeholder
    /// until the next store read migrates it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ItemId>,
    /// Canonical start timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    /// Canonical end timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    /// Id of the containing task; `0` is the root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ItemId>,
    /// Any other fields, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Task {
    /// The parent id, if present and not the root.
    #[must_use]
    pub fn non_root_parent(&self) -> Option<&ItemId> {
        self.parent.as_ref().filter(|parent| !parent.is_root())
    }

    /// An untyped field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.extra.get(name)
    }

    /// Display text, when it is a string.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.field("text").and_then(Value::as_str)
    }

    /// Duration in days. Only a JSON number counts.
    #[must_use]
    pub fn duration_days(&self) -> Option<f64> {
        duration_days(&self.extra)
    }
}

fn duration_days(extra: &Map<String, Value>) -> Option<f64> {
    extra.get("duration").and_then(Value::as_f64)
}

/// Keeps an explicit `null` as `Some(Value::Null)` so a patch can tell it
/// apart from an absent key.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// A task as received from a client or read from disk, before normalization.
///
/// Dates may be in any shape the date normalizer accepts. Every field is
/// optional so the same type doubles as a partial update; an explicit
/// `"start": null` or `"end": null` is kept and clears that side on merge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskDraft {
    /// Task id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ItemId>,
    /// Raw start value.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub start: Option<Value>,
    /// Raw end value.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub end: Option<Value>,
    /// Parent id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ItemId>,
    /// Any other fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TaskDraft {
    /// Set an untyped field.
    #[must_use]
    pub fn with_field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(name.to_string(), value.into());
        self
    }

    /// Duration in days. Only a JSON number counts.
    #[must_use]
    pub fn duration_days(&self) -> Option<f64> {
        duration_days(&self.extra)
    }

    /// Overlay `patch` on this draft: every field the patch carries wins,
    /// including explicit nulls.
    pub fn merge(&mut self, patch: Self) {
        if patch.id.is_some() {
            self.id = patch.id;
        }
        if patch.start.is_some() {
            self.start = patch.start;
        }
        if patch.end.is_some() {
            self.end = patch.end;
        }
        if patch.parent.is_some() {
            self.parent = patch.parent;
        }
        self.extra.extend(patch.extra);
    }
}

impl From<Task> for TaskDraft {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            start: task.start.map(Value::String),
            end: task.end.map(Value::String),
            parent: task.parent,
            extra: task.extra,
        }
    }
}

/// One element of a task list: either a bare task or a `{ task, id }` wrapper.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TaskEntry {
    /// A task nested under a `task` key, optionally with its own outer id.
    Wrapped {
        /// The wrapped task.
        task: TaskDraft,
        /// Outer id, used only when the inner task has none.
        #[serde(default)]
        id: Option<ItemId>,
    },
    /// A bare task.
    Bare(TaskDraft),
}

impl TaskEntry {
    /// Unwrap into a draft, taking the outer id when the inner one is missing.
    #[must_use]
    pub fn into_draft(self) -> TaskDraft {
        match self {
            Self::Wrapped { mut task, id } => {
                if task.id.is_none() {
                    task.id = id;
                }
                task
            }
            Self::Bare(task) => task,
        }
    }
}

impl From<TaskDraft> for TaskEntry {
    fn from(draft: TaskDraft) -> Self {
        Self::Bare(draft)
    }
}

/// A dependency link between two tasks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Link {
    /// Link id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ItemId>,
    /// Id of the predecessor task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ItemId>,
    /// Id of the successor task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<ItemId>,
    /// Relation metadata (`type`, lag, ...), preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Link {
    /// Overlay `patch` on this link.
    pub fn merge(&mut self, patch: Self) {
        if patch.id.is_some() {
            self.id = patch.id;
        }
        if patch.source.is_some() {
            self.source = patch.source;
        }
        if patch.target.is_some() {
            self.target = patch.target;
        }
        self.extra.extend(patch.extra);
    }

    /// Whether either endpoint is the task with the given key.
    #[must_use]
    pub fn touches(&self, key: &str) -> bool {
        [&self.source, &self.target].into_iter().flatten().any(|id| id.key() == key)
    }
}

/// A user that tasks can be assigned to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// User id.
    pub id: ItemId,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Avatar color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Any other fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The whole store document as persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Document {
    /// All tasks.
    pub tasks: Vec<Task>,
    /// All links.
    pub links: Vec<Link>,
    /// Timeline scale configuration, passed through untouched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scales: Option<Vec<Value>>,
    /// The user catalogue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub users: Option<Vec<User>>,
    /// Any other top-level keys.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Document {
    /// The document written when no data file exists yet.
    #[must_use]
    pub fn empty() -> Self {
        Self { scales: Some(Vec::new()), ..Self::default() }
    }

    /// Find a task by id key.
    #[must_use]
    pub fn task(&self, key: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id.as_ref().is_some_and(|id| id.key() == key))
    }
}

/// A store document as read from disk or received from a client, before
/// its tasks are flattened and normalized.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawDocument {
    /// Task entries in any accepted shape. `None` when missing or null.
    #[serde(default)]
    pub tasks: Option<Vec<TaskEntry>>,
    /// Links. `None` when missing or null.
    #[serde(default)]
    pub links: Option<Vec<Link>>,
    /// Timeline scales.
    #[serde(default)]
    pub scales: Option<Vec<Value>>,
    /// Users.
    #[serde(default)]
    pub users: Option<Vec<User>>,
    /// Any other top-level keys.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
