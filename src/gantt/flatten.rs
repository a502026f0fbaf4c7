//! Task flattening: unwrap task entries and normalize their dates.

use crate::gantt::dates;
use crate::gantt::models::{Document, RawDocument, Task, TaskDraft, TaskEntry};

/// Flatten a heterogeneous task list into normalized tasks.
///
/// Wrapped entries are unwrapped (the outer id fills in a missing inner
/// id) and every task goes through [`normalize_task`].
pub fn flatten_tasks(entries: impl IntoIterator<Item = TaskEntry>) -> Vec<Task> {
    entries.into_iter().map(|entry| normalize_task(entry.into_draft())).collect()
}

/// Turn a raw document into a [`Document`] with flattened, normalized tasks.
///
/// Missing or null `tasks`/`links` become empty lists. Links, scales, users
/// and unknown top-level keys otherwise pass through as-is.
#[must_use]
pub fn flatten_document(raw: RawDocument) -> Document {
    Document {
        tasks: flatten_tasks(raw.tasks.unwrap_or_default()),
        links: raw.links.unwrap_or_default(),
        scales: raw.scales,
        users: raw.users,
        extra: raw.extra,
    }
}

/// Normalize one draft into a persisted task.
///
/// `start`/`end` become canonical timestamps. A missing side is derived
/// from the other plus a numeric `duration` in days; anything that cannot be
/// resolved is left absent. Other fields are untouched.
#[must_use]
pub fn normalize_task(draft: TaskDraft) -> Task {
    let duration_days = draft.duration_days();
    let (start, end) = dates::resolve_span(draft.start.as_ref(), draft.end.as_ref(), duration_days);

    Task { id: draft.id, start, end, parent: draft.parent, extra: draft.extra }
}
