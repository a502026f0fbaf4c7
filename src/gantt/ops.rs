//! Collection and item operations on an in-memory [`Document`].
//!
//! These are the mutations behind the HTTP handlers. They never touch the
//! disk; callers run them inside [`crate::gantt::JsonFileStore::update`].

use crate::error::{Error, Result};
use crate::gantt::flatten::{flatten_tasks, normalize_task};
use crate::gantt::id::{is_temporary_key, next_numeric_id, ItemId};
use crate::gantt::models::{Document, Link, Task, TaskDraft, TaskEntry, User};
use serde::Serialize;
use std::collections::HashSet;

/// Outcome of [`upsert_task`].
#[derive(Debug, Clone, PartialEq)]
pub enum TaskUpsert {
    /// A new task was stored under a fresh numeric id.
    Created(Task),
    /// An existing task was updated in place.
    Updated(Task),
}

/// The children of one parent plus the links that touch them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Subtree {
    /// Tasks whose parent matches.
    pub tasks: Vec<Task>,
    /// Links with an endpoint among those tasks.
    pub links: Vec<Link>,
}

fn has_key(id: Option<&ItemId>, key: &str) -> bool {
    id.is_some_and(|id| id.key() == key)
}

fn next_task_id(doc: &Document) -> i64 {
    next_numeric_id(doc.tasks.iter().filter_map(|task| task.id.as_ref()))
}

fn next_link_id(doc: &Document) -> i64 {
    next_numeric_id(doc.links.iter().filter_map(|link| link.id.as_ref()))
}

/// Append a new task.
///
/// A client id is kept unless it is missing or temporary, in which case the
/// next numeric id is allocated.
pub fn create_task(doc: &mut Document, mut draft: TaskDraft) -> Task {
    if draft.id.as_ref().map_or(true, ItemId::is_temporary) {
        draft.id = Some(ItemId::Number(next_task_id(doc)));
    }
    let task = normalize_task(draft);
    doc.tasks.push(task.clone());
    task
}

/// Create or update the task addressed by `key`.
///
/// A temporary `key` always creates a new task with a fresh numeric id,
/// ignoring any id in the patch. Otherwise the patch is merged over the
/// stored task, which keeps its stored id.
///
/// # Errors
///
/// Returns [`Error::TaskNotFound`] if `key` is not temporary and matches no task.
pub fn upsert_task(doc: &mut Document, key: &str, mut patch: TaskDraft) -> Result<TaskUpsert> {
    if is_temporary_key(key) {
        patch.id = None;
        return Ok(TaskUpsert::Created(create_task(doc, patch)));
    }

    let index = doc
        .tasks
        .iter()
        .position(|task| has_key(task.id.as_ref(), key))
        .ok_or_else(|| Error::TaskNotFound(key.to_string()))?;
    let task = merge_into(&mut doc.tasks[index], patch);
    Ok(TaskUpsert::Updated(task))
}

fn merge_into(slot: &mut Task, patch: TaskDraft) -> Task {
    let mut draft = TaskDraft::from(std::mem::take(slot));
    let id = draft.id.clone();
    draft.merge(patch);
    draft.id = id;
    *slot = normalize_task(draft);
    slot.clone()
}

/// Remove the task addressed by `key`.
///
/// Links and children that pointed at it are left for the integrity pass on
/// the next read.
///
/// # Errors
///
/// Returns [`Error::TaskNotFound`] if nothing was removed.
pub fn delete_task(doc: &mut Document, key: &str) -> Result<Task> {
    let index = doc
        .tasks
        .iter()
        .position(|task| has_key(task.id.as_ref(), key))
        .ok_or_else(|| Error::TaskNotFound(key.to_string()))?;
    Ok(doc.tasks.remove(index))
}

/// Replace the whole task collection.
pub fn replace_tasks(doc: &mut Document, entries: Vec<TaskEntry>) -> Vec<Task> {
    doc.tasks = flatten_tasks(entries);
    doc.tasks.clone()
}

/// Append a new link, allocating an id if the client sent none.
pub fn create_link(doc: &mut Document, mut link: Link) -> Link {
    if link.id.is_none() {
        link.id = Some(ItemId::Number(next_link_id(doc)));
    }
    doc.links.push(link.clone());
    link
}

/// Merge `patch` over the link addressed by `key`; the stored id is kept.
///
/// # Errors
///
/// Returns [`Error::LinkNotFound`] if no link matches.
pub fn update_link(doc: &mut Document, key: &str, patch: Link) -> Result<Link> {
    let link = doc
        .links
        .iter_mut()
        .find(|link| has_key(link.id.as_ref(), key))
        .ok_or_else(|| Error::LinkNotFound(key.to_string()))?;
    let id = link.id.clone();
    link.merge(patch);
    link.id = id;
    Ok(link.clone())
}

/// Remove the link addressed by `key`.
///
/// # Errors
///
/// Returns [`Error::LinkNotFound`] if nothing was removed.
pub fn delete_link(doc: &mut Document, key: &str) -> Result<Link> {
    let index = doc
        .links
        .iter()
        .position(|link| has_key(link.id.as_ref(), key))
        .ok_or_else(|| Error::LinkNotFound(key.to_string()))?;
    Ok(doc.links.remove(index))
}

/// Replace the whole link collection.
pub fn replace_links(doc: &mut Document, links: Vec<Link>) -> Vec<Link> {
    doc.links = links;
    doc.links.clone()
}

/// Replace the user catalogue.
pub fn replace_users(doc: &mut Document, users: Vec<User>) -> Vec<User> {
    doc.users = Some(users.clone());
    users
}

/// Tasks directly under `parent_key`, plus the links touching them.
///
/// A task with no parent matches the empty key.
#[must_use]
pub fn subtree(doc: &Document, parent_key: &str) -> Subtree {
    let tasks: Vec<Task> = doc
        .tasks
        .iter()
        .filter(|task| task.parent.as_ref().map(ItemId::key).unwrap_or_default() == parent_key)
        .cloned()
        .collect();
    let keys: HashSet<String> =
        tasks.iter().filter_map(|task| task.id.as_ref()).map(ItemId::key).collect();
    let links = doc
        .links
        .iter()
        .filter(|link| keys.iter().any(|key| link.touches(key)))
        .cloned()
        .collect();
    Subtree { tasks, links }
}

fn numeric_index(doc: &Document, id: i64) -> Result<usize> {
    doc.tasks
        .iter()
        .position(|task| task.id.as_ref().and_then(ItemId::as_number) == Some(id))
        .ok_or_else(|| Error::TaskNotFound(id.to_string()))
}

/// Merge `patch` over the task whose id is the number `id`.
///
/// Textual ids never match, even `"5"` for `5`. Unlike the old server's raw
/// object merge, the result is normalized like any other task update.
///
/// # Errors
///
/// Returns [`Error::TaskNotFound`] if no numeric id matches.
pub fn update_task_numeric(doc: &mut Document, id: i64, patch: TaskDraft) -> Result<Task> {
    let index = numeric_index(doc, id)?;
    Ok(merge_into(&mut doc.tasks[index], patch))
}

/// Remove the task whose id is the number `id`.
///
/// # Errors
///
/// Returns [`Error::TaskNotFound`] if no numeric id matches.
pub fn delete_task_numeric(doc: &mut Document, id: i64) -> Result<Task> {
    let index = numeric_index(doc, id)?;
    Ok(doc.tasks.remove(index))
}
