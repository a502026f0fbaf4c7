//! `/api` handlers.
//!
//! Bodies are taken as raw bytes and parsed with [`payload::parse`] so a
//! malformed body produces the crate's typed 400 instead of axum's rejection.
//! Store access is blocking file I/O under a mutex, so every call goes
//! through [`with_store`] on tokio's blocking pool.

use crate::error::{Error, Result};
use crate::gantt::ops::{self, TaskUpsert};
use crate::gantt::payload::{self, LinkEntry, LinksPayload, TasksPayload, UsersPayload};
use crate::gantt::{
    flatten, Document, JsonFileStore, Link, RawDocument, Task, TaskDraft, TaskEntry, User,
};
use crate::server::AppState;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Query string of `GET /api`.
#[derive(Debug, Default, Deserialize)]
pub struct ParentQuery {
    id: Option<String>,
    parent: Option<String>,
    #[serde(rename = "parentId")]
    parent_id: Option<String>,
}

impl ParentQuery {
    fn parent_key(self) -> Option<String> {
        self.id.or(self.parent).or(self.parent_id)
    }
}

/// Run `f` against the store on the blocking pool.
async fn with_store<T, F>(state: &AppState, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&JsonFileStore) -> Result<T> + Send + 'static,
{
    let store = Arc::clone(&state.store);
    tokio::task::spawn_blocking(move || f(&store))
        .await
        .map_err(|e| Error::Io(std::io::Error::other(e.to_string())))?
}

fn require_data_file(store: &JsonFileStore) -> Result<()> {
    if store.exists() {
        Ok(())
    } else {
        Err(Error::DataFileMissing(store.path().to_path_buf()))
    }
}

fn ok() -> Json<Value> {
    Json(json!({"ok": true}))
}

/// `GET /api/data`
pub async fn get_document(State(state): State<AppState>) -> Result<Json<Document>> {
    Ok(Json(with_store(&state, JsonFileStore::read).await?))
}

/// `GET /api`: the whole document, or one parent's children.
pub async fn query_document(
    State(state): State<AppState>,
    Query(query): Query<ParentQuery>,
) -> Result<Response> {
    let doc = with_store(&state, JsonFileStore::read).await?;
    Ok(match query.parent_key() {
        Some(key) => Json(ops::subtree(&doc, &key)).into_response(),
        None => Json(doc).into_response(),
    })
}

/// `POST /api` and `POST /api/data`: replace the whole document.
pub async fn replace_document(State(state): State<AppState>, body: Bytes) -> Result<Json<Value>> {
    let raw: RawDocument = payload::parse(&body)?;
    let doc = flatten::flatten_document(raw);
    let (tasks, links) = (doc.tasks.len(), doc.links.len());
    with_store(&state, move |store| store.write(&doc)).await?;
    tracing::info!(tasks, links, "document replaced");
    Ok(ok())
}

/// `GET /api/tasks`
pub async fn list_tasks(State(state): State<AppState>) -> Result<Json<Vec<Task>>> {
    Ok(Json(with_store(&state, JsonFileStore::read).await?.tasks))
}

/// `POST /api/tasks`: an array replaces the collection, an object creates one task.
pub async fn post_tasks(State(state): State<AppState>, body: Bytes) -> Result<Response> {
    match payload::parse::<TasksPayload>(&body)? {
        TasksPayload::Replace(entries) => {
            let tasks = with_store(&state, move |store| {
                store.update(|doc| Ok(ops::replace_tasks(doc, entries)))
            })
            .await?;
            tracing::info!(count = tasks.len(), "tasks replaced");
            Ok(Json(json!({"ok": true, "tasks": tasks})).into_response())
        }
        TasksPayload::Single(entry) => {
            let draft = entry.into_draft();
            let task = with_store(&state, move |store| {
                store.update(|doc| Ok(ops::create_task(doc, draft)))
            })
            .await?;
            tracing::info!(id = ?task.id, "task created");
            Ok((StatusCode::CREATED, Json(task)).into_response())
        }
    }
}

/// `PUT /api/tasks/:id`: a temporary id creates, anything else merges.
pub async fn put_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Response> {
    let patch = payload::parse::<TaskEntry>(&body)?.into_draft();
    let key = id.clone();
    let outcome = with_store(&state, move |store| {
        require_data_file(store)?;
        store.update(|doc| ops::upsert_task(doc, &key, patch))
    })
    .await?;

    match outcome {
        TaskUpsert::Created(task) => {
            tracing::info!(temporary = %id, id = ?task.id, "task created from placeholder");
            Ok((StatusCode::CREATED, Json(task)).into_response())
        }
        TaskUpsert::Updated(task) => {
            tracing::info!(%id, "task updated");
            Ok(Json(task).into_response())
        }
    }
}

/// `DELETE /api/tasks/:id`
pub async fn delete_task(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>> {
    let key = id.clone();
    with_store(&state, move |store| {
        require_data_file(store)?;
        store.update(|doc| ops::delete_task(doc, &key))
    })
    .await?;
    tracing::info!(%id, "task deleted");
    Ok(ok())
}

/// `GET /api/links`
pub async fn list_links(State(state): State<AppState>) -> Result<Json<Vec<Link>>> {
    Ok(Json(with_store(&state, JsonFileStore::read).await?.links))
}

/// `POST /api/links`: an array replaces the collection, an object creates one link.
pub async fn post_links(State(state): State<AppState>, body: Bytes) -> Result<Response> {
    match payload::parse::<LinksPayload>(&body)? {
        LinksPayload::Replace(links) => {
            let links = with_store(&state, move |store| {
                store.update(|doc| Ok(ops::replace_links(doc, links)))
            })
            .await?;
            tracing::info!(count = links.len(), "links replaced");
            Ok(Json(json!({"ok": true, "links": links})).into_response())
        }
        LinksPayload::Single(entry) => {
            let link = entry.into_link();
            let link = with_store(&state, move |store| {
                store.update(|doc| Ok(ops::create_link(doc, link)))
            })
            .await?;
            tracing::info!(id = ?link.id, "link created");
            Ok((StatusCode::CREATED, Json(json!({"ok": true, "link": link}))).into_response())
        }
    }
}

/// `PUT /api/links/:id`
pub async fn put_link(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Value>> {
    let patch = payload::parse::<LinkEntry>(&body)?.into_link();
    let key = id.clone();
    let link = with_store(&state, move |store| {
        require_data_file(store)?;
        store.update(|doc| ops::update_link(doc, &key, patch))
    })
    .await?;
    tracing::info!(%id, "link updated");
    Ok(Json(json!({"ok": true, "link": link})))
}

/// `DELETE /api/links/:id`
pub async fn delete_link(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>> {
    let key = id.clone();
    with_store(&state, move |store| {
        require_data_file(store)?;
        store.update(|doc| ops::delete_link(doc, &key))
    })
    .await?;
    tracing::info!(%id, "link deleted");
    Ok(ok())
}

/// `GET /api/users`
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>> {
    Ok(Json(with_store(&state, JsonFileStore::read).await?.users.unwrap_or_default()))
}

/// `POST /api/users`
pub async fn post_users(State(state): State<AppState>, body: Bytes) -> Result<Json<Value>> {
    let users = payload::parse::<UsersPayload>(&body)?.into_users();
    let users = with_store(&state, move |store| {
        store.update(|doc| Ok(ops::replace_users(doc, users)))
    })
    .await?;
    tracing::info!(count = users.len(), "users replaced");
    Ok(Json(json!({"ok": true, "users": users})))
}

fn numeric_id(raw: &str) -> Result<i64> {
    raw.trim().parse().map_err(|_| Error::TaskNotFound(raw.to_string()))
}

/// `PUT /api/:id`: merge into the task with this numeric id.
///
/// The merged task is normalized, and a missing data file is created empty
/// (giving 404) rather than failing with 500 as the old server did.
pub async fn legacy_put_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Value>> {
    let id = numeric_id(&id)?;
    let patch: TaskDraft = payload::parse(&body)?;
    with_store(&state, move |store| {
        store.update(|doc| ops::update_task_numeric(doc, id, patch))
    })
    .await?;
    tracing::info!(id, "task updated by numeric id");
    Ok(ok())
}

/// `DELETE /api/:id`: remove the task with this numeric id.
pub async fn legacy_delete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let id = numeric_id(&id)?;
    with_store(&state, move |store| store.update(|doc| ops::delete_task_numeric(doc, id))).await?;
    tracing::info!(id, "task deleted by numeric id");
    Ok(ok())
}
