//! Gantt chart data store.
//!
//! This module holds everything between the HTTP layer and the disk:
//! - Record types for tasks, links and users that keep unknown fields
//! - Date normalization to canonical UTC timestamps
//! - Flattening of wrapped task entries
//! - Migration of client placeholder ids to numeric ids
//! - Referential integrity between tasks, parents and links
//! - A JSON file store that reconciles on every read
//! - The document operations behind each endpoint
//!
//! # Example
//!
//! ```no_run
//! use gantt_server::gantt::{ops, JsonFileStore, TaskDraft};
//!
//! let store = JsonFileStore::new("/tmp/gantt/tasks.json");
//!
//! let task = store
//!     .update(|doc| {
//!         let draft = TaskDraft::default().with_field("text", "Kickoff");
//!         Ok(ops::create_task(doc, draft))
//!     })
//!     .unwrap();
//!
//! let doc = store.read().unwrap();
//! assert!(doc.task(&task.id.unwrap().key()).is_some());
//! ```

pub mod dates;
pub mod flatten;
pub mod id;
pub mod integrity;
pub mod migrate;
pub mod models;
pub mod ops;
pub mod payload;
pub mod store;

pub use id::{ItemId, TEMP_ID_PREFIX};
pub use integrity::IntegrityReport;
pub use migrate::{IdAssignment, IdMigration};
pub use models::{Document, Link, RawDocument, Task, TaskDraft, TaskEntry, User};
pub use ops::{Subtree, TaskUpsert};
pub use store::{JsonFileStore, ReconcileReport, DEFAULT_DATA_FILE};
