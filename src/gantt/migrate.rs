//! Temporary id migration.
//!
//! The Gantt widget gives new tasks `temp://<n>` ids and may persist them
//! (through a whole-collection replace) before the server ever assigns a
//! real id. This pass swaps each placeholder for a fresh numeric id and
//! rewrites every parent and link endpoint that referenced it.
//!
//! The pass is idempotent: once no task carries a temporary id it does
//! nothing, so it is safe to run on every store read.

use crate::gantt::id::{next_numeric_id, ItemId};
use crate::gantt::models::Document;
use serde::Serialize;
use std::collections::HashMap;

/// One placeholder and the numeric id that replaced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdAssignment {
    /// The placeholder id.
    pub temporary: String,
    /// The id that replaced it.
    pub assigned: i64,
}

/// Outcome of a migration pass, in allocation order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IdMigration {
    /// Placeholder → numeric id assignments.
    pub assignments: Vec<IdAssignment>,
}

impl IdMigration {
    /// Whether the pass changed anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

/// Replace every temporary task id in `doc` with a fresh numeric id.
///
/// Ids are allocated from one past the largest numeric task id, one per
/// distinct placeholder in first-seen order. Task ids, task parents and link
/// endpoints are all rewritten through the same mapping.
pub fn migrate_temporary_ids(doc: &mut Document) -> IdMigration {
    let mut next_id = next_numeric_id(doc.tasks.iter().filter_map(|task| task.id.as_ref()));
    let mut mapping: HashMap<String, i64> = HashMap::new();
    let mut migration = IdMigration::default();

    for id in doc.tasks.iter().filter_map(|task| task.id.as_ref()) {
        if !id.is_temporary() {
            continue;
        }
        let key = id.key();
        if mapping.contains_key(&key) {
            continue;
        }
        mapping.insert(key.clone(), next_id);
        migration.assignments.push(IdAssignment { temporary: key, assigned: next_id });
        next_id += 1;
    }

    if mapping.is_empty() {
        return migration;
    }

    for task in &mut doc.tasks {
        remap(&mut task.id, &mapping);
        remap(&mut task.parent, &mapping);
    }
    for link in &mut doc.links {
        remap(&mut link.source, &mapping);
        remap(&mut link.target, &mapping);
    }

    migration
}

fn remap(slot: &mut Option<ItemId>, mapping: &HashMap<String, i64>) {
    if let Some(ItemId::Text(text)) = slot {
        if let Some(&assigned) = mapping.get(text.as_str()) {
            *slot = Some(ItemId::Number(assigned));
        }
    }
}
