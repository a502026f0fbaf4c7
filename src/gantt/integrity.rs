//! Referential integrity: prune links and parents that point at missing tasks.

use crate::gantt::id::ItemId;
use crate::gantt::models::Document;
use serde::Serialize;
use std::collections::HashSet;

/// What the integrity pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IntegrityReport {
    /// Links removed because an endpoint was missing or unknown.
    pub links_dropped: usize,
    /// Task ids whose parent was reset to the root.
    pub parents_reset: Vec<String>,
}

impl IntegrityReport {
    /// Whether the pass changed anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links_dropped == 0 && self.parents_reset.is_empty()
    }
}

/// Drop dangling links and reset orphaned parents to `0`.
///
/// Ids are compared by string key. A link survives only if both `source`
/// and `target` name an existing task. A parent is reset when it is present,
/// not the root, and names no existing task.
pub fn enforce_referential_integrity(doc: &mut Document) -> IntegrityReport {
    let known: HashSet<String> =
        doc.tasks.iter().filter_map(|task| task.id.as_ref()).map(ItemId::key).collect();
    let resolves = |id: &Option<ItemId>| id.as_ref().is_some_and(|id| known.contains(&id.key()));

    let before = doc.links.len();
    doc.links.retain(|link| resolves(&link.source) && resolves(&link.target));
    let mut report =
        IntegrityReport { links_dropped: before - doc.links.len(), ..IntegrityReport::default() };

    for task in &mut doc.tasks {
        let orphaned = task.non_root_parent().is_some_and(|parent| !known.contains(&parent.key()));
        if orphaned {
            task.parent = Some(ItemId::ROOT);
            report.parents_reset.push(task.id.as_ref().map(ItemId::key).unwrap_or_default());
        }
    }

    report
}
