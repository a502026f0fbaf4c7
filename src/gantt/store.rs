//! JSON file store.
//!
//! The whole store is one JSON document on disk. Every read loads it,
//! reconciles it (flatten and normalize tasks, migrate temporary ids,
//! enforce referential integrity) and writes it back only if reconciliation
//! changed something. Mutations go through [`JsonFileStore::update`], which
//! holds the store lock across the read-modify-write cycle.

use crate::error::{Error, Result};
use crate::gantt::flatten::flatten_document;
use crate::gantt::integrity::{enforce_referential_integrity, IntegrityReport};
use crate::gantt::migrate::{migrate_temporary_ids, IdMigration};
use crate::gantt::models::{Document, RawDocument};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Default data file location, relative to the working directory.
pub const DEFAULT_DATA_FILE: &str = "data/tasks.json";

/// What reconciling the data file did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Temporary ids replaced during this read.
    pub migration: IdMigration,
    /// Links and parents pruned during this read.
    pub integrity: IntegrityReport,
    /// Whether the reconciled document differs from what was on disk.
    pub rewritten: bool,
}

/// File-backed store for the Gantt document.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    /// Create a store backed by the file at `path`.
    ///
    /// Nothing is touched on disk until the first read or write.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf(), lock: Mutex::new(()) }
    }

    /// Get the data file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the data file exists.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load and reconcile the document, persisting it if reconciliation
    /// changed anything.
    ///
    /// A missing data file is created as an empty document first.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or written.
    pub fn read(&self) -> Result<Document> {
        self.reconcile().map(|(doc, _)| doc)
    }

    /// Like [`Self::read`], also returning what reconciliation did.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or written.
    pub fn reconcile(&self) -> Result<(Document, ReconcileReport)> {
        let _guard = self.lock();
        let (doc, report) = self.load()?;
        if report.rewritten {
            self.persist(&doc)?;
        }
        Ok((doc, report))
    }

    /// Persist `doc` unconditionally.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write(&self, doc: &Document) -> Result<()> {
        let _guard = self.lock();
        self.persist(doc)
    }

    /// Read, apply `mutate`, and write back, holding the store lock the
    /// whole time.
    ///
    /// When `mutate` fails nothing it did is written, though a reconciled
    /// document still is.
    ///
    /// # Errors
    ///
    /// Returns the error from `mutate`, or an error if the file cannot be
    /// read, parsed, or written.
    pub fn update<T>(&self, mutate: impl FnOnce(&mut Document) -> Result<T>) -> Result<T> {
        let _guard = self.lock();
        let (mut doc, report) = self.load()?;
        let original = report.rewritten.then(|| doc.clone());

        match mutate(&mut doc) {
            Ok(value) => {
                self.persist(&doc)?;
                Ok(value)
            }
            Err(e) => {
                if let Some(reconciled) = original {
                    self.persist(&reconciled)?;
                }
                Err(e)
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load and reconcile without writing. Caller holds the lock.
    fn load(&self) -> Result<(Document, ReconcileReport)> {
        self.ensure_file()?;

        let content = std::fs::read_to_string(&self.path)?;
        let on_disk: Value = serde_json::from_str(&content).map_err(|source| self.invalid(source))?;
        let raw: RawDocument =
            serde_json::from_value(on_disk.clone()).map_err(|source| self.invalid(source))?;

        let mut doc = flatten_document(raw);
        let migration = migrate_temporary_ids(&mut doc);
        let integrity = enforce_referential_integrity(&mut doc);
        let rewritten = serde_json::to_value(&doc)? != on_disk;

        if !migration.is_empty() {
            tracing::info!(
                path = %self.path.display(),
                assignments = ?migration.assignments,
                "migrated temporary task ids"
            );
        }
        if !integrity.is_empty() {
            tracing::info!(
                path = %self.path.display(),
                links_dropped = integrity.links_dropped,
                parents_reset = ?integrity.parents_reset,
                "pruned dangling references"
            );
        }
        if rewritten {
            tracing::debug!(path = %self.path.display(), "data file needs rewrite");
        }

        Ok((doc, ReconcileReport { migration, integrity, rewritten }))
    }

    fn ensure_file(&self) -> Result<()> {
        if self.path.exists() {
            return Ok(());
        }
        tracing::info!(path = %self.path.display(), "creating empty data file");
        self.persist(&Document::empty())
    }

    /// Write through a sibling temp file so readers never see a partial document.
    fn persist(&self, doc: &Document) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(doc)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn invalid(&self, source: serde_json::Error) -> Error {
        Error::InvalidDataFile { path: self.path.clone(), source }
    }
}
