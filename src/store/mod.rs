//! Persistence layer.
//!
//! All state sits behind one `RwLock`. A write clones the entity tables, applies
//! the caller's closure to the clone, checks the schema constraints, persists and
//! only then swaps the clone in. Any error along the way leaves the live state
//! untouched, and the conflict checks a closure runs cannot race another writer.
//!
//! - [`tables`] - Entity tables and their constraints
//! - [`persist`] - Memory-only and JSON-file backends

mod persist;
mod tables;

pub use persist::{Database, JsonFile, MemoryOnly, Persist};
pub use tables::Tables;

use crate::models::{ChangeLogEntry, NewChange};
use chrono::Utc;
use std::path::PathBuf;
use std::sync::{RwLock, RwLockWriteGuard};
use thiserror::Error;

/// Failures of the storage layer itself.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Error serializing database: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Database file {path} is unreadable: {reason}")]
    Corrupt { path: PathBuf, reason: String },
    #[error("Store lock poisoned by a panicked writer")]
    LockPoisoned,
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),
    #[error("{table} {id} references missing block {block_id}")]
    ForeignKey {
        table: &'static str,
        id: i64,
        block_id: i64,
    },
    #[error("Duplicate {table} id {id}")]
    DuplicateId { table: &'static str, id: i64 },
    #[error("{table} {id} does not exist")]
    MissingRow { table: &'static str, id: i64 },
}

/// Transactional store over a [`Persist`] backend.
#[derive(Debug)]
pub struct Store<P: Persist = MemoryOnly> {
    db: RwLock<Database>,
    persist: P,
}

impl Store<MemoryOnly> {
    pub fn in_memory() -> Self {
        Store {
            db: RwLock::new(Database::default()),
            persist: MemoryOnly,
        }
    }
}

impl Store<JsonFile> {
    /// Open (or start) a JSON database file.
    pub fn open_file(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        Store::open(JsonFile::new(path))
    }
}

impl<P: Persist> Store<P> {
    /// Load whatever the backend holds and check it before use.
    pub fn open(persist: P) -> Result<Self, StoreError> {
        let db = persist.load()?.unwrap_or_default();
        db.tables.check_integrity()?;
        log::debug!(
            "Store opened with {} block(s) and {} change-log entries",
            db.tables.blocks().len(),
            db.changes.len()
        );
        Ok(Store {
            db: RwLock::new(db),
            persist,
        })
    }

    /// Run a query against a consistent view of the tables.
    pub fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> Result<T, StoreError> {
        let db = self.db.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(f(&db.tables))
    }

    /// Apply `mutate` atomically and keep the write lock for the audit step.
    ///
    /// On any error, from the closure, the integrity check or the backend, nothing
    /// is changed. On success the returned [`Committed`] still holds the lock, so the
    /// caller can export and log exactly the state it wrote.
    pub fn write<T, E, F>(&self, mutate: F) -> Result<Committed<'_, T, P>, E>
    where
        F: FnOnce(&mut Tables) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut db = self.db.write().map_err(|_| StoreError::LockPoisoned)?;
        let mut staged = db.tables.clone();
        let value = mutate(&mut staged)?;
        staged.check_integrity()?;

        std::mem::swap(&mut db.tables, &mut staged);
        if let Err(e) = self.persist.save(&db) {
            std::mem::swap(&mut db.tables, &mut staged);
            return Err(e.into());
        }
        Ok(Committed {
            db,
            persist: &self.persist,
            value,
        })
    }

    /// Append a change-log entry outside of a write.
    pub fn append_change(&self, change: NewChange) -> Result<ChangeLogEntry, StoreError> {
        let mut db = self.db.write().map_err(|_| StoreError::LockPoisoned)?;
        append(&mut db, &self.persist, change)
    }

    /// Newest entries first.
    pub fn recent_changes(&self, limit: usize) -> Result<Vec<ChangeLogEntry>, StoreError> {
        let db = self.db.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(db.changes.iter().rev().take(limit).cloned().collect())
    }

    /// Entries that carry a snapshot, newest first.
    pub fn snapshots(&self, limit: usize) -> Result<Vec<ChangeLogEntry>, StoreError> {
        let db = self.db.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(db
            .changes
            .iter()
            .rev()
            .filter(|c| c.is_snapshot())
            .take(limit)
            .cloned()
            .collect())
    }

    pub fn change(&self, id: i64) -> Result<Option<ChangeLogEntry>, StoreError> {
        let db = self.db.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(db.changes.iter().find(|c| c.id == id).cloned())
    }
}

fn append<P: Persist>(
    db: &mut Database,
    persist: &P,
    change: NewChange,
) -> Result<ChangeLogEntry, StoreError> {
    let last = db.changes.last();
    let now = Utc::now();
    let entry = ChangeLogEntry {
        id: last.map_or(1, |c| c.id + 1),
        timestamp: last.map_or(now, |c| now.max(c.timestamp)),
        action: change.action,
        block: change.block,
        details: change.details,
        content: change.content,
    };
    db.changes.push(entry.clone());
    if let Err(e) = persist.save(db) {
        db.changes.pop();
        return Err(e);
    }
    Ok(entry)
}

/// A committed write still holding the store's write lock.
pub struct Committed<'a, T, P: Persist> {
    db: RwLockWriteGuard<'a, Database>,
    persist: &'a P,
    value: T,
}

impl<T, P: Persist> Committed<'_, T, P> {
    /// The state as just committed.
    pub fn tables(&self) -> &Tables {
        &self.db.tables
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    /// Append to the change log before any other writer can commit.
    pub fn append_change(&mut self, change: NewChange) -> Result<ChangeLogEntry, StoreError> {
        append(&mut self.db, self.persist, change)
    }

    /// Release the lock and hand back the closure's result.
    pub fn into_value(self) -> T {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::action;

    #[test]
    fn test_failed_write_leaves_state_untouched() {
        let store = Store::in_memory();
        store
            .write(|t| t.insert_block("Production").map(|_| ()))
            .map(Committed::into_value)
            .unwrap();

        let result: Result<_, StoreError> = store.write(|t| {
            t.insert_block("Staging")?;
            t.insert_subnet(42, "orphan", "10.0.0.0/24", None)
        });
        assert!(matches!(result, Err(StoreError::ForeignKey { .. })));

        let names: Vec<String> = store
            .read(|t| t.blocks().into_iter().map(|b| b.name).collect())
            .unwrap();
        assert_eq!(names, ["Production"]);
    }

    #[test]
    fn test_change_log_ids_and_timestamps() {
        let store = Store::in_memory();
        let a = store
            .append_change(NewChange::new(action::ADD_BLOCK, "A", "Added block 'A'"))
            .unwrap();
        let change = NewChange::new(action::ADD_BLOCK, "B", "Added block 'B'");
        let snapshot = change.with_content("{}".into());
        let b = store.append_change(snapshot).unwrap();
        assert_eq!((a.id, b.id), (1, 2));
        assert!(a.timestamp <= b.timestamp);

        let recent = store.recent_changes(10).unwrap();
        assert_eq!(recent.iter().map(|c| c.id).collect::<Vec<_>>(), [2, 1]);
        let snapshots = store.snapshots(10).unwrap();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].id, 2);
        assert!(store.change(3).unwrap().is_none());
    }

    #[test]
    fn test_committed_logs_under_lock() {
        let store = Store::in_memory();
        let mut committed = store.write(|t| t.insert_block("Production")).unwrap();
        assert_eq!(committed.tables().blocks().len(), 1);
        let change = NewChange::new(action::ADD_BLOCK, "Production", "Added block 'Production'");
        let entry = committed.append_change(change).unwrap();
        assert_eq!(entry.block, "Production");
        let block = committed.into_value();
        assert_eq!(block.position, 1);
        assert_eq!(store.recent_changes(5).unwrap().len(), 1);
    }

    #[test]
    fn test_file_store_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ipam.json");
        {
            let store = Store::open_file(&path).unwrap();
            let mut committed = store.write(|t| t.insert_block("Production")).unwrap();
            committed
                .append_change(NewChange::new(action::ADD_BLOCK, "Production", "Added"))
                .unwrap();
        }
        let store = Store::open_file(&path).unwrap();
        let blocks = store.read(Tables::blocks).unwrap();
        assert_eq!(blocks[0].name, "Production");
        assert_eq!(store.recent_changes(5).unwrap().len(), 1);
    }
}
