//! Durability backends for the [`super::Store`].

use super::{StoreError, Tables};
use crate::models::{Block, ChangeLogEntry, Container, Subnet};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Everything the store holds: entity tables plus the change log.
#[derive(Debug, Clone, Default)]
pub struct Database {
    pub tables: Tables,
    pub changes: Vec<ChangeLogEntry>,
}

/// Where committed state goes.
pub trait Persist: Send + Sync {
    /// Previously saved state, `None` when nothing has been saved yet.
    fn load(&self) -> Result<Option<Database>, StoreError>;
    /// Durably write the full state. Must not leave a partial write behind.
    fn save(&self, db: &Database) -> Result<(), StoreError>;
}

/// No durability: state lives only as long as the process.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryOnly;

impl Persist for MemoryOnly {
    fn load(&self) -> Result<Option<Database>, StoreError> {
        Ok(None)
    }

    fn save(&self, _db: &Database) -> Result<(), StoreError> {
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Default)]
struct DatabaseFile {
    #[serde(default)]
    blocks: Vec<Block>,
    #[serde(default)]
    containers: Vec<Container>,
    #[serde(default)]
    subnets: Vec<Subnet>,
    #[serde(default)]
    change_log: Vec<ChangeLogEntry>,
}

/// Single JSON document on disk, replaced atomically through a temp file and rename.
#[derive(Debug, Clone)]
pub struct JsonFile {
    path: PathBuf,
}

impl JsonFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFile { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn corrupt(&self, reason: String) -> StoreError {
        StoreError::Corrupt {
            path: self.path.clone(),
            reason,
        }
    }
}

impl Persist for JsonFile {
    fn load(&self) -> Result<Option<Database>, StoreError> {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let path = self.path.display();
                log::warn!("Database file not found, starting empty: {path}");
                return Ok(None);
            }
            Err(e) => return Err(self.io_error(e)),
        };
        log::info!("Reading database file: {}", self.path.display());

        let de = &mut serde_json::Deserializer::from_str(&json);
        let file: DatabaseFile =
            serde_path_to_error::deserialize(de).map_err(|e| self.corrupt(e.to_string()))?;

        let mut tables = Tables::new();
        for block in file.blocks {
            tables.restore_block(block)?;
        }
        for container in file.containers {
            tables.restore_container(container)?;
        }
        for subnet in file.subnets {
            tables.restore_subnet(subnet)?;
        }
        Ok(Some(Database {
            tables,
            changes: file.change_log,
        }))
    }

    fn save(&self, db: &Database) -> Result<(), StoreError> {
        let file = DatabaseFile {
            blocks: db.tables.blocks(),
            containers: db.tables.containers(),
            subnets: db.tables.subnets(),
            change_log: db.changes.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| self.io_error(e))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| self.io_error(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))?;
        log::debug!("Wrote database file: {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let persist = JsonFile::new(dir.path().join("nested").join("ipam.json"));
        assert!(persist.load().unwrap().is_none());

        let mut db = Database::default();
        let block = db.tables.insert_block("Production").unwrap();
        db.tables
            .insert_subnet(block.id, "Web", "10.0.1.0/24", Some(100))
            .unwrap();
        persist.save(&db).unwrap();

        let loaded = persist.load().unwrap().unwrap();
        assert_eq!(loaded.tables, db.tables);
        assert!(loaded.changes.is_empty());
        assert!(!persist.path().with_extension("json.tmp").exists());
    }

    #[test]
    fn test_corrupt_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ipam.json");
        fs::write(&path, r#"{"blocks": [{"id": "one", "name": "x"}]}"#).unwrap();
        let err = JsonFile::new(&path).load().unwrap_err();
        match err {
            StoreError::Corrupt { reason, .. } => {
                assert!(reason.contains("blocks[0].id"), "{reason}")
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
