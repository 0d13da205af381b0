//! Audit trail entries. An entry carrying `content` doubles as a snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Action tags written by the library. The column itself is free-form.
pub mod action {
    pub const ADD_BLOCK: &str = "ADD_BLOCK";
    pub const RENAME_BLOCK: &str = "RENAME_BLOCK";
    pub const UPDATE_BLOCK: &str = "UPDATE_BLOCK";
    pub const REORDER_BLOCKS: &str = "REORDER_BLOCKS";
    pub const DELETE_BLOCK: &str = "DELETE_BLOCK";
    pub const ADD_CONTAINER: &str = "ADD_CONTAINER";
    pub const EDIT_CONTAINER: &str = "EDIT_CONTAINER";
    pub const DELETE_CONTAINER: &str = "DELETE_CONTAINER";
    pub const ADD_SUBNET: &str = "ADD_SUBNET";
    pub const EDIT_SUBNET: &str = "EDIT_SUBNET";
    pub const DELETE_SUBNET: &str = "DELETE_SUBNET";
    pub const RESTORE: &str = "RESTORE";
    pub const PRE_REPLACE_SNAPSHOT: &str = "PRE_REPLACE_SNAPSHOT";
    pub const IMPORT_CSV: &str = "IMPORT_CSV";
}

/// Label stored when a change is not scoped to one block.
pub const NO_BLOCK: &str = "-";

/// Immutable audit record.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ChangeLogEntry {
    pub id: i64,
    /// UTC, non-decreasing in insertion order.
    pub timestamp: DateTime<Utc>,
    pub action: String,
    /// Display label of the affected block, [`NO_BLOCK`] otherwise.
    pub block: String,
    pub details: String,
    /// Serialized [`super::Export`] when this entry is a snapshot.
    #[serde(default)]
    pub content: Option<String>,
}

impl ChangeLogEntry {
    pub fn is_snapshot(&self) -> bool {
        self.content.is_some()
    }
}

/// A change-log row before the store assigns id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChange {
    pub action: String,
    pub block: String,
    pub details: String,
    pub content: Option<String>,
}

impl NewChange {
    pub fn new(action: &str, block: &str, details: impl Into<String>) -> Self {
        let block = if block.trim().is_empty() {
            NO_BLOCK
        } else {
            block
        };
        NewChange {
            action: action.to_string(),
            block: block.to_string(),
            details: details.into(),
            content: None,
        }
    }

    pub fn with_content(mut self, content: String) -> Self {
        self.content = Some(content);
        self
    }
}
