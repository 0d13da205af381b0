//! Crate-level error type.

use crate::output::CsvRowError;
use crate::processing::{Conflict, ValidationError};
use crate::store::StoreError;
use std::fmt;
use thiserror::Error;

/// Kind of record an id refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Block,
    Container,
    Subnet,
    Snapshot,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EntityKind::Block => "Block",
            EntityKind::Container => "Container",
            EntityKind::Subnet => "Subnet",
            EntityKind::Snapshot => "Snapshot",
        };
        f.write_str(label)
    }
}

/// Everything a core operation can fail with.
///
/// Validation, conflict and not-found errors are expected outcomes the caller can
/// show and retry. `Persistence` hides storage details from its message; the
/// underlying [`StoreError`] is still available through `source()`.
#[derive(Error, Debug)]
pub enum IpamError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    Conflict(Conflict),
    #[error("{kind} with ID {id} not found")]
    NotFound { kind: EntityKind, id: i64 },
    #[error("The storage operation failed")]
    Persistence(#[source] StoreError),
    #[error("Snapshot {id} exists but cannot be read: {reason}")]
    SnapshotCorrupt { id: i64, reason: String },
    #[error("CSV file is not valid: {0}")]
    CsvFormat(String),
    #[error("CSV import rejected: {} invalid row(s)", .0.len())]
    CsvRows(Vec<CsvRowError>),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<StoreError> for IpamError {
    fn from(e: StoreError) -> Self {
        IpamError::Persistence(e)
    }
}

impl From<Conflict> for IpamError {
    fn from(c: Conflict) -> Self {
        IpamError::Conflict(c)
    }
}

impl IpamError {
    pub fn not_found(kind: EntityKind, id: i64) -> Self {
        IpamError::NotFound { kind, id }
    }

    /// True for errors the user can fix by changing the input.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            IpamError::Validation(_)
                | IpamError::Conflict(_)
                | IpamError::NotFound { .. }
                | IpamError::CsvFormat(_)
                | IpamError::CsvRows(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, IpamError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_persistence_error_hides_detail() {
        let err = IpamError::from(StoreError::LockPoisoned);
        assert_eq!(err.to_string(), "The storage operation failed");
        let source = err.source().expect("store error is the source");
        assert!(source.to_string().contains("poisoned"));
        assert!(!err.is_user_error());
    }

    #[test]
    fn test_not_found_message() {
        let err = IpamError::not_found(EntityKind::Snapshot, 12);
        assert_eq!(err.to_string(), "Snapshot with ID 12 not found");
        assert!(err.is_user_error());
    }

    #[test]
    fn test_validation_is_transparent() {
        let err = IpamError::from(ValidationError::VlanNotNumeric);
        assert_eq!(err.to_string(), "VLAN ID can only contain numbers");
    }
}
