//! Audit trail and snapshots.
//!
//! Every committed mutation is followed by a change-log entry carrying a full
//! export of the state it produced, so the change log doubles as the snapshot
//! history.
//!
//! - [`snapshot`] - Export, import and blob encoding

mod snapshot;

pub use snapshot::{decode_snapshot, encode_snapshot, export_all, import_all, snapshot_of};

use crate::models::{ChangeLogEntry, NewChange};
use crate::processing::SortOrder;
use crate::store::{Committed, Persist, StoreError};

/// Append a change-log entry while the write that caused it still holds the lock.
pub fn record_change<T, P: Persist>(
    committed: &mut Committed<'_, T, P>,
    change: NewChange,
) -> Result<ChangeLogEntry, StoreError> {
    committed.append_change(change)
}

/// Export the committed state and append `change` with that export as its content.
pub fn record_snapshot<T, P: Persist>(
    committed: &mut Committed<'_, T, P>,
    change: NewChange,
    order: SortOrder,
) -> Result<ChangeLogEntry, StoreError> {
    let content = encode_snapshot(&export_all(committed.tables(), order))?;
    record_change(committed, change.with_content(content))
}

/// Like [`record_snapshot`], but a failure is logged instead of returned.
///
/// The write has already committed at this point, so losing the audit entry is
/// preferred over reporting a completed change as failed.
pub fn record_snapshot_or_log<T, P: Persist>(
    committed: &mut Committed<'_, T, P>,
    change: NewChange,
    order: SortOrder,
) -> Option<ChangeLogEntry> {
    let action = change.action.clone();
    match record_snapshot(committed, change, order) {
        Ok(entry) => Some(entry),
        Err(e) => {
            log::error!("Change committed but audit entry {action} was not recorded: {e}");
            None
        }
    }
}
