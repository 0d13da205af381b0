//! Full-state export and destructive import, plus the snapshot blob encoding.

use crate::error::{EntityKind, IpamError, Result};
use crate::models::{ChangeLogEntry, Export, EXPORT_VERSION};
use crate::processing::{sorted_subnets, SortOrder};
use crate::store::{StoreError, Tables};

/// Serialize every table in display order.
///
/// Blocks by position and name, containers by block then position, subnets by `order`.
pub fn export_all(tables: &Tables, order: SortOrder) -> Export {
    let blocks = tables.blocks();
    let containers = tables.containers();
    let mut subnets = sorted_subnets(tables.subnets(), order);
    // sorter groups by block_id, export groups by block display order
    let block_rank = |block_id: i64| blocks.iter().position(|b| b.id == block_id);
    subnets.sort_by_key(|s| block_rank(s.block_id));
    Export::new(blocks, containers, subnets)
}

/// Replace every row with the contents of `data`, keeping its ids.
///
/// Runs inside a store write: if any row is rejected the whole write is dropped
/// and the previous state stays in place.
pub fn import_all(tables: &mut Tables, data: &Export) -> std::result::Result<(), StoreError> {
    tables.clear();
    for block in &data.blocks {
        tables.restore_block(block.clone())?;
    }
    for container in &data.containers {
        tables.restore_container(container.clone())?;
    }
    for subnet in &data.subnets {
        tables.restore_subnet(subnet.clone())?;
    }
    log::debug!(
        "Imported {} block(s), {} container(s), {} subnet(s)",
        data.blocks.len(),
        data.containers.len(),
        data.subnets.len()
    );
    Ok(())
}

pub fn encode_snapshot(export: &Export) -> std::result::Result<String, StoreError> {
    Ok(serde_json::to_string(export)?)
}

/// Decode a stored snapshot blob. Errors name the JSON path that failed.
pub fn decode_snapshot(id: i64, content: &str) -> Result<Export> {
    let de = &mut serde_json::Deserializer::from_str(content);
    let export: Export = serde_path_to_error::deserialize(de).map_err(|e| corrupt(id, e))?;
    if export.version > EXPORT_VERSION {
        let found = export.version;
        let reason = format!("unsupported snapshot version {found}, newest is {EXPORT_VERSION}");
        return Err(corrupt(id, reason));
    }
    Ok(export)
}

fn corrupt(id: i64, reason: impl ToString) -> IpamError {
    IpamError::SnapshotCorrupt {
        id,
        reason: reason.to_string(),
    }
}

/// Decode the snapshot carried by a change-log entry.
///
/// An entry without content is not a snapshot and reports as not found.
pub fn snapshot_of(entry: &ChangeLogEntry) -> Result<Export> {
    match &entry.content {
        Some(content) => decode_snapshot(entry.id, content),
        None => Err(IpamError::not_found(EntityKind::Snapshot, entry.id)),
    }
}
