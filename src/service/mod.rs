//! The `Ipam` facade used by the CLI and by embedding applications.
//!
//! Every mutation goes through [`Ipam::commit`]: inputs are sanitised and
//! validated first, conflict checks and the write run inside one store write,
//! and the committed state is exported and logged as a snapshot before the
//! write lock is released.
//!
//! - [`blocks`] - Block operations
//! - [`containers`] - Container operations and segment usage
//! - [`subnets`] - Subnet operations
//! - [`import`] - CSV import in merge, override and replace mode

mod blocks;
mod containers;
mod import;
mod subnets;

pub use containers::ContainerUsage;
pub use import::{ImportMode, ImportSummary};

use crate::audit::{self, snapshot_of};
use crate::config::Config;
use crate::error::{EntityKind, IpamError, Result};
use crate::models::{action, Block, ChangeLogEntry, Export, NewChange, Subnet, NO_BLOCK};
use crate::output;
use crate::processing::{
    find_overlapping_subnets, log_overlapping_subnets, sorted_subnets, OverlapConflict,
    ValidationError,
};
use crate::store::{JsonFile, MemoryOnly, Persist, Store, StoreError, Tables};

/// IPAM service over a store backend.
#[derive(Debug)]
pub struct Ipam<P: Persist = MemoryOnly> {
    store: Store<P>,
    config: Config,
}

/// Outcome of a snapshot restore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreSummary {
    pub snapshot_id: i64,
    pub blocks: usize,
    pub containers: usize,
    pub subnets: usize,
    /// Overlapping subnet pairs carried in by the snapshot.
    pub overlaps: Vec<OverlapConflict>,
}

impl Ipam<MemoryOnly> {
    /// Service with no durability, for tests and embedding.
    pub fn in_memory(config: Config) -> Self {
        Ipam {
            store: Store::in_memory(),
            config,
        }
    }
}

impl Ipam<JsonFile> {
    /// Open the JSON database named by `config.database.path`.
    pub fn open(config: Config) -> Result<Self> {
        log::info!("Opening database {}", config.database.path.display());
        let store = Store::open_file(&config.database.path)?;
        Ok(Ipam { store, config })
    }
}

/// Display name of a block for change-log lines.
fn block_label(t: &Tables, block_id: i64) -> String {
    t.block(block_id)
        .map(|b| b.name.clone())
        .unwrap_or_else(|| "Unknown".to_string())
}

fn log_rejection(operation: &str, e: &IpamError) {
    if e.is_user_error() {
        log::debug!("{operation} rejected: {e}");
    } else {
        log::error!("{operation} failed: {e} ({:?})", e);
    }
}

impl<P: Persist> Ipam<P> {
    pub fn with_store(store: Store<P>, config: Config) -> Self {
        Ipam { store, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run `mutate` as one write, then log the change it describes with a snapshot.
    ///
    /// `describe` sees the committed tables and the closure's result. A failed
    /// audit step is logged and does not fail the operation.
    fn commit<T, F, D>(&self, operation: &str, mutate: F, describe: D) -> Result<T>
    where
        F: FnOnce(&mut Tables) -> Result<T>,
        D: FnOnce(&Tables, &T) -> NewChange,
    {
        let mut committed = self.store.write(mutate).map_err(|e| {
            log_rejection(operation, &e);
            e
        })?;
        let change = describe(committed.tables(), committed.value());
        log::info!("{}: {}", change.action, change.details);
        audit::record_snapshot_or_log(&mut committed, change, self.config.display.default_sort);
        Ok(committed.into_value())
    }

    /// Reject invalid input before any lock is taken.
    fn validated<T>(
        operation: &str,
        check: impl FnOnce() -> std::result::Result<T, ValidationError>,
    ) -> Result<T> {
        check().map_err(|e| {
            let e = IpamError::from(e);
            log_rejection(operation, &e);
            e
        })
    }

    // --- queries ---

    pub fn blocks(&self) -> Result<Vec<Block>> {
        Ok(self.store.read(Tables::blocks)?)
    }

    pub fn block(&self, id: i64) -> Result<Block> {
        self.store
            .read(|t| t.block(id).cloned())?
            .ok_or_else(|| IpamError::not_found(EntityKind::Block, id))
    }

    pub fn block_by_name(&self, name: &str) -> Result<Option<Block>> {
        Ok(self.store.read(|t| t.block_by_name(name).cloned())?)
    }

    /// Every subnet in the configured order.
    pub fn subnets(&self) -> Result<Vec<Subnet>> {
        let subnets = self.store.read(Tables::subnets)?;
        Ok(sorted_subnets(subnets, self.config.display.default_sort))
    }

    pub fn subnets_in_block(&self, block_id: i64) -> Result<Vec<Subnet>> {
        let subnets = self
            .store
            .read(|t| t.block(block_id).map(|_| t.subnets_in_block(block_id)))?
            .ok_or_else(|| IpamError::not_found(EntityKind::Block, block_id))?;
        Ok(sorted_subnets(subnets, self.config.display.default_sort))
    }

    pub fn subnet(&self, id: i64) -> Result<Subnet> {
        self.store
            .read(|t| t.subnet(id).cloned())?
            .ok_or_else(|| IpamError::not_found(EntityKind::Subnet, id))
    }

    /// Full state in display order. Feed it to [`crate::processing::compose_all`] for a tree.
    pub fn export_all(&self) -> Result<Export> {
        let order = self.config.display.default_sort;
        Ok(self.store.read(|t| audit::export_all(t, order))?)
    }

    pub fn export_json(&self) -> Result<String> {
        let export = self.export_all()?;
        Ok(serde_json::to_string_pretty(&export).map_err(StoreError::from)?)
    }

    /// CSV of every subnet, or of one block's subnets.
    pub fn export_csv(&self, block_id: Option<i64>) -> Result<String> {
        let blocks = self.blocks()?;
        let subnets = match block_id {
            Some(id) => self.subnets_in_block(id)?,
            None => {
                // one section per block, in block display order
                let mut subnets = self.subnets()?;
                subnets.sort_by_key(|s| blocks.iter().position(|b| b.id == s.block_id));
                subnets
            }
        };
        output::export_csv(&blocks, &subnets)
    }

    /// Overlapping subnet pairs inside each block, logged as warnings.
    pub fn check_overlaps(&self) -> Result<Vec<OverlapConflict>> {
        let (blocks, subnets) = self.store.read(|t| (t.blocks(), t.subnets()))?;
        let conflicts = find_overlapping_subnets(&subnets);
        log_overlapping_subnets(&conflicts, &blocks);
        Ok(conflicts)
    }

    // --- audit ---

    /// Newest entries first, capped at `audit.recent_limit`.
    pub fn recent_changes(&self) -> Result<Vec<ChangeLogEntry>> {
        Ok(self.store.recent_changes(self.config.audit.recent_limit)?)
    }

    /// Snapshot entries newest first, capped at `snapshots.limit`.
    pub fn snapshots(&self) -> Result<Vec<ChangeLogEntry>> {
        Ok(self.store.snapshots(self.config.snapshots.limit)?)
    }

    /// A change-log entry that carries a snapshot.
    pub fn snapshot(&self, id: i64) -> Result<ChangeLogEntry> {
        self.store
            .change(id)?
            .filter(ChangeLogEntry::is_snapshot)
            .ok_or_else(|| IpamError::not_found(EntityKind::Snapshot, id))
    }

    /// Replace all data with the state stored in snapshot `id`.
    ///
    /// The restore itself is logged as a new snapshot, so it can be undone by
    /// restoring the entry before it.
    pub fn restore_snapshot(&self, id: i64) -> Result<RestoreSummary> {
        let entry = self.snapshot(id)?;
        let export = snapshot_of(&entry).map_err(|e| {
            log::warn!("Snapshot {id} cannot be restored: {e}");
            e
        })?;
        log::info!(
            "Restoring snapshot {id} from {} ({} block(s), {} subnet(s))",
            entry.timestamp,
            export.blocks.len(),
            export.subnets.len()
        );
        let summary = self.commit(
            "Restore",
            |t| {
                audit::import_all(t, &export)?;
                Ok(RestoreSummary {
                    snapshot_id: id,
                    blocks: export.blocks.len(),
                    containers: export.containers.len(),
                    subnets: export.subnets.len(),
                    overlaps: find_overlapping_subnets(&t.subnets()),
                })
            },
            |_, _| {
                NewChange::new(
                    action::RESTORE,
                    NO_BLOCK,
                    format!("Restored to snapshot {id}"),
                )
            },
        )?;
        log::info!("Restore of snapshot {id} finished");
        if !summary.overlaps.is_empty() {
            log::warn!("Snapshot {id} contains overlapping subnets");
            log_overlapping_subnets(&summary.overlaps, &export.blocks);
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ipam() -> Ipam {
        Ipam::in_memory(Config::default())
    }

    #[test]
    fn test_every_mutation_is_a_snapshot() {
        let ipam = ipam();
        let block = ipam.add_block("Production").unwrap();
        ipam.add_subnet(block.id, "Web", "10.0.1.0/24", Some(100))
            .unwrap();
        ipam.rename_block(block.id, "Prod").unwrap();

        let changes = ipam.recent_changes().unwrap();
        assert_eq!(changes.len(), 3);
        assert!(changes.iter().all(ChangeLogEntry::is_snapshot));
        assert_eq!(
            changes[0].details,
            "Renamed block from 'Production' to 'Prod'"
        );
        assert_eq!(
            changes[1].details,
            "Added subnet 'Web' (10.0.1.0/24) VLAN 100 to block 'Production'"
        );

        let latest = snapshot_of(&changes[0]).unwrap();
        assert_eq!(latest, ipam.export_all().unwrap());
    }

    #[test]
    fn test_rejected_mutation_writes_nothing() {
        let ipam = ipam();
        let block = ipam.add_block("Production").unwrap();
        assert!(ipam.add_block("Production").is_err());
        assert!(ipam.add_subnet(block.id, "Bad", "10.0.0.0", None).is_err());
        assert_eq!(ipam.recent_changes().unwrap().len(), 1);
    }

    #[test]
    fn test_snapshot_lookup_errors() {
        let ipam = ipam();
        assert!(matches!(
            ipam.snapshot(9),
            Err(IpamError::NotFound {
                kind: EntityKind::Snapshot,
                id: 9,
            })
        ));
    }

    #[test]
    fn test_restore_returns_summary_and_logs_restore() {
        let ipam = ipam();
        let block = ipam.add_block("Production").unwrap();
        let first = ipam.recent_changes().unwrap()[0].id;
        ipam.add_subnet(block.id, "Web", "10.0.1.0/24", None)
            .unwrap();

        let summary = ipam.restore_snapshot(first).unwrap();
        assert_eq!(
            summary,
            RestoreSummary {
                snapshot_id: first,
                blocks: 1,
                containers: 0,
                subnets: 0,
                overlaps: vec![],
            }
        );
        let latest = &ipam.recent_changes().unwrap()[0];
        assert_eq!(latest.action, action::RESTORE);
        assert_eq!(latest.block, NO_BLOCK);
        assert_eq!(latest.details, format!("Restored to snapshot {first}"));
        assert!(ipam.subnets().unwrap().is_empty());
    }

    #[test]
    fn test_export_csv_single_block() {
        let ipam = ipam();
        let a = ipam.add_block("A").unwrap();
        let b = ipam.add_block("B").unwrap();
        ipam.add_subnet(a.id, "a1", "10.0.0.0/24", None).unwrap();
        ipam.add_subnet(b.id, "b1", "10.1.0.0/24", Some(5)).unwrap();

        let csv = ipam.export_csv(Some(b.id)).unwrap();
        assert_eq!(csv, "Block,Network,VLAN,Subnet Name\nB,10.1.0.0/24,5,b1\n");
        assert!(matches!(ipam.export_csv(Some(99)), Err(IpamError::NotFound { .. })));
        assert_eq!(ipam.export_csv(None).unwrap().lines().count(), 3);
    }

    #[test]
    fn test_restore_reports_overlaps_in_snapshot() {
        let blocks = vec![Block {
            id: 1,
            name: "Legacy".to_string(),
            position: 1,
            collapsed: false,
        }];
        let subnets = vec![
            Subnet {
                id: 1,
                block_id: 1,
                name: "wide".to_string(),
                cidr: "10.0.0.0/16".to_string(),
                vlan_id: None,
            },
            Subnet {
                id: 2,
                block_id: 1,
                name: "inner".to_string(),
                cidr: "10.0.5.0/24".to_string(),
                vlan_id: None,
            },
        ];
        let content = audit::encode_snapshot(&Export::new(blocks, vec![], subnets)).unwrap();
        let change = NewChange::new(action::IMPORT_CSV, "Legacy", "legacy").with_content(content);
        let store = Store::in_memory();
        let entry = store.append_change(change).unwrap();
        let ipam = Ipam::with_store(store, Config::default());

        let summary = ipam.restore_snapshot(entry.id).unwrap();
        assert_eq!(summary.subnets, 2);
        assert_eq!(summary.overlaps.len(), 1);
        assert_eq!(summary.overlaps[0].first.name, "wide");
        assert_eq!(ipam.recent_changes().unwrap()[0].action, action::RESTORE);
    }
}
