use super::Ipam;
use crate::audit::{self, encode_snapshot, export_all};
use crate::error::{IpamError, Result};
use crate::models::{action, NewChange};
use crate::output::{parse_import, CsvRow};
use crate::processing::check_subnet_conflicts;
use crate::store::{Persist, StoreError, Tables};
use std::fmt;
use std::io::Read;
use std::str::FromStr;

/// How CSV rows are combined with existing data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImportMode {
    /// Keep existing subnets, skip rows that match one by name or network.
    #[default]
    Merge,
    /// Update the matching subnet in place.
    Override,
    /// Delete everything first.
    Replace,
}

impl FromStr for ImportMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "merge" => Ok(ImportMode::Merge),
            "override" => Ok(ImportMode::Override),
            "replace" => Ok(ImportMode::Replace),
            other => Err(format!("Unknown import mode '{other}' (merge, override or replace)")),
        }
    }
}

impl fmt::Display for ImportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ImportMode::Merge => "merge",
            ImportMode::Override => "override",
            ImportMode::Replace => "replace",
        };
        f.write_str(label)
    }
}

/// What a CSV import did.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImportSummary {
    pub mode: ImportMode,
    /// Subnets created or updated.
    pub success: usize,
    /// Rows left alone in merge mode.
    pub skipped: usize,
    /// Rows refused by a conflict check, as `row N: message`.
    pub errors: Vec<String>,
    pub created_blocks: Vec<String>,
}

impl ImportSummary {
    /// Change-log block label: the one created block, or a placeholder.
    fn block_label(&self) -> &str {
        match self.created_blocks.as_slice() {
            [] => "Existing",
            [only] => only,
            _ => "Multiple",
        }
    }

    fn details(&self) -> String {
        let created = if self.created_blocks.is_empty() {
            "none".to_string()
        } else {
            self.created_blocks.join(", ")
        };
        format!(
            "CSV import: {} subnets, {} errors, created blocks: {created}, mode: {}",
            self.success, self.errors.len(), self.mode
        )
    }
}

/// Apply validated rows to the staged tables.
fn apply_rows(
    t: &mut Tables,
    rows: &[CsvRow],
    mode: ImportMode,
) -> std::result::Result<ImportSummary, StoreError> {
    let mut summary = ImportSummary {
        mode,
        ..ImportSummary::default()
    };
    if mode == ImportMode::Replace {
        t.clear();
    }

    for row in rows {
        let block_id = match t.block_by_name(&row.block_name) {
            Some(block) => block.id,
            None => {
                let block = t.insert_block(&row.block_name)?;
                log::debug!("CSV import created block '{}'", block.name);
                summary.created_blocks.push(block.name);
                block.id
            }
        };

        let existing = t.subnets_in_block(block_id);
        let matched = existing
            .iter()
            .find(|s| s.name == row.subnet_name || s.cidr == row.cidr)
            .map(|s| s.id);

        if matched.is_some() && mode == ImportMode::Merge {
            log::debug!("CSV row {} skipped: matches an existing subnet", row.line);
            summary.skipped += 1;
            continue;
        }
        // an override row is checked against the block without the subnet it replaces
        let conflict = check_subnet_conflicts(&existing, &row.cidr, row.vlan_id, block_id, matched);
        if let Some(conflict) = conflict {
            summary.errors.push(format!("row {}: {conflict}", row.line));
            continue;
        }
        if let Some(id) = matched {
            t.update_subnet(id, &row.subnet_name, &row.cidr, row.vlan_id)?;
        } else {
            t.insert_subnet(block_id, &row.subnet_name, &row.cidr, row.vlan_id)?;
        }
        summary.success += 1;
    }
    Ok(summary)
}

impl<P: Persist> Ipam<P> {
    /// Import subnets from a `Block,Network,VLAN,Subnet Name` CSV.
    ///
    /// The file is validated as a whole first; any invalid row rejects it with no
    /// writes. Valid rows are then applied in one write, where rows refused by a
    /// conflict check are counted in [`ImportSummary::errors`]. Replace mode logs a
    /// snapshot of the previous state before the import entry.
    pub fn import_csv<R: Read>(&self, reader: R, mode: ImportMode) -> Result<ImportSummary> {
        let rows = parse_import(reader).map_err(|e| {
            log::warn!("CSV import rejected: {e}");
            e
        })?;
        let order = self.config.display.default_sort;

        let mut committed = self.store.write(|t| {
            let previous = match mode {
                ImportMode::Replace => Some(export_all(t, order)),
                _ => None,
            };
            let summary = apply_rows(t, &rows, mode)?;
            Ok::<_, IpamError>((previous, summary))
        })?;

        let previous = committed.value().0.as_ref().map(encode_snapshot);
        if let Some(content) = previous {
            let change = NewChange::new(
                action::PRE_REPLACE_SNAPSHOT,
                "All",
                "Snapshot before complete replace import",
            );
            if let Err(e) = content.and_then(|c| committed.append_change(change.with_content(c))) {
                log::error!("Replace import committed but the previous state was not saved: {e}");
            }
        }

        let summary = committed.value().1.clone();
        for e in &summary.errors {
            log::warn!("CSV import {e}");
        }
        let change = NewChange::new(action::IMPORT_CSV, summary.block_label(), summary.details());
        log::info!("{}: {}", change.action, change.details);
        audit::record_snapshot_or_log(&mut committed, change, order);
        Ok(summary)
    }
}
