//! Duplicate and overlap detection, scoped to one block.
//!
//! Every check scans a slice of existing records, so the same functions serve the
//! create path, the update path (through `exclude_id`) and the CSV import.

use crate::models::{Block, Container, Ipv4, Subnet};
use std::fmt;

/// Which field of the candidate collided with an existing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictField {
    BlockName,
    Vlan,
    Cidr,
    BaseNetwork,
}

impl fmt::Display for ConflictField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConflictField::BlockName => "block name",
            ConflictField::Vlan => "VLAN",
            ConflictField::Cidr => "network",
            ConflictField::BaseNetwork => "base network",
        };
        f.write_str(label)
    }
}

/// The existing record a candidate collided with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictEntity {
    Block(Block),
    Container(Container),
    Subnet(Subnet),
}

/// A duplicate or overlap found by one of the checks below.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub field: ConflictField,
    pub existing: ConflictEntity,
}

impl Conflict {
    /// Id of the conflicting record.
    pub fn existing_id(&self) -> i64 {
        match &self.existing {
            ConflictEntity::Block(b) => b.id,
            ConflictEntity::Container(c) => c.id,
            ConflictEntity::Subnet(s) => s.id,
        }
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.field, &self.existing) {
            (ConflictField::BlockName, ConflictEntity::Block(b)) => {
                write!(f, "A block with the name '{}' already exists", b.name)
            }
            (ConflictField::Vlan, ConflictEntity::Subnet(s)) => {
                let vlan = s.vlan_id.map(|v| v.to_string()).unwrap_or_default();
                write!(f, "VLAN {vlan} already exists on subnet {s}")
            }
            (ConflictField::Cidr, ConflictEntity::Subnet(s)) => {
                write!(f, "Network overlaps with existing subnet {}", s)
            }
            (ConflictField::BaseNetwork, ConflictEntity::Container(c)) => {
                write!(f, "Network overlaps with existing container {}", c)
            }
            (field, _) => write!(f, "{} conflicts with record #{}", field, self.existing_id()),
        }
    }
}

fn not_excluded(id: i64, exclude_id: Option<i64>) -> bool {
    exclude_id != Some(id)
}

/// Exact name match across all blocks.
pub fn duplicate_block_name(
    blocks: &[Block],
    name: &str,
    exclude_id: Option<i64>,
) -> Option<Conflict> {
    blocks
        .iter()
        .find(|b| b.name == name && not_excluded(b.id, exclude_id))
        .map(|b| Conflict {
            field: ConflictField::BlockName,
            existing: ConflictEntity::Block(b.clone()),
        })
}

/// Same non-null VLAN inside `block_id`. A `None` VLAN never conflicts.
pub fn duplicate_vlan_in_block(
    subnets: &[Subnet],
    vlan_id: Option<u16>,
    block_id: i64,
    exclude_id: Option<i64>,
) -> Option<Conflict> {
    let vlan_id = vlan_id?;
    subnets
        .iter()
        .find(|s| {
            s.block_id == block_id && s.vlan_id == Some(vlan_id) && not_excluded(s.id, exclude_id)
        })
        .map(|s| Conflict {
            field: ConflictField::Vlan,
            existing: ConflictEntity::Subnet(s.clone()),
        })
}

/// First subnet in `block_id` whose range shares an address with `cidr`.
///
/// An unparseable candidate yields `None`; stored CIDRs that fail to parse are skipped.
pub fn overlapping_cidr_in_block(
    subnets: &[Subnet],
    cidr: &str,
    block_id: i64,
    exclude_id: Option<i64>,
) -> Option<Conflict> {
    let candidate = Ipv4::new(cidr).ok()?;
    subnets
        .iter()
        .filter(|s| s.block_id == block_id && not_excluded(s.id, exclude_id))
        .find(|s| s.network().is_some_and(|net| net.overlaps(&candidate)))
        .map(|s| Conflict {
            field: ConflictField::Cidr,
            existing: ConflictEntity::Subnet(s.clone()),
        })
}

/// Container counterpart of [`overlapping_cidr_in_block`].
pub fn overlapping_container_networks(
    containers: &[Container],
    base_network: &str,
    block_id: i64,
    exclude_id: Option<i64>,
) -> Option<Conflict> {
    let candidate = Ipv4::new(base_network).ok()?;
    containers
        .iter()
        .filter(|c| c.block_id == block_id && not_excluded(c.id, exclude_id))
        .find(|c| c.network().is_some_and(|net| net.overlaps(&candidate)))
        .map(|c| Conflict {
            field: ConflictField::BaseNetwork,
            existing: ConflictEntity::Container(c.clone()),
        })
}

/// VLAN check first, then CIDR overlap, as a subnet create/update needs.
pub fn check_subnet_conflicts(
    subnets: &[Subnet],
    cidr: &str,
    vlan_id: Option<u16>,
    block_id: i64,
    exclude_id: Option<i64>,
) -> Option<Conflict> {
    duplicate_vlan_in_block(subnets, vlan_id, block_id, exclude_id)
        .or_else(|| overlapping_cidr_in_block(subnets, cidr, block_id, exclude_id))
}
