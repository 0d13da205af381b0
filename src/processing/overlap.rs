//! Overlap scan over existing data.
//!
//! The write path refuses overlapping subnets inside one block, but a restored
//! legacy snapshot can still carry them. This scan reports every such pair so
//! they can be logged and cleaned up by hand.

use crate::models::{Block, Ipv4, Subnet};
use itertools::Itertools;

/// Two subnets in the same block whose ranges share addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlapConflict {
    pub block_id: i64,
    pub first: Subnet,
    pub second: Subnet,
}

/// Find every overlapping pair of subnets within a block.
///
/// Subnets with unparseable CIDRs are ignored. Pairs come out grouped by block and
/// ordered by the first subnet's network address.
pub fn find_overlapping_subnets(subnets: &[Subnet]) -> Vec<OverlapConflict> {
    let parsed: Vec<(&Subnet, Ipv4)> = subnets
        .iter()
        .filter_map(|s| s.network().map(|net| (s, net)))
        .sorted_by_key(|(s, net)| (s.block_id, net.sort_key(), s.id))
        .collect();

    let mut conflicts = Vec::new();
    for (i, (a, a_net)) in parsed.iter().enumerate() {
        // sorted by start address, so only later entries that start inside `a` can overlap
        for (b, b_net) in parsed[i + 1..]
            .iter()
            .take_while(|(b, b_net)| b.block_id == a.block_id && b_net.lo_u32() <= a_net.hi_u32())
        {
            if a_net.overlaps(b_net) {
                conflicts.push(OverlapConflict {
                    block_id: a.block_id,
                    first: (*a).clone(),
                    second: (*b).clone(),
                });
            }
        }
    }
    conflicts
}

/// Log overlapping subnets as warnings, using block names where known.
pub fn log_overlapping_subnets(conflicts: &[OverlapConflict], blocks: &[Block]) {
    if conflicts.is_empty() {
        log::info!("No overlapping subnets found.");
        return;
    }

    log::warn!("Found {} overlapping subnet pair(s):", conflicts.len());

    for (block_id, group) in &conflicts.iter().group_by(|c| c.block_id) {
        let block_name = blocks
            .iter()
            .find(|b| b.id == block_id)
            .map(|b| b.name.as_str())
            .unwrap_or("?");
        log::warn!("  Block '{}' (#{}):", block_name, block_id);
        for conflict in group {
            log::warn!("    - {} overlaps {}", conflict.first, conflict.second);
        }
    }
}
