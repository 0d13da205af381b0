//! Subnet ordering strategies.
//!
//! Every strategy groups by `block_id` first, so a cross-block listing stays
//! contiguous per block.

use crate::models::{Ipv4, Subnet};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How subnet listings are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortOrder {
    /// Network address, then prefix length.
    Network,
    /// VLAN ascending with untagged last, then network.
    #[default]
    #[serde(rename = "VLAN")]
    Vlan,
    /// Case-insensitive name, then network.
    Name,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "network" | "cidr" | "address" => Ok(SortOrder::Network),
            "vlan" => Ok(SortOrder::Vlan),
            "name" => Ok(SortOrder::Name),
            other => Err(format!("Unknown sort order '{other}'")),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SortOrder::Network => "Network",
            SortOrder::Vlan => "VLAN",
            SortOrder::Name => "Name",
        };
        f.write_str(label)
    }
}

/// Address key where an unparseable CIDR compares greater than any valid one.
pub fn network_key(network: Option<Ipv4>) -> (bool, u32, u8) {
    match network {
        Some(net) => {
            let (addr, prefix) = net.sort_key();
            (false, addr, prefix)
        }
        None => (true, u32::MAX, u8::MAX),
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Secondary {
    None,
    Vlan(bool, u16),
    Name(String),
}

fn sort_key(subnet: &Subnet, order: SortOrder) -> (i64, Secondary, (bool, u32, u8)) {
    let secondary = match order {
        SortOrder::Network => Secondary::None,
        SortOrder::Vlan => Secondary::Vlan(subnet.vlan_id.is_none(), subnet.vlan_id.unwrap_or(0)),
        SortOrder::Name => Secondary::Name(subnet.name.to_lowercase()),
    };
    (subnet.block_id, secondary, network_key(subnet.network()))
}

/// Sort in place. Stable, so records with equal keys keep their input order.
pub fn sort_subnets(subnets: &mut [Subnet], order: SortOrder) {
    subnets.sort_by_cached_key(|s| sort_key(s, order));
}

/// Owned convenience wrapper around [`sort_subnets`].
pub fn sorted_subnets(mut subnets: Vec<Subnet>, order: SortOrder) -> Vec<Subnet> {
    sort_subnets(&mut subnets, order);
    subnets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subnet(id: i64, block_id: i64, name: &str, cidr: &str, vlan_id: Option<u16>) -> Subnet {
        Subnet {
            id,
            block_id,
            name: name.to_string(),
            cidr: cidr.to_string(),
            vlan_id,
        }
    }

    fn cidrs(subnets: &[Subnet]) -> Vec<&str> {
        subnets.iter().map(|s| s.cidr.as_str()).collect()
    }

    #[test]
    fn test_sort_by_network_is_numeric() {
        let subnets = vec![
            subnet(1, 1, "a", "10.0.10.0/24", None),
            subnet(2, 1, "b", "10.0.1.0/24", None),
            subnet(3, 1, "c", "10.0.2.0/24", None),
        ];
        let sorted = sorted_subnets(subnets, SortOrder::Network);
        assert_eq!(
            cidrs(&sorted),
            ["10.0.1.0/24", "10.0.2.0/24", "10.0.10.0/24"]
        );
    }

    #[test]
    fn test_sort_groups_by_block_and_puts_invalid_last() {
        let subnets = vec![
            subnet(1, 2, "a", "10.0.0.0/24", None),
            subnet(2, 1, "b", "bogus", None),
            subnet(3, 1, "c", "192.168.0.0/24", None),
            subnet(4, 1, "d", "10.0.0.0/8", None),
            subnet(5, 1, "e", "10.0.0.0/16", None),
        ];
        let sorted = sorted_subnets(subnets, SortOrder::Network);
        let ids: Vec<i64> = sorted.iter().map(|s| s.id).collect();
        assert_eq!(ids, [4, 5, 3, 2, 1]);
    }

    #[test]
    fn test_sort_by_vlan_null_last() {
        let subnets = vec![
            subnet(1, 1, "a", "10.0.3.0/24", None),
            subnet(2, 1, "b", "10.0.2.0/24", Some(200)),
            subnet(3, 1, "c", "10.0.1.0/24", Some(100)),
            subnet(4, 1, "d", "10.0.0.0/24", None),
        ];
        let sorted = sorted_subnets(subnets, SortOrder::Vlan);
        let ids: Vec<i64> = sorted.iter().map(|s| s.id).collect();
        assert_eq!(ids, [3, 2, 4, 1]);
    }

    #[test]
    fn test_sort_by_name_case_insensitive() {
        let subnets = vec![
            subnet(1, 1, "web", "10.0.2.0/24", None),
            subnet(2, 1, "Database", "10.0.1.0/24", None),
            subnet(3, 1, "Web", "10.0.1.0/24", None),
        ];
        let sorted = sorted_subnets(subnets, SortOrder::Name);
        let ids: Vec<i64> = sorted.iter().map(|s| s.id).collect();
        assert_eq!(ids, [2, 3, 1], "ties on name fall back to the address");
    }

    #[test]
    fn test_sort_is_idempotent() {
        let subnets = vec![
            subnet(1, 2, "x", "10.0.10.0/24", Some(5)),
            subnet(2, 1, "y", "10.0.1.0/24", None),
            subnet(3, 1, "z", "bad", Some(5)),
            subnet(4, 2, "w", "10.0.2.0/24", None),
        ];
        for order in [SortOrder::Network, SortOrder::Vlan, SortOrder::Name] {
            let once = sorted_subnets(subnets.clone(), order);
            let twice = sorted_subnets(once.clone(), order);
            assert_eq!(once, twice, "{order}");
            let blocks: Vec<i64> = once.iter().map(|s| s.block_id).collect();
            assert_eq!(blocks, [1, 1, 2, 2], "{order}");
        }
    }

    #[test]
    fn test_sort_order_from_str() {
        assert_eq!("VLAN".parse::<SortOrder>(), Ok(SortOrder::Vlan));
        assert_eq!("network".parse::<SortOrder>(), Ok(SortOrder::Network));
        assert_eq!(" Name ".parse::<SortOrder>(), Ok(SortOrder::Name));
        assert!("size".parse::<SortOrder>().is_err());
        assert_eq!(SortOrder::default(), SortOrder::Vlan);
        assert_eq!(SortOrder::Vlan.to_string(), "VLAN");
    }
}
