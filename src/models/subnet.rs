//! Leaf address allocation, shown to users as a "Network".

use super::Ipv4;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents a CIDR allocation inside a block, optionally VLAN tagged.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Subnet {
    pub id: i64,
    /// Owning block.
    pub block_id: i64,
    pub name: String,
    /// CIDR string as stored, always with an explicit prefix.
    pub cidr: String,
    /// VLAN tag in 1..=4094, `None` when untagged.
    #[serde(default)]
    pub vlan_id: Option<u16>,
}

impl Subnet {
    /// Parsed CIDR, `None` when the stored string is not a valid CIDR.
    pub fn network(&self) -> Option<Ipv4> {
        Ipv4::new(&self.cidr).ok()
    }
}

impl fmt::Display for Subnet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.vlan_id {
            Some(vlan) => write!(f, "'{}' ({}, VLAN {})", self.name, self.cidr, vlan),
            None => write!(f, "'{}' ({})", self.name, self.cidr),
        }
    }
}
