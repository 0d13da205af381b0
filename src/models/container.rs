//! Address-space reservation within a block.

use super::Ipv4;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A reserved range used to group the subnets of a block.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub id: i64,
    /// Owning block.
    pub block_id: i64,
    pub name: String,
    /// CIDR string as stored.
    pub base_network: String,
    #[serde(default)]
    pub position: i64,
}

impl Container {
    /// Parsed base network, `None` when the stored string is not a valid CIDR.
    pub fn network(&self) -> Option<Ipv4> {
        Ipv4::new(&self.base_network).ok()
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' ({})", self.name, self.base_network)
    }
}
