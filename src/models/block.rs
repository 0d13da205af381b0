//! Network block: the top-level named grouping that owns containers and subnets.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A named grouping of network inventory.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub id: i64,
    /// Unique across all blocks.
    pub name: String,
    /// Display order, lowest first. Not enforced unique.
    #[serde(default)]
    pub position: i64,
    /// UI display state.
    #[serde(default)]
    pub collapsed: bool,
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (#{})", self.name, self.id)
    }
}
