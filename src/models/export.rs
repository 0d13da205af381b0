//! Full-state export document, the payload of every snapshot.

use super::{Block, Container, Subnet};
use serde::{Deserialize, Serialize};

/// Current snapshot document version.
pub const EXPORT_VERSION: u32 = 1;

fn default_version() -> u32 {
    EXPORT_VERSION
}

/// Complete serialization of blocks, containers and subnets.
///
/// Documents written before versioning carry no `version` field and read as v1.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Export {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub blocks: Vec<Block>,
    #[serde(default)]
    pub containers: Vec<Container>,
    #[serde(default)]
    pub subnets: Vec<Subnet>,
}

impl Default for Export {
    fn default() -> Self {
        Export::new(Vec::new(), Vec::new(), Vec::new())
    }
}

impl Export {
    pub fn new(blocks: Vec<Block>, containers: Vec<Container>, subnets: Vec<Subnet>) -> Self {
        Export {
            version: EXPORT_VERSION,
            blocks,
            containers,
            subnets,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty() && self.containers.is_empty() && self.subnets.is_empty()
    }
}
