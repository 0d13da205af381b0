//! In-memory entity tables with the constraints of the relational schema:
//! unique block names, block-owned containers and subnets, cascade delete.

use super::StoreError;
use crate::models::{Block, Container, Subnet};
use std::collections::{BTreeMap, HashMap, HashSet};

const BLOCKS: &str = "block";
const CONTAINERS: &str = "container";
const SUBNETS: &str = "subnet";

fn next_id<V>(table: &BTreeMap<i64, V>) -> i64 {
    table.keys().next_back().map_or(1, |max| max + 1)
}

/// Blocks, containers and subnets keyed by id.
///
/// New ids are `max(id) + 1`, so ids restored from a snapshot stay authoritative.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tables {
    blocks: BTreeMap<i64, Block>,
    containers: BTreeMap<i64, Container>,
    subnets: BTreeMap<i64, Subnet>,
}

impl Tables {
    pub fn new() -> Self {
        Tables::default()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty() && self.containers.is_empty() && self.subnets.is_empty()
    }

    // --- blocks ---

    pub fn block(&self, id: i64) -> Option<&Block> {
        self.blocks.get(&id)
    }

    pub fn block_by_name(&self, name: &str) -> Option<&Block> {
        self.blocks.values().find(|b| b.name == name)
    }

    /// All blocks in display order: position, then name.
    pub fn blocks(&self) -> Vec<Block> {
        let mut blocks: Vec<Block> = self.blocks.values().cloned().collect();
        blocks.sort_by(|a, b| (a.position, &a.name).cmp(&(b.position, &b.name)));
        blocks
    }

    fn ensure_unique_name(&self, name: &str, exclude_id: Option<i64>) -> Result<(), StoreError> {
        match self.block_by_name(name) {
            Some(b) if Some(b.id) != exclude_id => {
                Err(StoreError::UniqueViolation(format!("block name '{name}'")))
            }
            _ => Ok(()),
        }
    }

    /// Insert a block at the end of the display order.
    pub fn insert_block(&mut self, name: &str) -> Result<Block, StoreError> {
        self.ensure_unique_name(name, None)?;
        let position = self.blocks.values().map(|b| b.position).max().unwrap_or(0) + 1;
        let block = Block {
            id: next_id(&self.blocks),
            name: name.to_string(),
            position,
            collapsed: false,
        };
        self.blocks.insert(block.id, block.clone());
        Ok(block)
    }

    /// Insert a block keeping its id, as a snapshot import does.
    pub fn restore_block(&mut self, block: Block) -> Result<(), StoreError> {
        if self.blocks.contains_key(&block.id) {
            return Err(StoreError::DuplicateId {
                table: BLOCKS,
                id: block.id,
            });
        }
        self.ensure_unique_name(&block.name, None)?;
        self.blocks.insert(block.id, block);
        Ok(())
    }

    fn block_mut(&mut self, id: i64) -> Result<&mut Block, StoreError> {
        self.blocks
            .get_mut(&id)
            .ok_or(StoreError::MissingRow { table: BLOCKS, id })
    }

    pub fn rename_block(&mut self, id: i64, name: &str) -> Result<Block, StoreError> {
        self.ensure_unique_name(name, Some(id))?;
        let block = self.block_mut(id)?;
        block.name = name.to_string();
        Ok(block.clone())
    }

    pub fn set_block_collapsed(&mut self, id: i64, collapsed: bool) -> Result<Block, StoreError> {
        let block = self.block_mut(id)?;
        block.collapsed = collapsed;
        Ok(block.clone())
    }

    pub fn set_block_position(&mut self, id: i64, position: i64) -> Result<Block, StoreError> {
        let block = self.block_mut(id)?;
        block.position = position;
        Ok(block.clone())
    }

    /// Delete a block together with every container and subnet it owns.
    pub fn delete_block(&mut self, id: i64) -> Result<Block, StoreError> {
        let block = self
            .blocks
            .remove(&id)
            .ok_or(StoreError::MissingRow { table: BLOCKS, id })?;
        self.containers.retain(|_, c| c.block_id != id);
        self.subnets.retain(|_, s| s.block_id != id);
        Ok(block)
    }

    // --- containers ---

    pub fn container(&self, id: i64) -> Option<&Container> {
        self.containers.get(&id)
    }

    /// All containers grouped by block in display order, then by position and name.
    pub fn containers(&self) -> Vec<Container> {
        let rank: HashMap<i64, usize> = self
            .blocks()
            .iter()
            .enumerate()
            .map(|(i, b)| (b.id, i))
            .collect();
        let mut containers: Vec<Container> = self.containers.values().cloned().collect();
        containers.sort_by(|a, b| {
            let key = |c: &Container| (rank.get(&c.block_id), c.block_id, c.position);
            key(a).cmp(&key(b)).then_with(|| a.name.cmp(&b.name))
        });
        containers
    }

    pub fn containers_in_block(&self, block_id: i64) -> Vec<Container> {
        let mut containers: Vec<Container> = self
            .containers
            .values()
            .filter(|c| c.block_id == block_id)
            .cloned()
            .collect();
        containers.sort_by(|a, b| (a.position, &a.name).cmp(&(b.position, &b.name)));
        containers
    }

    fn ensure_block(&self, table: &'static str, id: i64, block_id: i64) -> Result<(), StoreError> {
        if self.blocks.contains_key(&block_id) {
            Ok(())
        } else {
            Err(StoreError::ForeignKey {
                table,
                id,
                block_id,
            })
        }
    }

    /// Insert a container after the last one of its block.
    pub fn insert_container(
        &mut self,
        block_id: i64,
        name: &str,
        base_network: &str,
    ) -> Result<Container, StoreError> {
        let id = next_id(&self.containers);
        self.ensure_block(CONTAINERS, id, block_id)?;
        let position = self
            .containers
            .values()
            .filter(|c| c.block_id == block_id)
            .map(|c| c.position)
            .max()
            .unwrap_or(0)
            + 1;
        let container = Container {
            id,
            block_id,
            name: name.to_string(),
            base_network: base_network.to_string(),
            position,
        };
        self.containers.insert(id, container.clone());
        Ok(container)
    }

    pub fn restore_container(&mut self, container: Container) -> Result<(), StoreError> {
        if self.containers.contains_key(&container.id) {
            return Err(StoreError::DuplicateId {
                table: CONTAINERS,
                id: container.id,
            });
        }
        self.ensure_block(CONTAINERS, container.id, container.block_id)?;
        self.containers.insert(container.id, container);
        Ok(())
    }

    pub fn update_container(
        &mut self,
        id: i64,
        name: &str,
        base_network: &str,
    ) -> Result<Container, StoreError> {
        let container = self
            .containers
            .get_mut(&id)
            .ok_or(StoreError::MissingRow {
                table: CONTAINERS,
                id,
            })?;
        container.name = name.to_string();
        container.base_network = base_network.to_string();
        Ok(container.clone())
    }

    pub fn delete_container(&mut self, id: i64) -> Result<Container, StoreError> {
        self.containers
            .remove(&id)
            .ok_or(StoreError::MissingRow {
                table: CONTAINERS,
                id,
            })
    }

    // --- subnets ---

    pub fn subnet(&self, id: i64) -> Option<&Subnet> {
        self.subnets.get(&id)
    }

    /// All subnets in id order. Callers apply the configured sort.
    pub fn subnets(&self) -> Vec<Subnet> {
        self.subnets.values().cloned().collect()
    }

    pub fn subnets_in_block(&self, block_id: i64) -> Vec<Subnet> {
        self.subnets
            .values()
            .filter(|s| s.block_id == block_id)
            .cloned()
            .collect()
    }

    pub fn insert_subnet(
        &mut self,
        block_id: i64,
        name: &str,
        cidr: &str,
        vlan_id: Option<u16>,
    ) -> Result<Subnet, StoreError> {
        let id = next_id(&self.subnets);
        self.ensure_block(SUBNETS, id, block_id)?;
        let subnet = Subnet {
            id,
            block_id,
            name: name.to_string(),
            cidr: cidr.to_string(),
            vlan_id,
        };
        self.subnets.insert(id, subnet.clone());
        Ok(subnet)
    }

    pub fn restore_subnet(&mut self, subnet: Subnet) -> Result<(), StoreError> {
        if self.subnets.contains_key(&subnet.id) {
            return Err(StoreError::DuplicateId {
                table: SUBNETS,
                id: subnet.id,
            });
        }
        self.ensure_block(SUBNETS, subnet.id, subnet.block_id)?;
        self.subnets.insert(subnet.id, subnet);
        Ok(())
    }

    pub fn update_subnet(
        &mut self,
        id: i64,
        name: &str,
        cidr: &str,
        vlan_id: Option<u16>,
    ) -> Result<Subnet, StoreError> {
        let subnet = self
            .subnets
            .get_mut(&id)
            .ok_or(StoreError::MissingRow { table: SUBNETS, id })?;
        subnet.name = name.to_string();
        subnet.cidr = cidr.to_string();
        subnet.vlan_id = vlan_id;
        Ok(subnet.clone())
    }

    pub fn delete_subnet(&mut self, id: i64) -> Result<Subnet, StoreError> {
        self.subnets
            .remove(&id)
            .ok_or(StoreError::MissingRow { table: SUBNETS, id })
    }

    /// Remove every row.
    pub fn clear(&mut self) {
        self.blocks.clear();
        self.containers.clear();
        self.subnets.clear();
    }

    /// Verify the schema constraints before a staged state is committed.
    pub fn check_integrity(&self) -> Result<(), StoreError> {
        let mut names = HashSet::new();
        for block in self.blocks.values() {
            if !names.insert(block.name.as_str()) {
                return Err(StoreError::UniqueViolation(format!("block name '{}'", block.name)));
            }
        }
        for c in self.containers.values() {
            self.ensure_block(CONTAINERS, c.id, c.block_id)?;
        }
        for s in self.subnets.values() {
            self.ensure_block(SUBNETS, s.id, s.block_id)?;
        }
        Ok(())
    }
}
