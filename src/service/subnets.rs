use super::{block_label, Ipam};
use crate::error::{EntityKind, IpamError, Result};
use crate::models::{action, NewChange, Subnet};
use crate::processing::{
    check_subnet_conflicts, sanitize, validate_cidr, validate_subnet_name, validate_vlan_number,
    ValidationError, MAX_INPUT_LENGTH,
};
use crate::store::Persist;

struct CleanSubnet {
    name: String,
    cidr: String,
    vlan_id: Option<u16>,
}

fn clean_subnet(
    name: &str,
    cidr: &str,
    vlan_id: Option<u16>,
) -> std::result::Result<CleanSubnet, ValidationError> {
    let name = sanitize(name, MAX_INPUT_LENGTH);
    let cidr = sanitize(cidr, MAX_INPUT_LENGTH);
    validate_subnet_name(&name)?;
    validate_cidr(&cidr)?;
    let vlan_id = validate_vlan_number(vlan_id)?;
    Ok(CleanSubnet {
        name,
        cidr,
        vlan_id,
    })
}

/// `'name' (cidr) VLAN n`, the subnet part of a change-log line.
fn describe_subnet(s: &Subnet) -> String {
    match s.vlan_id {
        Some(vlan) => format!("'{}' ({}) VLAN {vlan}", s.name, s.cidr),
        None => format!("'{}' ({})", s.name, s.cidr),
    }
}

impl<P: Persist> Ipam<P> {
    /// Allocate a subnet in a block.
    ///
    /// Rejected when its VLAN is already used in the block or its range overlaps
    /// another subnet of the block. Other blocks are not considered.
    pub fn add_subnet(
        &self,
        block_id: i64,
        name: &str,
        cidr: &str,
        vlan_id: Option<u16>,
    ) -> Result<Subnet> {
        let input = Self::validated("Add subnet", || clean_subnet(name, cidr, vlan_id))?;
        self.commit(
            "Add subnet",
            |t| {
                if t.block(block_id).is_none() {
                    return Err(IpamError::not_found(EntityKind::Block, block_id));
                }
                let existing = t.subnets_in_block(block_id);
                if let Some(conflict) =
                    check_subnet_conflicts(&existing, &input.cidr, input.vlan_id, block_id, None)
                {
                    return Err(conflict.into());
                }
                Ok(t.insert_subnet(block_id, &input.name, &input.cidr, input.vlan_id)?)
            },
            |t, s| {
                let block = block_label(t, s.block_id);
                NewChange::new(
                    action::ADD_SUBNET,
                    &block,
                    format!("Added subnet {} to block '{block}'", describe_subnet(s)),
                )
            },
        )
    }

    /// Change name, CIDR and VLAN of a subnet, checked against the rest of its block.
    pub fn update_subnet(
        &self,
        id: i64,
        name: &str,
        cidr: &str,
        vlan_id: Option<u16>,
    ) -> Result<Subnet> {
        let input = Self::validated("Update subnet", || clean_subnet(name, cidr, vlan_id))?;
        self.commit(
            "Update subnet",
            |t| {
                let block_id = t
                    .subnet(id)
                    .map(|s| s.block_id)
                    .ok_or_else(|| IpamError::not_found(EntityKind::Subnet, id))?;
                let existing = t.subnets_in_block(block_id);
                if let Some(conflict) = check_subnet_conflicts(
                    &existing,
                    &input.cidr,
                    input.vlan_id,
                    block_id,
                    Some(id),
                ) {
                    return Err(conflict.into());
                }
                Ok(t.update_subnet(id, &input.name, &input.cidr, input.vlan_id)?)
            },
            |t, s| {
                let block = block_label(t, s.block_id);
                NewChange::new(
                    action::EDIT_SUBNET,
                    &block,
                    format!("Edited subnet {} in block '{block}'", describe_subnet(s)),
                )
            },
        )
    }

    pub fn delete_subnet(&self, id: i64) -> Result<Subnet> {
        self.commit(
            "Delete subnet",
            |t| {
                t.delete_subnet(id)
                    .map_err(|_| IpamError::not_found(EntityKind::Subnet, id))
            },
            |t, s| {
                let block = block_label(t, s.block_id);
                NewChange::new(
                    action::DELETE_SUBNET,
                    &block,
                    format!("Deleted subnet {} from block '{block}'", describe_subnet(s)),
                )
            },
        )
    }
}
