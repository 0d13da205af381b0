use super::{block_label, Ipam};
use crate::error::{EntityKind, IpamError, Result};
use crate::models::{action, Container, NewChange, Subnet};
use crate::processing::{
    container_allocations, overlapping_container_networks, sanitize, segment_usage,
    validate_cidr, validate_container_name, SegmentUsage, ValidationError, MAX_INPUT_LENGTH,
};
use crate::store::{Persist, Tables};

/// A container with its address usage and the subnets inside it.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerUsage {
    pub container: Container,
    pub usage: SegmentUsage,
    pub allocations: Vec<Subnet>,
}

fn clean_container(
    name: &str,
    base_network: &str,
) -> std::result::Result<(String, String), ValidationError> {
    let name = sanitize(name, MAX_INPUT_LENGTH);
    let base_network = sanitize(base_network, MAX_INPUT_LENGTH);
    validate_container_name(&name)?;
    validate_cidr(&base_network)?;
    Ok((name, base_network))
}

impl<P: Persist> Ipam<P> {
    pub fn containers(&self) -> Result<Vec<Container>> {
        Ok(self.store.read(Tables::containers)?)
    }

    pub fn container(&self, id: i64) -> Result<Container> {
        self.store
            .read(|t| t.container(id).cloned())?
            .ok_or_else(|| IpamError::not_found(EntityKind::Container, id))
    }

    /// Reserve `base_network` in a block. Must not overlap another container of the block.
    pub fn add_container(
        &self,
        block_id: i64,
        name: &str,
        base_network: &str,
    ) -> Result<Container> {
        let (name, base_network) =
            Self::validated("Add container", || clean_container(name, base_network))?;
        self.commit(
            "Add container",
            |t| {
                if t.block(block_id).is_none() {
                    return Err(IpamError::not_found(EntityKind::Block, block_id));
                }
                let existing = t.containers_in_block(block_id);
                if let Some(conflict) =
                    overlapping_container_networks(&existing, &base_network, block_id, None)
                {
                    return Err(conflict.into());
                }
                Ok(t.insert_container(block_id, &name, &base_network)?)
            },
            |t, c| {
                let block = block_label(t, c.block_id);
                NewChange::new(
                    action::ADD_CONTAINER,
                    &block,
                    format!(
                        "Added container '{}' ({}) to block '{block}'",
                        c.name, c.base_network
                    ),
                )
            },
        )
    }

    /// Rename a container or move its base network, re-checking overlap against the others.
    pub fn update_container(&self, id: i64, name: &str, base_network: &str) -> Result<Container> {
        let (name, base_network) =
            Self::validated("Update container", || clean_container(name, base_network))?;
        self.commit(
            "Update container",
            |t| {
                let block_id = t
                    .container(id)
                    .map(|c| c.block_id)
                    .ok_or_else(|| IpamError::not_found(EntityKind::Container, id))?;
                let existing = t.containers_in_block(block_id);
                if let Some(conflict) =
                    overlapping_container_networks(&existing, &base_network, block_id, Some(id))
                {
                    return Err(conflict.into());
                }
                Ok(t.update_container(id, &name, &base_network)?)
            },
            |t, c| {
                let block = block_label(t, c.block_id);
                NewChange::new(
                    action::EDIT_CONTAINER,
                    &block,
                    format!(
                        "Edited container '{}' ({}) in block '{block}'",
                        c.name, c.base_network
                    ),
                )
            },
        )
    }

    /// Delete a container. Its subnets stay in the block.
    pub fn delete_container(&self, id: i64) -> Result<Container> {
        self.commit(
            "Delete container",
            |t| {
                t.delete_container(id)
                    .map_err(|_| IpamError::not_found(EntityKind::Container, id))
            },
            |t, c| {
                NewChange::new(
                    action::DELETE_CONTAINER,
                    &block_label(t, c.block_id),
                    format!("Deleted container '{}'", c.name),
                )
            },
        )
    }

    /// Address usage of one container.
    pub fn container_usage(&self, id: i64) -> Result<ContainerUsage> {
        let (container, subnets) = self
            .store
            .read(|t| {
                t.container(id).cloned().map(|c| {
                    let subnets = t.subnets_in_block(c.block_id);
                    (c, subnets)
                })
            })?
            .ok_or_else(|| IpamError::not_found(EntityKind::Container, id))?;
        let usage = segment_usage(&container, &subnets);
        let allocations = container_allocations(&container, &subnets)
            .into_iter()
            .cloned()
            .collect();
        Ok(ContainerUsage {
            container,
            usage,
            allocations,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::error::IpamError;
    use crate::processing::ConflictField;
    use crate::service::Ipam;

    #[test]
    fn test_container_overlap_is_block_scoped() {
        let ipam = Ipam::in_memory(Config::default());
        let a = ipam.add_block("A").unwrap();
        let b = ipam.add_block("B").unwrap();
        let dc = ipam.add_container(a.id, "DC1", "10.0.0.0/16").unwrap();
        assert_eq!(dc.position, 1);

        let err = ipam
            .add_container(a.id, "DC2", "10.0.128.0/17")
            .unwrap_err();
        match err {
            IpamError::Conflict(c) => {
                assert_eq!(c.field, ConflictField::BaseNetwork);
                assert_eq!(c.existing_id(), dc.id);
            }
            other => panic!("unexpected {other:?}"),
        }
        ipam.add_container(b.id, "DC1", "10.0.0.0/16").unwrap();
        assert!(matches!(
            ipam.add_container(77, "X", "172.16.0.0/12"),
            Err(IpamError::NotFound { .. })
        ));
    }

    #[test]
    fn test_update_container_excludes_itself() {
        let ipam = Ipam::in_memory(Config::default());
        let a = ipam.add_block("A").unwrap();
        let dc = ipam.add_container(a.id, "DC1", "10.0.0.0/16").unwrap();
        ipam.add_container(a.id, "DC2", "10.1.0.0/16").unwrap();

        let err = ipam
            .update_container(dc.id, "Core", "10.0.0.0/15")
            .unwrap_err();
        assert!(matches!(err, IpamError::Conflict(_)));
        let updated = ipam.update_container(dc.id, "Core", "10.0.0.0/17").unwrap();
        assert_eq!(updated.name, "Core");
        assert_eq!(
            ipam.recent_changes().unwrap()[0].details,
            "Edited container 'Core' (10.0.0.0/17) in block 'A'"
        );
    }

    #[test]
    fn test_usage_and_delete() {
        let ipam = Ipam::in_memory(Config::default());
        let a = ipam.add_block("A").unwrap();
        let dc = ipam.add_container(a.id, "DC1", "192.168.0.0/16").unwrap();
        ipam.add_subnet(a.id, "one", "192.168.1.0/24", Some(1))
            .unwrap();
        ipam.add_subnet(a.id, "two", "192.168.2.0/24", Some(2))
            .unwrap();
        ipam.add_subnet(a.id, "out", "10.0.0.0/24", None).unwrap();

        let report = ipam.container_usage(dc.id).unwrap();
        assert_eq!(report.usage.total, 65536);
        assert_eq!(report.usage.used, 512);
        assert_eq!(report.allocations.len(), 2);

        ipam.delete_container(dc.id).unwrap();
        assert_eq!(ipam.subnets().unwrap().len(), 3);
        assert!(matches!(ipam.container_usage(dc.id), Err(IpamError::NotFound { .. })));
    }
}
