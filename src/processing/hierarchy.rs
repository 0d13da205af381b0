//! Container/subnet tree for display, plus per-container address usage.

use super::sort::network_key;
use crate::models::{Block, Container, Ipv4, Subnet};

/// A top-level entry of a block tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HierarchyNode<'a> {
    /// A container and the subnets assigned to it.
    Container {
        container: &'a Container,
        subnets: Vec<&'a Subnet>,
    },
    /// A subnet not contained by any container of its block.
    Subnet(&'a Subnet),
}

impl HierarchyNode<'_> {
    pub fn network(&self) -> Option<Ipv4> {
        match self {
            HierarchyNode::Container { container, .. } => container.network(),
            HierarchyNode::Subnet(subnet) => subnet.network(),
        }
    }
}

/// One block and its composed tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockTree<'a> {
    pub block: &'a Block,
    pub nodes: Vec<HierarchyNode<'a>>,
}

/// Nest the subnets of `block_id` under the containers of `block_id`.
///
/// Containers are tried in slice order and a subnet goes to the first one whose
/// range covers it (equal ranges count). Subnets and containers with unparseable
/// CIDRs never nest, and the top level is ordered by network with those last.
pub fn compose_block<'a>(
    containers: &'a [Container],
    subnets: &'a [Subnet],
    block_id: i64,
) -> Vec<HierarchyNode<'a>> {
    let block_containers: Vec<(&Container, Option<Ipv4>)> = containers
        .iter()
        .filter(|c| c.block_id == block_id)
        .map(|c| (c, c.network()))
        .collect();
    let mut assigned: Vec<Vec<&Subnet>> = vec![Vec::new(); block_containers.len()];
    let mut orphans: Vec<&Subnet> = Vec::new();

    for subnet in subnets.iter().filter(|s| s.block_id == block_id) {
        let slot = subnet.network().and_then(|net| {
            block_containers
                .iter()
                .position(|(_, base)| base.is_some_and(|base| net.subnet_of(&base)))
        });
        match slot {
            Some(i) => assigned[i].push(subnet),
            None => orphans.push(subnet),
        }
    }

    let mut nodes: Vec<HierarchyNode> = block_containers
        .into_iter()
        .zip(assigned)
        .map(|((container, _), subnets)| HierarchyNode::Container { container, subnets })
        .chain(orphans.into_iter().map(HierarchyNode::Subnet))
        .collect();
    nodes.sort_by_cached_key(|n| network_key(n.network()));
    nodes
}

/// Compose every block in the given order.
pub fn compose_all<'a>(
    blocks: &'a [Block],
    containers: &'a [Container],
    subnets: &'a [Subnet],
) -> Vec<BlockTree<'a>> {
    blocks
        .iter()
        .map(|block| BlockTree {
            block,
            nodes: compose_block(containers, subnets, block.id),
        })
        .collect()
}

/// Address usage of a container's base network.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentUsage {
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub percent: f64,
}

impl SegmentUsage {
    fn empty() -> Self {
        SegmentUsage {
            total: 0,
            used: 0,
            free: 0,
            percent: 0.0,
        }
    }
}

/// Subnets of the container's block that fit inside its base network.
pub fn container_allocations<'a>(container: &Container, subnets: &'a [Subnet]) -> Vec<&'a Subnet> {
    let Some(base) = container.network() else {
        return Vec::new();
    };
    let mut allocations: Vec<&Subnet> = subnets
        .iter()
        .filter(|s| s.block_id == container.block_id)
        .filter(|s| s.network().is_some_and(|net| net.subnet_of(&base)))
        .collect();
    allocations.sort_by_cached_key(|s| network_key(s.network()));
    allocations
}

/// Total, used and free addresses of a container, counting every allocation inside it.
///
/// An invalid base network reports all zeros.
pub fn segment_usage(container: &Container, subnets: &[Subnet]) -> SegmentUsage {
    let Some(base) = container.network() else {
        return SegmentUsage::empty();
    };
    let total = base.size();
    let used: u64 = container_allocations(container, subnets)
        .iter()
        .filter_map(|s| s.network())
        .map(|net| net.size())
        .sum();
    SegmentUsage {
        total,
        used,
        free: total.saturating_sub(used),
        percent: used as f64 / total as f64 * 100.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container(id: i64, block_id: i64, base_network: &str) -> Container {
        Container {
            id,
            block_id,
            name: format!("c-{id}"),
            base_network: base_network.to_string(),
            position: id,
        }
    }

    fn subnet(id: i64, block_id: i64, cidr: &str) -> Subnet {
        Subnet {
            id,
            block_id,
            name: format!("s-{id}"),
            cidr: cidr.to_string(),
            vlan_id: None,
        }
    }

    fn container_children(node: &HierarchyNode) -> Vec<i64> {
        match node {
            HierarchyNode::Container { subnets, .. } => subnets.iter().map(|s| s.id).collect(),
            HierarchyNode::Subnet(_) => panic!("expected a container node"),
        }
    }

    #[test]
    fn test_subnet_nests_under_container() {
        let containers = vec![container(1, 7, "192.168.0.0/16")];
        let subnets = vec![subnet(10, 7, "192.168.1.0/24")];
        let nodes = compose_block(&containers, &subnets, 7);
        assert_eq!(nodes.len(), 1);
        assert_eq!(container_children(&nodes[0]), [10]);
    }

    #[test]
    fn test_orphans_and_ordering() {
        let containers = vec![
            container(1, 1, "10.20.0.0/16"),
            container(2, 1, "broken"),
            container(3, 2, "10.0.0.0/8"),
        ];
        let subnets = vec![
            subnet(10, 1, "10.20.5.0/24"),
            subnet(11, 1, "10.0.0.0/24"),
            subnet(12, 1, "nope"),
            subnet(13, 1, "10.20.0.0/16"),
        ];
        let nodes = compose_block(&containers, &subnets, 1);
        assert_eq!(nodes.len(), 4);
        assert!(matches!(nodes[0], HierarchyNode::Subnet(s) if s.id == 11));
        assert_eq!(
            container_children(&nodes[1]),
            [10, 13],
            "equal range counts as contained"
        );
        let HierarchyNode::Container { container, .. } = &nodes[2] else {
            panic!("expected a container node");
        };
        assert_eq!(container.id, 2);
        assert!(matches!(nodes[3], HierarchyNode::Subnet(s) if s.id == 12));
    }

    #[test]
    fn test_first_matching_container_wins() {
        let containers = vec![
            container(1, 1, "10.0.0.0/16"),
            container(2, 1, "10.0.0.0/8"),
        ];
        let subnets = vec![subnet(10, 1, "10.0.1.0/24")];
        let nodes = compose_block(&containers, &subnets, 1);
        let children: Vec<Vec<i64>> = nodes.iter().map(container_children).collect();
        // /8 sorts first for display, but the /16 was tried first
        assert_eq!(children, vec![vec![], vec![10]]);
    }

    #[test]
    fn test_compose_all_keeps_block_order() {
        let blocks = vec![
            Block {
                id: 2,
                name: "B".to_string(),
                position: 1,
                collapsed: false,
            },
            Block {
                id: 1,
                name: "A".to_string(),
                position: 2,
                collapsed: true,
            },
        ];
        let subnets = vec![subnet(10, 1, "10.0.0.0/24"), subnet(11, 2, "10.0.0.0/24")];
        let trees = compose_all(&blocks, &[], &subnets);
        assert_eq!(trees[0].block.id, 2);
        assert!(matches!(trees[0].nodes[..], [HierarchyNode::Subnet(s)] if s.id == 11));
        assert!(matches!(trees[1].nodes[..], [HierarchyNode::Subnet(s)] if s.id == 10));
    }

    #[test]
    fn test_segment_usage() {
        let c = container(1, 1, "10.0.0.0/24");
        let subnets = vec![
            subnet(10, 1, "10.0.0.0/26"),
            subnet(11, 1, "10.0.0.64/26"),
            subnet(12, 1, "10.0.1.0/26"),
            subnet(13, 2, "10.0.0.128/26"),
        ];
        let usage = segment_usage(&c, &subnets);
        assert_eq!(usage.total, 256);
        assert_eq!(usage.used, 128);
        assert_eq!(usage.free, 128);
        assert!((usage.percent - 50.0).abs() < f64::EPSILON);

        let ids: Vec<i64> = container_allocations(&c, &subnets)
            .iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, [10, 11]);

        let broken = container(2, 1, "oops");
        assert_eq!(segment_usage(&broken, &subnets), SegmentUsage::empty());
    }
}
