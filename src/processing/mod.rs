//! Pure IPAM logic, free of storage and I/O.
//!
//! - [`validate`] - Sanitising and validating names, CIDRs and VLAN IDs
//! - [`conflict`] - Duplicate and overlap checks scoped to one block
//! - [`overlap`] - Scan of existing data for overlapping subnets
//! - [`sort`] - The three subnet ordering strategies
//! - [`hierarchy`] - Container/subnet tree and segment usage

pub mod conflict;
pub mod hierarchy;
pub mod overlap;
pub mod sort;
pub mod validate;

// Re-export public functions
pub use conflict::{
    check_subnet_conflicts, duplicate_block_name, duplicate_vlan_in_block,
    overlapping_cidr_in_block, overlapping_container_networks, Conflict, ConflictEntity,
    ConflictField,
};
pub use hierarchy::{
    compose_all, compose_block, container_allocations, segment_usage, BlockTree, HierarchyNode,
    SegmentUsage,
};
pub use overlap::{find_overlapping_subnets, log_overlapping_subnets, OverlapConflict};
pub use sort::{network_key, sort_subnets, sorted_subnets, SortOrder};
pub use validate::{
    sanitize, validate_block_name, validate_cidr, validate_container_name, validate_name,
    validate_subnet_name, validate_vlan, validate_vlan_number, NameKind, ValidationError,
    MAX_INPUT_LENGTH, MAX_NAME_LENGTH,
};
