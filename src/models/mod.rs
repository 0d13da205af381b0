//! Domain models for the IPAM inventory.
//!
//! This module contains the core data structures used throughout the application:
//! - [`Ipv4`] - IPv4 network with CIDR notation support
//! - [`Block`], [`Container`], [`Subnet`] - the inventory entities
//! - [`ChangeLogEntry`] - audit trail rows, some of them snapshots
//! - [`Export`] - the full-state document stored in snapshots

mod block;
mod change_log;
mod container;
mod export;
mod ipv4;
mod subnet;

// Re-export public types
pub use block::Block;
pub use change_log::{action, ChangeLogEntry, NewChange, NO_BLOCK};
pub use container::Container;
pub use export::{Export, EXPORT_VERSION};
pub use ipv4::{broadcast_addr, cut_addr, get_cidr_mask, CidrParseError, Ipv4, MAX_LENGTH};
pub use subnet::Subnet;
