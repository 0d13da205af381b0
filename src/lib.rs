// cargo watch -x 'fmt' -x 'test'

//! IP address management core.
//!
//! Blocks own containers and subnets; every change is validated, checked for
//! VLAN and address conflicts inside its block, written atomically and then
//! recorded in a change log whose entries carry full-state snapshots.
//!
//! ```no_run
//! use ipam_core::{Config, Ipam};
//!
//! let ipam = Ipam::in_memory(Config::default());
//! let block = ipam.add_block("Production")?;
//! ipam.add_subnet(block.id, "Web", "10.0.1.0/24", Some(100))?;
//! # Ok::<(), ipam_core::IpamError>(())
//! ```

pub mod audit;
pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod output;
pub mod processing;
pub mod service;
pub mod store;

pub use config::Config;
pub use error::{IpamError, Result};
pub use service::{ContainerUsage, ImportMode, ImportSummary, Ipam, RestoreSummary};
