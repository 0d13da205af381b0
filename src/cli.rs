//! Command-line surface of the `ipam` binary.
//!
//! Parsing is done with clap derive; [`run`] executes a parsed command against an
//! [`Ipam`] and returns the text to print, so every command is testable without
//! a process.

use crate::error::{EntityKind, IpamError, Result};
use crate::output::{render_changes, render_subnet_list, render_tree, render_usage, template_csv};
use crate::processing::{compose_all, validate_vlan};
use crate::service::{ImportMode, Ipam};
use crate::store::Persist;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::fmt::Write;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "ipam",
    about = "IP address management: blocks, containers, subnets and VLANs with snapshot history",
    version
)]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "IPAM_CONFIG", global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage blocks
    #[command(subcommand)]
    Block(BlockCommand),
    /// Manage containers
    #[command(subcommand)]
    Container(ContainerCommand),
    /// Manage subnets
    #[command(subcommand)]
    Subnet(SubnetCommand),
    /// List subnets in the configured sort order
    List {
        #[arg(long)]
        block: Option<i64>,
    },
    /// Show blocks with containers and nested subnets
    Tree,
    /// Report overlapping subnets inside each block
    Check,
    /// Show recent change-log entries
    Log,
    /// List snapshots, newest first
    Snapshots,
    /// Replace all data with a snapshot
    Restore { id: i64 },
    /// Write subnets as CSV
    ExportCsv {
        #[arg(long)]
        block: Option<i64>,
    },
    /// Import subnets from a CSV file
    ImportCsv {
        file: PathBuf,
        #[arg(long, default_value = "merge")]
        mode: ImportMode,
    },
    /// Print an example CSV import file
    CsvTemplate,
    /// Write the full state as JSON
    ExportJson,
    /// Show the effective configuration
    Settings,
}

#[derive(Subcommand, Debug)]
pub enum BlockCommand {
    Add { name: String },
    Rename { id: i64, name: String },
    Delete { id: i64 },
    /// Toggle the collapsed display state
    Collapse { id: i64 },
    /// Set the display position
    Move { id: i64, position: i64 },
}

#[derive(Subcommand, Debug)]
pub enum ContainerCommand {
    Add {
        block: i64,
        name: String,
        base_network: String,
    },
    Update {
        id: i64,
        name: String,
        base_network: String,
    },
    Delete { id: i64 },
    /// Address usage of a container
    Usage { id: i64 },
}

#[derive(Subcommand, Debug)]
pub enum SubnetCommand {
    Add {
        block: i64,
        name: String,
        cidr: String,
        #[arg(long, default_value = "")]
        vlan: String,
    },
    Update {
        id: i64,
        name: String,
        cidr: String,
        #[arg(long, default_value = "")]
        vlan: String,
    },
    Delete { id: i64 },
}

fn done(message: String) -> Result<String> {
    Ok(format!("{} {message}\n", "OK".green()))
}

/// Execute one command and return its output.
pub fn run<P: Persist>(ipam: &Ipam<P>, command: Command) -> Result<String> {
    log::debug!("run({command:?})");
    match command {
        Command::Block(cmd) => run_block(ipam, cmd),
        Command::Container(cmd) => run_container(ipam, cmd),
        Command::Subnet(cmd) => run_subnet(ipam, cmd),
        Command::List { block } => {
            let subnets = match block {
                Some(id) => ipam.subnets_in_block(id)?,
                None => ipam.subnets()?,
            };
            Ok(render_subnet_list(&ipam.blocks()?, &subnets))
        }
        Command::Tree => {
            let export = ipam.export_all()?;
            let trees = compose_all(&export.blocks, &export.containers, &export.subnets);
            Ok(render_tree(&trees))
        }
        Command::Check => {
            let blocks = ipam.blocks()?;
            let conflicts = ipam.check_overlaps()?;
            if conflicts.is_empty() {
                return Ok("No overlapping subnets found.\n".to_string());
            }
            let mut out = String::new();
            for c in &conflicts {
                let block = blocks
                    .iter()
                    .find(|b| b.id == c.block_id)
                    .map(|b| b.name.as_str())
                    .unwrap_or("?");
                let pair = format!("{} <-> {}", c.first, c.second);
                let _ = writeln!(out, "{} {block}: {pair}", "OVERLAP".red());
            }
            Ok(out)
        }
        Command::Log => Ok(render_changes(&ipam.recent_changes()?, ipam.config().timezone())),
        Command::Snapshots => Ok(render_changes(&ipam.snapshots()?, ipam.config().timezone())),
        Command::Restore { id } => {
            let summary = ipam.restore_snapshot(id)?;
            let mut out = done(format!(
                "Restored snapshot {}: {} block(s), {} container(s), {} subnet(s)",
                summary.snapshot_id, summary.blocks, summary.containers, summary.subnets
            ))?;
            if !summary.overlaps.is_empty() {
                let warning = format!("{} overlapping subnet pair(s)", summary.overlaps.len());
                let _ = writeln!(out, "{} {warning}", "WARNING".yellow());
            }
            Ok(out)
        }
        Command::ExportCsv { block } => ipam.export_csv(block),
        Command::ImportCsv { file, mode } => {
            let path = file.display();
            let reader = std::fs::File::open(&file)
                .map_err(|e| IpamError::CsvFormat(format!("cannot open {path}: {e}")))?;
            let summary = ipam.import_csv(reader, mode)?;
            let mut out = done(format!(
                "Imported {} subnet(s), skipped {}, {} error(s), mode {}",
                summary.success, summary.skipped, summary.errors.len(), summary.mode
            ))?;
            if !summary.created_blocks.is_empty() {
                let _ = writeln!(out, "Created blocks: {}", summary.created_blocks.join(", "));
            }
            for e in &summary.errors {
                let _ = writeln!(out, "  {}", e.yellow());
            }
            Ok(out)
        }
        Command::CsvTemplate => template_csv(),
        Command::ExportJson => ipam.export_json(),
        Command::Settings => {
            toml::to_string_pretty(ipam.config()).map_err(|e| IpamError::Config(e.to_string()))
        }
    }
}

fn run_block<P: Persist>(ipam: &Ipam<P>, cmd: BlockCommand) -> Result<String> {
    match cmd {
        BlockCommand::Add { name } => {
            let block = ipam.add_block(&name)?;
            done(format!("Added block {block}"))
        }
        BlockCommand::Rename { id, name } => {
            let block = ipam.rename_block(id, &name)?;
            done(format!("Renamed block to {block}"))
        }
        BlockCommand::Delete { id } => {
            let block = ipam.delete_block(id)?;
            done(format!("Deleted block {block}"))
        }
        BlockCommand::Collapse { id } => {
            let block = ipam.toggle_collapse(id)?;
            let state = if block.collapsed {
                "collapsed"
            } else {
                "expanded"
            };
            done(format!("Block {block} {state}"))
        }
        BlockCommand::Move { id, position } => {
            if ipam.reorder_blocks(&[(id, position)])? == 0 {
                return Err(IpamError::not_found(EntityKind::Block, id));
            }
            done(format!("Moved block {id} to position {position}"))
        }
    }
}

fn run_container<P: Persist>(ipam: &Ipam<P>, cmd: ContainerCommand) -> Result<String> {
    match cmd {
        ContainerCommand::Add {
            block,
            name,
            base_network,
        } => {
            let c = ipam.add_container(block, &name, &base_network)?;
            done(format!("Added container #{} {c}", c.id))
        }
        ContainerCommand::Update {
            id,
            name,
            base_network,
        } => {
            let c = ipam.update_container(id, &name, &base_network)?;
            done(format!("Updated container #{} {c}", c.id))
        }
        ContainerCommand::Delete { id } => {
            let c = ipam.delete_container(id)?;
            done(format!("Deleted container {c}"))
        }
        ContainerCommand::Usage { id } => {
            let report = ipam.container_usage(id)?;
            let allocations: Vec<_> = report.allocations.iter().collect();
            Ok(render_usage(&report.container, &report.usage, &allocations))
        }
    }
}

fn run_subnet<P: Persist>(ipam: &Ipam<P>, cmd: SubnetCommand) -> Result<String> {
    match cmd {
        SubnetCommand::Add {
            block,
            name,
            cidr,
            vlan,
        } => {
            let vlan_id = validate_vlan(vlan.trim())?;
            let s = ipam.add_subnet(block, &name, &cidr, vlan_id)?;
            done(format!("Added subnet #{} {s}", s.id))
        }
        SubnetCommand::Update {
            id,
            name,
            cidr,
            vlan,
        } => {
            let vlan_id = validate_vlan(vlan.trim())?;
            let s = ipam.update_subnet(id, &name, &cidr, vlan_id)?;
            done(format!("Updated subnet #{} {s}", s.id))
        }
        SubnetCommand::Delete { id } => {
            let s = ipam.delete_subnet(id)?;
            done(format!("Deleted subnet {s}"))
        }
    }
}
