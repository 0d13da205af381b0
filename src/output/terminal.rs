//! Terminal output utilities.
//!
//! Renders listings, block trees and the audit log as text for the CLI.

use crate::models::{Block, ChangeLogEntry, Container, Subnet};
use crate::processing::{BlockTree, HierarchyNode, SegmentUsage};
use chrono_tz::Tz;
use colored::Colorize;
use std::fmt::Write;

/// Format a value as a quoted, right-aligned field.
///
/// # Arguments
/// * `value` - The value to format
/// * `width` - The minimum width of the field
///
/// # Returns
/// A quoted, right-aligned string
pub fn format_field<T: ToString>(value: T, width: usize) -> String {
    let value_str = value.to_string();
    let quoted = format!("\"{value_str}\"");
    let quoted_len = quoted.len();

    if quoted_len >= width {
        quoted
    } else {
        format!("{quoted:>width$}")
    }
}

fn vlan_label(vlan_id: Option<u16>) -> String {
    vlan_id.map(|v| v.to_string()).unwrap_or_default()
}

/// One aligned row per subnet: block, network, VLAN, name.
pub fn render_subnet_list(blocks: &[Block], subnets: &[Subnet]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        r#"{:>16},{:>20},{:>7},{:>26}"#,
        "\"block\"", "\"network\"", "\"vlan\"", "\"name\""
    );
    for s in subnets {
        let block = blocks
            .iter()
            .find(|b| b.id == s.block_id)
            .map(|b| b.name.as_str())
            .unwrap_or("?");
        let _ = writeln!(
            out,
            "{block},{cidr},{vlan},{name}",
            block = format_field(block, 16),
            cidr = format_field(&s.cidr, 20),
            vlan = format_field(vlan_label(s.vlan_id), 7),
            name = format_field(&s.name, 26),
        );
    }
    out
}

fn subnet_line(s: &Subnet) -> String {
    match s.vlan_id {
        Some(vlan) => format!("{:<20} VLAN {:<5} {}", s.cidr, vlan, s.name),
        None => format!("{:<20} {:<10} {}", s.cidr, "", s.name),
    }
}

/// Blocks with their containers and subnets nested. Collapsed blocks show only the header.
pub fn render_tree(trees: &[BlockTree]) -> String {
    let mut out = String::new();
    for tree in trees {
        let header = format!("{} (#{})", tree.block.name, tree.block.id);
        if tree.block.collapsed {
            let _ = writeln!(out, "{} {}", header.bold(), "[collapsed]".dimmed());
            continue;
        }
        let _ = writeln!(out, "{}", header.bold());
        if tree.nodes.is_empty() {
            let _ = writeln!(out, "  {}", "(empty)".dimmed());
        }
        for node in &tree.nodes {
            match node {
                HierarchyNode::Container { container, subnets } => {
                    let line = format!("[{}] {}", container.base_network, container.name);
                    let _ = writeln!(out, "  {}", line.cyan());
                    for s in subnets {
                        let _ = writeln!(out, "    {}", subnet_line(s));
                    }
                }
                HierarchyNode::Subnet(s) => {
                    let _ = writeln!(out, "  {}", subnet_line(s));
                }
            }
        }
    }
    out
}

/// Change-log entries with timestamps shown in `tz`.
pub fn render_changes(entries: &[ChangeLogEntry], tz: Tz) -> String {
    let mut out = String::new();
    for e in entries {
        let when = e.timestamp.with_timezone(&tz).format("%Y-%m-%d %H:%M:%S %Z");
        let marker = if e.is_snapshot() { "*" } else { " " };
        let _ = writeln!(
            out,
            "{:>5}{} {} {:<20} {:<16} {}",
            e.id, marker, when, e.action.yellow(), e.block, e.details
        );
    }
    out
}

/// Usage summary of one container followed by the subnets inside it.
pub fn render_usage(
    container: &Container,
    usage: &SegmentUsage,
    allocations: &[&Subnet],
) -> String {
    let mut out = String::new();
    let base = format!("({})", container.base_network);
    let _ = writeln!(out, "{} {}", container.name.bold(), base.cyan());
    let _ = writeln!(
        out,
        "  total {}  used {}  free {}  ({:.1}% used)",
        usage.total, usage.used, usage.free, usage.percent
    );
    for s in allocations {
        let _ = writeln!(out, "    {}", subnet_line(s));
    }
    out
}
