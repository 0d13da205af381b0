//! Output formatting for IPAM data.
//!
//! This module handles the external text formats:
//! - [`csv`] - CSV import/export
//! - [`terminal`] - Terminal output with colors

mod csv;
mod terminal;

pub use csv::{export_csv, parse_import, template_csv, CsvField, CsvRow, CsvRowError, CSV_HEADERS};
pub use terminal::{format_field, render_changes, render_subnet_list, render_tree, render_usage};
