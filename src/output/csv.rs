//! CSV import/export in the `Block,Network,VLAN,Subnet Name` format.

use crate::error::{IpamError, Result};
use crate::models::{Block, Subnet};
use crate::processing::{
    sanitize, validate_block_name, validate_cidr, validate_subnet_name, validate_vlan,
    MAX_INPUT_LENGTH,
};
use std::fmt;
use std::io::Read;

pub const CSV_HEADERS: [&str; 4] = ["Block", "Network", "VLAN", "Subnet Name"];

/// Rows of the downloadable example file.
const TEMPLATE_ROWS: [[&str; 4]; 4] = [
    ["Production", "10.0.1.0/24", "100", "Web Servers"],
    ["Production", "10.0.2.0/24", "101", "Database Servers"],
    ["Development", "10.1.0.0/24", "200", "Dev Environment"],
    ["Development", "10.1.1.0/24", "", "Test Environment"],
];

/// A validated CSV data row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvRow {
    /// 1-based line number, the header is line 1.
    pub line: usize,
    pub block_name: String,
    pub cidr: String,
    pub vlan_id: Option<u16>,
    pub subnet_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CsvField {
    BlockName,
    Cidr,
    Vlan,
    SubnetName,
}

/// Why a CSV data row was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvRowError {
    pub row_number: usize,
    /// The row as read.
    pub data: Vec<String>,
    /// Fields that failed. Empty when the row shape itself is wrong.
    pub fields: Vec<CsvField>,
    pub message: String,
}

impl fmt::Display for CsvRowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}: {}", self.row_number, self.message)
    }
}

fn csv_error(e: impl fmt::Display) -> IpamError {
    IpamError::CsvFormat(e.to_string())
}

fn block_name(blocks: &[Block], id: i64) -> &str {
    blocks
        .iter()
        .find(|b| b.id == id)
        .map(|b| b.name.as_str())
        .unwrap_or("Unknown")
}

/// Write subnets as CSV, in the order given, with the header row.
pub fn export_csv(blocks: &[Block], subnets: &[Subnet]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADERS).map_err(csv_error)?;
    for subnet in subnets {
        let vlan = subnet.vlan_id.map(|v| v.to_string()).unwrap_or_default();
        writer
            .write_record([
                block_name(blocks, subnet.block_id),
                subnet.cidr.as_str(),
                vlan.as_str(),
                subnet.name.as_str(),
            ])
            .map_err(csv_error)?;
    }
    let bytes = writer.into_inner().map_err(csv_error)?;
    String::from_utf8(bytes).map_err(csv_error)
}

/// The example import file.
pub fn template_csv() -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADERS).map_err(csv_error)?;
    for row in TEMPLATE_ROWS {
        writer.write_record(row).map_err(csv_error)?;
    }
    let bytes = writer.into_inner().map_err(csv_error)?;
    String::from_utf8(bytes).map_err(csv_error)
}

fn validate_row(
    line: usize,
    record: &csv::StringRecord,
) -> std::result::Result<CsvRow, CsvRowError> {
    let data: Vec<String> = record.iter().map(str::to_string).collect();
    let columns = record.len();
    if columns != CSV_HEADERS.len() {
        return Err(CsvRowError {
            row_number: line,
            data,
            fields: Vec::new(),
            message: format!("Expected {} columns, got {columns}", CSV_HEADERS.len()),
        });
    }

    let block_name = sanitize(record[0].trim(), MAX_INPUT_LENGTH);
    let cidr = sanitize(record[1].trim(), MAX_INPUT_LENGTH);
    let vlan_raw = record[2].trim();
    let subnet_name = sanitize(record[3].trim(), MAX_INPUT_LENGTH);

    let mut errors: Vec<String> = Vec::new();
    let mut fields: Vec<CsvField> = Vec::new();
    let mut fail = |field: CsvField, message: String| {
        errors.push(message);
        if !fields.contains(&field) {
            fields.push(field);
        }
    };

    if block_name.is_empty() {
        fail(CsvField::BlockName, "Block name cannot be empty".into());
    } else if let Err(e) = validate_block_name(&block_name) {
        fail(CsvField::BlockName, format!("Block name: {e}"));
    }
    if subnet_name.is_empty() {
        fail(CsvField::SubnetName, "Subnet name cannot be empty".into());
    } else if let Err(e) = validate_subnet_name(&subnet_name) {
        fail(CsvField::SubnetName, format!("Subnet name: {e}"));
    }
    if let Err(e) = validate_cidr(&cidr) {
        // an empty CIDR already reads "CIDR cannot be empty"
        let message = if cidr.is_empty() {
            e.to_string()
        } else {
            format!("CIDR: {e}")
        };
        fail(CsvField::Cidr, message);
    }
    let vlan_id = match validate_vlan(vlan_raw) {
        Ok(vlan) => vlan,
        Err(e) => {
            fail(CsvField::Vlan, format!("VLAN ID: {e}"));
            None
        }
    };

    if errors.is_empty() {
        Ok(CsvRow {
            line,
            block_name,
            cidr,
            vlan_id,
            subnet_name,
        })
    } else {
        Err(CsvRowError {
            row_number: line,
            data,
            fields,
            message: errors.join("; "),
        })
    }
}

/// Parse and validate a whole CSV import.
///
/// The header must match [`CSV_HEADERS`] exactly and at least one data row must
/// follow. Any invalid row rejects the whole file with every row error collected.
pub fn parse_import<R: Read>(reader: R) -> Result<Vec<CsvRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);
    let records = reader
        .records()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| IpamError::CsvFormat(format!("Invalid CSV format - {e}")))?;

    if records.len() < 2 {
        return Err(IpamError::CsvFormat(
            "CSV file must contain at least a header row and one data row".to_string(),
        ));
    }
    let header: Vec<&str> = records[0].iter().map(str::trim).collect();
    if header != CSV_HEADERS {
        return Err(IpamError::CsvFormat(format!(
            "CSV headers must be exactly: {}",
            CSV_HEADERS.join(", ")
        )));
    }

    let (rows, errors): (Vec<_>, Vec<_>) = records[1..]
        .iter()
        .enumerate()
        .map(|(i, record)| validate_row(i + 2, record))
        .partition(|r| r.is_ok());
    let errors: Vec<CsvRowError> = errors.into_iter().filter_map(|r| r.err()).collect();
    if !errors.is_empty() {
        for e in &errors {
            log::debug!("CSV import {e}");
        }
        return Err(IpamError::CsvRows(errors));
    }
    Ok(rows.into_iter().filter_map(|r| r.ok()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_parses_cleanly() {
        let template = template_csv().unwrap();
        assert!(template.starts_with("Block,Network,VLAN,Subnet Name\n"));
        let rows = parse_import(template.as_bytes()).unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].line, 2);
        assert_eq!(rows[1].subnet_name, "Database Servers");
        assert_eq!(rows[3].vlan_id, None);
    }

    #[test]
    fn test_export_csv() {
        let blocks = vec![Block {
            id: 1,
            name: "Production".to_string(),
            position: 1,
            collapsed: false,
        }];
        let subnets = vec![
            Subnet {
                id: 1,
                block_id: 1,
                name: "Web, public".to_string(),
                cidr: "10.0.1.0/24".to_string(),
                vlan_id: Some(100),
            },
            Subnet {
                id: 2,
                block_id: 1,
                name: "Test".to_string(),
                cidr: "10.0.2.0/24".to_string(),
                vlan_id: None,
            },
        ];
        let csv = export_csv(&blocks, &subnets).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines,
            [
                "Block,Network,VLAN,Subnet Name",
                "Production,10.0.1.0/24,100,\"Web, public\"",
                "Production,10.0.2.0/24,,Test",
            ]
        );
    }

    #[test]
    fn test_rejects_bad_header_and_empty_files() {
        let err = parse_import("Block,CIDR,VLAN,Name\nA,10.0.0.0/24,,x\n".as_bytes()).unwrap_err();
        assert!(matches!(err, IpamError::CsvFormat(m) if m.contains("headers")));
        let err = parse_import("Block,Network,VLAN,Subnet Name\n".as_bytes()).unwrap_err();
        assert!(matches!(err, IpamError::CsvFormat(_)));
    }

    #[test]
    fn test_collects_every_row_error() {
        let input = "Block,Network,VLAN,Subnet Name\n\
                     Production,10.0.1.0/24,100,Web\n\
                     ,10.0.2.0,5000,\n\
                     Production,10.0.3.0/24\n\
                     <b>Lab</b>,10.0.4.0/24,abc,ok\n";
        let err = parse_import(input.as_bytes()).unwrap_err();
        let IpamError::CsvRows(errors) = err else {
            panic!("expected row errors");
        };
        assert_eq!(errors.len(), 3);

        assert_eq!(errors[0].row_number, 3);
        let expected = [
            CsvField::BlockName,
            CsvField::SubnetName,
            CsvField::Cidr,
            CsvField::Vlan,
        ];
        assert_eq!(errors[0].fields, expected);
        assert!(errors[0].message.starts_with("Block name cannot be empty; "));

        assert_eq!(errors[1].row_number, 4);
        assert_eq!(errors[1].message, "Expected 4 columns, got 2");

        assert_eq!(errors[2].fields, [CsvField::Vlan]);
        assert_eq!(
            errors[2].message,
            "VLAN ID: VLAN ID can only contain numbers"
        );
    }

    #[test]
    fn test_values_are_sanitized() {
        let input = "Block,Network,VLAN,Subnet Name\n <i>Core</i> , 10.9.0.0/16 , 7 , Uplinks \n";
        let rows = parse_import(input.as_bytes()).unwrap();
        assert_eq!(rows[0].block_name, "Core");
        assert_eq!(rows[0].cidr, "10.9.0.0/16");
        assert_eq!(rows[0].vlan_id, Some(7));
        assert_eq!(rows[0].subnet_name, "Uplinks");
    }
}
