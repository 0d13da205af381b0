//! Input validation for names, CIDRs and VLAN IDs.
//!
//! Pure functions, no I/O. Every free-text value is passed through [`sanitize`]
//! before it reaches a validator or the store.

use crate::models::{CidrParseError, Ipv4};
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use thiserror::Error;

/// Default maximum length for block, container and subnet names.
pub const MAX_NAME_LENGTH: usize = 50;
/// Default maximum length applied by [`sanitize`].
pub const MAX_INPUT_LENGTH: usize = 100;
pub const VLAN_MIN: u16 = 1;
pub const VLAN_MAX: u16 = 4094;

lazy_static! {
    static ref HTML_TAG: Regex = Regex::new(r"<[^>]+>").expect("Invalid Regex?");
    static ref INVALID_NAME_CHARS: Regex = Regex::new(r#"[<>"']"#).expect("Invalid Regex?");
    static ref VLAN_DIGITS: Regex = Regex::new(r"^[0-9]+$").expect("Invalid Regex?");
    static ref SQL_PATTERNS: Vec<Regex> = [
        r"(?i);\s*(drop|delete|truncate|alter|insert|update|create|exec)\b",
        r"(?i)\bunion\s+(all\s+)?select\b",
        r"(?i)\bxp_\w+",
        r"--",
        r"/\*|\*/",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Invalid Regex?"))
    .collect();
}

/// Which kind of record a name belongs to, used in messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    Block,
    Container,
    Subnet,
}

impl fmt::Display for NameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            NameKind::Block => "Block",
            NameKind::Container => "Container",
            NameKind::Subnet => "Subnet",
        };
        f.write_str(label)
    }
}

/// Format violations. Always recoverable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} name cannot be empty")]
    EmptyName(NameKind),
    #[error("{kind} name must be {max} characters or less")]
    NameTooLong { kind: NameKind, max: usize },
    #[error("{0} name contains invalid characters")]
    NameInvalidCharacters(NameKind),
    #[error("{0} name contains a disallowed SQL-like pattern")]
    NameSuspiciousPattern(NameKind),
    #[error("CIDR cannot be empty")]
    EmptyCidr,
    #[error("Invalid CIDR format: {0}")]
    InvalidCidr(CidrParseError),
    #[error("VLAN ID can only contain numbers")]
    VlanNotNumeric,
    #[error("VLAN ID must be between {VLAN_MIN} and {VLAN_MAX}")]
    VlanOutOfRange,
    #[error("Block ID is required")]
    MissingBlock,
}

/// Strip HTML tags, truncate to `max_len` characters and trim whitespace.
///
/// Tag stripping is a simple `<...>` removal, not an HTML parser.
pub fn sanitize(text: &str, max_len: usize) -> String {
    let cleaned = HTML_TAG.replace_all(text, "");
    let truncated: String = cleaned.chars().take(max_len).collect();
    truncated.trim().to_string()
}

/// Validate a CIDR string and return the parsed network.
///
/// IPv6 and bare addresses without a prefix are rejected.
pub fn validate_cidr(cidr: &str) -> Result<Ipv4, ValidationError> {
    if cidr.is_empty() {
        return Err(ValidationError::EmptyCidr);
    }
    Ipv4::new(cidr).map_err(ValidationError::InvalidCidr)
}

/// Validate an optional VLAN ID string.
///
/// Empty input is valid and yields `None`. Only a plain digit string is accepted.
pub fn validate_vlan(vlan_id: &str) -> Result<Option<u16>, ValidationError> {
    if vlan_id.is_empty() {
        return Ok(None);
    }
    if !VLAN_DIGITS.is_match(vlan_id) {
        return Err(ValidationError::VlanNotNumeric);
    }
    // too many digits for u64 is still just out of range
    let vlan: u64 = vlan_id
        .parse()
        .map_err(|_| ValidationError::VlanOutOfRange)?;
    if vlan < VLAN_MIN as u64 || vlan > VLAN_MAX as u64 {
        return Err(ValidationError::VlanOutOfRange);
    }
    Ok(Some(vlan as u16))
}

/// Validate a stored VLAN number, the typed counterpart of [`validate_vlan`].
pub fn validate_vlan_number(vlan_id: Option<u16>) -> Result<Option<u16>, ValidationError> {
    match vlan_id {
        Some(v) if !(VLAN_MIN..=VLAN_MAX).contains(&v) => Err(ValidationError::VlanOutOfRange),
        other => Ok(other),
    }
}

/// Validate a display name: non-blank, at most `max_len` characters, none of `<>"'`.
pub fn validate_name(name: &str, max_len: usize, kind: NameKind) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyName(kind));
    }
    if name.chars().count() > max_len {
        return Err(ValidationError::NameTooLong { kind, max: max_len });
    }
    if INVALID_NAME_CHARS.is_match(name) {
        return Err(ValidationError::NameInvalidCharacters(kind));
    }
    Ok(())
}

/// Validate a block name. Adds the SQL-pattern rule on top of [`validate_name`].
pub fn validate_block_name(name: &str) -> Result<(), ValidationError> {
    validate_name(name, MAX_NAME_LENGTH, NameKind::Block)?;
    if SQL_PATTERNS.iter().any(|re| re.is_match(name)) {
        return Err(ValidationError::NameSuspiciousPattern(NameKind::Block));
    }
    Ok(())
}

pub fn validate_subnet_name(name: &str) -> Result<(), ValidationError> {
    validate_name(name, MAX_NAME_LENGTH, NameKind::Subnet)
}

pub fn validate_container_name(name: &str) -> Result<(), ValidationError> {
    validate_name(name, MAX_NAME_LENGTH, NameKind::Container)
}
