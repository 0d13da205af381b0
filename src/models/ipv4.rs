//! IPv4 address and CIDR notation utilities.
//!
//! Provides [`Ipv4`] struct for representing IPv4 networks with a prefix length,
//! along with the range arithmetic used by the conflict detector, the sorter and
//! the hierarchy composer.

use serde::de;
use serde::{Deserialize, Deserializer, Serialize};
use std::cmp::Ordering;
use std::net::Ipv4Addr;
use std::str::FromStr;
use thiserror::Error;

/// Maximum length for an IPv4 subnet mask (32 bits).
pub const MAX_LENGTH: u8 = 32;

/// Reasons a CIDR string can fail to parse.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CidrParseError {
    #[error("CIDR cannot be empty")]
    Empty,
    #[error("'{0}' is missing a /prefix length")]
    MissingPrefix(String),
    #[error("'{0}' does not appear to be an IPv4 address")]
    InvalidAddress(String),
    #[error("'{0}' is not a valid netmask")]
    InvalidPrefix(String),
    #[error("prefix length /{0} is longer than 32 bits")]
    PrefixTooLong(u8),
}

/// Convert a CIDR prefix length to a subnet mask as u32.
///
/// # Examples
/// ```
/// use ipam_core::models::get_cidr_mask;
/// assert_eq!(get_cidr_mask(24).unwrap(), 0xFFFFFF00);
/// ```
pub fn get_cidr_mask(len: u8) -> Result<u32, CidrParseError> {
    if len > MAX_LENGTH {
        Err(CidrParseError::PrefixTooLong(len))
    } else {
        let right_len = MAX_LENGTH - len;
        let all_bits = u32::MAX as u64;

        let mask = (all_bits >> right_len) << right_len;

        Ok(mask as u32)
    }
}

/// Prefix length of a contiguous netmask, `None` for anything else.
fn netmask_prefix(bits: u32) -> Option<u8> {
    let len = bits.leading_ones();
    (bits.checked_shl(len).unwrap_or(0) == 0).then_some(len as u8)
}

/// Prefix length from `24`, a netmask like `255.255.255.0` or a hostmask like
/// `0.0.0.255`. A dotted value is read as a netmask first.
fn parse_prefix(text: &str) -> Result<u8, CidrParseError> {
    let invalid = || CidrParseError::InvalidPrefix(text.to_string());
    if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
        let len: u8 = text.parse().map_err(|_| invalid())?;
        if len > MAX_LENGTH {
            return Err(CidrParseError::PrefixTooLong(len));
        }
        return Ok(len);
    }
    let bits = u32::from(text.parse::<Ipv4Addr>().map_err(|_| invalid())?);
    netmask_prefix(bits)
        .or_else(|| netmask_prefix(!bits))
        .ok_or_else(invalid)
}

/// Get the network address for a given IP and prefix length.
pub fn cut_addr(addr: Ipv4Addr, len: u8) -> Result<Ipv4Addr, CidrParseError> {
    let mask = get_cidr_mask(len)?;
    Ok(Ipv4Addr::from(u32::from(addr) & mask))
}

/// Calculate the broadcast address for a given IP and prefix length.
pub fn broadcast_addr(addr: Ipv4Addr, len: u8) -> Result<Ipv4Addr, CidrParseError> {
    let mask = get_cidr_mask(len)?;
    let network_bits = u32::from(addr) & mask;
    Ok(Ipv4Addr::from(network_bits | !mask))
}

/// IPv4 network in CIDR notation.
///
/// Host bits in `addr` are tolerated (`10.0.0.7/24` parses), range queries always
/// work on the masked network address.
#[derive(Eq, Debug, Copy, Clone, Hash)]
pub struct Ipv4 {
    /// The IPv4 address as written.
    pub addr: Ipv4Addr,
    /// The subnet mask length (0-32).
    pub mask: u8,
}

impl Serialize for Ipv4 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Ipv4 {
    fn deserialize<D>(deserializer: D) -> Result<Ipv4, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ipv4::new(&s).map_err(de::Error::custom)
    }
}

impl Ipv4 {
    /// Create a new [`Ipv4`] from a CIDR string (e.g., "10.0.0.0/24").
    ///
    /// The prefix is mandatory: a bare address is rejected rather than read as /32.
    /// Dotted netmasks and hostmasks are accepted in place of the prefix length.
    pub fn new(addr_cidr: &str) -> Result<Ipv4, CidrParseError> {
        if addr_cidr.is_empty() {
            return Err(CidrParseError::Empty);
        }
        let (addr, mask) = addr_cidr
            .split_once('/')
            .ok_or_else(|| CidrParseError::MissingPrefix(addr_cidr.to_string()))?;
        let addr: Ipv4Addr = addr
            .parse()
            .map_err(|_| CidrParseError::InvalidAddress(addr.to_string()))?;
        let mask = parse_prefix(mask)?;
        Ok(Ipv4 { addr, mask })
    }

    fn mask_bits(&self) -> u32 {
        // mask is validated on construction; clamp for hand-built values
        get_cidr_mask(self.mask.min(MAX_LENGTH)).unwrap_or(u32::MAX)
    }

    /// Get the lowest (network) address in the subnet.
    pub fn lo(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.lo_u32())
    }

    /// Get the highest (broadcast) address in the subnet.
    pub fn hi(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.hi_u32())
    }

    pub fn lo_u32(&self) -> u32 {
        u32::from(self.addr) & self.mask_bits()
    }

    pub fn hi_u32(&self) -> u32 {
        self.lo_u32() | !self.mask_bits()
    }

    /// Number of addresses covered, /0 included.
    pub fn size(&self) -> u64 {
        1u64 << (MAX_LENGTH - self.mask.min(MAX_LENGTH))
    }

    /// The canonical network form, host bits cleared.
    pub fn network(&self) -> Ipv4 {
        Ipv4 {
            addr: self.lo(),
            mask: self.mask,
        }
    }

    /// True if `ip` falls inside this network.
    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        let ip = u32::from(ip);
        self.lo_u32() <= ip && ip <= self.hi_u32()
    }

    /// True if the two ranges share at least one address.
    pub fn overlaps(&self, other: &Ipv4) -> bool {
        !(self.hi_u32() < other.lo_u32() || other.hi_u32() < self.lo_u32())
    }

    /// True if every address of `self` lies inside `other`. Equal ranges count.
    pub fn subnet_of(&self, other: &Ipv4) -> bool {
        other.lo_u32() <= self.lo_u32() && self.hi_u32() <= other.hi_u32()
    }

    /// Ordering key used for display: network address, then prefix length.
    pub fn sort_key(&self) -> (u32, u8) {
        (self.lo_u32(), self.mask)
    }
}

impl FromStr for Ipv4 {
    type Err = CidrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ipv4::new(s)
    }
}

impl std::fmt::Display for Ipv4 {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}/{}", self.addr, self.mask)
    }
}

impl PartialEq for Ipv4 {
    fn eq(&self, other: &Ipv4) -> bool {
        self.addr == other.addr && self.mask == other.mask
    }
}

impl Ord for Ipv4 {
    fn cmp(&self, other: &Ipv4) -> Ordering {
        self.sort_key()
            .cmp(&other.sort_key())
            .then_with(|| self.addr.cmp(&other.addr))
    }
}

impl PartialOrd for Ipv4 {
    fn partial_cmp(&self, other: &Ipv4) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
