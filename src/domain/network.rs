// Copyright (c) 2025 - Cowboy AI, Inc.
//! Network Value Objects with Validation Invariants

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use thiserror::Error;

use crate::errors::ConfigError;

/// Network validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Invalid IPv4 address: {0}")]
    InvalidIpAddress(String),

    #[error("Invalid CIDR notation: {0}")]
    InvalidCidr(String),

    #[error("Invalid prefix length: {0} (must be 0-32)")]
    InvalidPrefixLength(u8),

    #[error("Host bits set in {0}: not a network block")]
    HostBitsSet(String),

    #[error("Cannot add {new_bits} bits to /{prefix_len}")]
    PrefixOverflow { prefix_len: u8, new_bits: u8 },

    #[error("Subnet index {index} exceeds {available} available subnets")]
    SubnetIndexOutOfRange { index: u32, available: u64 },
}

impl From<NetworkError> for ConfigError {
    fn from(err: NetworkError) -> Self {
        ConfigError::InvalidCidr(err.to_string())
    }
}

/// IPv4 network block in CIDR notation
///
/// Invariants:
/// - Prefix length 0-32
/// - No host bits set (`10.0.1.0/24` is valid, `10.0.1.7/24` is not)
///
/// # Examples
///
/// ```rust
/// use cim_network_topology::domain::Ipv4Cidr;
///
/// let vpc: Ipv4Cidr = "10.0.0.0/16".parse().unwrap();
/// let third = vpc.subnet(8, 2).unwrap();
/// assert_eq!(third.to_string(), "10.0.2.0/24");
/// assert!(vpc.contains_block(&third));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ipv4Cidr {
    network: Ipv4Addr,
    prefix_len: u8,
}

impl Ipv4Cidr {
    /// `0.0.0.0/0`
    pub const ANY: Ipv4Cidr = Ipv4Cidr {
        network: Ipv4Addr::UNSPECIFIED,
        prefix_len: 0,
    };

    /// Create a network block
    ///
    /// # Invariants
    /// - Prefix length 0-32
    /// - Address has no bits set beyond the prefix
    pub fn new(network: Ipv4Addr, prefix_len: u8) -> Result<Self, NetworkError> {
        if prefix_len > 32 {
            return Err(NetworkError::InvalidPrefixLength(prefix_len));
        }

        let candidate = Self {
            network,
            prefix_len,
        };

        if u32::from(network) & !candidate.mask() != 0 {
            return Err(NetworkError::HostBitsSet(format!("{}/{}", network, prefix_len)));
        }

        Ok(candidate)
    }

    /// Network address
    pub fn network(&self) -> Ipv4Addr {
        self.network
    }

    /// Prefix length
    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Netmask as an integer
    pub fn mask(&self) -> u32 {
        if self.prefix_len == 0 {
            0
        } else {
            u32::MAX << (32 - self.prefix_len)
        }
    }

    /// Number of addresses in the block
    pub fn size(&self) -> u64 {
        1u64 << (32 - self.prefix_len)
    }

    /// First address as an integer
    pub fn first(&self) -> u32 {
        u32::from(self.network)
    }

    /// Last address as an integer
    pub fn last(&self) -> u32 {
        self.first() | !self.mask()
    }

    /// Whether this is the default route `0.0.0.0/0`
    pub fn is_any(&self) -> bool {
        self.prefix_len == 0
    }

    /// Whether `addr` lies inside the block
    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        u32::from(addr) & self.mask() == self.first()
    }

    /// Whether `other` lies entirely inside this block
    pub fn contains_block(&self, other: &Ipv4Cidr) -> bool {
        other.prefix_len >= self.prefix_len && self.contains(other.network)
    }

    /// Whether the two blocks share at least one address
    pub fn overlaps(&self, other: &Ipv4Cidr) -> bool {
        self.first() <= other.last() && other.first() <= self.last()
    }

    /// Derive the `index`-th child block with `new_bits` more prefix bits
    ///
    /// Deterministic bit subdivision: a `/16` with `new_bits = 8` has 256
    /// `/24` children, child `i` starting at `network + i * 256`.
    pub fn subnet(&self, new_bits: u8, index: u32) -> Result<Ipv4Cidr, NetworkError> {
        let child_prefix = self.prefix_len as u16 + new_bits as u16;
        if child_prefix > 32 {
            return Err(NetworkError::PrefixOverflow {
                prefix_len: self.prefix_len,
                new_bits,
            });
        }

        let available = 1u64 << new_bits;
        if index as u64 >= available {
            return Err(NetworkError::SubnetIndexOutOfRange { index, available });
        }

        let offset = (index as u64) << (32 - child_prefix);
        let network = Ipv4Addr::from(self.first() + offset as u32);
        Ipv4Cidr::new(network, child_prefix as u8)
    }
}

impl fmt::Display for Ipv4Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix_len)
    }
}

impl FromStr for Ipv4Cidr {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr_str, prefix_str) = s
            .trim()
            .split_once('/')
            .ok_or_else(|| NetworkError::InvalidCidr(s.to_string()))?;

        let network = Ipv4Addr::from_str(addr_str)
            .map_err(|_| NetworkError::InvalidIpAddress(addr_str.to_string()))?;

        let prefix_len = prefix_str
            .parse::<u8>()
            .map_err(|_| NetworkError::InvalidCidr(s.to_string()))?;

        Self::new(network, prefix_len)
    }
}

impl TryFrom<String> for Ipv4Cidr {
    type Error = NetworkError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Ipv4Cidr> for String {
    fn from(value: Ipv4Cidr) -> Self {
        value.to_string()
    }
}

/// TCP/UDP port number (1-65535)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Port(u16);

impl Port {
    pub const SSH: Port = Port(22);
    pub const DNS: Port = Port(53);
    pub const HTTP: Port = Port(80);
    pub const NTP: Port = Port(123);
    pub const HTTPS: Port = Port(443);

    /// Create a port; zero is rejected
    pub fn new(field: &str, value: u16) -> Result<Self, ConfigError> {
        if value == 0 {
            return Err(ConfigError::InvalidPort {
                field: field.to_string(),
                value,
            });
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transport protocol of a security rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
