// Copyright (c) 2025 - Cowboy AI, Inc.
//! Alert Recipient and Geo Value Objects

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::ConfigError;

/// E-mail address of an alert recipient
///
/// Deliberately shallow validation: exactly one `@`, a non-empty local part,
/// a dotted domain, no whitespace. Delivery is confirmed by the notification
/// backend, not here.
///
/// # Examples
///
/// ```rust
/// use cim_network_topology::domain::EmailAddress;
///
/// let ops = EmailAddress::new("Ops@Example.com").unwrap();
/// assert_eq!(ops.as_str(), "ops@example.com");
/// assert!(EmailAddress::new("not-an-address").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Maximum address length (RFC 5321 path limit)
    pub const MAX_LENGTH: usize = 254;

    /// Create a validated, lowercased address
    pub fn new(address: impl AsRef<str>) -> Result<Self, ConfigError> {
        let raw = address.as_ref().trim();
        let invalid = || ConfigError::InvalidEmail(raw.to_string());

        if raw.is_empty() || raw.len() > Self::MAX_LENGTH {
            return Err(invalid());
        }
        if raw.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(invalid());
        }

        let (local, domain) = raw.split_once('@').ok_or_else(invalid)?;
        if local.is_empty() || domain.contains('@') {
            return Err(invalid());
        }

        let labels: Vec<&str> = domain.split('.').collect();
        if labels.len() < 2 || labels.iter().any(|label| label.is_empty()) {
            return Err(invalid());
        }

        Ok(Self(raw.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for EmailAddress {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// ISO 3166-1 alpha-2 country code, stored uppercase
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CountryCode(String);

impl CountryCode {
    pub fn new(code: impl AsRef<str>) -> Result<Self, ConfigError> {
        let raw = code.as_ref().trim();
        if raw.len() != 2 || !raw.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ConfigError::InvalidCountryCode(raw.to_string()));
        }
        Ok(Self(raw.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CountryCode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
