// Copyright (c) 2025 - Cowboy AI, Inc.
//! Pure Validation Functions - Configuration Invariants
//!
//! Every configuration value passes through one of these functions before any
//! resource is derived. All functions are pure (no side effects) and return a
//! [`ConfigError`] naming the offending field.
//!
//! # Invariant Categories
//!
//! 1. **Topology**: zone count, parent block size
//! 2. **Naming**: project and database identifiers
//! 3. **Sizing**: storage, retention, alarm periods
//! 4. **Lists**: element identity must be unique

use std::collections::BTreeSet;

use crate::domain::Ipv4Cidr;
use crate::errors::ConfigError;

/// Validation result
pub type ValidationResult = Result<(), ConfigError>;

/// Fewest availability zones a topology may span
pub const MIN_ZONES: u8 = 2;

/// Most availability zones a topology may span
pub const MAX_ZONES: u8 = 6;

/// Longest parent prefix that still yields `/28` tier subnets
pub const MAX_PARENT_PREFIX: u8 = 20;

/// Validate requested zone count
///
/// # Rules
/// - 2 ≤ zone_count ≤ 6
pub fn validate_zone_count(zone_count: u8) -> ValidationResult {
    if !(MIN_ZONES..=MAX_ZONES).contains(&zone_count) {
        return Err(ConfigError::ZoneCountOutOfRange(zone_count));
    }
    Ok(())
}

/// Validate the parent block can be subdivided into tier subnets
///
/// # Rules
/// - Children are parent prefix + 8 and must be at least `/28`
pub fn validate_parent_block(parent: &Ipv4Cidr) -> ValidationResult {
    if parent.prefix_len() > MAX_PARENT_PREFIX {
        return Err(ConfigError::ParentTooSmall {
            cidr: parent.to_string(),
            max_prefix: MAX_PARENT_PREFIX,
        });
    }
    Ok(())
}

/// Validate a name used as a resource-name prefix
///
/// # Rules
/// - 1-32 characters
/// - Lowercase ASCII letters, digits and hyphens
/// - Starts with a letter, does not end with a hyphen
pub fn validate_name_component(field: &str, value: &str) -> ValidationResult {
    let invalid = |reason: &str| ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    };

    if value.is_empty() || value.len() > 32 {
        return Err(invalid("must be 1-32 characters"));
    }
    if !value.starts_with(|c: char| c.is_ascii_lowercase()) {
        return Err(invalid("must start with a lowercase letter"));
    }
    if value.ends_with('-') {
        return Err(invalid("must not end with a hyphen"));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(invalid("only lowercase letters, digits and hyphens are allowed"));
    }
    Ok(())
}

/// Validate a database identifier (database name or master username)
///
/// # Rules
/// - 1-63 characters
/// - Letters, digits and underscores, starting with a letter
pub fn validate_db_identifier(field: &str, value: &str) -> ValidationResult {
    let valid = !value.is_empty()
        && value.len() <= 63
        && value.starts_with(|c: char| c.is_ascii_alphabetic())
        && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

    if !valid {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: "must be 1-63 letters, digits or underscores, starting with a letter"
                .to_string(),
        });
    }
    Ok(())
}

/// Validate a managed-database instance class
///
/// # Rules
/// - Of the form `db.<family>.<size>`
pub fn validate_instance_class(instance_class: &str) -> ValidationResult {
    let parts: Vec<&str> = instance_class.split('.').collect();
    if parts.len() != 3 || parts[0] != "db" || parts[1].is_empty() || parts[2].is_empty() {
        return Err(ConfigError::InvalidValue {
            field: "instance_class".to_string(),
            reason: format!("{} is not of the form db.<family>.<size>", instance_class),
        });
    }
    Ok(())
}

/// Validate an inclusive numeric range
pub fn validate_range(field: &str, value: i64, min: i64, max: i64) -> ValidationResult {
    if value < min || value > max {
        return Err(ConfigError::OutOfRange {
            field: field.to_string(),
            value,
            min,
            max,
        });
    }
    Ok(())
}

/// Validate every element identity of a list input is unique
///
/// List inputs key their materialized resources by element identity, so a
/// duplicate would silently collapse two resources into one.
pub fn validate_distinct<'a>(
    list: &str,
    identities: impl IntoIterator<Item = &'a str>,
) -> ValidationResult {
    let mut seen = BTreeSet::new();
    for identity in identities {
        if !seen.insert(identity) {
            return Err(ConfigError::DuplicateElement {
                list: list.to_string(),
                element: identity.to_string(),
            });
        }
    }
    Ok(())
}
