// Copyright (c) 2025 - Cowboy AI, Inc.
//! Error types for topology generation
//!
//! Three local, synchronous failure classes exist:
//!
//! - [`ConfigError`]: an input is malformed or out of range; rejected before
//!   any resource is derived.
//! - [`StructuralViolation`]: something tried to break a structural
//!   invariant of the generated graph (tier DAG, dependency acyclicity).
//! - [`crate::change::DestructiveChangeWarning`]: a topology-affecting
//!   parameter changed; surfaced to the operator through
//!   [`TopologyError::DestructiveChange`] unless acknowledged.
//!
//! None of these are retried. Messaging errors only occur at the hand-off edge.

use thiserror::Error;

use crate::change::DestructiveChangeWarning;

/// Invalid configuration input
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// CIDR block failed to parse or is not a network block
    #[error("Invalid CIDR block: {0}")]
    InvalidCidr(String),

    /// Parent block leaves no room for tier subnets
    #[error("Parent CIDR {cidr} is too small: prefix must be /{max_prefix} or shorter")]
    ParentTooSmall { cidr: String, max_prefix: u8 },

    /// Requested zone count outside the supported range
    #[error("Zone count {0} out of range (must be 2-6)")]
    ZoneCountOutOfRange(u8),

    /// Region offers fewer zones than the minimum topology needs
    #[error("Region {region} has only {available} availability zone(s); at least 2 are required")]
    InsufficientZones { region: String, available: usize },

    /// Region has no built-in zone list and none was supplied
    #[error("Unknown region {0}: supply available_zones explicitly")]
    UnknownRegion(String),

    /// Malformed e-mail address in a list input
    #[error("Invalid e-mail address: {0}")]
    InvalidEmail(String),

    /// Malformed ISO 3166-1 alpha-2 country code
    #[error("Invalid country code: {0}")]
    InvalidCountryCode(String),

    /// Port zero or otherwise unusable
    #[error("Invalid port for {field}: {value}")]
    InvalidPort { field: String, value: u16 },

    /// Same element appears twice in a list whose elements key resources
    #[error("Duplicate element {element} in {list}")]
    DuplicateElement { list: String, element: String },

    /// Numeric value outside its accepted range
    #[error("{field} = {value} out of range ({min}-{max})")]
    OutOfRange {
        field: String,
        value: i64,
        min: i64,
        max: i64,
    },

    /// Value present but unusable
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    /// Required value missing for an enabled feature
    #[error("Missing value: {0}")]
    MissingValue(String),

    /// Zone has no public subnet to host its NAT gateway
    #[error("No public subnet in zone {0} to host a NAT gateway")]
    MissingPublicSubnet(usize),
}

/// Attempted violation of a structural invariant
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StructuralViolation {
    /// Ingress edge not permitted by the tier table
    #[error("Ingress from {from} into {to} is not a legal tier edge")]
    IllegalIngress { from: String, to: String },

    /// Egress rule not permitted (database egress, or a node target that could not accept it)
    #[error("Egress from {from} to {to} is not permitted")]
    IllegalEgress { from: String, to: String },

    /// Rule references a node that is not part of the graph
    #[error("Security node {0} is not enabled")]
    NodeNotEnabled(String),

    /// Bastion entry CIDR would open SSH to the whole internet
    #[error("Bastion ingress CIDR {0} is unrestricted")]
    UnrestrictedBastion(String),

    /// Resource key registered twice in the dependency graph
    #[error("Duplicate resource key {0}")]
    DuplicateResource(String),

    /// Dependency refers to a resource that was never registered
    #[error("Dependency {dependent} -> {prerequisite} references an unknown resource")]
    UnknownDependency {
        dependent: String,
        prerequisite: String,
    },

    /// Dependency graph contains a cycle
    #[error("Dependency cycle among: {}", .0.join(", "))]
    DependencyCycle(Vec<String>),
}

/// Top-level error for topology generation and plan hand-off
#[derive(Debug, Error)]
pub enum TopologyError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Structural invariant violation
    #[error("Structural violation: {0}")]
    Structural(#[from] StructuralViolation),

    /// Topology-affecting change that was not acknowledged
    #[error("{} destructive change(s) require acknowledgement", .0.len())]
    DestructiveChange(Vec<DestructiveChangeWarning>),

    /// NATS connection error
    #[error("NATS connection error: {0}")]
    NatsConnection(String),

    /// NATS publish error
    #[error("NATS publish error: {0}")]
    NatsPublish(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// File system error
    #[error("I/O error: {0}")]
    Io(String),
}

/// Result type for topology operations
pub type TopologyResult<T> = Result<T, TopologyError>;

impl From<serde_json::Error> for TopologyError {
    fn from(err: serde_json::Error) -> Self {
        TopologyError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for TopologyError {
    fn from(err: std::io::Error) -> Self {
        TopologyError::Io(err.to_string())
    }
}

impl From<async_nats::Error> for TopologyError {
    fn from(err: async_nats::Error) -> Self {
        TopologyError::NatsConnection(err.to_string())
    }
}
