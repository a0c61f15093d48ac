// Copyright (c) 2025 - Cowboy AI, Inc.
//! Network topology generation for the Composable Information Machine
//!
//! Turns one declarative configuration into a complete three-tier plan:
//! subnets across availability zones, NAT and routing, a security group
//! graph with enforced tier legality, an edge filter, a PostgreSQL data
//! tier and a monitoring overlay, together with the dependency order in
//! which an external reconciliation engine must apply them.
//!
//! ```rust
//! use cim_network_topology::{generate, TopologyConfig};
//!
//! let config = TopologyConfig::default().validate()?;
//! let plan = generate(&config)?;
//! assert_eq!(plan.layout.subnets.len(), 6);
//! # Ok::<(), cim_network_topology::TopologyError>(())
//! ```

pub mod cardinality;
pub mod change;
pub mod config;
pub mod cost;
pub mod database;
pub mod domain;
pub mod errors;
pub mod graph;
pub mod monitoring;
pub mod nats;
pub mod outputs;
pub mod plan;
pub mod routing;
pub mod security;
pub mod sink;
pub mod subjects;
pub mod topology;

// Re-export commonly used types
pub use change::{assess_change, ChangeAssessment, DestructiveChangeWarning};
pub use config::{Environment, TopologyConfig, ValidatedConfig};
pub use errors::{ConfigError, StructuralViolation, TopologyError, TopologyResult};
pub use graph::{Dependency, DependencyGraph, Materialized};
pub use nats::{NatsConfig, NatsPlanSink};
pub use plan::{generate, generate_update, InfrastructurePlan, PlanUpdate};
pub use sink::{FileSink, PlanEnvelope, PlanSink};
pub use topology::{RedundancyMode, Tier};
