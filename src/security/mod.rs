// Copyright (c) 2025 - Cowboy AI, Inc.
//! Security Graph
//!
//! Security nodes, the tier legality table that governs every edge between
//! them, and their materialization into security groups and rules.
//!
//! # Invariants
//!
//! 1. Every edge into `Database` originates from the `Application` or
//!    `Bastion` node, never from a CIDR.
//! 2. Every edge into `Application` originates from `Alb` or `Bastion`.
//! 3. `Alb` is the only node accepting `0.0.0.0/0`.
//! 4. `Database` has no egress.
//!
//! These hold by construction: [`AuthorizedEdge`] can only be created
//! through the legality table.

pub mod edge;
pub mod edge_filter;
pub mod graph;
pub mod groups;
pub mod node;

pub use edge::{AuthorizedEdge, EgressRule};
pub use edge_filter::{build_edge_filters, EdgeFilterSettings, EdgeFilters};
pub use graph::{build_graph, BastionSettings, CustomIngressRule, SecurityGraph, SecurityGraphSettings, SecurityNode};
pub use groups::{materialize_groups, RuleDirection, RulePeer, SecurityGroup, SecurityGroupRule, SecurityGroupSet};
pub use node::{authorizes_egress, authorizes_ingress, NodeKind, Peer};
