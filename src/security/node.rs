// Copyright (c) 2025 - Cowboy AI, Inc.
//! Security nodes and the static tier legality table

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::{Ipv4Cidr, ResourceKey, ResourceKind};
use crate::topology::Tier;

/// Role that owns one security group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Load balancer, the only internet-facing node
    Alb,
    /// Application instances
    Application,
    /// Managed database
    Database,
    /// SSH jump host
    Bastion,
    /// Private service endpoints
    VpcEndpoints,
}

impl NodeKind {
    pub const ALL: [NodeKind; 5] = [
        NodeKind::Alb,
        NodeKind::Application,
        NodeKind::Database,
        NodeKind::Bastion,
        NodeKind::VpcEndpoints,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Alb => "alb",
            NodeKind::Application => "application",
            NodeKind::Database => "database",
            NodeKind::Bastion => "bastion",
            NodeKind::VpcEndpoints => "vpc_endpoints",
        }
    }

    /// Tier whose subnets this node is placed in
    pub fn tier(&self) -> Tier {
        match self {
            NodeKind::Alb | NodeKind::Bastion => Tier::Public,
            NodeKind::Application | NodeKind::VpcEndpoints => Tier::Private,
            NodeKind::Database => Tier::Database,
        }
    }

    /// Key of the security group materialized for this node
    pub fn group_key(&self) -> ResourceKey {
        ResourceKey::new(ResourceKind::SecurityGroup, self.as_str())
    }

    /// Nodes allowed to open connections into this node
    pub fn legal_sources(&self) -> &'static [NodeKind] {
        LEGAL_SOURCES
            .iter()
            .find(|(target, _)| target == self)
            .map(|(_, sources)| *sources)
            .unwrap_or(&[])
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tier DAG: `Internet → Alb → Application → Database`, plus the bastion
/// side-channel and the endpoint node reachable from the application only.
const LEGAL_SOURCES: &[(NodeKind, &[NodeKind])] = &[
    (NodeKind::Alb, &[]),
    (NodeKind::Application, &[NodeKind::Alb, NodeKind::Bastion]),
    (NodeKind::Database, &[NodeKind::Application, NodeKind::Bastion]),
    (NodeKind::Bastion, &[]),
    (NodeKind::VpcEndpoints, &[NodeKind::Application]),
];

/// Other end of a security rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Peer {
    /// Another security node, referenced by its group
    Node(NodeKind),
    /// Raw address block
    Cidr(Ipv4Cidr),
}

impl Peer {
    pub const INTERNET: Peer = Peer::Cidr(Ipv4Cidr::ANY);

    /// Short form used inside rule keys
    pub fn label(&self) -> String {
        match self {
            Peer::Node(node) => node.as_str().to_string(),
            Peer::Cidr(cidr) => cidr.to_string(),
        }
    }
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Peer::Node(node) => write!(f, "{}", node),
            Peer::Cidr(cidr) => write!(f, "{}", cidr),
        }
    }
}

/// Whether `from` may open connections into `to`
///
/// Database accepts node references only, never a CIDR. Alb is the only
/// node that accepts the internet; Bastion accepts a restricted CIDR.
pub fn authorizes_ingress(from: &Peer, to: NodeKind) -> bool {
    match from {
        Peer::Node(source) => to.legal_sources().contains(source),
        Peer::Cidr(cidr) => match to {
            NodeKind::Alb => true,
            NodeKind::Bastion => !cidr.is_any(),
            NodeKind::Application | NodeKind::Database | NodeKind::VpcEndpoints => false,
        },
    }
}

/// Whether `from` may send traffic to `to`
///
/// Node targets mirror the ingress table. Database and endpoint nodes never
/// originate traffic; the bastion only reaches the nodes it administers.
pub fn authorizes_egress(from: NodeKind, to: &Peer) -> bool {
    match from {
        NodeKind::Database | NodeKind::VpcEndpoints => false,
        NodeKind::Bastion => match to {
            Peer::Node(target) => authorizes_ingress(&Peer::Node(from), *target),
            Peer::Cidr(_) => false,
        },
        NodeKind::Alb | NodeKind::Application => match to {
            Peer::Node(target) => authorizes_ingress(&Peer::Node(from), *target),
            Peer::Cidr(_) => true,
        },
    }
}
