// Copyright (c) 2025 - Cowboy AI, Inc.
//! Security group materialization
//!
//! Every security node becomes one group; every authorized edge becomes one
//! rule per port. Rules that name another group depend on that group, since
//! the rule reads the peer group's id.

use serde::Serialize;
use std::collections::BTreeMap;

use super::graph::SecurityGraph;
use super::node::{NodeKind, Peer};
use crate::domain::{Ipv4Cidr, Port, Protocol, ResourceKey, ResourceKind};
use crate::graph::{Dependency, Materialized};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleDirection {
    Ingress,
    Egress,
}

impl RuleDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleDirection::Ingress => "ingress",
            RuleDirection::Egress => "egress",
        }
    }
}

/// Other end of a materialized rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum RulePeer {
    Group(ResourceKey),
    Cidr(Ipv4Cidr),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecurityGroup {
    pub key: ResourceKey,
    pub node: NodeKind,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecurityGroupRule {
    pub key: ResourceKey,
    pub group: ResourceKey,
    pub direction: RuleDirection,
    pub protocol: Protocol,
    pub port: Port,
    pub peer: RulePeer,
    pub description: String,
}

/// Groups and rules generated from one security graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecurityGroupSet {
    pub vpc: ResourceKey,
    pub groups: Vec<SecurityGroup>,
    pub rules: Vec<SecurityGroupRule>,
}

impl SecurityGroupSet {
    pub fn group_for(&self, node: NodeKind) -> Option<&SecurityGroup> {
        self.groups.iter().find(|g| g.node == node)
    }

    /// Rules attached to `node`'s group
    pub fn rules_of(&self, node: NodeKind) -> Vec<&SecurityGroupRule> {
        let key = node.group_key();
        self.rules.iter().filter(|r| r.group == key).collect()
    }
}

fn rule_peer(peer: &Peer) -> RulePeer {
    match peer {
        Peer::Node(node) => RulePeer::Group(node.group_key()),
        Peer::Cidr(cidr) => RulePeer::Cidr(*cidr),
    }
}

fn rule_key(node: NodeKind, direction: RuleDirection, peer: &Peer, protocol: Protocol, port: Port) -> ResourceKey {
    ResourceKey::new(
        ResourceKind::SecurityGroupRule,
        format!("{}.{}.{}.{}.{}", node, direction.as_str(), peer.label(), protocol, port),
    )
}

/// Turn every node into a group and every edge into per-port rules
///
/// Rules with the same key (a custom rule repeating a built-in one) collapse
/// into the first.
pub fn materialize_groups(graph: &SecurityGraph, name_prefix: &str) -> SecurityGroupSet {
    let groups = graph
        .nodes()
        .map(|node| SecurityGroup {
            key: node.kind.group_key(),
            node: node.kind,
            name: format!("{}-{}", name_prefix, node.kind.as_str().replace('_', "-")),
            description: format!("{} security group", node.kind),
        })
        .collect();

    let mut rules: BTreeMap<ResourceKey, SecurityGroupRule> = BTreeMap::new();
    for edge in graph.ingress_edges() {
        for port in edge.ports() {
            let key = rule_key(edge.to(), RuleDirection::Ingress, edge.from(), edge.protocol(), *port);
            rules.entry(key.clone()).or_insert_with(|| SecurityGroupRule {
                key,
                group: edge.to().group_key(),
                direction: RuleDirection::Ingress,
                protocol: edge.protocol(),
                port: *port,
                peer: rule_peer(edge.from()),
                description: edge.description().to_string(),
            });
        }
    }
    for rule in graph.egress_rules() {
        for port in rule.ports() {
            let key = rule_key(rule.from(), RuleDirection::Egress, rule.to(), rule.protocol(), *port);
            rules.entry(key.clone()).or_insert_with(|| SecurityGroupRule {
                key,
                group: rule.from().group_key(),
                direction: RuleDirection::Egress,
                protocol: rule.protocol(),
                port: *port,
                peer: rule_peer(rule.to()),
                description: rule.description().to_string(),
            });
        }
    }

    SecurityGroupSet {
        vpc: ResourceKey::singleton(ResourceKind::Vpc),
        groups,
        rules: rules.into_values().collect(),
    }
}

impl Materialized for SecurityGroupSet {
    fn resources(&self) -> Vec<(ResourceKey, ResourceKind)> {
        self.groups
            .iter()
            .map(|g| (g.key.clone(), ResourceKind::SecurityGroup))
            .chain(self.rules.iter().map(|r| (r.key.clone(), ResourceKind::SecurityGroupRule)))
            .collect()
    }

    fn dependencies(&self) -> Vec<Dependency> {
        let mut deps: Vec<Dependency> = self
            .groups
            .iter()
            .map(|g| Dependency::reference(&g.key, &self.vpc))
            .collect();
        for rule in &self.rules {
            deps.push(Dependency::reference(&rule.key, &rule.group));
            if let RulePeer::Group(peer) = &rule.peer {
                if peer != &rule.group {
                    deps.push(Dependency::reference(&rule.key, peer));
                }
            }
        }
        deps
    }
}
