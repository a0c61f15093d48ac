// Copyright (c) 2025 - Cowboy AI, Inc.
//! Security Graph Builder
//!
//! Builds the directed graph of permitted traffic between security nodes.
//!
//! # Base Graph
//!
//! ```text
//! Internet ──80,443──▶ Alb ──app_port──▶ Application ──db_port──▶ Database
//!                                           │
//!                                           └──443──▶ VpcEndpoints (optional)
//!
//! office CIDR ──22──▶ Bastion ──22──▶ Application
//!                        └──db_port──▶ Database (bastion_database_access)
//! ```
//!
//! Optional nodes only add edges; enabling or disabling one never alters the
//! edges between the base nodes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

use super::edge::{AuthorizedEdge, EgressRule};
use super::node::{NodeKind, Peer};
use crate::cardinality::{materialize_list, Identity};
use crate::domain::{Ipv4Cidr, Port, Protocol, ResourceKey};
use crate::errors::{StructuralViolation, TopologyResult};
use crate::topology::{subnets_of_tier, Subnet};

/// Extra ingress edge supplied through configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomIngressRule {
    pub target: NodeKind,
    pub source: Peer,
    pub port: Port,
    #[serde(default = "default_protocol")]
    pub protocol: Protocol,
    #[serde(default)]
    pub description: String,
}

fn default_protocol() -> Protocol {
    Protocol::Tcp
}

impl Identity for CustomIngressRule {
    fn identity(&self) -> String {
        format!("{}.{}.{}.{}", self.target, self.source.label(), self.protocol, self.port)
    }
}

/// Bastion side-channel parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BastionSettings {
    /// Only block allowed to reach the bastion on SSH
    pub allowed_cidr: Ipv4Cidr,
    /// Also open the database port from the bastion
    pub database_access: bool,
}

/// Inputs of [`build_graph`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecurityGraphSettings {
    pub application_port: Port,
    pub database_port: Port,
    /// `Some` enables the bastion node
    pub bastion: Option<BastionSettings>,
    pub enable_vpc_endpoints: bool,
    pub custom_ingress_rules: Vec<CustomIngressRule>,
}

/// One node of the security graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecurityNode {
    pub kind: NodeKind,
    /// Subnets the node's members are placed in
    pub subnets: Vec<ResourceKey>,
    pub ingress: Vec<AuthorizedEdge>,
    pub egress: Vec<EgressRule>,
}

impl SecurityNode {
    fn new(kind: NodeKind, subnets: &[Subnet]) -> Self {
        Self {
            kind,
            subnets: subnets_of_tier(subnets, kind.tier())
                .into_iter()
                .map(|s| s.key.clone())
                .collect(),
            ingress: Vec::new(),
            egress: Vec::new(),
        }
    }
}

/// Security nodes with their authorized edges
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SecurityGraph {
    nodes: BTreeMap<NodeKind, SecurityNode>,
}

impl SecurityGraph {
    pub fn node(&self, kind: NodeKind) -> Option<&SecurityNode> {
        self.nodes.get(&kind)
    }

    pub fn contains(&self, kind: NodeKind) -> bool {
        self.nodes.contains_key(&kind)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &SecurityNode> {
        self.nodes.values()
    }

    pub fn node_kinds(&self) -> Vec<NodeKind> {
        self.nodes.keys().copied().collect()
    }

    /// Every ingress edge in the graph
    pub fn ingress_edges(&self) -> impl Iterator<Item = &AuthorizedEdge> {
        self.nodes.values().flat_map(|n| n.ingress.iter())
    }

    /// Every egress rule in the graph
    pub fn egress_rules(&self) -> impl Iterator<Item = &EgressRule> {
        self.nodes.values().flat_map(|n| n.egress.iter())
    }

    /// Ingress edges into `kind`
    pub fn edges_into(&self, kind: NodeKind) -> Vec<&AuthorizedEdge> {
        self.node(kind).map(|n| n.ingress.iter().collect()).unwrap_or_default()
    }

    fn add_node(&mut self, kind: NodeKind, subnets: &[Subnet]) {
        self.nodes.insert(kind, SecurityNode::new(kind, subnets));
    }

    /// Attach an ingress edge; both ends must be enabled nodes
    pub fn add_ingress(&mut self, edge: AuthorizedEdge) -> Result<(), StructuralViolation> {
        if let Peer::Node(source) = edge.from() {
            self.require(*source)?;
        }
        let target = self.node_mut(edge.to())?;
        if !target.ingress.contains(&edge) {
            target.ingress.push(edge);
        }
        Ok(())
    }

    /// Attach an egress rule; both ends must be enabled nodes
    pub fn add_egress(&mut self, rule: EgressRule) -> Result<(), StructuralViolation> {
        if let Peer::Node(target) = rule.to() {
            self.require(*target)?;
        }
        let source = self.node_mut(rule.from())?;
        if !source.egress.contains(&rule) {
            source.egress.push(rule);
        }
        Ok(())
    }

    /// Authorize and attach an ingress edge together with the matching egress
    /// on the source node
    fn connect(
        &mut self,
        from: NodeKind,
        to: NodeKind,
        ports: &[Port],
        protocol: Protocol,
        description: &str,
    ) -> Result<(), StructuralViolation> {
        self.add_ingress(AuthorizedEdge::authorize(
            Peer::Node(from),
            to,
            ports.iter().copied(),
            protocol,
            description,
        )?)?;
        self.add_egress(EgressRule::authorize(
            from,
            Peer::Node(to),
            ports.iter().copied(),
            protocol,
            description,
        )?)
    }

    fn require(&self, kind: NodeKind) -> Result<(), StructuralViolation> {
        if self.contains(kind) {
            Ok(())
        } else {
            Err(StructuralViolation::NodeNotEnabled(kind.to_string()))
        }
    }

    fn node_mut(&mut self, kind: NodeKind) -> Result<&mut SecurityNode, StructuralViolation> {
        self.nodes
            .get_mut(&kind)
            .ok_or_else(|| StructuralViolation::NodeNotEnabled(kind.to_string()))
    }
}

/// Build the security graph for the given subnets
///
/// # Errors
/// - `StructuralViolation` when a custom rule or the bastion entry breaks the tier DAG
/// - `ConfigError::DuplicateElement` for repeated custom rules
pub fn build_graph(subnets: &[Subnet], settings: &SecurityGraphSettings) -> TopologyResult<SecurityGraph> {
    let mut graph = SecurityGraph::default();
    let app_port = settings.application_port;
    let db_port = settings.database_port;

    for kind in [NodeKind::Alb, NodeKind::Application, NodeKind::Database] {
        graph.add_node(kind, subnets);
    }

    graph.add_ingress(AuthorizedEdge::authorize(
        Peer::INTERNET,
        NodeKind::Alb,
        [Port::HTTP, Port::HTTPS],
        Protocol::Tcp,
        "HTTP/HTTPS from the internet",
    )?)?;
    graph.connect(
        NodeKind::Alb,
        NodeKind::Application,
        &[app_port],
        Protocol::Tcp,
        "Load balancer to application",
    )?;
    graph.connect(
        NodeKind::Application,
        NodeKind::Database,
        &[db_port],
        Protocol::Tcp,
        "Application to database",
    )?;

    // Outbound internet access
    graph.add_egress(EgressRule::authorize(
        NodeKind::Alb,
        Peer::INTERNET,
        [Port::HTTPS],
        Protocol::Tcp,
        "Load balancer health checks and redirects",
    )?)?;
    graph.add_egress(EgressRule::authorize(
        NodeKind::Application,
        Peer::INTERNET,
        [Port::HTTP, Port::HTTPS],
        Protocol::Tcp,
        "Package and API access through NAT",
    )?)?;
    for protocol in [Protocol::Udp, Protocol::Tcp] {
        graph.add_egress(EgressRule::authorize(
            NodeKind::Application,
            Peer::INTERNET,
            [Port::DNS],
            protocol,
            "DNS",
        )?)?;
    }
    graph.add_egress(EgressRule::authorize(
        NodeKind::Application,
        Peer::INTERNET,
        [Port::NTP],
        Protocol::Udp,
        "NTP",
    )?)?;

    if let Some(bastion) = &settings.bastion {
        graph.add_node(NodeKind::Bastion, subnets);
        graph.add_ingress(AuthorizedEdge::authorize(
            Peer::Cidr(bastion.allowed_cidr),
            NodeKind::Bastion,
            [Port::SSH],
            Protocol::Tcp,
            "SSH from the administration network",
        )?)?;
        graph.connect(
            NodeKind::Bastion,
            NodeKind::Application,
            &[Port::SSH],
            Protocol::Tcp,
            "SSH from bastion",
        )?;
        if bastion.database_access {
            graph.connect(
                NodeKind::Bastion,
                NodeKind::Database,
                &[db_port],
                Protocol::Tcp,
                "Database access from bastion",
            )?;
        }
    }

    if settings.enable_vpc_endpoints {
        graph.add_node(NodeKind::VpcEndpoints, subnets);
        graph.connect(
            NodeKind::Application,
            NodeKind::VpcEndpoints,
            &[Port::HTTPS],
            Protocol::Tcp,
            "Application to private service endpoints",
        )?;
    }

    let custom = materialize_list("custom_ingress_rules", &settings.custom_ingress_rules, |rule| {
        let edge = AuthorizedEdge::authorize(
            rule.source,
            rule.target,
            [rule.port],
            rule.protocol,
            rule.description.clone(),
        )?;
        // Node sources also need the matching egress on their own group
        let egress = match rule.source {
            Peer::Node(source) => Some(EgressRule::authorize(
                source,
                Peer::Node(rule.target),
                [rule.port],
                rule.protocol,
                rule.description.clone(),
            )?),
            Peer::Cidr(_) => None,
        };
        Ok::<_, StructuralViolation>((edge, egress))
    })?;
    for authorized in custom {
        let (edge, egress) = authorized?;
        graph.add_ingress(edge)?;
        if let Some(egress) = egress {
            graph.add_egress(egress)?;
        }
    }

    debug!(
        nodes = ?graph.node_kinds(),
        custom_rules = settings.custom_ingress_rules.len(),
        "Security graph nodes"
    );
    info!(
        ingress_edges = graph.ingress_edges().count(),
        egress_rules = graph.egress_rules().count(),
        "Built security graph"
    );

    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{plan, Tier};

    fn subnets() -> Vec<Subnet> {
        plan(&"10.0.0.0/16".parse().unwrap(), 2, &Tier::ALL).unwrap()
    }

    fn settings() -> SecurityGraphSettings {
        SecurityGraphSettings {
            application_port: Port::new("application_port", 8080).unwrap(),
            database_port: Port::new("database_port", 5432).unwrap(),
            bastion: None,
            enable_vpc_endpoints: false,
            custom_ingress_rules: Vec::new(),
        }
    }

    #[test]
    fn test_base_graph() {
        let graph = build_graph(&subnets(), &settings()).unwrap();
        assert_eq!(
            graph.node_kinds(),
            vec![NodeKind::Alb, NodeKind::Application, NodeKind::Database]
        );
        let into_db = graph.edges_into(NodeKind::Database);
        assert_eq!(into_db.len(), 1);
        assert_eq!(into_db[0].from(), &Peer::Node(NodeKind::Application));
        assert!(graph.node(NodeKind::Database).unwrap().egress.is_empty());
        assert_eq!(
            graph.node(NodeKind::Application).unwrap().subnets[1].as_str(),
            "subnet.private.1"
        );
    }

    #[test]
    fn test_bastion_adds_two_tier_edges() {
        let base = build_graph(&subnets(), &settings()).unwrap();
        let mut with_bastion = settings();
        with_bastion.bastion = Some(BastionSettings {
            allowed_cidr: "198.51.100.0/24".parse().unwrap(),
            database_access: false,
        });
        let graph = build_graph(&subnets(), &with_bastion).unwrap();

        assert_eq!(graph.edges_into(NodeKind::Application).len(), 2);
        assert_eq!(graph.edges_into(NodeKind::Database), base.edges_into(NodeKind::Database));
        assert_eq!(graph.node(NodeKind::Bastion).unwrap().egress.len(), 1);
    }

    #[test]
    fn test_bastion_database_access() {
        let mut s = settings();
        s.bastion = Some(BastionSettings {
            allowed_cidr: "198.51.100.0/24".parse().unwrap(),
            database_access: true,
        });
        let graph = build_graph(&subnets(), &s).unwrap();
        let sources: Vec<Peer> = graph
            .edges_into(NodeKind::Database)
            .iter()
            .map(|e| *e.from())
            .collect();
        assert_eq!(
            sources,
            vec![Peer::Node(NodeKind::Application), Peer::Node(NodeKind::Bastion)]
        );
    }

    #[test]
    fn test_unrestricted_bastion_rejected() {
        let mut s = settings();
        s.bastion = Some(BastionSettings {
            allowed_cidr: Ipv4Cidr::ANY,
            database_access: false,
        });
        assert!(matches!(
            build_graph(&subnets(), &s),
            Err(crate::errors::TopologyError::Structural(
                StructuralViolation::UnrestrictedBastion(_)
            ))
        ));
    }

    #[test]
    fn test_custom_rule_through_gate() {
        let mut s = settings();
        s.custom_ingress_rules.push(CustomIngressRule {
            target: NodeKind::Database,
            source: Peer::Cidr("10.0.0.0/8".parse().unwrap()),
            port: Port::new("port", 5432).unwrap(),
            protocol: Protocol::Tcp,
            description: "reporting".to_string(),
        });
        assert!(matches!(
            build_graph(&subnets(), &s),
            Err(crate::errors::TopologyError::Structural(
                StructuralViolation::IllegalIngress { .. }
            ))
        ));
    }

    #[test]
    fn test_custom_rule_needs_enabled_source() {
        let mut s = settings();
        s.custom_ingress_rules.push(CustomIngressRule {
            target: NodeKind::Application,
            source: Peer::Node(NodeKind::Bastion),
            port: Port::new("port", 9000).unwrap(),
            protocol: Protocol::Tcp,
            description: String::new(),
        });
        assert!(matches!(
            build_graph(&subnets(), &s),
            Err(crate::errors::TopologyError::Structural(
                StructuralViolation::NodeNotEnabled(_)
            ))
        ));
    }

    #[test]
    fn test_vpc_endpoints_accept_application_only() {
        let mut s = settings();
        s.enable_vpc_endpoints = true;
        let graph = build_graph(&subnets(), &s).unwrap();
        let into = graph.edges_into(NodeKind::VpcEndpoints);
        assert_eq!(into.len(), 1);
        assert_eq!(into[0].from(), &Peer::Node(NodeKind::Application));
        assert!(graph.node(NodeKind::VpcEndpoints).unwrap().egress.is_empty());
    }
}
