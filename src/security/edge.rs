// Copyright (c) 2025 - Cowboy AI, Inc.
//! Authorized security edges
//!
//! [`AuthorizedEdge`] and [`EgressRule`] have private fields and no
//! `Deserialize` implementation: the only way to obtain one is through
//! [`AuthorizedEdge::authorize`] / [`EgressRule::authorize`], which consult the
//! legality table. Holding a value is proof that the edge is legal.

use serde::Serialize;
use std::collections::BTreeSet;

use super::node::{authorizes_egress, authorizes_ingress, NodeKind, Peer};
use crate::domain::{Port, Protocol};
use crate::errors::StructuralViolation;

/// Ingress edge that passed the tier legality check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorizedEdge {
    from: Peer,
    to: NodeKind,
    ports: BTreeSet<Port>,
    protocol: Protocol,
    description: String,
}

impl AuthorizedEdge {
    /// Authorize `from → to` on the given ports
    ///
    /// # Errors
    /// - `UnrestrictedBastion` when the bastion would accept `0.0.0.0/0`
    /// - `IllegalIngress` when the tier table does not permit the edge
    pub fn authorize(
        from: Peer,
        to: NodeKind,
        ports: impl IntoIterator<Item = Port>,
        protocol: Protocol,
        description: impl Into<String>,
    ) -> Result<Self, StructuralViolation> {
        if to == NodeKind::Bastion && from == Peer::INTERNET {
            return Err(StructuralViolation::UnrestrictedBastion(from.to_string()));
        }
        if !authorizes_ingress(&from, to) {
            return Err(StructuralViolation::IllegalIngress {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        Ok(Self {
            from,
            to,
            ports: ports.into_iter().collect(),
            protocol,
            description: description.into(),
        })
    }

    pub fn from(&self) -> &Peer {
        &self.from
    }

    pub fn to(&self) -> NodeKind {
        self.to
    }

    pub fn ports(&self) -> &BTreeSet<Port> {
        &self.ports
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

/// Egress rule that passed the legality check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EgressRule {
    from: NodeKind,
    to: Peer,
    ports: BTreeSet<Port>,
    protocol: Protocol,
    description: String,
}

impl EgressRule {
    /// # Errors
    /// - `IllegalEgress` for any egress from the database or endpoint nodes,
    ///   and for node targets the ingress table would refuse
    pub fn authorize(
        from: NodeKind,
        to: Peer,
        ports: impl IntoIterator<Item = Port>,
        protocol: Protocol,
        description: impl Into<String>,
    ) -> Result<Self, StructuralViolation> {
        if !authorizes_egress(from, &to) {
            return Err(StructuralViolation::IllegalEgress {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        Ok(Self {
            from,
            to,
            ports: ports.into_iter().collect(),
            protocol,
            description: description.into(),
        })
    }

    pub fn from(&self) -> NodeKind {
        self.from
    }

    pub fn to(&self) -> &Peer {
        &self.to
    }

    pub fn ports(&self) -> &BTreeSet<Port> {
        &self.ports
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internet_into_database_is_unrepresentable() {
        let result = AuthorizedEdge::authorize(
            Peer::INTERNET,
            NodeKind::Database,
            [Port::new("db", 5432).unwrap()],
            Protocol::Tcp,
            "nope",
        );
        assert_eq!(
            result,
            Err(StructuralViolation::IllegalIngress {
                from: "0.0.0.0/0".to_string(),
                to: "database".to_string(),
            })
        );
    }

    #[test]
    fn test_unrestricted_bastion() {
        let result = AuthorizedEdge::authorize(Peer::INTERNET, NodeKind::Bastion, [Port::SSH], Protocol::Tcp, "ssh");
        assert!(matches!(result, Err(StructuralViolation::UnrestrictedBastion(_))));
    }

    #[test]
    fn test_alb_edge_collects_ports() {
        let edge = AuthorizedEdge::authorize(
            Peer::INTERNET,
            NodeKind::Alb,
            [Port::HTTPS, Port::HTTP, Port::HTTPS],
            Protocol::Tcp,
            "web",
        )
        .unwrap();
        assert_eq!(edge.ports().iter().map(Port::value).collect::<Vec<_>>(), vec![80, 443]);
        assert_eq!(edge.to(), NodeKind::Alb);
    }

    #[test]
    fn test_database_egress_rejected() {
        let result = EgressRule::authorize(NodeKind::Database, Peer::INTERNET, [Port::HTTPS], Protocol::Tcp, "out");
        assert!(matches!(result, Err(StructuralViolation::IllegalEgress { .. })));
    }
}
