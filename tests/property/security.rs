// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for security graph legality
//!
//! Whatever optional nodes and custom rules are requested, a generated graph
//! only ever contains edges the tier table authorizes. Requests that would
//! break it fail with a structural violation instead.

use proptest::prelude::*;
use std::net::Ipv4Addr;

use cim_network_topology::domain::{Ipv4Cidr, Port, Protocol};
use cim_network_topology::security::{authorizes_egress, authorizes_ingress, CustomIngressRule, NodeKind, Peer, RulePeer};
use cim_network_topology::{generate, InfrastructurePlan, TopologyConfig, TopologyError};

use crate::fixtures::{base_config, validated, OFFICE_CIDR};

fn node_kind() -> impl Strategy<Value = NodeKind> {
    proptest::sample::select(NodeKind::ALL.to_vec())
}

fn peer() -> impl Strategy<Value = Peer> {
    prop_oneof![
        node_kind().prop_map(Peer::Node),
        Just(Peer::INTERNET),
        (any::<[u8; 3]>()).prop_map(|[a, b, c]| {
            Peer::Cidr(Ipv4Cidr::new(Ipv4Addr::new(a, b, c, 0), 24).unwrap())
        }),
    ]
}

fn custom_rule() -> impl Strategy<Value = CustomIngressRule> {
    (node_kind(), peer(), 1u16..=65535).prop_map(|(target, source, port)| CustomIngressRule {
        target,
        source,
        port: Port::new("port", port).unwrap(),
        protocol: Protocol::Tcp,
        description: String::new(),
    })
}

fn config(bastion: bool, database_access: bool, endpoints: bool, rules: Vec<CustomIngressRule>) -> TopologyConfig {
    TopologyConfig {
        enable_bastion: bastion,
        bastion_allowed_cidr: bastion.then(|| OFFICE_CIDR.to_string()),
        bastion_database_access: database_access,
        enable_vpc_endpoints: endpoints,
        custom_ingress_rules: rules,
        ..base_config()
    }
}

fn assert_legal(plan: &InfrastructurePlan) -> Result<(), TestCaseError> {
    let graph = &plan.security_graph;
    for edge in graph.ingress_edges() {
        prop_assert!(graph.contains(edge.to()));
        prop_assert!(authorizes_ingress(edge.from(), edge.to()), "{} -> {}", edge.from(), edge.to());
        if let Peer::Node(source) = edge.from() {
            prop_assert!(graph.contains(*source));
        }
    }
    for rule in graph.egress_rules() {
        prop_assert!(authorizes_egress(rule.from(), rule.to()));
        prop_assert!(rule.from() != NodeKind::Database);
    }

    // Nothing reaches the database except application and bastion groups
    for rule in plan.security_groups.rules_of(NodeKind::Database) {
        if let RulePeer::Cidr(cidr) = &rule.peer {
            prop_assert!(false, "database rule opened to {}", cidr);
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Every combination of optional nodes yields a legal graph
    #[test]
    fn prop_optional_nodes_stay_legal(bastion in any::<bool>(), database_access in any::<bool>(), endpoints in any::<bool>()) {
        let plan = generate(&validated(config(bastion, database_access, endpoints, Vec::new()))).unwrap();
        assert_legal(&plan)?;
        prop_assert_eq!(plan.security_graph.contains(NodeKind::Bastion), bastion);
        prop_assert_eq!(plan.security_graph.contains(NodeKind::VpcEndpoints), endpoints);
    }

    /// Custom rules are either accepted as legal edges or refused structurally
    #[test]
    fn prop_custom_rules_never_break_the_dag(
        bastion in any::<bool>(),
        endpoints in any::<bool>(),
        rules in prop::collection::vec(custom_rule(), 0..4),
    ) {
        let config = match config(bastion, false, endpoints, rules).validate() {
            Ok(config) => config,
            // Duplicate rules are a configuration error, not a graph error
            Err(_) => return Ok(()),
        };
        match generate(&config) {
            Ok(plan) => assert_legal(&plan)?,
            Err(TopologyError::Structural(_)) => {}
            Err(other) => prop_assert!(false, "unexpected error {}", other),
        }
    }
}
