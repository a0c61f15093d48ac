// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for the subnet layout, routing and dependency order

use proptest::prelude::*;
use std::collections::HashMap;
use std::net::Ipv4Addr;

use cim_network_topology::domain::{Ipv4Cidr, ResourceKey, ResourceKind};
use cim_network_topology::routing::RouteTarget;
use cim_network_topology::topology::{plan, select_zones};
use cim_network_topology::{generate, RedundancyMode, Tier, TopologyConfig};

use crate::fixtures::{base_config, config_with, plan_for, validated};

// ============================================================================
// Strategies
// ============================================================================

fn parent_block() -> impl Strategy<Value = Ipv4Cidr> {
    (any::<u32>(), 8u8..=20).prop_map(|(address, prefix)| {
        let mask = u32::MAX << (32 - prefix);
        Ipv4Cidr::new(Ipv4Addr::from(address & mask), prefix).unwrap()
    })
}

fn redundancy_mode() -> impl Strategy<Value = RedundancyMode> {
    prop_oneof![Just(RedundancyMode::Single), Just(RedundancyMode::PerZone)]
}

// ============================================================================
// Layout
// ============================================================================

proptest! {
    /// No two subnets overlap and every subnet lies inside the parent block
    #[test]
    fn prop_subnets_never_overlap(parent in parent_block(), zone_count in 2u8..=6) {
        let subnets = plan(&parent, zone_count, &Tier::ALL).unwrap();
        prop_assert_eq!(subnets.len(), 3 * zone_count as usize);

        for (i, a) in subnets.iter().enumerate() {
            prop_assert!(parent.contains_block(&a.cidr_block));
            for b in &subnets[i + 1..] {
                prop_assert!(!a.cidr_block.overlaps(&b.cidr_block), "{} overlaps {}", a.cidr_block, b.cidr_block);
            }
        }
    }

    /// Growing the zone count never moves an existing subnet
    #[test]
    fn prop_existing_subnets_are_stable(parent in parent_block(), zone_count in 2u8..6) {
        let smaller = plan(&parent, zone_count, &Tier::ALL).unwrap();
        let larger: HashMap<_, _> = plan(&parent, zone_count + 1, &Tier::ALL)
            .unwrap()
            .into_iter()
            .map(|s| (s.key.clone(), s))
            .collect();
        for subnet in &smaller {
            prop_assert_eq!(Some(subnet), larger.get(&subnet.key));
        }
    }

    /// Effective zone count is the smaller of request and region capacity
    #[test]
    fn prop_zone_count_clamped(requested in 2u8..=6, available in 2usize..=6) {
        let zones: Vec<String> = (0..available).map(|i| format!("zone-{}", i)).collect();
        let selected = select_zones("region", requested, &zones).unwrap();
        prop_assert_eq!(selected.len(), (requested as usize).min(available));
    }
}

// ============================================================================
// Routing
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// One NAT per zone in per-zone mode, and no private subnet ever routes
    /// through another zone's NAT
    #[test]
    fn prop_per_zone_isolation(zone_count in 2u8..=4) {
        let plan = plan_for(config_with(zone_count, RedundancyMode::PerZone));
        let gateways = &plan.gateways;
        prop_assert_eq!(gateways.nat_gateway_count(), zone_count as usize);

        for nat in &gateways.nat_gateways {
            let public = plan.layout.tier(Tier::Public)[nat.zone_index].key.clone();
            prop_assert_eq!(&nat.subnet, &public);
        }
        for subnet in plan.layout.tier(Tier::Private) {
            let table = gateways.route_table_for(&subnet.key).unwrap();
            match &table.default_route().unwrap().target {
                RouteTarget::NatGateway(key) => {
                    let nat = gateways.nat_gateways.iter().find(|n| &n.key == key).unwrap();
                    prop_assert_eq!(nat.zone_index, subnet.zone_index);
                }
                other => prop_assert!(false, "private route targets {:?}", other),
            }
        }
    }

    /// Losing one zone's NAT gateway only ever touches that zone
    #[test]
    fn prop_nat_dependents_stay_in_zone(zone_count in 2u8..=4) {
        let plan = plan_for(config_with(zone_count, RedundancyMode::PerZone));
        let graph = &plan.dependencies;

        for zone_index in 0..zone_count as usize {
            let nat = ResourceKey::new(ResourceKind::NatGateway, zone_index);
            let zone = zone_index.to_string();
            prop_assert!(graph.contains(&nat));

            let dependents = graph.transitive_dependents(&nat);
            prop_assert!(!dependents.is_empty());
            for dependent in &dependents {
                let zone_suffix = dependent.as_str().rsplit('.').next();
                prop_assert_eq!(zone_suffix, Some(zone.as_str()), "{} depends on {}", dependent, nat);
                prop_assert_ne!(graph.kind_of(dependent), Some(ResourceKind::RouteTable));
                prop_assert_ne!(graph.kind_of(dependent), Some(ResourceKind::NatGateway));
            }
        }
    }

    /// Database subnets never get an internet-facing route
    #[test]
    fn prop_database_tier_isolated(zone_count in 2u8..=4, mode in redundancy_mode(), endpoints in any::<bool>()) {
        let plan = plan_for(TopologyConfig {
            enable_vpc_endpoints: endpoints,
            ..config_with(zone_count, mode)
        });
        for subnet in plan.layout.tier(Tier::Database) {
            let table = plan.gateways.route_table_for(&subnet.key).unwrap();
            prop_assert!(table.routes.is_empty());
        }
        if let Some(set) = &plan.endpoints {
            for endpoint in &set.endpoints {
                prop_assert!(!endpoint.route_tables.contains(&plan.gateways.database_route_table.key));
            }
        }
    }

    /// Every dependency is applied before its dependent and destroyed after it
    #[test]
    fn prop_apply_order_respects_dependencies(zone_count in 2u8..=4, mode in redundancy_mode(), endpoints in any::<bool>()) {
        let plan = plan_for(TopologyConfig {
            enable_vpc_endpoints: endpoints,
            ..config_with(zone_count, mode)
        });
        prop_assert_eq!(plan.apply_order.len(), plan.resource_count());

        let apply: HashMap<_, _> = plan.apply_order.iter().enumerate().map(|(i, k)| (k, i)).collect();
        let destroy: HashMap<_, _> = plan.destroy_order.iter().enumerate().map(|(i, k)| (k, i)).collect();
        for dependency in plan.dependency_edges() {
            prop_assert!(apply[&dependency.prerequisite] < apply[&dependency.dependent]);
            prop_assert!(destroy[&dependency.dependent] < destroy[&dependency.prerequisite]);
        }
    }

    /// Identical input, identical output
    #[test]
    fn prop_generation_is_idempotent(zone_count in 2u8..=4, mode in redundancy_mode()) {
        let config = validated(config_with(zone_count, mode));
        let first = generate(&config).unwrap();
        let second = generate(&config).unwrap();
        prop_assert_eq!(first.plan_id, second.plan_id);
        prop_assert_eq!(first.to_canonical_json().unwrap(), second.to_canonical_json().unwrap());
    }
}

#[test]
fn test_base_fixture_uses_single_nat() {
    let plan = plan_for(base_config());
    assert_eq!(plan.gateways.nat_gateway_count(), 1);
}
