// Copyright (c) 2025 - Cowboy AI, Inc.
//! Routing & Gateway Strategist
//!
//! Decides NAT gateway cardinality and builds the route-table fan-out.
//!
//! # Redundancy Modes
//!
//! ```text
//! Single                               PerZone
//! ──────                               ───────
//! nat_gateway.0 (zone 0)               nat_gateway.i (zone i)
//!      ▲                                    ▲
//! route_table.private                  route_table.private.i
//!      ▲       ▲                            ▲
//! private.0  private.1 ...             private.i only
//! ```
//!
//! In `Single` mode a zone-0 outage severs egress for every private subnet;
//! this is the cost/availability trade-off the mode exists for. In `PerZone`
//! mode no zone's routing depends on another zone.
//!
//! Regardless of mode:
//! - Public subnets share one table with `0.0.0.0/0 → internet_gateway`.
//! - Database subnets share one table with no default route at all.

pub mod endpoints;

use serde::Serialize;
use tracing::info;

use crate::domain::{Ipv4Cidr, ResourceKey, ResourceKind};
use crate::errors::ConfigError;
use crate::graph::{Dependency, Materialized};
use crate::topology::{subnets_of_tier, RedundancyMode, Subnet, Tier};

pub use endpoints::{build_endpoints, EndpointType, VpcEndpoint, VpcEndpointSet};

/// Where a route sends traffic
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "key", rename_all = "snake_case")]
pub enum RouteTarget {
    InternetGateway(ResourceKey),
    NatGateway(ResourceKey),
}

impl RouteTarget {
    pub fn key(&self) -> &ResourceKey {
        match self {
            RouteTarget::InternetGateway(key) | RouteTarget::NatGateway(key) => key,
        }
    }
}

/// A single route inside a route table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Route {
    pub key: ResourceKey,
    pub route_table: ResourceKey,
    pub destination: Ipv4Cidr,
    pub target: RouteTarget,
}

/// Route table serving one tier (optionally one zone of it)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteTable {
    pub key: ResourceKey,
    pub tier: Tier,
    /// Zone served exclusively, `None` when shared across zones
    pub zone_index: Option<usize>,
    pub routes: Vec<Route>,
}

impl RouteTable {
    /// Default (`0.0.0.0/0`) route, if any
    pub fn default_route(&self) -> Option<&Route> {
        self.routes.iter().find(|r| r.destination.is_any())
    }
}

/// Subnet ↔ route table association
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteTableAssociation {
    pub key: ResourceKey,
    pub subnet: ResourceKey,
    pub route_table: ResourceKey,
}

/// Elastic IP backing one NAT gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ElasticIp {
    pub key: ResourceKey,
    pub zone_index: usize,
}

/// NAT gateway placed in a zone's public subnet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NatGateway {
    pub key: ResourceKey,
    pub zone_index: usize,
    pub subnet: ResourceKey,
    pub elastic_ip: ResourceKey,
}

/// Gateways, route tables and associations of one network
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatewayTopology {
    pub redundancy_mode: RedundancyMode,
    pub vpc: ResourceKey,
    pub internet_gateway: ResourceKey,
    pub elastic_ips: Vec<ElasticIp>,
    pub nat_gateways: Vec<NatGateway>,
    pub public_route_table: RouteTable,
    pub private_route_tables: Vec<RouteTable>,
    pub database_route_table: RouteTable,
    pub associations: Vec<RouteTableAssociation>,
}

impl GatewayTopology {
    pub fn nat_gateway_count(&self) -> usize {
        self.nat_gateways.len()
    }

    pub fn elastic_ip_count(&self) -> usize {
        self.elastic_ips.len()
    }

    /// Number of private route tables; always equals the NAT gateway count
    pub fn route_table_count(&self) -> usize {
        self.private_route_tables.len()
    }

    /// Every route table, public first, database last
    pub fn route_tables(&self) -> Vec<&RouteTable> {
        let mut tables = vec![&self.public_route_table];
        tables.extend(self.private_route_tables.iter());
        tables.push(&self.database_route_table);
        tables
    }

    /// Route table a subnet is associated with
    pub fn route_table_for(&self, subnet: &ResourceKey) -> Option<&RouteTable> {
        let association = self.associations.iter().find(|a| &a.subnet == subnet)?;
        self.route_tables()
            .into_iter()
            .find(|t| t.key == association.route_table)
    }

    pub fn nat_for_zone(&self, zone_index: usize) -> Option<&NatGateway> {
        self.nat_gateways.iter().find(|n| n.zone_index == zone_index)
    }
}

fn private_table_key(mode: RedundancyMode, zone_index: usize) -> ResourceKey {
    match mode {
        RedundancyMode::Single => ResourceKey::new(ResourceKind::RouteTable, "private"),
        RedundancyMode::PerZone => {
            ResourceKey::new(ResourceKind::RouteTable, format!("private.{}", zone_index))
        }
    }
}

fn private_route_key(mode: RedundancyMode, zone_index: usize) -> ResourceKey {
    match mode {
        RedundancyMode::Single => ResourceKey::new(ResourceKind::Route, "private_default"),
        RedundancyMode::PerZone => {
            ResourceKey::new(ResourceKind::Route, format!("private_default.{}", zone_index))
        }
    }
}

/// Build gateways and routing for the given subnets
///
/// # Errors
/// - `MissingPublicSubnet` when a zone that needs a NAT gateway has no public subnet
pub fn build_routing(subnets: &[Subnet], redundancy_mode: RedundancyMode) -> Result<GatewayTopology, ConfigError> {
    let vpc = ResourceKey::singleton(ResourceKind::Vpc);
    let internet_gateway = ResourceKey::singleton(ResourceKind::InternetGateway);

    let public = subnets_of_tier(subnets, Tier::Public);
    let private = subnets_of_tier(subnets, Tier::Private);
    let database = subnets_of_tier(subnets, Tier::Database);

    let nat_zones: Vec<usize> = match redundancy_mode {
        RedundancyMode::Single => vec![0],
        RedundancyMode::PerZone => private.iter().map(|s| s.zone_index).collect(),
    };

    let mut elastic_ips = Vec::with_capacity(nat_zones.len());
    let mut nat_gateways = Vec::with_capacity(nat_zones.len());
    for zone_index in nat_zones {
        let host = public
            .iter()
            .find(|s| s.zone_index == zone_index)
            .ok_or(ConfigError::MissingPublicSubnet(zone_index))?;

        let eip = ElasticIp {
            key: ResourceKey::new(ResourceKind::ElasticIp, zone_index),
            zone_index,
        };
        nat_gateways.push(NatGateway {
            key: ResourceKey::new(ResourceKind::NatGateway, zone_index),
            zone_index,
            subnet: host.key.clone(),
            elastic_ip: eip.key.clone(),
        });
        elastic_ips.push(eip);
    }

    let public_table_key = ResourceKey::new(ResourceKind::RouteTable, "public");
    let public_route_table = RouteTable {
        key: public_table_key.clone(),
        tier: Tier::Public,
        zone_index: None,
        routes: vec![Route {
            key: ResourceKey::new(ResourceKind::Route, "public_default"),
            route_table: public_table_key,
            destination: Ipv4Cidr::ANY,
            target: RouteTarget::InternetGateway(internet_gateway.clone()),
        }],
    };

    let private_route_tables: Vec<RouteTable> = nat_gateways
        .iter()
        .map(|nat| {
            let key = private_table_key(redundancy_mode, nat.zone_index);
            RouteTable {
                key: key.clone(),
                tier: Tier::Private,
                zone_index: match redundancy_mode {
                    RedundancyMode::Single => None,
                    RedundancyMode::PerZone => Some(nat.zone_index),
                },
                routes: vec![Route {
                    key: private_route_key(redundancy_mode, nat.zone_index),
                    route_table: key,
                    destination: Ipv4Cidr::ANY,
                    target: RouteTarget::NatGateway(nat.key.clone()),
                }],
            }
        })
        .collect();

    let database_route_table = RouteTable {
        key: ResourceKey::new(ResourceKind::RouteTable, "database"),
        tier: Tier::Database,
        zone_index: None,
        routes: Vec::new(),
    };

    let mut associations = Vec::with_capacity(subnets.len());
    let associate = |subnet: &Subnet, table: &ResourceKey| RouteTableAssociation {
        key: ResourceKey::new(
            ResourceKind::RouteTableAssociation,
            format!("{}.{}", subnet.tier, subnet.zone_index),
        ),
        subnet: subnet.key.clone(),
        route_table: table.clone(),
    };

    for subnet in &public {
        associations.push(associate(subnet, &public_route_table.key));
    }
    for subnet in &private {
        let table = private_table_key(redundancy_mode, subnet.zone_index);
        associations.push(associate(subnet, &table));
    }
    for subnet in &database {
        associations.push(associate(subnet, &database_route_table.key));
    }

    info!(
        mode = %redundancy_mode,
        nat_gateways = nat_gateways.len(),
        private_route_tables = private_route_tables.len(),
        "Built routing topology"
    );

    Ok(GatewayTopology {
        redundancy_mode,
        vpc,
        internet_gateway,
        elastic_ips,
        nat_gateways,
        public_route_table,
        private_route_tables,
        database_route_table,
        associations,
    })
}

impl Materialized for GatewayTopology {
    fn resources(&self) -> Vec<(ResourceKey, ResourceKind)> {
        let mut resources = vec![(self.internet_gateway.clone(), ResourceKind::InternetGateway)];
        resources.extend(self.elastic_ips.iter().map(|e| (e.key.clone(), ResourceKind::ElasticIp)));
        resources.extend(self.nat_gateways.iter().map(|n| (n.key.clone(), ResourceKind::NatGateway)));
        for table in self.route_tables() {
            resources.push((table.key.clone(), ResourceKind::RouteTable));
            resources.extend(table.routes.iter().map(|r| (r.key.clone(), ResourceKind::Route)));
        }
        resources.extend(
            self.associations
                .iter()
                .map(|a| (a.key.clone(), ResourceKind::RouteTableAssociation)),
        );
        resources
    }

    fn dependencies(&self) -> Vec<Dependency> {
        let mut deps = vec![Dependency::reference(&self.internet_gateway, &self.vpc)];

        // Address allocation and NAT creation need a working internet gateway.
        for eip in &self.elastic_ips {
            deps.push(Dependency::explicit(&eip.key, &self.internet_gateway));
        }
        for nat in &self.nat_gateways {
            deps.push(Dependency::reference(&nat.key, &nat.subnet));
            deps.push(Dependency::reference(&nat.key, &nat.elastic_ip));
            deps.push(Dependency::explicit(&nat.key, &self.internet_gateway));
        }

        for table in self.route_tables() {
            deps.push(Dependency::reference(&table.key, &self.vpc));
            for route in &table.routes {
                deps.push(Dependency::reference(&route.key, &route.route_table));
                match &route.target {
                    // Teardown must remove this route before the gateway itself.
                    RouteTarget::InternetGateway(igw) => {
                        deps.push(Dependency::explicit(&route.key, igw));
                    }
                    RouteTarget::NatGateway(nat) => {
                        deps.push(Dependency::reference(&route.key, nat));
                    }
                }
            }
        }

        for association in &self.associations {
            deps.push(Dependency::reference(&association.key, &association.subnet));
            deps.push(Dependency::reference(&association.key, &association.route_table));
        }
        deps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::plan;

    fn subnets(zone_count: u8) -> Vec<Subnet> {
        plan(&"10.0.0.0/16".parse().unwrap(), zone_count, &Tier::ALL).unwrap()
    }

    #[test]
    fn test_single_mode_shares_one_nat() {
        let subnets = subnets(3);
        let routing = build_routing(&subnets, RedundancyMode::Single).unwrap();

        assert_eq!(routing.nat_gateway_count(), 1);
        assert_eq!(routing.elastic_ip_count(), 1);
        assert_eq!(routing.route_table_count(), 1);
        assert_eq!(routing.nat_gateways[0].subnet.as_str(), "subnet.public.0");

        let shared = &routing.private_route_tables[0];
        for private in subnets_of_tier(&subnets, Tier::Private) {
            assert_eq!(routing.route_table_for(&private.key).unwrap().key, shared.key);
        }
    }

    #[test]
    fn test_per_zone_mode_binds_same_zone() {
        let subnets = subnets(3);
        let routing = build_routing(&subnets, RedundancyMode::PerZone).unwrap();

        assert_eq!(routing.nat_gateway_count(), 3);
        assert_eq!(routing.route_table_count(), 3);
        for table in &routing.private_route_tables {
            let zone = table.zone_index.unwrap();
            let target = table.default_route().unwrap().target.key();
            assert_eq!(target, &routing.nat_for_zone(zone).unwrap().key);
        }
        for private in subnets_of_tier(&subnets, Tier::Private) {
            let table = routing.route_table_for(&private.key).unwrap();
            assert_eq!(table.zone_index, Some(private.zone_index));
        }
    }

    #[test]
    fn test_database_table_has_no_routes() {
        for mode in [RedundancyMode::Single, RedundancyMode::PerZone] {
            let routing = build_routing(&subnets(2), mode).unwrap();
            assert!(routing.database_route_table.routes.is_empty());
            assert!(routing.database_route_table.default_route().is_none());
        }
    }

    #[test]
    fn test_public_default_route_is_explicit_on_igw() {
        let routing = build_routing(&subnets(2), RedundancyMode::Single).unwrap();
        let route = routing.public_route_table.default_route().unwrap();
        let deps = routing.dependencies();
        assert!(deps.contains(&Dependency::explicit(&route.key, &routing.internet_gateway)));
        for nat in &routing.nat_gateways {
            assert!(deps.contains(&Dependency::explicit(&nat.key, &routing.internet_gateway)));
        }
    }

    #[test]
    fn test_missing_public_subnet() {
        let only_private: Vec<Subnet> = subnets(2)
            .into_iter()
            .filter(|s| s.tier != Tier::Public)
            .collect();
        assert_eq!(
            build_routing(&only_private, RedundancyMode::Single),
            Err(ConfigError::MissingPublicSubnet(0))
        );
    }
}
