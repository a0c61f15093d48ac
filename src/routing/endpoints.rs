// Copyright (c) 2025 - Cowboy AI, Inc.
//! Private service endpoints
//!
//! When enabled, object storage is reached through a gateway endpoint on the
//! private route tables, and the services the application
//! talks to (secrets, logs, metrics) through interface endpoints in the
//! private subnets behind the `VpcEndpoints` security group.

use serde::Serialize;

use super::GatewayTopology;
use crate::domain::{ResourceKey, ResourceKind};
use crate::graph::{Dependency, Materialized};
use crate::security::NodeKind;
use crate::topology::{subnets_of_tier, Subnet, Tier};

/// Services reached through interface endpoints
pub const INTERFACE_SERVICES: [&str; 3] = ["logs", "monitoring", "secretsmanager"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointType {
    Gateway,
    Interface,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VpcEndpoint {
    pub key: ResourceKey,
    pub service_name: String,
    pub endpoint_type: EndpointType,
    /// Gateway endpoints only
    pub route_tables: Vec<ResourceKey>,
    /// Interface endpoints only
    pub subnets: Vec<ResourceKey>,
    pub security_group: Option<ResourceKey>,
    pub private_dns_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VpcEndpointSet {
    pub vpc: ResourceKey,
    pub endpoints: Vec<VpcEndpoint>,
}

/// Endpoints for `region`, attached to the given routing
pub fn build_endpoints(region: &str, subnets: &[Subnet], gateways: &GatewayTopology) -> VpcEndpointSet {
    // The database table stays without any route out of the VPC.
    let route_tables: Vec<ResourceKey> = gateways
        .private_route_tables
        .iter()
        .map(|t| t.key.clone())
        .collect();

    let mut endpoints = vec![VpcEndpoint {
        key: ResourceKey::new(ResourceKind::VpcEndpoint, "s3"),
        service_name: format!("com.amazonaws.{}.s3", region),
        endpoint_type: EndpointType::Gateway,
        route_tables,
        subnets: Vec::new(),
        security_group: None,
        private_dns_enabled: false,
    }];

    let private: Vec<ResourceKey> = subnets_of_tier(subnets, Tier::Private)
        .into_iter()
        .map(|s| s.key.clone())
        .collect();
    endpoints.extend(INTERFACE_SERVICES.iter().map(|service| VpcEndpoint {
        key: ResourceKey::new(ResourceKind::VpcEndpoint, service),
        service_name: format!("com.amazonaws.{}.{}", region, service),
        endpoint_type: EndpointType::Interface,
        route_tables: Vec::new(),
        subnets: private.clone(),
        security_group: Some(NodeKind::VpcEndpoints.group_key()),
        private_dns_enabled: true,
    }));

    VpcEndpointSet {
        vpc: gateways.vpc.clone(),
        endpoints,
    }
}

impl Materialized for VpcEndpointSet {
    fn resources(&self) -> Vec<(ResourceKey, ResourceKind)> {
        self.endpoints
            .iter()
            .map(|e| (e.key.clone(), ResourceKind::VpcEndpoint))
            .collect()
    }

    fn dependencies(&self) -> Vec<Dependency> {
        let mut deps = Vec::new();
        for endpoint in &self.endpoints {
            deps.push(Dependency::reference(&endpoint.key, &self.vpc));
            for prerequisite in endpoint
                .route_tables
                .iter()
                .chain(endpoint.subnets.iter())
                .chain(endpoint.security_group.iter())
            {
                deps.push(Dependency::reference(&endpoint.key, prerequisite));
            }
        }
        deps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::build_routing;
    use crate::topology::{plan, RedundancyMode};

    #[test]
    fn test_gateway_endpoint_on_private_tables_only() {
        let subnets = plan(&"10.0.0.0/16".parse().unwrap(), 2, &Tier::ALL).unwrap();
        let gateways = build_routing(&subnets, RedundancyMode::PerZone).unwrap();
        let set = build_endpoints("eu-north-1", &subnets, &gateways);

        let s3 = &set.endpoints[0];
        assert_eq!(s3.service_name, "com.amazonaws.eu-north-1.s3");
        assert_eq!(s3.route_tables.len(), 2);
        assert!(!s3.route_tables.contains(&gateways.database_route_table.key));

        let interfaces: Vec<&VpcEndpoint> = set
            .endpoints
            .iter()
            .filter(|e| e.endpoint_type == EndpointType::Interface)
            .collect();
        assert_eq!(interfaces.len(), 3);
        assert!(interfaces.iter().all(|e| e.subnets.len() == 2));
    }
}
