// Copyright (c) 2025 - Cowboy AI, Inc.
//! Plan outputs exposed to collaborators

use serde::Serialize;
use std::collections::BTreeMap;

use crate::database::{ConnectionDetails, DataTier};
use crate::domain::ResourceKey;
use crate::monitoring::MonitoringOverlay;
use crate::routing::GatewayTopology;
use crate::security::{EdgeFilters, NodeKind, SecurityGroupSet};
use crate::topology::{NetworkLayout, Tier};

/// Stable handles downstream systems attach to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanOutputs {
    pub vpc: ResourceKey,
    /// Subnet keys per tier, ordered by zone index
    pub subnets: BTreeMap<Tier, Vec<ResourceKey>>,
    pub security_groups: BTreeMap<NodeKind, ResourceKey>,
    pub nat_gateways: Vec<ResourceKey>,
    pub route_tables: Vec<ResourceKey>,
    pub database: ConnectionDetails,
    /// Connection settings in the form the application reads them
    pub application_environment: BTreeMap<String, String>,
    pub alert_topic: ResourceKey,
    pub web_acl: Option<ResourceKey>,
}

impl PlanOutputs {
    pub fn collect(
        layout: &NetworkLayout,
        gateways: &GatewayTopology,
        groups: &SecurityGroupSet,
        edge_filters: &EdgeFilters,
        database: &DataTier,
        monitoring: &MonitoringOverlay,
    ) -> Self {
        let subnets = Tier::ALL
            .iter()
            .map(|tier| {
                let keys = layout.tier(*tier).into_iter().map(|s| s.key.clone()).collect();
                (*tier, keys)
            })
            .collect();
        let connection = database.connection_details();

        Self {
            vpc: layout.vpc.clone(),
            subnets,
            security_groups: groups.groups.iter().map(|g| (g.node, g.key.clone())).collect(),
            nat_gateways: gateways.nat_gateways.iter().map(|n| n.key.clone()).collect(),
            route_tables: gateways.route_tables().into_iter().map(|t| t.key.clone()).collect(),
            application_environment: connection.to_environment(),
            database: connection,
            alert_topic: monitoring.topic.key.clone(),
            web_acl: edge_filters.web_acl.as_ref().map(|acl| acl.key.clone()),
        }
    }
}
