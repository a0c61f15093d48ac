// Copyright (c) 2025 - Cowboy AI, Inc.
//! Infrastructure Plan
//!
//! Runs every generator component over one validated configuration and
//! assembles the result, including the resource dependency graph and its
//! apply/destroy orders.
//!
//! ```text
//! ValidatedConfig
//!   ├─▶ topology   (subnets)
//!   ├─▶ routing    (NAT, route tables) ──▶ endpoints
//!   ├─▶ security   (graph ▶ groups, edge filters)
//!   ├─▶ database   (needs subnets + graph)
//!   └─▶ monitoring (needs routing + database)
//!                   │
//!                   ▼
//!           DependencyGraph ──▶ apply order / destroy order
//! ```
//!
//! # Determinism
//!
//! Generation is a pure function of the configuration: the plan id is a
//! UUID v5 over the configuration's canonical JSON, and every collection is
//! ordered. Two runs over the same input produce byte-identical JSON.

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::change::{assess_change, ChangeAssessment};
use crate::config::{Environment, ValidatedConfig};
use crate::database::{provision_database, DataTier};
use crate::domain::ResourceKey;
use crate::errors::{TopologyError, TopologyResult};
use crate::graph::{Dependency, DependencyGraph, Materialized};
use crate::monitoring::{compose_monitoring, MonitoringOverlay};
use crate::outputs::PlanOutputs;
use crate::routing::{build_endpoints, build_routing, GatewayTopology, VpcEndpointSet};
use crate::security::{build_edge_filters, build_graph, materialize_groups, EdgeFilters, SecurityGraph, SecurityGroupSet};
use crate::topology::{NetworkLayout, NetworkPlan};

/// Complete generator output for one configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfrastructurePlan {
    pub plan_id: Uuid,
    pub project: String,
    pub environment: Environment,
    pub region: String,
    pub network: NetworkPlan,
    pub layout: NetworkLayout,
    pub gateways: GatewayTopology,
    pub endpoints: Option<VpcEndpointSet>,
    pub security_graph: SecurityGraph,
    pub security_groups: SecurityGroupSet,
    pub edge_filters: EdgeFilters,
    pub database: DataTier,
    pub monitoring: MonitoringOverlay,
    pub dependencies: DependencyGraph,
    pub apply_order: Vec<ResourceKey>,
    pub destroy_order: Vec<ResourceKey>,
    pub outputs: PlanOutputs,
}

/// Plan for a changed configuration together with what the change replaces
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanUpdate {
    pub plan: InfrastructurePlan,
    pub assessment: ChangeAssessment,
}

/// Deterministic plan id for a configuration
pub fn plan_id(config: &ValidatedConfig) -> TopologyResult<Uuid> {
    let canonical = config.canonical_json()?;
    Ok(Uuid::new_v5(&Uuid::NAMESPACE_OID, canonical.as_bytes()))
}

/// Generate the plan for a validated configuration
///
/// # Errors
/// - `Config` / `Structural` from any component
pub fn generate(config: &ValidatedConfig) -> TopologyResult<InfrastructurePlan> {
    let network = config.network.clone();
    let layout = NetworkLayout::new(&network)?;
    let gateways = build_routing(&layout.subnets, network.redundancy_mode)?;
    let endpoints = config
        .security
        .enable_vpc_endpoints
        .then(|| build_endpoints(&config.region, &layout.subnets, &gateways));

    let security_graph = build_graph(&layout.subnets, &config.security)?;
    let security_groups = materialize_groups(&security_graph, &config.name_prefix);
    let edge_filters = build_edge_filters(&config.edge_filters, &config.name_prefix)?;
    let database = provision_database(&layout.subnets, &security_graph, &config.database)?;
    let monitoring = compose_monitoring(&config.monitoring, &gateways, &database)?;

    let mut components: Vec<&dyn Materialized> = Vec::new();
    components.push(&layout);
    components.push(&gateways);
    if let Some(endpoints) = &endpoints {
        components.push(endpoints);
    }
    components.push(&security_groups);
    components.push(&edge_filters);
    components.push(&database);
    components.push(&monitoring);

    let mut dependencies = DependencyGraph::new();
    for component in &components {
        dependencies.add_component(*component)?;
    }
    for component in &components {
        for dependency in component.dependencies() {
            dependencies.add_dependency(dependency)?;
        }
    }
    let apply_order = dependencies.apply_order()?;
    let destroy_order = dependencies.destroy_order()?;

    let outputs = PlanOutputs::collect(
        &layout,
        &gateways,
        &security_groups,
        &edge_filters,
        &database,
        &monitoring,
    );

    let plan = InfrastructurePlan {
        plan_id: plan_id(config)?,
        project: config.project.clone(),
        environment: config.environment,
        region: config.region.clone(),
        network,
        layout,
        gateways,
        endpoints,
        security_graph,
        security_groups,
        edge_filters,
        database,
        monitoring,
        dependencies,
        apply_order,
        destroy_order,
        outputs,
    };

    info!(
        plan_id = %plan.plan_id,
        resources = plan.dependencies.len(),
        zones = plan.network.zone_count,
        mode = %plan.network.redundancy_mode,
        "Generated infrastructure plan"
    );
    Ok(plan)
}

/// Generate the plan for `next`, refusing destructive changes from
/// `previous` unless `allow_destructive` is set
///
/// # Errors
/// - `DestructiveChange` with every warning when not acknowledged
pub fn generate_update(
    previous: &ValidatedConfig,
    next: &ValidatedConfig,
    allow_destructive: bool,
) -> TopologyResult<PlanUpdate> {
    let assessment = assess_change(previous, next)?;
    if assessment.is_destructive() {
        if !allow_destructive {
            return Err(TopologyError::DestructiveChange(assessment.warnings));
        }
        warn!(
            warnings = assessment.warnings.len(),
            replaced = assessment.replaced_keys().len(),
            "Destructive change acknowledged"
        );
    }
    Ok(PlanUpdate {
        plan: generate(next)?,
        assessment,
    })
}

impl InfrastructurePlan {
    /// Canonical JSON; byte-identical for identical configurations
    pub fn to_canonical_json(&self) -> TopologyResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Every dependency edge of the plan
    pub fn dependency_edges(&self) -> Vec<Dependency> {
        self.dependencies.dependencies()
    }

    pub fn resource_count(&self) -> usize {
        self.dependencies.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TopologyConfig;
    use crate::domain::ResourceKind;

    fn validated(config: TopologyConfig) -> ValidatedConfig {
        config.validate().unwrap()
    }

    #[test]
    fn test_generate_defaults() {
        let plan = generate(&validated(TopologyConfig::default())).unwrap();
        assert_eq!(plan.layout.subnets.len(), 6);
        assert_eq!(plan.gateways.nat_gateway_count(), 1);
        assert!(plan.endpoints.is_none());
        assert_eq!(plan.apply_order.len(), plan.resource_count());
        assert_eq!(plan.apply_order.first().map(|k| k.as_str()), Some("alert_topic"));
    }

    #[test]
    fn test_plan_id_is_deterministic() {
        let a = generate(&validated(TopologyConfig::default())).unwrap();
        let b = generate(&validated(TopologyConfig::default())).unwrap();
        assert_eq!(a.plan_id, b.plan_id);
        assert_eq!(a.to_canonical_json().unwrap(), b.to_canonical_json().unwrap());

        let c = generate(&validated(TopologyConfig {
            zone_count: 3,
            ..Default::default()
        }))
        .unwrap();
        assert_ne!(a.plan_id, c.plan_id);
    }

    #[test]
    fn test_vpc_before_subnets_before_nat() {
        let plan = generate(&validated(TopologyConfig::default())).unwrap();
        let position = |key: &str| plan.apply_order.iter().position(|k| k.as_str() == key).unwrap();
        assert!(position("vpc") < position("subnet.public.0"));
        assert!(position("subnet.public.0") < position("nat_gateway.0"));
        assert!(position("internet_gateway") < position("nat_gateway.0"));
        assert!(position("db_subnet_group") < position("db_instance.primary"));
    }

    #[test]
    fn test_update_refuses_destructive_change() {
        let previous = validated(TopologyConfig::default());
        let next = validated(TopologyConfig {
            parent_cidr: "10.20.0.0/16".to_string(),
            ..Default::default()
        });

        match generate_update(&previous, &next, false) {
            Err(TopologyError::DestructiveChange(warnings)) => assert_eq!(warnings.len(), 1),
            other => panic!("expected destructive change, got {:?}", other.map(|u| u.plan.plan_id)),
        }

        let update = generate_update(&previous, &next, true).unwrap();
        assert!(update.assessment.is_destructive());
        assert_eq!(update.plan.layout.cidr_block.to_string(), "10.20.0.0/16");
    }

    #[test]
    fn test_vpc_endpoints_included_when_enabled() {
        let plan = generate(&validated(TopologyConfig {
            enable_vpc_endpoints: true,
            ..Default::default()
        }))
        .unwrap();
        assert_eq!(plan.dependencies.keys_of_kind(ResourceKind::VpcEndpoint).len(), 4);
        assert!(plan.outputs.security_groups.contains_key(&crate::security::NodeKind::VpcEndpoints));
    }
}
