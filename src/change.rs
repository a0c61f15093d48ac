// Copyright (c) 2025 - Cowboy AI, Inc.
//! Destructive change assessment
//!
//! Subnets are immutable once created: a new parent block, zone count or
//! zone list replaces them, and a redundancy change replaces the NAT gateways
//! and private route tables. Such changes are surfaced as
//! [`DestructiveChangeWarning`]s that the operator must acknowledge.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::warn;

use crate::config::ValidatedConfig;
use crate::domain::{Ipv4Cidr, ResourceKey};
use crate::errors::ConfigError;
use crate::routing::{build_routing, GatewayTopology};
use crate::topology::{NetworkPlan, Subnet};

/// Topology parameter whose change replaces resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangedParameter {
    ParentCidr,
    ZoneCount,
    Zones,
    RedundancyMode,
}

impl fmt::Display for ChangedParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangedParameter::ParentCidr => write!(f, "parent_cidr"),
            ChangedParameter::ZoneCount => write!(f, "zone_count"),
            ChangedParameter::Zones => write!(f, "zones"),
            ChangedParameter::RedundancyMode => write!(f, "redundancy_mode"),
        }
    }
}

/// A topology-affecting change and the resources it replaces
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestructiveChangeWarning {
    pub parameter: ChangedParameter,
    pub previous: String,
    pub next: String,
    /// Keys of resources destroyed, recreated or added by the change
    pub replaced: Vec<ResourceKey>,
}

impl fmt::Display for DestructiveChangeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} changes from {} to {}; {} resource(s) replaced",
            self.parameter,
            self.previous,
            self.next,
            self.replaced.len()
        )
    }
}

/// Outcome of comparing two configurations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeAssessment {
    pub warnings: Vec<DestructiveChangeWarning>,
}

impl ChangeAssessment {
    pub fn is_destructive(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Every resource key named by any warning
    pub fn replaced_keys(&self) -> BTreeSet<ResourceKey> {
        self.warnings
            .iter()
            .flat_map(|w| w.replaced.iter().cloned())
            .collect()
    }
}

type SubnetShape = (Ipv4Cidr, Option<String>);

fn subnet_shapes(network: &NetworkPlan) -> Result<BTreeMap<ResourceKey, SubnetShape>, ConfigError> {
    Ok(network
        .subnets()?
        .into_iter()
        .map(|s: Subnet| (s.key, (s.cidr_block, s.zone)))
        .collect())
}

/// Keys present on one side only, or present on both with `differs`
fn diff_keys<V>(
    previous: &BTreeMap<ResourceKey, V>,
    next: &BTreeMap<ResourceKey, V>,
    differs: impl Fn(&V, &V) -> bool,
) -> Vec<ResourceKey> {
    let keys: BTreeSet<&ResourceKey> = previous.keys().chain(next.keys()).collect();
    keys.into_iter()
        .filter(|key| match (previous.get(*key), next.get(*key)) {
            (Some(a), Some(b)) => differs(a, b),
            _ => true,
        })
        .cloned()
        .collect()
}

fn redundancy_keys(gateways: &GatewayTopology) -> BTreeSet<ResourceKey> {
    let mut keys = BTreeSet::new();
    keys.extend(gateways.elastic_ips.iter().map(|e| e.key.clone()));
    keys.extend(gateways.nat_gateways.iter().map(|n| n.key.clone()));
    for table in &gateways.private_route_tables {
        keys.insert(table.key.clone());
        keys.extend(table.routes.iter().map(|r| r.key.clone()));
    }
    keys.extend(
        gateways
            .associations
            .iter()
            .filter(|a| gateways.private_route_tables.iter().any(|t| t.key == a.route_table))
            .map(|a| a.key.clone()),
    );
    keys
}

/// Compare two validated configurations
///
/// # Errors
/// - `ConfigError` if either network plan cannot be laid out
pub fn assess_change(previous: &ValidatedConfig, next: &ValidatedConfig) -> Result<ChangeAssessment, ConfigError> {
    let (prev_net, next_net) = (&previous.network, &next.network);
    let prev_shapes = subnet_shapes(prev_net)?;
    let next_shapes = subnet_shapes(next_net)?;
    let mut warnings = Vec::new();

    if prev_net.parent_cidr != next_net.parent_cidr {
        warnings.push(DestructiveChangeWarning {
            parameter: ChangedParameter::ParentCidr,
            previous: prev_net.parent_cidr.to_string(),
            next: next_net.parent_cidr.to_string(),
            replaced: diff_keys(&prev_shapes, &next_shapes, |a, b| a.0 != b.0),
        });
    }

    if prev_net.zone_count != next_net.zone_count {
        warnings.push(DestructiveChangeWarning {
            parameter: ChangedParameter::ZoneCount,
            previous: prev_net.zone_count.to_string(),
            next: next_net.zone_count.to_string(),
            replaced: diff_keys(&prev_shapes, &next_shapes, |_, _| false),
        });
    }

    let common = prev_net.zones.len().min(next_net.zones.len());
    if prev_net.zones[..common] != next_net.zones[..common] {
        warnings.push(DestructiveChangeWarning {
            parameter: ChangedParameter::Zones,
            previous: prev_net.zones.join(","),
            next: next_net.zones.join(","),
            replaced: diff_keys(&prev_shapes, &next_shapes, |a, b| a.0 == b.0 && a.1 != b.1),
        });
    }

    if prev_net.redundancy_mode != next_net.redundancy_mode {
        let prev_routing = build_routing(&prev_net.subnets()?, prev_net.redundancy_mode)?;
        let next_routing = build_routing(&next_net.subnets()?, next_net.redundancy_mode)?;
        let mut replaced = redundancy_keys(&prev_routing);
        replaced.extend(redundancy_keys(&next_routing));
        warnings.push(DestructiveChangeWarning {
            parameter: ChangedParameter::RedundancyMode,
            previous: prev_net.redundancy_mode.to_string(),
            next: next_net.redundancy_mode.to_string(),
            replaced: replaced.into_iter().collect(),
        });
    }

    for warning in &warnings {
        warn!(
            parameter = %warning.parameter,
            previous = %warning.previous,
            next = %warning.next,
            replaced = warning.replaced.len(),
            "Destructive topology change"
        );
    }

    Ok(ChangeAssessment { warnings })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TopologyConfig;

    fn validated(config: TopologyConfig) -> ValidatedConfig {
        config.validate().unwrap()
    }

    #[test]
    fn test_no_change() {
        let config = validated(TopologyConfig::default());
        let assessment = assess_change(&config, &config).unwrap();
        assert!(!assessment.is_destructive());
    }

    #[test]
    fn test_non_topology_change_is_safe() {
        let previous = validated(TopologyConfig::default());
        let next = validated(TopologyConfig {
            alert_recipients: vec!["ops@example.com".to_string()],
            enable_waf: true,
            ..Default::default()
        });
        assert!(!assess_change(&previous, &next).unwrap().is_destructive());
    }

    #[test]
    fn test_parent_cidr_replaces_every_subnet() {
        let previous = validated(TopologyConfig::default());
        let next = validated(TopologyConfig {
            parent_cidr: "10.1.0.0/16".to_string(),
            ..Default::default()
        });
        let assessment = assess_change(&previous, &next).unwrap();
        assert_eq!(assessment.warnings.len(), 1);
        assert_eq!(assessment.warnings[0].parameter, ChangedParameter::ParentCidr);
        assert_eq!(assessment.warnings[0].replaced.len(), 6);
    }

    #[test]
    fn test_zone_count_lists_added_subnets() {
        let previous = validated(TopologyConfig::default());
        let next = validated(TopologyConfig {
            zone_count: 3,
            ..Default::default()
        });
        let assessment = assess_change(&previous, &next).unwrap();
        let keys: Vec<&str> = assessment.warnings[0].replaced.iter().map(|k| k.as_str()).collect();
        assert_eq!(
            keys,
            vec!["subnet.database.2", "subnet.private.2", "subnet.public.2"]
        );
    }

    #[test]
    fn test_redundancy_change_lists_gateways() {
        let previous = validated(TopologyConfig {
            redundancy_mode: Some(crate::topology::RedundancyMode::Single),
            ..Default::default()
        });
        let next = validated(TopologyConfig {
            redundancy_mode: Some(crate::topology::RedundancyMode::PerZone),
            ..Default::default()
        });
        let assessment = assess_change(&previous, &next).unwrap();
        let replaced = assessment.replaced_keys();
        assert!(replaced.contains(&ResourceKey::new(crate::domain::ResourceKind::NatGateway, 1)));
        assert!(replaced.contains(&ResourceKey::new(crate::domain::ResourceKind::RouteTable, "private")));
        assert!(replaced.contains(&ResourceKey::new(crate::domain::ResourceKind::RouteTable, "private.0")));
    }
}
