// Copyright (c) 2025 - Cowboy AI, Inc.
//! Topology Planner
//!
//! Turns one parent CIDR block and a zone count into the complete, non-
//! overlapping subnet layout of a three-tier network.
//!
//! # Offset Bands
//!
//! The parent block is split into 256 equal children (parent prefix + 8, so a
//! `/16` yields `/24`s). Each tier owns a band of ten child indices:
//!
//! ```text
//! index   0 ..  9   Public     (zone i → index i)
//! index  10 .. 19   Private    (zone i → index 10 + i)
//! index  20 .. 29   Database   (zone i → index 20 + i)
//! ```
//!
//! Bands never intersect, so no zone count up to ten can make two tiers
//! collide; zone counts are capped at six.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::domain::invariants::{validate_parent_block, validate_zone_count, MIN_ZONES};
use crate::domain::{Ipv4Cidr, ResourceKey, ResourceKind};
use crate::errors::ConfigError;
use crate::graph::{Dependency, Materialized};

/// Prefix bits added to the parent block for every tier subnet
pub const SUBNET_NEW_BITS: u8 = 8;

/// Child indices reserved per tier
pub const BAND_WIDTH: u32 = 10;

/// Network tier with a distinct trust level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Internet-facing edge (load balancer, NAT, bastion)
    Public,
    /// Application tier, egress through NAT only
    Private,
    /// Data tier, no route out of the VPC
    Database,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Public, Tier::Private, Tier::Database];

    /// First child index of this tier's band
    pub fn band_start(&self) -> u32 {
        match self {
            Tier::Public => 0,
            Tier::Private => BAND_WIDTH,
            Tier::Database => 2 * BAND_WIDTH,
        }
    }

    /// Child index of this tier's subnet in zone `zone_index`
    pub fn offset(&self, zone_index: usize) -> Result<u32, ConfigError> {
        let zone_index = u32::try_from(zone_index)
            .ok()
            .filter(|i| *i < BAND_WIDTH)
            .ok_or(ConfigError::OutOfRange {
                field: "zone_index".to_string(),
                value: zone_index as i64,
                min: 0,
                max: BAND_WIDTH as i64 - 1,
            })?;
        Ok(self.band_start() + zone_index)
    }

    /// Whether instances launched here get a public address
    pub fn auto_assign_public_address(&self) -> bool {
        matches!(self, Tier::Public)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Public => "public",
            Tier::Private => "private",
            Tier::Database => "database",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// NAT gateway and private route-table cardinality strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedundancyMode {
    /// One NAT gateway and one private route table shared by all zones
    Single,
    /// One NAT gateway and one private route table per zone
    PerZone,
}

impl fmt::Display for RedundancyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RedundancyMode::Single => write!(f, "single"),
            RedundancyMode::PerZone => write!(f, "per_zone"),
        }
    }
}

/// One tier subnet in one availability zone
///
/// Created once per `(tier, zone_index)` and never mutated; a CIDR or zone
/// change replaces it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subnet {
    pub key: ResourceKey,
    pub tier: Tier,
    pub zone_index: usize,
    /// Zone name; set once the subnet is placed in a region
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    pub cidr_block: Ipv4Cidr,
    pub auto_assign_public_address: bool,
}

impl Subnet {
    pub fn key_for(tier: Tier, zone_index: usize) -> ResourceKey {
        ResourceKey::new(ResourceKind::Subnet, format!("{}.{}", tier, zone_index))
    }
}

/// Derive every tier subnet for `zone_count` zones
///
/// # Errors
/// - `ZoneCountOutOfRange` unless 2 ≤ zone_count ≤ 6
/// - `ParentTooSmall` when the parent prefix is longer than /20
pub fn plan(parent_cidr: &Ipv4Cidr, zone_count: u8, tiers: &[Tier]) -> Result<Vec<Subnet>, ConfigError> {
    validate_zone_count(zone_count)?;
    validate_parent_block(parent_cidr)?;

    let mut subnets = Vec::with_capacity(tiers.len() * zone_count as usize);
    for tier in tiers {
        for zone_index in 0..zone_count as usize {
            let cidr_block = parent_cidr.subnet(SUBNET_NEW_BITS, tier.offset(zone_index)?)?;
            subnets.push(Subnet {
                key: Subnet::key_for(*tier, zone_index),
                tier: *tier,
                zone_index,
                zone: None,
                cidr_block,
                auto_assign_public_address: tier.auto_assign_public_address(),
            });
        }
    }

    debug!(
        parent = %parent_cidr,
        zone_count,
        subnet_count = subnets.len(),
        "Derived tier subnets"
    );
    Ok(subnets)
}

/// Pick the zones a topology spans
///
/// Zone names are deduplicated and sorted so the selection does not depend
/// on input order; the first `min(requested, available)` are used.
///
/// # Errors
/// - `ZoneCountOutOfRange` unless 2 ≤ requested ≤ 6
/// - `InsufficientZones` when the region offers fewer than two zones
pub fn select_zones(region: &str, requested: u8, available: &[String]) -> Result<Vec<String>, ConfigError> {
    validate_zone_count(requested)?;

    let mut zones: Vec<String> = available.iter().map(|z| z.trim().to_string()).collect();
    zones.retain(|z| !z.is_empty());
    zones.sort();
    zones.dedup();

    if zones.len() < MIN_ZONES as usize {
        return Err(ConfigError::InsufficientZones {
            region: region.to_string(),
            available: zones.len(),
        });
    }

    zones.truncate(requested as usize);
    Ok(zones)
}

/// Validated network layout parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkPlan {
    pub parent_cidr: Ipv4Cidr,
    pub requested_zone_count: u8,
    /// Effective zone count after clamping to the region
    pub zone_count: u8,
    pub redundancy_mode: RedundancyMode,
    /// Selected zone names; `zones[i]` is zone index `i`
    pub zones: Vec<String>,
}

impl NetworkPlan {
    /// Build a plan, clamping the zone count to what the region offers
    pub fn new(
        region: &str,
        parent_cidr: Ipv4Cidr,
        requested_zone_count: u8,
        redundancy_mode: RedundancyMode,
        available_zones: &[String],
    ) -> Result<Self, ConfigError> {
        validate_parent_block(&parent_cidr)?;
        let zones = select_zones(region, requested_zone_count, available_zones)?;
        let zone_count = zones.len() as u8;

        if zone_count < requested_zone_count {
            debug!(
                region,
                requested = requested_zone_count,
                effective = zone_count,
                "Zone count clamped to region capacity"
            );
        }

        Ok(Self {
            parent_cidr,
            requested_zone_count,
            zone_count,
            redundancy_mode,
            zones,
        })
    }

    /// Subnets of every tier in every selected zone, named after their zone
    pub fn subnets(&self) -> Result<Vec<Subnet>, ConfigError> {
        let mut subnets = plan(&self.parent_cidr, self.zone_count, &Tier::ALL)?;
        for subnet in &mut subnets {
            subnet.zone = self.zone_name(subnet.zone_index).map(str::to_string);
        }
        Ok(subnets)
    }

    /// Name of the zone with index `zone_index`
    pub fn zone_name(&self, zone_index: usize) -> Option<&str> {
        self.zones.get(zone_index).map(String::as_str)
    }
}

/// The VPC and its subnets as generated resources
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkLayout {
    pub vpc: ResourceKey,
    pub cidr_block: Ipv4Cidr,
    pub enable_dns_support: bool,
    pub enable_dns_hostnames: bool,
    pub subnets: Vec<Subnet>,
}

impl NetworkLayout {
    pub fn new(plan: &NetworkPlan) -> Result<Self, ConfigError> {
        Ok(Self {
            vpc: ResourceKey::singleton(ResourceKind::Vpc),
            cidr_block: plan.parent_cidr,
            enable_dns_support: true,
            enable_dns_hostnames: true,
            subnets: plan.subnets()?,
        })
    }

    /// Subnets of one tier ordered by zone index
    pub fn tier(&self, tier: Tier) -> Vec<&Subnet> {
        subnets_of_tier(&self.subnets, tier)
    }
}

impl Materialized for NetworkLayout {
    fn resources(&self) -> Vec<(ResourceKey, ResourceKind)> {
        let mut resources = vec![(self.vpc.clone(), ResourceKind::Vpc)];
        resources.extend(self.subnets.iter().map(|s| (s.key.clone(), ResourceKind::Subnet)));
        resources
    }

    fn dependencies(&self) -> Vec<Dependency> {
        self.subnets
            .iter()
            .map(|s| Dependency::reference(&s.key, &self.vpc))
            .collect()
    }
}

/// Subnets of one tier ordered by zone index
pub fn subnets_of_tier(subnets: &[Subnet], tier: Tier) -> Vec<&Subnet> {
    let mut selected: Vec<&Subnet> = subnets.iter().filter(|s| s.tier == tier).collect();
    selected.sort_by_key(|s| s.zone_index);
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn zones(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_band_offsets() {
        assert_eq!(Tier::Public.offset(0).unwrap(), 0);
        assert_eq!(Tier::Private.offset(2).unwrap(), 12);
        assert_eq!(Tier::Database.offset(5).unwrap(), 25);
        assert!(Tier::Public.offset(10).is_err());
    }

    #[test]
    fn test_plan_two_zones() {
        let parent: Ipv4Cidr = "10.0.0.0/16".parse().unwrap();
        let subnets = plan(&parent, 2, &Tier::ALL).unwrap();

        let cidrs: Vec<String> = subnets.iter().map(|s| s.cidr_block.to_string()).collect();
        assert_eq!(
            cidrs,
            vec![
                "10.0.0.0/24",
                "10.0.1.0/24",
                "10.0.10.0/24",
                "10.0.11.0/24",
                "10.0.20.0/24",
                "10.0.21.0/24",
            ]
        );
        assert!(subnets
            .iter()
            .all(|s| s.auto_assign_public_address == (s.tier == Tier::Public)));
    }

    #[test]
    fn test_plan_rejects_zone_count() {
        let parent: Ipv4Cidr = "10.0.0.0/16".parse().unwrap();
        assert_eq!(
            plan(&parent, 1, &Tier::ALL),
            Err(ConfigError::ZoneCountOutOfRange(1))
        );
        assert!(plan(&parent, 7, &Tier::ALL).is_err());
    }

    #[test]
    fn test_plan_rejects_small_parent() {
        let parent: Ipv4Cidr = "10.0.0.0/24".parse().unwrap();
        assert!(matches!(
            plan(&parent, 2, &Tier::ALL),
            Err(ConfigError::ParentTooSmall { .. })
        ));
    }

    #[test]
    fn test_select_zones_clamps() {
        let available = zones(&["eu-north-1c", "eu-north-1a", "eu-north-1b"]);
        let selected = select_zones("eu-north-1", 6, &available).unwrap();
        assert_eq!(selected, zones(&["eu-north-1a", "eu-north-1b", "eu-north-1c"]));
    }

    #[test]
    fn test_select_zones_insufficient() {
        let available = zones(&["solo-1a"]);
        assert_eq!(
            select_zones("solo-1", 2, &available),
            Err(ConfigError::InsufficientZones {
                region: "solo-1".to_string(),
                available: 1
            })
        );
    }

    #[test]
    fn test_network_plan_records_clamp() {
        let plan = NetworkPlan::new(
            "eu-north-1",
            "10.0.0.0/16".parse().unwrap(),
            4,
            RedundancyMode::PerZone,
            &zones(&["eu-north-1a", "eu-north-1b", "eu-north-1c"]),
        )
        .unwrap();
        assert_eq!(plan.requested_zone_count, 4);
        assert_eq!(plan.zone_count, 3);
        assert_eq!(plan.subnets().unwrap().len(), 9);
        assert_eq!(plan.zone_name(2), Some("eu-north-1c"));
    }

    #[test]
    fn test_network_plan_names_subnet_zones() {
        let network = NetworkPlan::new(
            "eu-north-1",
            "10.0.0.0/16".parse().unwrap(),
            2,
            RedundancyMode::Single,
            &zones(&["eu-north-1b", "eu-north-1a"]),
        )
        .unwrap();
        for subnet in network.subnets().unwrap() {
            assert_eq!(subnet.zone.as_deref(), network.zone_name(subnet.zone_index));
        }
        assert_eq!(network.subnets().unwrap()[0].zone.as_deref(), Some("eu-north-1a"));
        assert!(plan(&network.parent_cidr, 2, &Tier::ALL).unwrap().iter().all(|s| s.zone.is_none()));
    }

    #[test]
    fn test_layout_dependencies_point_at_vpc() {
        let plan = NetworkPlan::new(
            "eu-north-1",
            "10.0.0.0/16".parse().unwrap(),
            2,
            RedundancyMode::Single,
            &zones(&["eu-north-1a", "eu-north-1b"]),
        )
        .unwrap();
        let layout = NetworkLayout::new(&plan).unwrap();
        assert_eq!(layout.resources().len(), 7);
        assert!(layout
            .dependencies()
            .iter()
            .all(|d| d.prerequisite == layout.vpc));
    }
}
