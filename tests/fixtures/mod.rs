// Copyright (c) 2025 - Cowboy AI, Inc.
//! Test Fixtures for cim-network-topology
//!
//! Shared configurations for the integration tests. Every fixture pins its
//! zones explicitly so results never depend on the built-in region table.

#![allow(dead_code)]

use cim_network_topology::{
    generate, Environment, InfrastructurePlan, RedundancyMode, TopologyConfig, ValidatedConfig,
};

pub const PARENT_CIDR: &str = "10.0.0.0/16";

pub const ZONES: [&str; 4] = ["test-1a", "test-1b", "test-1c", "test-1d"];

/// Administration network allowed onto the bastion
pub const OFFICE_CIDR: &str = "203.0.113.0/24";

pub fn base_config() -> TopologyConfig {
    TopologyConfig {
        project: "shop".to_string(),
        environment: Environment::Dev,
        region: "test-1".to_string(),
        available_zones: Some(ZONES.iter().map(|z| z.to_string()).collect()),
        parent_cidr: PARENT_CIDR.to_string(),
        ..Default::default()
    }
}

pub fn config_with(zone_count: u8, mode: RedundancyMode) -> TopologyConfig {
    TopologyConfig {
        zone_count,
        redundancy_mode: Some(mode),
        ..base_config()
    }
}

pub fn with_recipients(recipients: &[&str]) -> TopologyConfig {
    TopologyConfig {
        alert_recipients: recipients.iter().map(|r| r.to_string()).collect(),
        ..base_config()
    }
}

pub fn with_bastion(database_access: bool) -> TopologyConfig {
    TopologyConfig {
        enable_bastion: true,
        bastion_allowed_cidr: Some(OFFICE_CIDR.to_string()),
        bastion_database_access: database_access,
        ..base_config()
    }
}

pub fn validated(config: TopologyConfig) -> ValidatedConfig {
    config.validate().expect("fixture configuration must validate")
}

pub fn plan_for(config: TopologyConfig) -> InfrastructurePlan {
    generate(&validated(config)).expect("fixture configuration must generate")
}
