// Copyright (c) 2025 - Cowboy AI, Inc.
//! Data-Tier Provisioner
//!
//! Places the managed database on the database subnets behind the `Database`
//! security node.
//!
//! # Invariants
//!
//! - The instance is never publicly accessible.
//! - Storage is always encrypted.
//! - The master password lives only in a generated secret; the plan carries
//!   a locator for it, never its value.

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

use crate::domain::{AttributeRef, Port, ResourceKey, ResourceKind};
use crate::errors::{ConfigError, StructuralViolation, TopologyResult};
use crate::graph::{Dependency, Materialized};
use crate::security::{NodeKind, SecurityGraph};
use crate::topology::{subnets_of_tier, Subnet, Tier};

pub const ENGINE: &str = "postgres";
pub const ENGINE_VERSION: &str = "16";
pub const PARAMETER_GROUP_FAMILY: &str = "postgres16";

/// Storage autoscaling ceiling as a multiple of allocated storage
pub const STORAGE_AUTOSCALING_FACTOR: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataTierSettings {
    /// Name prefix for the instance and its groups
    pub name_prefix: String,
    pub instance_class: String,
    /// Allocated storage in GiB
    pub allocated_storage: u32,
    pub multi_az: bool,
    pub backup_retention_days: u32,
    pub db_name: String,
    pub username: String,
    pub port: Port,
    pub deletion_protection: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DbSubnetGroup {
    pub key: ResourceKey,
    pub name: String,
    pub subnets: Vec<ResourceKey>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DbParameterGroup {
    pub key: ResourceKey,
    pub name: String,
    pub family: String,
    pub parameters: BTreeMap<String, String>,
}

/// Secret holding the generated master credentials
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialSecret {
    pub key: ResourceKey,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DbInstance {
    pub key: ResourceKey,
    pub identifier: String,
    pub engine: String,
    pub engine_version: String,
    pub instance_class: String,
    pub allocated_storage: u32,
    pub max_allocated_storage: u32,
    pub multi_az: bool,
    pub backup_retention_days: u32,
    pub storage_encrypted: bool,
    pub publicly_accessible: bool,
    pub deletion_protection: bool,
    pub port: Port,
    pub db_name: String,
    pub username: String,
    pub subnet_group: ResourceKey,
    pub parameter_group: ResourceKey,
    pub security_group: ResourceKey,
    pub credential_secret: ResourceKey,
}

/// Where a consumer fetches the database password from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialLocator {
    pub secret: ResourceKey,
    pub arn: AttributeRef,
}

/// What an application needs to connect
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionDetails {
    /// Resolved by the reconciliation engine once the instance exists
    pub host: AttributeRef,
    pub port: Port,
    pub db_name: String,
    pub username: String,
    pub credential_locator: CredentialLocator,
}

impl ConnectionDetails {
    /// Environment the application reads its connection settings from
    pub fn to_environment(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("DB_HOST".to_string(), self.host.to_string()),
            ("DB_PORT".to_string(), self.port.to_string()),
            ("DB_NAME".to_string(), self.db_name.clone()),
            ("DB_USER".to_string(), self.username.clone()),
            ("DB_SECRET_ARN".to_string(), self.credential_locator.arn.to_string()),
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataTier {
    pub subnet_group: DbSubnetGroup,
    pub parameter_group: DbParameterGroup,
    pub secret: CredentialSecret,
    pub instance: DbInstance,
    /// Database subnet keys, for the subnet group dependency edges
    subnets: Vec<ResourceKey>,
}

impl DataTier {
    pub fn connection_details(&self) -> ConnectionDetails {
        ConnectionDetails {
            host: AttributeRef::new(self.instance.key.clone(), "address"),
            port: self.instance.port,
            db_name: self.instance.db_name.clone(),
            username: self.instance.username.clone(),
            credential_locator: CredentialLocator {
                secret: self.secret.key.clone(),
                arn: AttributeRef::new(self.secret.key.clone(), "arn"),
            },
        }
    }
}

/// Provision the database on the database tier
///
/// # Errors
/// - `ConfigError::MissingValue` when there are no database subnets
/// - `StructuralViolation::NodeNotEnabled` when the graph has no database node
pub fn provision_database(
    subnets: &[Subnet],
    graph: &SecurityGraph,
    settings: &DataTierSettings,
) -> TopologyResult<DataTier> {
    let database_subnets: Vec<ResourceKey> = subnets_of_tier(subnets, Tier::Database)
        .into_iter()
        .map(|s| s.key.clone())
        .collect();
    if database_subnets.is_empty() {
        return Err(ConfigError::MissingValue("database subnets".to_string()).into());
    }
    if !graph.contains(NodeKind::Database) {
        return Err(StructuralViolation::NodeNotEnabled(NodeKind::Database.to_string()).into());
    }

    let subnet_group = DbSubnetGroup {
        key: ResourceKey::singleton(ResourceKind::DbSubnetGroup),
        name: format!("{}-db-subnets", settings.name_prefix),
        subnets: database_subnets.clone(),
    };

    let parameters = BTreeMap::from([
        ("rds.force_ssl".to_string(), "1".to_string()),
        ("log_min_duration_statement".to_string(), "1000".to_string()),
    ]);
    let parameter_group = DbParameterGroup {
        key: ResourceKey::singleton(ResourceKind::DbParameterGroup),
        name: format!("{}-{}", settings.name_prefix, PARAMETER_GROUP_FAMILY),
        family: PARAMETER_GROUP_FAMILY.to_string(),
        parameters,
    };

    let secret = CredentialSecret {
        key: ResourceKey::new(ResourceKind::Secret, "db_master"),
        name: format!("{}/database/master", settings.name_prefix),
    };

    let instance = DbInstance {
        key: ResourceKey::new(ResourceKind::DbInstance, "primary"),
        identifier: format!("{}-db", settings.name_prefix),
        engine: ENGINE.to_string(),
        engine_version: ENGINE_VERSION.to_string(),
        instance_class: settings.instance_class.clone(),
        allocated_storage: settings.allocated_storage,
        max_allocated_storage: settings.allocated_storage.saturating_mul(STORAGE_AUTOSCALING_FACTOR),
        multi_az: settings.multi_az,
        backup_retention_days: settings.backup_retention_days,
        storage_encrypted: true,
        publicly_accessible: false,
        deletion_protection: settings.deletion_protection,
        port: settings.port,
        db_name: settings.db_name.clone(),
        username: settings.username.clone(),
        subnet_group: subnet_group.key.clone(),
        parameter_group: parameter_group.key.clone(),
        security_group: NodeKind::Database.group_key(),
        credential_secret: secret.key.clone(),
    };

    info!(
        identifier = %instance.identifier,
        instance_class = %instance.instance_class,
        multi_az = instance.multi_az,
        subnets = database_subnets.len(),
        "Provisioned data tier"
    );

    Ok(DataTier {
        subnet_group,
        parameter_group,
        secret,
        instance,
        subnets: database_subnets,
    })
}

impl Materialized for DataTier {
    fn resources(&self) -> Vec<(ResourceKey, ResourceKind)> {
        vec![
            (self.subnet_group.key.clone(), ResourceKind::DbSubnetGroup),
            (self.parameter_group.key.clone(), ResourceKind::DbParameterGroup),
            (self.secret.key.clone(), ResourceKind::Secret),
            (self.instance.key.clone(), ResourceKind::DbInstance),
        ]
    }

    fn dependencies(&self) -> Vec<Dependency> {
        let mut deps: Vec<Dependency> = self
            .subnets
            .iter()
            .map(|subnet| Dependency::reference(&self.subnet_group.key, subnet))
            .collect();
        let instance = &self.instance.key;
        deps.push(Dependency::reference(instance, &self.instance.subnet_group));
        deps.push(Dependency::reference(instance, &self.instance.parameter_group));
        deps.push(Dependency::reference(instance, &self.instance.security_group));
        deps.push(Dependency::reference(instance, &self.instance.credential_secret));
        deps
    }
}
