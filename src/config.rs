// Copyright (c) 2025 - Cowboy AI, Inc.
//! Topology Configuration
//!
//! Raw configuration is read from a JSON file, optionally overridden by
//! `TOPOLOGY_*` environment variables, then validated into a
//! [`ValidatedConfig`] of typed values. Nothing downstream ever sees an
//! unvalidated string.
//!
//! # Environment Overrides
//!
//! | Variable | Field |
//! |---|---|
//! | `TOPOLOGY_PROJECT` | `project` |
//! | `TOPOLOGY_ENVIRONMENT` | `environment` |
//! | `TOPOLOGY_REGION` | `region` |
//! | `TOPOLOGY_PARENT_CIDR` | `parent_cidr` |
//! | `TOPOLOGY_ZONE_COUNT` | `zone_count` |
//! | `TOPOLOGY_REDUNDANCY_MODE` | `redundancy_mode` |
//! | `TOPOLOGY_ENABLE_BASTION` | `enable_bastion` |
//! | `TOPOLOGY_BASTION_ALLOWED_CIDR` | `bastion_allowed_cidr` |
//! | `TOPOLOGY_ALERT_RECIPIENTS` | `alert_recipients` (comma-separated) |
//!
//! # Examples
//!
//! ```rust
//! use cim_network_topology::config::TopologyConfig;
//!
//! let config = TopologyConfig::from_json_str(r#"{
//!     "project": "shop",
//!     "environment": "prod",
//!     "zone_count": 3
//! }"#).unwrap();
//! let validated = config.validate().unwrap();
//! assert_eq!(validated.name_prefix, "shop-prod");
//! assert_eq!(validated.network.zone_count, 3);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::cardinality::Identity;
use crate::database::DataTierSettings;
use crate::domain::invariants::{
    validate_db_identifier, validate_distinct, validate_instance_class, validate_name_component, validate_range,
};
use crate::domain::{CountryCode, EmailAddress, Ipv4Cidr, Port};
use crate::errors::{ConfigError, TopologyResult};
use crate::monitoring::alarm::DEFAULT_EVALUATION_PERIODS;
use crate::monitoring::MonitoringSettings;
use crate::security::{BastionSettings, CustomIngressRule, EdgeFilterSettings, SecurityGraphSettings};
use crate::topology::{NetworkPlan, RedundancyMode};

/// Prefix of every environment override
pub const ENV_PREFIX: &str = "TOPOLOGY_";

/// Built-in zone lists for regions the generator knows
const REGION_ZONES: &[(&str, &[&str])] = &[
    ("eu-north-1", &["eu-north-1a", "eu-north-1b", "eu-north-1c"]),
    ("eu-west-1", &["eu-west-1a", "eu-west-1b", "eu-west-1c"]),
    ("eu-central-1", &["eu-central-1a", "eu-central-1b", "eu-central-1c"]),
    (
        "us-east-1",
        &["us-east-1a", "us-east-1b", "us-east-1c", "us-east-1d", "us-east-1e", "us-east-1f"],
    ),
    ("us-west-2", &["us-west-2a", "us-west-2b", "us-west-2c", "us-west-2d"]),
    ("ap-southeast-1", &["ap-southeast-1a", "ap-southeast-1b", "ap-southeast-1c"]),
];

/// Zones of a known region
pub fn region_zones(region: &str) -> Option<Vec<String>> {
    REGION_ZONES
        .iter()
        .find(|(name, _)| *name == region)
        .map(|(_, zones)| zones.iter().map(|z| z.to_string()).collect())
}

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Dev,
    Staging,
    Prod,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Staging => "staging",
            Environment::Prod => "prod",
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Prod)
    }

    /// Redundancy used when the configuration does not choose one
    pub fn default_redundancy_mode(&self) -> RedundancyMode {
        if self.is_production() {
            RedundancyMode::PerZone
        } else {
            RedundancyMode::Single
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "staging" => Ok(Environment::Staging),
            "prod" => Ok(Environment::Prod),
            other => Err(ConfigError::InvalidValue {
                field: "environment".to_string(),
                reason: format!("{} is not one of dev, staging, prod", other),
            }),
        }
    }
}

/// Monitoring gates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub enable_alb_alarms: bool,
    pub enable_database_alarms: bool,
    pub enable_log_alarms: bool,
    pub alarm_evaluation_periods: u32,
    pub log_retention_days: u32,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enable_alb_alarms: true,
            enable_database_alarms: true,
            enable_log_alarms: true,
            alarm_evaluation_periods: DEFAULT_EVALUATION_PERIODS,
            log_retention_days: 30,
        }
    }
}

/// Data tier sizing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Defaults to `true` in prod
    pub multi_az: Option<bool>,
    pub instance_class: String,
    /// GiB
    pub allocated_storage: u32,
    /// Defaults to 7 in prod, 1 elsewhere
    pub backup_retention_days: Option<u32>,
    pub db_name: String,
    pub db_username: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            multi_az: None,
            instance_class: "db.t3.micro".to_string(),
            allocated_storage: 20,
            backup_retention_days: None,
            db_name: "appdb".to_string(),
            db_username: "dbadmin".to_string(),
        }
    }
}

/// Raw topology configuration as read from file and environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyConfig {
    pub project: String,
    pub environment: Environment,
    pub region: String,
    /// Overrides the built-in zone list of `region`
    pub available_zones: Option<Vec<String>>,
    pub parent_cidr: String,
    pub zone_count: u8,
    /// Defaults by environment: prod → per_zone, otherwise single
    pub redundancy_mode: Option<RedundancyMode>,
    pub application_port: u16,
    pub database_port: u16,
    pub enable_bastion: bool,
    pub bastion_allowed_cidr: Option<String>,
    pub bastion_database_access: bool,
    pub enable_vpc_endpoints: bool,
    pub custom_ingress_rules: Vec<CustomIngressRule>,
    pub alert_recipients: Vec<String>,
    pub ip_whitelist: Vec<String>,
    pub blocked_countries: Vec<String>,
    pub excluded_managed_rules: Vec<String>,
    pub enable_waf: bool,
    pub monitoring: MonitoringConfig,
    pub database: DatabaseConfig,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            project: "app".to_string(),
            environment: Environment::Dev,
            region: "eu-north-1".to_string(),
            available_zones: None,
            parent_cidr: "10.0.0.0/16".to_string(),
            zone_count: 2,
            redundancy_mode: None,
            application_port: 5001,
            database_port: 5432,
            enable_bastion: false,
            bastion_allowed_cidr: None,
            bastion_database_access: false,
            enable_vpc_endpoints: false,
            custom_ingress_rules: Vec::new(),
            alert_recipients: Vec::new(),
            ip_whitelist: Vec::new(),
            blocked_countries: Vec::new(),
            excluded_managed_rules: Vec::new(),
            enable_waf: false,
            monitoring: MonitoringConfig::default(),
            database: DatabaseConfig::default(),
        }
    }
}

fn parse_override<T: FromStr>(field: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        field: field.to_string(),
        reason: format!("cannot parse {:?}", value),
    })
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|element| !element.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_redundancy_mode(value: &str) -> Result<RedundancyMode, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "single" => Ok(RedundancyMode::Single),
        "per_zone" | "per-zone" => Ok(RedundancyMode::PerZone),
        other => Err(ConfigError::InvalidValue {
            field: "redundancy_mode".to_string(),
            reason: format!("{} is not one of single, per_zone", other),
        }),
    }
}

impl TopologyConfig {
    /// Load a configuration file
    pub fn from_file(path: impl AsRef<Path>) -> TopologyResult<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading topology configuration");
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn from_json_str(json: &str) -> TopologyResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Apply `TOPOLOGY_*` overrides from the process environment
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from any variable source
    ///
    /// Every option has a variable named after it, upper-cased
    /// (`TOPOLOGY_ZONE_COUNT`). Nested options drop their section name
    /// (`TOPOLOGY_INSTANCE_CLASS`). Lists are comma separated, except
    /// `TOPOLOGY_CUSTOM_INGRESS_RULES` which holds a JSON array.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        let var = |suffix: &str| lookup(&format!("{}{}", ENV_PREFIX, suffix));

        if let Some(project) = var("PROJECT") {
            self.project = project;
        }
        if let Some(environment) = var("ENVIRONMENT") {
            self.environment = environment.parse()?;
        }
        if let Some(region) = var("REGION") {
            self.region = region;
        }
        if let Some(zones) = var("AVAILABLE_ZONES") {
            self.available_zones = Some(split_list(&zones));
        }
        if let Some(parent_cidr) = var("PARENT_CIDR") {
            self.parent_cidr = parent_cidr;
        }
        if let Some(zone_count) = var("ZONE_COUNT") {
            self.zone_count = parse_override("zone_count", &zone_count)?;
        }
        if let Some(mode) = var("REDUNDANCY_MODE") {
            self.redundancy_mode = Some(parse_redundancy_mode(&mode)?);
        }
        if let Some(port) = var("APPLICATION_PORT") {
            self.application_port = parse_override("application_port", &port)?;
        }
        if let Some(port) = var("DATABASE_PORT") {
            self.database_port = parse_override("database_port", &port)?;
        }

        // Bastion and endpoints
        if let Some(enable) = var("ENABLE_BASTION") {
            self.enable_bastion = parse_override("enable_bastion", &enable)?;
        }
        if let Some(cidr) = var("BASTION_ALLOWED_CIDR") {
            self.bastion_allowed_cidr = Some(cidr);
        }
        if let Some(access) = var("BASTION_DATABASE_ACCESS") {
            self.bastion_database_access = parse_override("bastion_database_access", &access)?;
        }
        if let Some(enable) = var("ENABLE_VPC_ENDPOINTS") {
            self.enable_vpc_endpoints = parse_override("enable_vpc_endpoints", &enable)?;
        }
        if let Some(rules) = var("CUSTOM_INGRESS_RULES") {
            self.custom_ingress_rules = serde_json::from_str(&rules).map_err(|e| ConfigError::InvalidValue {
                field: "custom_ingress_rules".to_string(),
                reason: e.to_string(),
            })?;
        }

        // Lists
        if let Some(recipients) = var("ALERT_RECIPIENTS") {
            self.alert_recipients = split_list(&recipients);
        }
        if let Some(whitelist) = var("IP_WHITELIST") {
            self.ip_whitelist = split_list(&whitelist);
        }
        if let Some(countries) = var("BLOCKED_COUNTRIES") {
            self.blocked_countries = split_list(&countries);
        }
        if let Some(rules) = var("EXCLUDED_MANAGED_RULES") {
            self.excluded_managed_rules = split_list(&rules);
        }
        if let Some(enable) = var("ENABLE_WAF") {
            self.enable_waf = parse_override("enable_waf", &enable)?;
        }

        // Monitoring
        let monitoring = &mut self.monitoring;
        if let Some(enable) = var("ENABLE_ALB_ALARMS") {
            monitoring.enable_alb_alarms = parse_override("enable_alb_alarms", &enable)?;
        }
        if let Some(enable) = var("ENABLE_DATABASE_ALARMS") {
            monitoring.enable_database_alarms = parse_override("enable_database_alarms", &enable)?;
        }
        if let Some(enable) = var("ENABLE_LOG_ALARMS") {
            monitoring.enable_log_alarms = parse_override("enable_log_alarms", &enable)?;
        }
        if let Some(periods) = var("ALARM_EVALUATION_PERIODS") {
            monitoring.alarm_evaluation_periods = parse_override("alarm_evaluation_periods", &periods)?;
        }
        if let Some(days) = var("LOG_RETENTION_DAYS") {
            monitoring.log_retention_days = parse_override("log_retention_days", &days)?;
        }

        // Data tier
        let database = &mut self.database;
        if let Some(multi_az) = var("MULTI_AZ") {
            database.multi_az = Some(parse_override("multi_az", &multi_az)?);
        }
        if let Some(class) = var("INSTANCE_CLASS") {
            database.instance_class = class;
        }
        if let Some(storage) = var("ALLOCATED_STORAGE") {
            database.allocated_storage = parse_override("allocated_storage", &storage)?;
        }
        if let Some(days) = var("BACKUP_RETENTION_DAYS") {
            database.backup_retention_days = Some(parse_override("backup_retention_days", &days)?);
        }
        if let Some(name) = var("DB_NAME") {
            database.db_name = name;
        }
        if let Some(username) = var("DB_USERNAME") {
            database.db_username = username;
        }
        Ok(())
    }

    /// Validate every field into typed settings
    ///
    /// List inputs are sorted by element identity so that their order has
    /// no effect on the plan.
    pub fn validate(&self) -> Result<ValidatedConfig, ConfigError> {
        validate_name_component("project", &self.project)?;
        let environment = self.environment;
        let name_prefix = format!("{}-{}", self.project, environment);

        let zones = match &self.available_zones {
            Some(zones) => zones.clone(),
            None => region_zones(&self.region).ok_or_else(|| ConfigError::UnknownRegion(self.region.clone()))?,
        };
        let parent_cidr: Ipv4Cidr = self.parent_cidr.parse()?;
        let redundancy_mode = self
            .redundancy_mode
            .unwrap_or_else(|| environment.default_redundancy_mode());
        let network = NetworkPlan::new(&self.region, parent_cidr, self.zone_count, redundancy_mode, &zones)?;

        let application_port = Port::new("application_port", self.application_port)?;
        let database_port = Port::new("database_port", self.database_port)?;

        let bastion = if self.enable_bastion {
            let cidr = self
                .bastion_allowed_cidr
                .as_deref()
                .ok_or_else(|| ConfigError::MissingValue("bastion_allowed_cidr".to_string()))?;
            Some(BastionSettings {
                allowed_cidr: cidr.parse()?,
                database_access: self.bastion_database_access,
            })
        } else {
            if self.bastion_database_access {
                warn!("bastion_database_access is set but the bastion is disabled; ignoring");
            }
            None
        };

        let mut custom_ingress_rules = self.custom_ingress_rules.clone();
        for rule in &custom_ingress_rules {
            Port::new("custom_ingress_rules.port", rule.port.value())?;
        }
        custom_ingress_rules.sort_by_key(|rule| rule.identity());
        let rule_ids: Vec<String> = custom_ingress_rules.iter().map(|rule| rule.identity()).collect();
        validate_distinct("custom_ingress_rules", rule_ids.iter().map(String::as_str))?;

        let mut alert_recipients = self
            .alert_recipients
            .iter()
            .map(EmailAddress::new)
            .collect::<Result<Vec<_>, _>>()?;
        alert_recipients.sort();
        validate_distinct("alert_recipients", alert_recipients.iter().map(EmailAddress::as_str))?;

        let mut ip_whitelist = self
            .ip_whitelist
            .iter()
            .map(|cidr| cidr.parse::<Ipv4Cidr>())
            .collect::<Result<Vec<_>, _>>()?;
        ip_whitelist.sort();
        let whitelist_ids: Vec<String> = ip_whitelist.iter().map(|cidr| cidr.identity()).collect();
        validate_distinct("ip_whitelist", whitelist_ids.iter().map(String::as_str))?;

        let mut blocked_countries = self
            .blocked_countries
            .iter()
            .map(CountryCode::new)
            .collect::<Result<Vec<_>, _>>()?;
        blocked_countries.sort();
        validate_distinct("blocked_countries", blocked_countries.iter().map(CountryCode::as_str))?;

        let mut excluded_managed_rules: Vec<String> =
            self.excluded_managed_rules.iter().map(|r| r.trim().to_string()).collect();
        excluded_managed_rules.sort();
        validate_distinct("excluded_managed_rules", excluded_managed_rules.iter().map(String::as_str))?;

        let monitoring = &self.monitoring;
        validate_range(
            "monitoring.alarm_evaluation_periods",
            i64::from(monitoring.alarm_evaluation_periods),
            1,
            10,
        )?;
        validate_range(
            "monitoring.log_retention_days",
            i64::from(monitoring.log_retention_days),
            1,
            3653,
        )?;

        let database = &self.database;
        validate_instance_class(&database.instance_class)?;
        validate_range(
            "database.allocated_storage",
            i64::from(database.allocated_storage),
            20,
            65536,
        )?;
        let backup_retention_days = database
            .backup_retention_days
            .unwrap_or(if environment.is_production() { 7 } else { 1 });
        validate_range("database.backup_retention_days", i64::from(backup_retention_days), 0, 35)?;
        validate_db_identifier("database.db_name", &database.db_name)?;
        validate_db_identifier("database.db_username", &database.db_username)?;

        debug!(
            name_prefix = %name_prefix,
            zones = ?network.zones,
            mode = %network.redundancy_mode,
            "Configuration validated"
        );

        Ok(ValidatedConfig {
            project: self.project.clone(),
            environment,
            region: self.region.clone(),
            security: SecurityGraphSettings {
                application_port,
                database_port,
                bastion,
                enable_vpc_endpoints: self.enable_vpc_endpoints,
                custom_ingress_rules,
            },
            edge_filters: EdgeFilterSettings {
                ip_whitelist,
                blocked_countries,
                excluded_managed_rules,
                enable_waf: self.enable_waf,
            },
            database: DataTierSettings {
                name_prefix: name_prefix.clone(),
                instance_class: database.instance_class.clone(),
                allocated_storage: database.allocated_storage,
                multi_az: database.multi_az.unwrap_or(environment.is_production()),
                backup_retention_days,
                db_name: database.db_name.clone(),
                username: database.db_username.clone(),
                port: database_port,
                deletion_protection: environment.is_production(),
            },
            monitoring: MonitoringSettings {
                name_prefix: name_prefix.clone(),
                alert_recipients,
                enable_alb_alarms: monitoring.enable_alb_alarms,
                enable_database_alarms: monitoring.enable_database_alarms,
                enable_log_alarms: monitoring.enable_log_alarms,
                evaluation_periods: monitoring.alarm_evaluation_periods,
                log_retention_days: monitoring.log_retention_days,
            },
            name_prefix,
            network,
        })
    }
}

/// Fully validated configuration, the only input of plan generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatedConfig {
    pub project: String,
    pub environment: Environment,
    pub region: String,
    /// `{project}-{environment}`, prefix of every generated name
    pub name_prefix: String,
    pub network: NetworkPlan,
    pub security: SecurityGraphSettings,
    pub edge_filters: EdgeFilterSettings,
    pub database: DataTierSettings,
    pub monitoring: MonitoringSettings,
}

impl ValidatedConfig {
    /// Canonical JSON; identical configurations give identical bytes
    pub fn canonical_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
