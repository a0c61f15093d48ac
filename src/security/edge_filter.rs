// Copyright (c) 2025 - Cowboy AI, Inc.
//! Edge filtering in front of the load balancer
//!
//! Three list inputs drive the web ACL:
//!
//! - `ip_whitelist`: one allow rule per CIDR
//! - `blocked_countries`: one geo-block rule per country code
//! - `excluded_managed_rules`: one exclusion per managed rule name
//!
//! The ACL itself exists when any list is non-empty or `enable_waf` is set,
//! and depends on every entry.

use serde::Serialize;

use crate::cardinality::{materialize_flag, materialize_list};
use crate::domain::{CountryCode, Ipv4Cidr, ResourceKey, ResourceKind};
use crate::errors::ConfigError;
use crate::graph::{Dependency, Materialized};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EdgeFilterSettings {
    pub ip_whitelist: Vec<Ipv4Cidr>,
    pub blocked_countries: Vec<CountryCode>,
    pub excluded_managed_rules: Vec<String>,
    pub enable_waf: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "match", rename_all = "snake_case")]
pub enum WebAclMatch {
    Allow(Ipv4Cidr),
    BlockCountry(CountryCode),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebAclRule {
    pub key: ResourceKey,
    pub rule: WebAclMatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManagedRuleExclusion {
    pub key: ResourceKey,
    pub rule_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebAcl {
    pub key: ResourceKey,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EdgeFilters {
    pub web_acl: Option<WebAcl>,
    pub rules: Vec<WebAclRule>,
    pub exclusions: Vec<ManagedRuleExclusion>,
}

/// Build the web ACL and its entries
///
/// # Errors
/// - `DuplicateElement` when any list repeats an element
/// - `InvalidValue` for an empty managed rule name
pub fn build_edge_filters(settings: &EdgeFilterSettings, name_prefix: &str) -> Result<EdgeFilters, ConfigError> {
    if settings.excluded_managed_rules.iter().any(|r| r.trim().is_empty()) {
        return Err(ConfigError::InvalidValue {
            field: "excluded_managed_rules".to_string(),
            reason: "rule name must not be empty".to_string(),
        });
    }

    let mut rules = materialize_list("ip_whitelist", &settings.ip_whitelist, |cidr| WebAclRule {
        key: ResourceKey::new(ResourceKind::WebAclRule, format!("allow.{}", cidr)),
        rule: WebAclMatch::Allow(*cidr),
    })?;
    rules.extend(materialize_list("blocked_countries", &settings.blocked_countries, |code| {
        WebAclRule {
            key: ResourceKey::new(ResourceKind::WebAclRule, format!("geo.{}", code)),
            rule: WebAclMatch::BlockCountry(code.clone()),
        }
    })?);
    let exclusions = materialize_list("excluded_managed_rules", &settings.excluded_managed_rules, |name| {
        ManagedRuleExclusion {
            key: ResourceKey::new(ResourceKind::ManagedRuleExclusion, name),
            rule_name: name.clone(),
        }
    })?;

    let enabled = settings.enable_waf || !rules.is_empty() || !exclusions.is_empty();
    let web_acl = materialize_flag(enabled, || WebAcl {
        key: ResourceKey::singleton(ResourceKind::WebAcl),
        name: format!("{}-web-acl", name_prefix),
    });

    Ok(EdgeFilters {
        web_acl,
        rules,
        exclusions,
    })
}

impl Materialized for EdgeFilters {
    fn resources(&self) -> Vec<(ResourceKey, ResourceKind)> {
        let mut resources: Vec<(ResourceKey, ResourceKind)> = self
            .rules
            .iter()
            .map(|r| (r.key.clone(), ResourceKind::WebAclRule))
            .chain(
                self.exclusions
                    .iter()
                    .map(|e| (e.key.clone(), ResourceKind::ManagedRuleExclusion)),
            )
            .collect();
        if let Some(acl) = &self.web_acl {
            resources.push((acl.key.clone(), ResourceKind::WebAcl));
        }
        resources
    }

    fn dependencies(&self) -> Vec<Dependency> {
        let Some(acl) = &self.web_acl else {
            return Vec::new();
        };
        self.rules
            .iter()
            .map(|r| &r.key)
            .chain(self.exclusions.iter().map(|e| &e.key))
            .map(|entry| Dependency::reference(&acl.key, entry))
            .collect()
    }
}
