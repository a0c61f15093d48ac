// Copyright (c) 2025 - Cowboy AI, Inc.
//! Generated Resource Taxonomy
//!
//! Defines every kind of resource the generator can emit, the provider type
//! the reconciliation engine maps it to, and the stable [`ResourceKey`] used
//! to address a single resource across runs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of generated resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    // Network
    /// Virtual private cloud
    Vpc,
    /// Tier subnet in one zone
    Subnet,
    /// Internet gateway
    InternetGateway,
    /// Elastic IP for a NAT gateway
    ElasticIp,
    /// NAT gateway
    NatGateway,
    /// Route table
    RouteTable,
    /// Single route inside a route table
    Route,
    /// Subnet to route table association
    RouteTableAssociation,
    /// Private service endpoint
    VpcEndpoint,

    // Security
    /// Security group (one per security node)
    SecurityGroup,
    /// Security group rule
    SecurityGroupRule,
    /// Web ACL in front of the load balancer
    WebAcl,
    /// Web ACL rule (allow-list entry, geo block)
    WebAclRule,
    /// Exclusion of one managed rule from the web ACL
    ManagedRuleExclusion,

    // Data
    /// Database subnet group
    DbSubnetGroup,
    /// Database parameter group
    DbParameterGroup,
    /// Managed database instance
    DbInstance,
    /// Secret holding generated credentials
    Secret,

    // Monitoring
    /// Alert notification topic
    AlertTopic,
    /// Alert topic subscription
    AlertSubscription,
    /// Log group
    LogGroup,
    /// Log metric filter
    LogMetricFilter,
    /// Threshold metric alarm
    MetricAlarm,
    /// Boolean composite of metric alarms
    CompositeAlarm,
}

impl ResourceKind {
    /// Prefix used in resource keys
    pub fn key_prefix(&self) -> &'static str {
        match self {
            Self::Vpc => "vpc",
            Self::Subnet => "subnet",
            Self::InternetGateway => "internet_gateway",
            Self::ElasticIp => "elastic_ip",
            Self::NatGateway => "nat_gateway",
            Self::RouteTable => "route_table",
            Self::Route => "route",
            Self::RouteTableAssociation => "route_table_association",
            Self::VpcEndpoint => "vpc_endpoint",
            Self::SecurityGroup => "security_group",
            Self::SecurityGroupRule => "security_group_rule",
            Self::WebAcl => "web_acl",
            Self::WebAclRule => "web_acl_rule",
            Self::ManagedRuleExclusion => "managed_rule_exclusion",
            Self::DbSubnetGroup => "db_subnet_group",
            Self::DbParameterGroup => "db_parameter_group",
            Self::DbInstance => "db_instance",
            Self::Secret => "secret",
            Self::AlertTopic => "alert_topic",
            Self::AlertSubscription => "alert_subscription",
            Self::LogGroup => "log_group",
            Self::LogMetricFilter => "log_metric_filter",
            Self::MetricAlarm => "alarm",
            Self::CompositeAlarm => "composite_alarm",
        }
    }

    /// Provider resource type the reconciliation engine maps this kind to
    pub fn provider_type(&self) -> &'static str {
        match self {
            Self::Vpc => "aws_vpc",
            Self::Subnet => "aws_subnet",
            Self::InternetGateway => "aws_internet_gateway",
            Self::ElasticIp => "aws_eip",
            Self::NatGateway => "aws_nat_gateway",
            Self::RouteTable => "aws_route_table",
            Self::Route => "aws_route",
            Self::RouteTableAssociation => "aws_route_table_association",
            Self::VpcEndpoint => "aws_vpc_endpoint",
            Self::SecurityGroup => "aws_security_group",
            Self::SecurityGroupRule => "aws_security_group_rule",
            Self::WebAcl => "aws_wafv2_web_acl",
            Self::WebAclRule => "aws_wafv2_web_acl_rule",
            Self::ManagedRuleExclusion => "aws_wafv2_rule_action_override",
            Self::DbSubnetGroup => "aws_db_subnet_group",
            Self::DbParameterGroup => "aws_db_parameter_group",
            Self::DbInstance => "aws_db_instance",
            Self::Secret => "aws_secretsmanager_secret",
            Self::AlertTopic => "aws_sns_topic",
            Self::AlertSubscription => "aws_sns_topic_subscription",
            Self::LogGroup => "aws_cloudwatch_log_group",
            Self::LogMetricFilter => "aws_cloudwatch_log_metric_filter",
            Self::MetricAlarm => "aws_cloudwatch_metric_alarm",
            Self::CompositeAlarm => "aws_cloudwatch_composite_alarm",
        }
    }

    /// Get the primary category for this resource kind
    pub fn category(&self) -> ResourceCategory {
        match self {
            Self::Vpc
            | Self::Subnet
            | Self::InternetGateway
            | Self::ElasticIp
            | Self::NatGateway
            | Self::RouteTable
            | Self::Route
            | Self::RouteTableAssociation
            | Self::VpcEndpoint => ResourceCategory::Network,

            Self::SecurityGroup
            | Self::SecurityGroupRule
            | Self::WebAcl
            | Self::WebAclRule
            | Self::ManagedRuleExclusion => ResourceCategory::Security,

            Self::DbSubnetGroup | Self::DbParameterGroup | Self::DbInstance | Self::Secret => {
                ResourceCategory::Data
            }

            Self::AlertTopic
            | Self::AlertSubscription
            | Self::LogGroup
            | Self::LogMetricFilter
            | Self::MetricAlarm
            | Self::CompositeAlarm => ResourceCategory::Monitoring,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.provider_type())
    }
}

/// Resource category (high-level grouping)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceCategory {
    /// Addressing, gateways, routing
    Network,
    /// Security groups and edge filtering
    Security,
    /// Managed database
    Data,
    /// Alerting and logging
    Monitoring,
}

impl fmt::Display for ResourceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => write!(f, "Network"),
            Self::Security => write!(f, "Security"),
            Self::Data => write!(f, "Data"),
            Self::Monitoring => write!(f, "Monitoring"),
        }
    }
}

/// Stable logical address of one generated resource
///
/// Keys are built only from configuration-derived parts (tier, zone index,
/// list element identity), never from time or randomness, so the same input
/// always yields the same key. Collaborators attach to these keys.
///
/// # Examples
///
/// ```rust
/// use cim_network_topology::domain::{ResourceKey, ResourceKind};
///
/// let key = ResourceKey::new(ResourceKind::Subnet, "private.1");
/// assert_eq!(key.as_str(), "subnet.private.1");
/// assert_eq!(ResourceKey::singleton(ResourceKind::Vpc).as_str(), "vpc");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceKey(String);

impl ResourceKey {
    /// Key for one of several resources of a kind
    pub fn new(kind: ResourceKind, name: impl fmt::Display) -> Self {
        Self(format!("{}.{}", kind.key_prefix(), name))
    }

    /// Key for the only resource of a kind
    pub fn singleton(kind: ResourceKind) -> Self {
        Self(kind.key_prefix().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reference to an attribute only known after reconciliation
///
/// Rendered as `${key.attribute}`; the engine substitutes the real value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttributeRef {
    pub resource: ResourceKey,
    pub attribute: String,
}

impl AttributeRef {
    pub fn new(resource: ResourceKey, attribute: impl Into<String>) -> Self {
        Self {
            resource,
            attribute: attribute.into(),
        }
    }
}

impl fmt::Display for AttributeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${{{}.{}}}", self.resource, self.attribute)
    }
}
