// Copyright (c) 2025 - Cowboy AI, Inc.
//! Monitoring overlay
//!
//! Alert topic and subscriptions, leaf alarms per component, and the
//! `system-health` composite, each gated by configuration.

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

use super::alarm::{
    AlarmRegistry, ComparisonOperator, CompositeAlarm, EvaluationContract, LeafRef, MetricAlarm, Statistic,
};
use crate::cardinality::{materialize_flag, materialize_list};
use crate::database::DataTier;
use crate::domain::{AttributeRef, EmailAddress, ResourceKey, ResourceKind};
use crate::errors::ConfigError;
use crate::graph::{Dependency, Materialized};
use crate::routing::GatewayTopology;

/// Namespace application error metrics are published under
pub const APPLICATION_METRIC_NAMESPACE: &str = "Application";

/// Structured log lines at this level count as application errors
pub const ERROR_LOG_PATTERN: &str = "{ $.level = \"ERROR\" }";

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonitoringSettings {
    pub name_prefix: String,
    pub alert_recipients: Vec<EmailAddress>,
    pub enable_alb_alarms: bool,
    pub enable_database_alarms: bool,
    pub enable_log_alarms: bool,
    pub evaluation_periods: u32,
    pub log_retention_days: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertTopic {
    pub key: ResourceKey,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertSubscription {
    pub key: ResourceKey,
    pub topic: ResourceKey,
    pub protocol: String,
    pub endpoint: EmailAddress,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogGroup {
    pub key: ResourceKey,
    pub name: String,
    pub retention_days: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogMetricFilter {
    pub key: ResourceKey,
    pub log_group: ResourceKey,
    pub pattern: String,
    pub metric_namespace: String,
    pub metric_name: String,
}

/// Everything the monitoring overlay generates
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitoringOverlay {
    pub topic: AlertTopic,
    pub subscriptions: Vec<AlertSubscription>,
    pub log_group: Option<LogGroup>,
    pub metric_filter: Option<LogMetricFilter>,
    pub alarms: Vec<MetricAlarm>,
    pub composite: Option<CompositeAlarm>,
}

impl MonitoringOverlay {
    pub fn alarm(&self, key: &str) -> Option<&MetricAlarm> {
        self.alarms.iter().find(|a| a.key.as_str() == key)
    }
}

/// Builds leaf alarms that share one action list and naming prefix
struct AlarmFactory<'a> {
    prefix: &'a str,
    topic: &'a ResourceKey,
    evaluation_periods: u32,
}

impl AlarmFactory<'_> {
    #[allow(clippy::too_many_arguments)]
    fn alarm(
        &self,
        id: &str,
        description: &str,
        namespace: &str,
        metric_name: &str,
        dimensions: &[(&str, String)],
        statistic: Statistic,
        comparison: ComparisonOperator,
        threshold: f64,
        contract: EvaluationContract,
    ) -> MetricAlarm {
        MetricAlarm {
            key: ResourceKey::new(ResourceKind::MetricAlarm, id),
            name: format!("{}-{}", self.prefix, id.replace(['_', '.'], "-")),
            description: description.to_string(),
            namespace: namespace.to_string(),
            metric_name: metric_name.to_string(),
            dimensions: dimensions
                .iter()
                .map(|(name, value)| (name.to_string(), value.clone()))
                .collect(),
            watches: None,
            statistic,
            comparison,
            threshold,
            contract,
            alarm_actions: vec![self.topic.clone()],
        }
    }

    fn standard(&self) -> EvaluationContract {
        EvaluationContract::standard(self.evaluation_periods)
    }

    fn database(&self) -> EvaluationContract {
        EvaluationContract::database(self.evaluation_periods)
    }
}

/// Compose the monitoring overlay over the generated components
///
/// # Errors
/// - `DuplicateElement` when an alert recipient repeats
pub fn compose_monitoring(
    settings: &MonitoringSettings,
    gateways: &GatewayTopology,
    database: &DataTier,
) -> Result<MonitoringOverlay, ConfigError> {
    let prefix = settings.name_prefix.as_str();
    let topic = AlertTopic {
        key: ResourceKey::singleton(ResourceKind::AlertTopic),
        name: format!("{}-alerts", prefix),
    };

    let subscriptions = materialize_list("alert_recipients", &settings.alert_recipients, |email| {
        AlertSubscription {
            key: ResourceKey::new(ResourceKind::AlertSubscription, email),
            topic: topic.key.clone(),
            protocol: "email".to_string(),
            endpoint: email.clone(),
        }
    })?;

    let factory = AlarmFactory {
        prefix,
        topic: &topic.key,
        evaluation_periods: settings.evaluation_periods,
    };
    let mut registry = AlarmRegistry::new();

    // Load balancer
    let load_balancer = format!("{}-alb", prefix);
    let target_group = format!("{}-app", prefix);
    let alb = |id: &str, description: &str, metric: &str, dims: &[(&str, String)], statistic, threshold| {
        materialize_flag(settings.enable_alb_alarms, || {
            factory.alarm(
                id,
                description,
                "AWS/ApplicationELB",
                metric,
                dims,
                statistic,
                ComparisonOperator::GreaterThanThreshold,
                threshold,
                factory.standard(),
            )
        })
    };
    let lb_dims = [("LoadBalancer", load_balancer.clone())];
    let tg_dims = [("LoadBalancer", load_balancer.clone()), ("TargetGroup", target_group)];
    let alb_5xx = alb(
        "alb_5xx",
        "Load balancer 5xx responses",
        "HTTPCode_ELB_5XX_Count",
        &lb_dims,
        Statistic::Sum,
        10.0,
    );
    let alb_unhealthy = alb(
        "alb_unhealthy_hosts",
        "Unhealthy application targets",
        "UnHealthyHostCount",
        &tg_dims,
        Statistic::Maximum,
        0.0,
    );
    let alb_latency = alb(
        "alb_latency",
        "Target response time above one second",
        "TargetResponseTime",
        &lb_dims,
        Statistic::Average,
        1.0,
    );

    // Database
    let instance = &database.instance;
    let db_dims = [("DBInstanceIdentifier", instance.identifier.clone())];
    let db = |id: &str, description: &str, metric: &str, comparison, threshold| {
        materialize_flag(settings.enable_database_alarms, || MetricAlarm {
            watches: Some(instance.key.clone()),
            ..factory.alarm(
                id,
                description,
                "AWS/RDS",
                metric,
                &db_dims,
                Statistic::Average,
                comparison,
                threshold,
                factory.database(),
            )
        })
    };
    let db_cpu = db(
        "db_cpu",
        "Database CPU above 80%",
        "CPUUtilization",
        ComparisonOperator::GreaterThanThreshold,
        80.0,
    );
    let db_storage = db(
        "db_free_storage",
        "Database free storage below 10% of allocation",
        "FreeStorageSpace",
        ComparisonOperator::LessThanThreshold,
        f64::from(instance.allocated_storage) * GIB * 0.1,
    );
    let db_connections = db(
        "db_connections",
        "Database connections above 80",
        "DatabaseConnections",
        ComparisonOperator::GreaterThanThreshold,
        80.0,
    );

    // NAT gateways, one alarm each
    for nat in &gateways.nat_gateways {
        let nat_id = AttributeRef::new(nat.key.clone(), "id").to_string();
        registry.register(MetricAlarm {
            watches: Some(nat.key.clone()),
            ..factory.alarm(
                &format!("nat_port_allocation.{}", nat.zone_index),
                "NAT gateway port allocation errors",
                "AWS/NATGateway",
                "ErrorPortAllocation",
                &[("NatGatewayId", nat_id)],
                Statistic::Sum,
                ComparisonOperator::GreaterThanThreshold,
                0.0,
                factory.standard(),
            )
        });
    }

    // Application error logs
    let log_group = materialize_flag(settings.enable_log_alarms, || LogGroup {
        key: ResourceKey::new(ResourceKind::LogGroup, "application"),
        name: format!("/{}/application", prefix),
        retention_days: settings.log_retention_days,
    });
    let metric_filter = log_group.as_ref().map(|group| LogMetricFilter {
        key: ResourceKey::new(ResourceKind::LogMetricFilter, "app_errors"),
        log_group: group.key.clone(),
        pattern: ERROR_LOG_PATTERN.to_string(),
        metric_namespace: format!("{}/{}", prefix, APPLICATION_METRIC_NAMESPACE),
        metric_name: "ErrorCount".to_string(),
    });
    let app_errors = metric_filter.as_ref().map(|filter| MetricAlarm {
        watches: Some(filter.key.clone()),
        ..factory.alarm(
            "app_errors",
            "Application error log lines",
            &filter.metric_namespace,
            &filter.metric_name,
            &[],
            Statistic::Sum,
            ComparisonOperator::GreaterThanThreshold,
            5.0,
            factory.standard(),
        )
    });

    let health_leaves = vec![
        registry.register_optional("alb_5xx", alb_5xx),
        registry.register_optional("alb_unhealthy_hosts", alb_unhealthy),
        registry.register_optional("db_cpu", db_cpu),
        registry.register_optional("app_errors", app_errors),
    ];
    registry.register_optional("alb_latency", alb_latency);
    registry.register_optional("db_free_storage", db_storage);
    registry.register_optional("db_connections", db_connections);

    let composite = CompositeAlarm::any_of(
        ResourceKey::new(ResourceKind::CompositeAlarm, "system_health"),
        format!("{}-system-health", prefix),
        "Any critical component alarm",
        health_leaves,
        vec![topic.key.clone()],
    );
    if composite.is_none() {
        debug!("All system-health leaves are gated off; composite omitted");
    }

    info!(
        subscriptions = subscriptions.len(),
        alarms = registry.len(),
        composite = composite.is_some(),
        "Composed monitoring overlay"
    );

    Ok(MonitoringOverlay {
        topic,
        subscriptions,
        log_group,
        metric_filter,
        alarms: registry.into_alarms(),
        composite,
    })
}

impl Materialized for MonitoringOverlay {
    fn resources(&self) -> Vec<(ResourceKey, ResourceKind)> {
        let mut resources = vec![(self.topic.key.clone(), ResourceKind::AlertTopic)];
        resources.extend(
            self.subscriptions
                .iter()
                .map(|s| (s.key.clone(), ResourceKind::AlertSubscription)),
        );
        if let Some(group) = &self.log_group {
            resources.push((group.key.clone(), ResourceKind::LogGroup));
        }
        if let Some(filter) = &self.metric_filter {
            resources.push((filter.key.clone(), ResourceKind::LogMetricFilter));
        }
        resources.extend(self.alarms.iter().map(|a| (a.key.clone(), ResourceKind::MetricAlarm)));
        if let Some(composite) = &self.composite {
            resources.push((composite.key.clone(), ResourceKind::CompositeAlarm));
        }
        resources
    }

    fn dependencies(&self) -> Vec<Dependency> {
        let mut deps: Vec<Dependency> = self
            .subscriptions
            .iter()
            .map(|s| Dependency::reference(&s.key, &s.topic))
            .collect();
        if let Some(filter) = &self.metric_filter {
            deps.push(Dependency::reference(&filter.key, &filter.log_group));
        }
        for alarm in &self.alarms {
            for action in &alarm.alarm_actions {
                deps.push(Dependency::reference(&alarm.key, action));
            }
            match &alarm.watches {
                // The metric only exists once the filter publishes it
                Some(watched) if Some(watched) == self.metric_filter.as_ref().map(|f| &f.key) => {
                    deps.push(Dependency::explicit(&alarm.key, watched));
                }
                Some(watched) => deps.push(Dependency::reference(&alarm.key, watched)),
                None => {}
            }
        }
        if let Some(composite) = &self.composite {
            for handle in composite.present_leaves() {
                deps.push(Dependency::reference(&composite.key, handle.key()));
            }
            for action in &composite.alarm_actions {
                deps.push(Dependency::reference(&composite.key, action));
            }
        }
        deps
    }
}
