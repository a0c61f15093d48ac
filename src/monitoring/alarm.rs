// Copyright (c) 2025 - Cowboy AI, Inc.
//! Metric alarms and their composites
//!
//! # Evaluation Contract
//!
//! Every leaf alarm shares one contract: a fixed period, N consecutive
//! breaching periods before entering `Alarm`, and missing data treated as
//! not breaching.
//!
//! # Composites
//!
//! A composite is a pure OR over its leaves' current state. Leaves are
//! referenced through [`AlarmHandle`]s that only an [`AlarmRegistry`] hands
//! out, so a composite can never name an alarm that was not generated. A
//! leaf whose gate is off resolves to [`LeafRef::Absent`] and never breaches.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::ResourceKey;

/// Default period of a leaf alarm in seconds
pub const DEFAULT_PERIOD_SECONDS: u32 = 60;

/// Period of database alarms in seconds
pub const DATABASE_PERIOD_SECONDS: u32 = 300;

/// Default consecutive breaching periods
pub const DEFAULT_EVALUATION_PERIODS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MissingDataTreatment {
    NotBreaching,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EvaluationContract {
    pub period_seconds: u32,
    pub evaluation_periods: u32,
    pub treat_missing_data: MissingDataTreatment,
}

impl EvaluationContract {
    pub fn standard(evaluation_periods: u32) -> Self {
        Self {
            period_seconds: DEFAULT_PERIOD_SECONDS,
            evaluation_periods,
            treat_missing_data: MissingDataTreatment::NotBreaching,
        }
    }

    pub fn database(evaluation_periods: u32) -> Self {
        Self {
            period_seconds: DATABASE_PERIOD_SECONDS,
            ..Self::standard(evaluation_periods)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ComparisonOperator {
    GreaterThanThreshold,
    LessThanThreshold,
}

impl ComparisonOperator {
    fn breaches(&self, value: f64, threshold: f64) -> bool {
        match self {
            ComparisonOperator::GreaterThanThreshold => value > threshold,
            ComparisonOperator::LessThanThreshold => value < threshold,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Statistic {
    Sum,
    Average,
    Maximum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlarmState {
    Ok,
    Alarm,
}

/// Threshold alarm over one metric
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricAlarm {
    pub key: ResourceKey,
    pub name: String,
    pub description: String,
    pub namespace: String,
    pub metric_name: String,
    pub dimensions: BTreeMap<String, String>,
    /// Generated resource whose metric is watched, if any
    pub watches: Option<ResourceKey>,
    pub statistic: Statistic,
    pub comparison: ComparisonOperator,
    pub threshold: f64,
    pub contract: EvaluationContract,
    pub alarm_actions: Vec<ResourceKey>,
}

impl MetricAlarm {
    /// State after the given datapoints, oldest first
    ///
    /// `None` is a period with no data. The alarm fires only when the last
    /// `evaluation_periods` datapoints all breach.
    pub fn evaluate(&self, datapoints: &[Option<f64>]) -> AlarmState {
        let needed = self.contract.evaluation_periods as usize;
        if needed == 0 || datapoints.len() < needed {
            return AlarmState::Ok;
        }
        let window = &datapoints[datapoints.len() - needed..];
        let breaching = window.iter().all(|point| match point {
            Some(value) => self.comparison.breaches(*value, self.threshold),
            // MissingDataTreatment::NotBreaching
            None => false,
        });
        if breaching {
            AlarmState::Alarm
        } else {
            AlarmState::Ok
        }
    }
}

/// Typed reference to a registered metric alarm
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct AlarmHandle {
    key: ResourceKey,
    name: String,
}

impl AlarmHandle {
    pub fn key(&self) -> &ResourceKey {
        &self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Leaf of a composite alarm
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LeafRef {
    Present { handle: AlarmHandle },
    /// Gate off; never breaches
    Absent { label: String },
}

impl LeafRef {
    pub fn handle(&self) -> Option<&AlarmHandle> {
        match self {
            LeafRef::Present { handle } => Some(handle),
            LeafRef::Absent { .. } => None,
        }
    }
}

/// Metric alarms generated so far, keyed by resource key
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AlarmRegistry {
    alarms: BTreeMap<ResourceKey, MetricAlarm>,
}

impl AlarmRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an alarm and return its handle
    pub fn register(&mut self, alarm: MetricAlarm) -> AlarmHandle {
        let handle = AlarmHandle {
            key: alarm.key.clone(),
            name: alarm.name.clone(),
        };
        self.alarms.insert(alarm.key.clone(), alarm);
        handle
    }

    /// Register when present; the label names the leaf when absent
    pub fn register_optional(&mut self, label: &str, alarm: Option<MetricAlarm>) -> LeafRef {
        match alarm {
            Some(alarm) => LeafRef::Present {
                handle: self.register(alarm),
            },
            None => LeafRef::Absent {
                label: label.to_string(),
            },
        }
    }

    pub fn get(&self, handle: &AlarmHandle) -> Option<&MetricAlarm> {
        self.alarms.get(&handle.key)
    }

    pub fn alarms(&self) -> impl Iterator<Item = &MetricAlarm> {
        self.alarms.values()
    }

    pub fn len(&self) -> usize {
        self.alarms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alarms.is_empty()
    }

    pub fn into_alarms(self) -> Vec<MetricAlarm> {
        self.alarms.into_values().collect()
    }
}

/// OR over leaf alarms; holds no state of its own
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompositeAlarm {
    pub key: ResourceKey,
    pub name: String,
    pub description: String,
    pub leaves: Vec<LeafRef>,
    pub alarm_actions: Vec<ResourceKey>,
}

impl CompositeAlarm {
    /// Create a composite, or `None` when every leaf is absent
    pub fn any_of(
        key: ResourceKey,
        name: impl Into<String>,
        description: impl Into<String>,
        leaves: Vec<LeafRef>,
        alarm_actions: Vec<ResourceKey>,
    ) -> Option<Self> {
        if leaves.iter().all(|leaf| leaf.handle().is_none()) {
            return None;
        }
        Some(Self {
            key,
            name: name.into(),
            description: description.into(),
            leaves,
            alarm_actions,
        })
    }

    /// Handles of the leaves that exist
    pub fn present_leaves(&self) -> impl Iterator<Item = &AlarmHandle> {
        self.leaves.iter().filter_map(LeafRef::handle)
    }

    /// `ALARM("a") OR ALARM("b")` over present leaves
    pub fn rule_expression(&self) -> String {
        self.present_leaves()
            .map(|handle| format!("ALARM(\"{}\")", handle.name()))
            .collect::<Vec<_>>()
            .join(" OR ")
    }

    /// Current state given the latest state of each leaf
    ///
    /// Absent leaves and leaves with no reported state never breach.
    pub fn evaluate(&self, leaf_states: &BTreeMap<ResourceKey, AlarmState>) -> AlarmState {
        let any_alarm = self
            .present_leaves()
            .any(|handle| leaf_states.get(handle.key()) == Some(&AlarmState::Alarm));
        if any_alarm {
            AlarmState::Alarm
        } else {
            AlarmState::Ok
        }
    }
}

impl fmt::Display for AlarmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlarmState::Ok => write!(f, "OK"),
            AlarmState::Alarm => write!(f, "ALARM"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ResourceKind;

    fn alarm(name: &str, threshold: f64) -> MetricAlarm {
        MetricAlarm {
            key: ResourceKey::new(ResourceKind::MetricAlarm, name),
            name: format!("test-{}", name),
            description: String::new(),
            namespace: "AWS/ApplicationELB".to_string(),
            metric_name: "HTTPCode_ELB_5XX_Count".to_string(),
            dimensions: BTreeMap::new(),
            watches: None,
            statistic: Statistic::Sum,
            comparison: ComparisonOperator::GreaterThanThreshold,
            threshold,
            contract: EvaluationContract::standard(DEFAULT_EVALUATION_PERIODS),
            alarm_actions: Vec::new(),
        }
    }

    #[test]
    fn test_consecutive_breaches_required() {
        let a = alarm("alb_5xx", 10.0);
        assert_eq!(a.evaluate(&[Some(50.0), Some(2.0)]), AlarmState::Ok);
        assert_eq!(a.evaluate(&[Some(2.0), Some(50.0), Some(60.0)]), AlarmState::Alarm);
        assert_eq!(a.evaluate(&[Some(50.0)]), AlarmState::Ok);
    }

    #[test]
    fn test_missing_data_not_breaching() {
        let a = alarm("alb_5xx", 10.0);
        assert_eq!(a.evaluate(&[Some(50.0), None]), AlarmState::Ok);
        assert_eq!(a.evaluate(&[None, None]), AlarmState::Ok);
    }

    #[test]
    fn test_database_contract_period() {
        let contract = EvaluationContract::database(3);
        assert_eq!(contract.period_seconds, 300);
        assert_eq!(contract.evaluation_periods, 3);
    }

    #[test]
    fn test_composite_is_or() {
        let mut registry = AlarmRegistry::new();
        let a = registry.register(alarm("a", 1.0));
        let b = registry.register(alarm("b", 1.0));
        let composite = CompositeAlarm::any_of(
            ResourceKey::new(ResourceKind::CompositeAlarm, "health"),
            "health",
            "",
            vec![
                LeafRef::Present { handle: a.clone() },
                LeafRef::Present { handle: b.clone() },
                registry.register_optional("c", None),
            ],
            Vec::new(),
        )
        .unwrap();

        let mut states = BTreeMap::new();
        states.insert(a.key().clone(), AlarmState::Ok);
        assert_eq!(composite.evaluate(&states), AlarmState::Ok);
        states.insert(b.key().clone(), AlarmState::Alarm);
        assert_eq!(composite.evaluate(&states), AlarmState::Alarm);
        assert_eq!(
            composite.rule_expression(),
            "ALARM(\"test-a\") OR ALARM(\"test-b\")"
        );
    }

    #[test]
    fn test_all_absent_composite_not_created() {
        let composite = CompositeAlarm::any_of(
            ResourceKey::new(ResourceKind::CompositeAlarm, "health"),
            "health",
            "",
            vec![LeafRef::Absent {
                label: "x".to_string(),
            }],
            Vec::new(),
        );
        assert!(composite.is_none());
    }
}
