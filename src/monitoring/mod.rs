// Copyright (c) 2025 - Cowboy AI, Inc.
//! Monitoring Overlay
//!
//! Alerting resources layered over the generated topology.
//!
//! ```text
//!                      system-health (OR)
//!        ┌──────────────┬───────┴──────┬──────────────┐
//!    alb_5xx   alb_unhealthy_hosts   db_cpu      app_errors
//!        │              │               │              │
//!        └──────────────┴──── alert topic ─────────────┘
//!                               │
//!                      email subscriptions
//! ```

pub mod alarm;
pub mod overlay;

pub use alarm::{
    AlarmHandle, AlarmRegistry, AlarmState, ComparisonOperator, CompositeAlarm, EvaluationContract, LeafRef,
    MetricAlarm, MissingDataTreatment, Statistic,
};
pub use overlay::{compose_monitoring, AlertSubscription, AlertTopic, LogGroup, LogMetricFilter, MonitoringOverlay, MonitoringSettings};
