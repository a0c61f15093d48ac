// Copyright (c) 2025 - Cowboy AI, Inc.
//! NATS hand-off to the reconciliation engine

use async_nats::{Client, ConnectOptions, HeaderMap};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::change::ChangeAssessment;
use crate::errors::{TopologyError, TopologyResult};
use crate::plan::InfrastructurePlan;
use crate::sink::{PlanEnvelope, PlanSink};
use crate::subjects::subjects;

/// Configuration for NATS connection
#[derive(Debug, Clone)]
pub struct NatsConfig {
    /// NATS server URLs
    pub servers: Vec<String>,
    /// Client name
    pub name: String,
    /// Connection timeout
    pub connect_timeout: Duration,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            servers: vec!["nats://localhost:4222".to_string()],
            name: "topology-gen".to_string(),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl NatsConfig {
    /// Single-server configuration
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            servers: vec![url.into()],
            ..Default::default()
        }
    }
}

/// Publishes plans on `topology.plan.generated` and destructive warnings on
/// `topology.plan.destructive_change`
#[derive(Clone)]
pub struct NatsPlanSink {
    client: Client,
}

impl NatsPlanSink {
    pub async fn connect(config: NatsConfig) -> TopologyResult<Self> {
        let connect_options = ConnectOptions::new()
            .name(&config.name)
            .connection_timeout(config.connect_timeout);

        let client = async_nats::connect_with_options(config.servers.join(","), connect_options)
            .await
            .map_err(|e| TopologyError::NatsConnection(e.to_string()))?;

        info!("Connected to NATS at {:?}", config.servers);
        Ok(Self { client })
    }

    /// Wrap an existing connection
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    async fn send<T: Serialize + ?Sized>(&self, subject: String, plan: &InfrastructurePlan, message: &T) -> TopologyResult<()> {
        let payload = serde_json::to_vec(message)?;

        let mut headers = HeaderMap::new();
        headers.insert("Plan-Id", plan.plan_id.to_string().as_str());
        headers.insert("Project", plan.project.as_str());
        headers.insert("Environment", plan.environment.as_str());

        self.client
            .publish_with_headers(subject.clone(), headers, payload.into())
            .await
            .map_err(|e| TopologyError::NatsPublish(e.to_string()))?;

        debug!("Published message to subject: {}", subject);
        Ok(())
    }
}

#[async_trait]
impl PlanSink for NatsPlanSink {
    async fn publish(&self, plan: &InfrastructurePlan, assessment: Option<&ChangeAssessment>) -> TopologyResult<()> {
        if let Some(assessment) = assessment.filter(|a| a.is_destructive()) {
            warn!(
                plan_id = %plan.plan_id,
                warnings = assessment.warnings.len(),
                "Publishing destructive change warnings"
            );
            self.send(subjects::plan_destructive_change(), plan, &assessment.warnings)
                .await?;
        }

        let envelope = PlanEnvelope::new(plan);
        self.send(subjects::plan_generated(), plan, &envelope).await?;

        self.client
            .flush()
            .await
            .map_err(|e| TopologyError::NatsPublish(e.to_string()))?;

        info!(plan_id = %plan.plan_id, event_id = %envelope.event_id, "Plan handed off");
        Ok(())
    }
}
