// Copyright (c) 2025 - Cowboy AI, Inc.
//! Plan hand-off
//!
//! Generation itself is synchronous and pure. Handing the finished plan to
//! whatever applies it is the only async step, behind [`PlanSink`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tracing::info;
use uuid::Uuid;

use crate::change::{ChangeAssessment, DestructiveChangeWarning};
use crate::config::Environment;
use crate::errors::TopologyResult;
use crate::plan::InfrastructurePlan;

/// Message wrapping a plan for delivery
///
/// Carries the only wall-clock data of a run; the wrapped plan stays
/// byte-identical for identical configurations.
#[derive(Debug, Clone, Serialize)]
pub struct PlanEnvelope<'a> {
    /// UUID v7, time-ordered per delivery
    pub event_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub plan_id: Uuid,
    pub project: &'a str,
    pub environment: Environment,
    pub plan: &'a InfrastructurePlan,
}

impl<'a> PlanEnvelope<'a> {
    pub fn new(plan: &'a InfrastructurePlan) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            generated_at: Utc::now(),
            plan_id: plan.plan_id,
            project: &plan.project,
            environment: plan.environment,
            plan,
        }
    }
}

/// Stdout document for a plan that replaces resources
///
/// Flattens the plan so its fields stay at the top level, next to the
/// warnings a file sink would write beside it.
#[derive(Serialize)]
struct PlanWithWarnings<'a> {
    #[serde(flatten)]
    plan: &'a InfrastructurePlan,
    destructive_warnings: &'a [DestructiveChangeWarning],
}

/// Destination for generated plans
#[async_trait]
pub trait PlanSink: Send + Sync {
    /// Deliver a plan, together with the change assessment when the plan
    /// updates an earlier one
    async fn publish(&self, plan: &InfrastructurePlan, assessment: Option<&ChangeAssessment>) -> TopologyResult<()>;
}

/// Writes the canonical plan JSON to a file, or to stdout
#[derive(Debug, Clone, Default)]
pub struct FileSink {
    path: Option<PathBuf>,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn stdout() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    /// What goes to stdout: the canonical plan, plus the warnings when the
    /// change is destructive
    fn stdout_document(plan: &InfrastructurePlan, assessment: Option<&ChangeAssessment>) -> TopologyResult<String> {
        let mut json = match assessment.filter(|a| a.is_destructive()) {
            Some(assessment) => serde_json::to_string_pretty(&PlanWithWarnings {
                plan,
                destructive_warnings: &assessment.warnings,
            })?,
            None => plan.to_canonical_json()?,
        };
        json.push('\n');
        Ok(json)
    }
}

#[async_trait]
impl PlanSink for FileSink {
    async fn publish(&self, plan: &InfrastructurePlan, assessment: Option<&ChangeAssessment>) -> TopologyResult<()> {
        match &self.path {
            Some(path) => {
                let mut json = plan.to_canonical_json()?;
                json.push('\n');
                tokio::fs::write(path, json.as_bytes()).await?;
                if let Some(assessment) = assessment.filter(|a| a.is_destructive()) {
                    let warnings_path = path.with_extension("warnings.json");
                    let warnings = serde_json::to_string_pretty(&assessment.warnings)?;
                    tokio::fs::write(&warnings_path, warnings.as_bytes()).await?;
                    info!(path = %warnings_path.display(), "Wrote destructive change warnings");
                }
                info!(plan_id = %plan.plan_id, path = %path.display(), "Wrote plan");
            }
            None => {
                let json = Self::stdout_document(plan, assessment)?;
                let mut stdout = tokio::io::stdout();
                stdout.write_all(json.as_bytes()).await?;
                stdout.flush().await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TopologyConfig;
    use crate::plan::{generate, generate_update};

    #[test]
    fn test_envelope_wraps_plan() {
        let plan = generate(&TopologyConfig::default().validate().unwrap()).unwrap();
        let envelope = PlanEnvelope::new(&plan);
        assert_eq!(envelope.plan_id, plan.plan_id);
        assert_eq!(envelope.event_id.get_version_num(), 7);

        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["project"], "app");
        assert_eq!(value["plan"]["plan_id"], plan.plan_id.to_string());
    }

    #[test]
    fn test_stdout_document_carries_destructive_warnings() {
        let previous = TopologyConfig {
            region: "eu-north-1".to_string(),
            ..Default::default()
        };
        let next = TopologyConfig {
            zone_count: 3,
            ..previous.clone()
        };
        let update = generate_update(&previous.validate().unwrap(), &next.validate().unwrap(), true).unwrap();
        assert!(update.assessment.is_destructive());

        let document = FileSink::stdout_document(&update.plan, Some(&update.assessment)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&document).unwrap();
        assert_eq!(value["plan_id"], update.plan.plan_id.to_string());
        assert_eq!(value["destructive_warnings"][0]["parameter"], "zone_count");
    }

    #[test]
    fn test_stdout_document_without_warnings_is_canonical() {
        let plan = generate(&TopologyConfig::default().validate().unwrap()).unwrap();
        let document = FileSink::stdout_document(&plan, None).unwrap();
        assert_eq!(document, format!("{}\n", plan.to_canonical_json().unwrap()));
    }
}
