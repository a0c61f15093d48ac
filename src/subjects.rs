// Copyright (c) 2025 - Cowboy AI, Inc.

//! NATS subject hierarchy for plan hand-off
//!
//! Every message the generator publishes follows the pattern:
//!
//! ```text
//! topology.{channel}.{event}
//! ```
//!
//! Subjects are not scoped by project or environment; those travel as
//! message headers so one subscription sees every plan.
//!
//! # Examples
//!
//! ```rust
//! use cim_network_topology::subjects::{subjects, PlanEvent};
//!
//! assert_eq!(subjects::plan_generated(), "topology.plan.generated");
//! assert_eq!(PlanEvent::DestructiveChange.subject(), subjects::plan_destructive_change());
//! ```

use std::fmt;

/// Root namespace for all topology subjects
pub const TOPOLOGY_ROOT: &str = "topology";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Generated plans and their change assessments
    Plan,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Plan => write!(f, "plan"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlanEvent {
    /// A plan was generated and is ready for reconciliation
    Generated,
    /// A plan replaces resources of the previous one
    DestructiveChange,
}

impl PlanEvent {
    /// Full subject this event is published on
    pub fn subject(self) -> String {
        format!("{}.{}.{}", TOPOLOGY_ROOT, Channel::Plan, self)
    }
}

impl fmt::Display for PlanEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanEvent::Generated => write!(f, "generated"),
            PlanEvent::DestructiveChange => write!(f, "destructive_change"),
        }
    }
}

/// Convenience functions for the subjects the generator publishes on
pub mod subjects {
    use super::PlanEvent;

    pub fn plan_generated() -> String {
        PlanEvent::Generated.subject()
    }

    pub fn plan_destructive_change() -> String {
        PlanEvent::DestructiveChange.subject()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_subjects() {
        assert_eq!(subjects::plan_generated(), "topology.plan.generated");
        assert_eq!(subjects::plan_destructive_change(), "topology.plan.destructive_change");
    }

    #[test]
    fn test_subjects_share_channel_prefix() {
        for event in [PlanEvent::Generated, PlanEvent::DestructiveChange] {
            assert!(event.subject().starts_with("topology.plan."));
            assert!(event.subject().ends_with(&event.to_string()));
        }
    }
}
