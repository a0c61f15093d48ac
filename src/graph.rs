// Copyright (c) 2025 - Cowboy AI, Inc.
//! Resource Dependency Graph
//!
//! Directed graph of "must exist before" relations between generated
//! resources, independent of whatever reconciliation engine consumes it.
//!
//! ```text
//! dependent ──depends on──▶ prerequisite
//!
//! nat_gateway.0 ──explicit──▶ internet_gateway
//! nat_gateway.0 ──reference─▶ elastic_ip.0
//! ```
//!
//! - `Reference` edges mirror an attribute the dependent reads from the
//!   prerequisite (subnet id, group id, ...).
//! - `Explicit` edges encode ordering that no attribute reference implies,
//!   such as gateway creation after the internet gateway exists.
//!
//! [`DependencyGraph::apply_order`] is Kahn's algorithm over a sorted ready
//! set, so the order is a pure function of the graph. The destroy order is its
//! exact reverse.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::domain::{ResourceKey, ResourceKind};
use crate::errors::StructuralViolation;

/// Why one resource depends on another
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKind {
    /// Dependent reads an attribute of the prerequisite
    Reference,
    /// Ordering declared explicitly, not inferable from references
    Explicit,
}

/// One dependency edge
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Dependency {
    pub dependent: ResourceKey,
    pub prerequisite: ResourceKey,
    pub kind: DependencyKind,
}

impl Dependency {
    pub fn reference(dependent: &ResourceKey, prerequisite: &ResourceKey) -> Self {
        Self {
            dependent: dependent.clone(),
            prerequisite: prerequisite.clone(),
            kind: DependencyKind::Reference,
        }
    }

    pub fn explicit(dependent: &ResourceKey, prerequisite: &ResourceKey) -> Self {
        Self {
            dependent: dependent.clone(),
            prerequisite: prerequisite.clone(),
            kind: DependencyKind::Explicit,
        }
    }
}

/// A set of generated resources that knows its own dependency edges
///
/// Every generator component implements this so the plan can assemble one
/// graph without knowing each component's internals.
pub trait Materialized {
    /// Resources owned by this component
    fn resources(&self) -> Vec<(ResourceKey, ResourceKind)>;

    /// Dependency edges whose dependent is owned by this component
    fn dependencies(&self) -> Vec<Dependency>;
}

/// Dependency graph over resource keys
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DependencyGraph {
    nodes: BTreeMap<ResourceKey, ResourceKind>,
    /// dependent → prerequisite → kind
    edges: BTreeMap<ResourceKey, BTreeMap<ResourceKey, DependencyKind>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every resource of a component
    ///
    /// Edges may cross components, so they are added once every component
    /// has registered its resources.
    pub fn add_component(&mut self, component: &dyn Materialized) -> Result<(), StructuralViolation> {
        for (key, kind) in component.resources() {
            self.add_resource(key, kind)?;
        }
        Ok(())
    }

    /// Register a resource; keys are unique
    pub fn add_resource(&mut self, key: ResourceKey, kind: ResourceKind) -> Result<(), StructuralViolation> {
        if self.nodes.contains_key(&key) {
            return Err(StructuralViolation::DuplicateResource(key.to_string()));
        }
        self.nodes.insert(key, kind);
        Ok(())
    }

    /// Add an edge between two registered resources
    ///
    /// An edge declared both ways keeps the stronger `Explicit` kind.
    pub fn add_dependency(&mut self, dependency: Dependency) -> Result<(), StructuralViolation> {
        let Dependency {
            dependent,
            prerequisite,
            kind,
        } = dependency;

        if !self.nodes.contains_key(&dependent) || !self.nodes.contains_key(&prerequisite) {
            return Err(StructuralViolation::UnknownDependency {
                dependent: dependent.to_string(),
                prerequisite: prerequisite.to_string(),
            });
        }
        if dependent == prerequisite {
            return Err(StructuralViolation::DependencyCycle(vec![dependent.to_string()]));
        }

        let slot = self
            .edges
            .entry(dependent)
            .or_default()
            .entry(prerequisite)
            .or_insert(kind);
        *slot = (*slot).max(kind);
        Ok(())
    }

    pub fn contains(&self, key: &ResourceKey) -> bool {
        self.nodes.contains_key(key)
    }

    pub fn kind_of(&self, key: &ResourceKey) -> Option<ResourceKind> {
        self.nodes.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Keys of all resources of one kind, sorted
    pub fn keys_of_kind(&self, kind: ResourceKind) -> Vec<&ResourceKey> {
        self.nodes
            .iter()
            .filter(|(_, k)| **k == kind)
            .map(|(key, _)| key)
            .collect()
    }

    /// Direct prerequisites of `key`
    pub fn prerequisites(&self, key: &ResourceKey) -> Vec<(&ResourceKey, DependencyKind)> {
        self.edges
            .get(key)
            .map(|targets| targets.iter().map(|(k, kind)| (k, *kind)).collect())
            .unwrap_or_default()
    }

    /// Kind of the edge `dependent → prerequisite`, if any
    pub fn edge(&self, dependent: &ResourceKey, prerequisite: &ResourceKey) -> Option<DependencyKind> {
        self.edges.get(dependent)?.get(prerequisite).copied()
    }

    /// Direct dependents of `key`
    pub fn dependents(&self, key: &ResourceKey) -> Vec<&ResourceKey> {
        self.edges
            .iter()
            .filter(|(_, targets)| targets.contains_key(key))
            .map(|(dependent, _)| dependent)
            .collect()
    }

    /// Everything that directly or transitively depends on `key`
    pub fn transitive_dependents(&self, key: &ResourceKey) -> BTreeSet<ResourceKey> {
        let mut found = BTreeSet::new();
        let mut frontier = vec![key.clone()];
        while let Some(current) = frontier.pop() {
            for dependent in self.dependents(&current) {
                if found.insert(dependent.clone()) {
                    frontier.push(dependent.clone());
                }
            }
        }
        found
    }

    /// All edges, sorted
    pub fn dependencies(&self) -> Vec<Dependency> {
        self.edges
            .iter()
            .flat_map(|(dependent, targets)| {
                targets.iter().map(move |(prerequisite, kind)| Dependency {
                    dependent: dependent.clone(),
                    prerequisite: prerequisite.clone(),
                    kind: *kind,
                })
            })
            .collect()
    }

    /// Edges declared explicitly
    pub fn explicit_dependencies(&self) -> Vec<Dependency> {
        self.dependencies()
            .into_iter()
            .filter(|d| d.kind == DependencyKind::Explicit)
            .collect()
    }

    /// Creation order: every prerequisite precedes its dependents
    ///
    /// Ties are broken by key order, which makes the result deterministic.
    pub fn apply_order(&self) -> Result<Vec<ResourceKey>, StructuralViolation> {
        let mut remaining: BTreeMap<&ResourceKey, usize> = self
            .nodes
            .keys()
            .map(|key| (key, self.edges.get(key).map_or(0, BTreeMap::len)))
            .collect();

        let mut dependents_of: BTreeMap<&ResourceKey, Vec<&ResourceKey>> = BTreeMap::new();
        for (dependent, targets) in &self.edges {
            for prerequisite in targets.keys() {
                dependents_of.entry(prerequisite).or_default().push(dependent);
            }
        }

        let mut ready: BTreeSet<&ResourceKey> = remaining
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(key, _)| *key)
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(next) = ready.pop_first() {
            remaining.remove(next);
            order.push(next.clone());

            for dependent in dependents_of.get(next).into_iter().flatten() {
                if let Some(count) = remaining.get_mut(dependent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(*dependent);
                    }
                }
            }
        }

        if !remaining.is_empty() {
            return Err(StructuralViolation::DependencyCycle(
                remaining.keys().map(|k| k.to_string()).collect(),
            ));
        }

        Ok(order)
    }

    /// Teardown order: exact reverse of [`Self::apply_order`]
    pub fn destroy_order(&self) -> Result<Vec<ResourceKey>, StructuralViolation> {
        let mut order = self.apply_order()?;
        order.reverse();
        Ok(order)
    }
}
