// Copyright (c) 2025 - Cowboy AI, Inc.
//! Conditional Resource Sets
//!
//! Every optional resource in the topology has its cardinality driven by
//! configuration in exactly one of two ways:
//!
//! - [`Gate::Flag`]: zero or one instance.
//! - [`Gate::List`]: one instance per element, addressed by the element's
//!   [`Identity`] rather than its position.
//!
//! Because list instances are keyed and ordered by identity, adding or
//! removing one element never renames the instances of the others, and the
//! input order of a list has no effect on the output.
//!
//! # Examples
//!
//! ```rust
//! use cim_network_topology::cardinality::{materialize, Gate};
//! use cim_network_topology::domain::EmailAddress;
//!
//! let recipients = vec![
//!     EmailAddress::new("b@example.com").unwrap(),
//!     EmailAddress::new("a@example.com").unwrap(),
//! ];
//! let names = materialize("alert_recipients", Gate::List(&recipients), |r| {
//!     r.map(|r| r.to_string()).unwrap_or_default()
//! })
//! .unwrap();
//! assert_eq!(names, vec!["a@example.com", "b@example.com"]);
//! ```

use crate::domain::invariants::validate_distinct;
use crate::domain::{CountryCode, EmailAddress, Ipv4Cidr};
use crate::errors::ConfigError;

/// Stable identity of a list element
///
/// The identity becomes part of the resource key of the instance the
/// element produces.
pub trait Identity {
    fn identity(&self) -> String;
}

impl Identity for String {
    fn identity(&self) -> String {
        self.clone()
    }
}

impl Identity for EmailAddress {
    fn identity(&self) -> String {
        self.as_str().to_string()
    }
}

impl Identity for CountryCode {
    fn identity(&self) -> String {
        self.as_str().to_string()
    }
}

impl Identity for Ipv4Cidr {
    fn identity(&self) -> String {
        self.to_string()
    }
}

/// What drives the cardinality of a resource set
#[derive(Debug, Clone, Copy)]
pub enum Gate<'a, T> {
    /// 0 or 1 instance
    Flag(bool),
    /// One instance per element
    List(&'a [T]),
}

impl<T> Gate<'_, T> {
    /// Number of instances this gate yields
    pub fn cardinality(&self) -> usize {
        match self {
            Gate::Flag(enabled) => usize::from(*enabled),
            Gate::List(items) => items.len(),
        }
    }
}

/// Instantiate `template` according to `gate`
///
/// The template receives `None` for a flag-gated instance and the element
/// for a list-gated one. List output is ordered by element identity.
///
/// # Errors
/// - `DuplicateElement` when two list elements share an identity
pub fn materialize<T, R>(
    name: &str,
    gate: Gate<'_, T>,
    mut template: impl FnMut(Option<&T>) -> R,
) -> Result<Vec<R>, ConfigError>
where
    T: Identity,
{
    match gate {
        Gate::Flag(enabled) => Ok(materialize_flag(enabled, || template(None)).into_iter().collect()),
        Gate::List(items) => materialize_list(name, items, |item| template(Some(item))),
    }
}

/// Instantiate `template` once when `enabled`
pub fn materialize_flag<R>(enabled: bool, template: impl FnOnce() -> R) -> Option<R> {
    if enabled {
        Some(template())
    } else {
        None
    }
}

/// Instantiate `template` once per list element, ordered by identity
///
/// # Errors
/// - `DuplicateElement` when two elements share an identity
pub fn materialize_list<T, R>(
    name: &str,
    items: &[T],
    template: impl FnMut(&T) -> R,
) -> Result<Vec<R>, ConfigError>
where
    T: Identity,
{
    let mut keyed: Vec<(String, &T)> = items.iter().map(|item| (item.identity(), item)).collect();
    validate_distinct(name, keyed.iter().map(|(identity, _)| identity.as_str()))?;
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(keyed.into_iter().map(|(_, item)| item).map(template).collect())
}
