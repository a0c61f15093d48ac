// Copyright (c) 2025 - Cowboy AI, Inc.
//! Topology Domain Models
//!
//! Validated value objects shared by every generator component.
//!
//! # Value Objects with Invariants
//!
//! - [`Ipv4Cidr`] - IPv4 network block with no host bits set
//! - [`Port`] - Non-zero TCP/UDP port
//! - [`EmailAddress`] - Alert recipient
//! - [`CountryCode`] - ISO 3166-1 alpha-2 code for geo blocking
//! - [`ResourceKind`] - Generated resource taxonomy
//! - [`ResourceKey`] - Stable logical address of a generated resource

pub mod contact;
pub mod invariants;
pub mod network;
pub mod resource_type;

pub use contact::{CountryCode, EmailAddress};
pub use invariants::ValidationResult;
pub use network::{Ipv4Cidr, NetworkError, Port, Protocol};
pub use resource_type::{AttributeRef, ResourceCategory, ResourceKey, ResourceKind};
