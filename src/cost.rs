// Copyright (c) 2025 - Cowboy AI, Inc.
//! Monthly cost estimate
//!
//! Static on-demand prices for the resources that dominate the bill. The
//! estimate is informational only and never affects generation.

use serde::Serialize;
use std::fmt;

use crate::domain::ResourceCategory;
use crate::errors::TopologyResult;
use crate::plan::InfrastructurePlan;

/// Billing hours per month
pub const HOURS_PER_MONTH: f64 = 730.0;

/// NAT gateway, per hour
pub const NAT_GATEWAY_HOURLY: f64 = 0.045;

/// Application load balancer base price, per hour
pub const ALB_HOURLY: f64 = 0.0225;

/// General purpose database storage, per GiB-month
pub const DB_STORAGE_GIB_MONTHLY: f64 = 0.115;

/// Single-AZ database instance prices, per hour
const DB_INSTANCE_HOURLY: &[(&str, f64)] = &[
    ("db.t3.micro", 0.018),
    ("db.t3.small", 0.036),
    ("db.t3.medium", 0.072),
    ("db.t3.large", 0.145),
    ("db.t4g.micro", 0.016),
    ("db.t4g.small", 0.032),
    ("db.t4g.medium", 0.065),
    ("db.m5.large", 0.178),
    ("db.m5.xlarge", 0.356),
    ("db.r5.large", 0.250),
];

/// Hourly price of a database instance class, if known
pub fn db_instance_hourly(instance_class: &str) -> Option<f64> {
    DB_INSTANCE_HOURLY
        .iter()
        .find(|(class, _)| *class == instance_class)
        .map(|(_, price)| *price)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostLine {
    pub category: ResourceCategory,
    pub item: String,
    pub quantity: u32,
    /// `None` when no price is known for the item
    pub monthly_usd: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostEstimate {
    pub lines: Vec<CostLine>,
    pub total_monthly_usd: f64,
    /// Items left out of the total for lack of a price
    pub unpriced: Vec<String>,
}

impl CostEstimate {
    /// Machine-readable form for CI jobs
    pub fn to_json(&self) -> TopologyResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for CostEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            match line.monthly_usd {
                Some(usd) => writeln!(f, "{:<10} {:<40} x{:<3} ${:>9.2}", line.category.to_string(), line.item, line.quantity, usd)?,
                None => writeln!(f, "{:<10} {:<40} x{:<3} {:>10}", line.category.to_string(), line.item, line.quantity, "n/a")?,
            }
        }
        write!(f, "Total: ${:.2}/month", self.total_monthly_usd)
    }
}

/// Estimate the monthly cost of a plan
pub fn estimate(plan: &InfrastructurePlan) -> CostEstimate {
    let mut lines = Vec::new();

    let nat_count = plan.gateways.nat_gateway_count() as u32;
    lines.push(CostLine {
        category: ResourceCategory::Network,
        item: "NAT gateway".to_string(),
        quantity: nat_count,
        monthly_usd: Some(f64::from(nat_count) * NAT_GATEWAY_HOURLY * HOURS_PER_MONTH),
    });
    lines.push(CostLine {
        category: ResourceCategory::Network,
        item: "Application load balancer".to_string(),
        quantity: 1,
        monthly_usd: Some(ALB_HOURLY * HOURS_PER_MONTH),
    });

    let instance = &plan.database.instance;
    let az_factor = if instance.multi_az { 2.0 } else { 1.0 };
    let instance_item = format!(
        "Database {}{}",
        instance.instance_class,
        if instance.multi_az { " (Multi-AZ)" } else { "" }
    );
    lines.push(CostLine {
        category: ResourceCategory::Data,
        item: instance_item,
        quantity: 1,
        monthly_usd: db_instance_hourly(&instance.instance_class).map(|hourly| hourly * az_factor * HOURS_PER_MONTH),
    });
    lines.push(CostLine {
        category: ResourceCategory::Data,
        item: format!("Database storage {} GiB", instance.allocated_storage),
        quantity: 1,
        monthly_usd: Some(f64::from(instance.allocated_storage) * DB_STORAGE_GIB_MONTHLY * az_factor),
    });

    let total_monthly_usd = lines.iter().filter_map(|l| l.monthly_usd).sum();
    let unpriced = lines
        .iter()
        .filter(|l| l.monthly_usd.is_none())
        .map(|l| l.item.clone())
        .collect();

    CostEstimate {
        lines,
        total_monthly_usd,
        unpriced,
    }
}
