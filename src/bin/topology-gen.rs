// Copyright (c) 2025 - Cowboy AI, Inc.
//! Topology generator CLI
//!
//! Reads a JSON configuration (plus `TOPOLOGY_*` environment overrides),
//! generates the plan and hands it to a file, stdout or NATS.
//!
//! Run with: cargo run --bin topology-gen -- --config topology.json generate --out plan.json
//!
//! Logs go to stderr so that stdout carries only the plan.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cim_network_topology::{
    cost, generate, generate_update, FileSink, NatsConfig, NatsPlanSink, PlanSink, TopologyConfig, TopologyError,
    ValidatedConfig,
};
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "topology-gen", version, about = "Generate three-tier network topology plans")]
struct Cli {
    /// JSON configuration file; defaults apply when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate the configuration and print the resolved settings
    Validate,

    /// Generate the plan
    Generate {
        /// Configuration of the currently applied plan, for change detection
        #[arg(long)]
        previous: Option<PathBuf>,

        /// Acknowledge changes that replace subnets or gateways
        #[arg(long)]
        allow_destructive: bool,

        /// Write the plan here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Also publish the plan to NATS
        #[arg(long)]
        publish: bool,

        #[arg(long, env = "NATS_URL", default_value = "localhost:4222")]
        nats_url: String,
    },

    /// Print the monthly cost estimate of the plan
    Cost {
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

fn load_config(path: Option<&Path>) -> Result<ValidatedConfig> {
    let mut config = match path {
        Some(path) => TopologyConfig::from_file(path)
            .with_context(|| format!("Failed to read configuration {}", path.display()))?,
        None => TopologyConfig::default(),
    };
    config
        .apply_env_overrides()
        .context("Invalid TOPOLOGY_* environment override")?;
    Ok(config.validate()?)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Validate => {
            println!("{}", config.canonical_json()?);
            info!(project = %config.project, environment = %config.environment.as_str(), "Configuration is valid");
        }

        Command::Generate {
            previous,
            allow_destructive,
            out,
            publish,
            nats_url,
        } => {
            let (plan, assessment) = match previous {
                Some(previous_path) => {
                    let previous = load_config(Some(&previous_path))?;
                    match generate_update(&previous, &config, allow_destructive) {
                        Ok(update) => (update.plan, Some(update.assessment)),
                        Err(TopologyError::DestructiveChange(warnings)) => {
                            for warning in &warnings {
                                error!("{}", warning);
                                for key in &warning.replaced {
                                    error!("  replaces {}", key);
                                }
                            }
                            anyhow::bail!(
                                "{} destructive change(s); rerun with --allow-destructive to proceed",
                                warnings.len()
                            );
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                None => (generate(&config)?, None),
            };

            let file_sink = match &out {
                Some(path) => FileSink::new(path),
                None => FileSink::stdout(),
            };
            file_sink.publish(&plan, assessment.as_ref()).await?;

            if publish {
                let sink = NatsPlanSink::connect(NatsConfig::with_url(&nats_url))
                    .await
                    .context("Failed to connect to NATS")?;
                sink.publish(&plan, assessment.as_ref())
                    .await
                    .context("Failed to publish plan")?;
            }
        }

        Command::Cost { json } => {
            let estimate = cost::estimate(&generate(&config)?);
            if json {
                println!("{}", estimate.to_json()?);
            } else {
                println!("{}", estimate);
            }
        }
    }

    Ok(())
}
