pub mod discover;
pub mod health;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use ecomap_common::config::{EngineSettings, ScanConfig};
use tracing::debug;

#[derive(Parser)]
#[command(name = "ecomap")]
#[command(about = "Maps the servers of a local ecosystem.")]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Skip reverse DNS lookups
    #[arg(long, global = true)]
    pub no_dns: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Discover and classify the servers of the local network
    #[command(alias = "d")]
    Discover {
        /// Sweep this CIDR block instead of the local subnet
        #[arg(short, long)]
        subnet: Option<String>,
        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Write the topology as JSON to this file
        #[arg(short, long)]
        export: Option<PathBuf>,
    },
    /// Check connectivity and whether an ecosystem is present
    Health {
        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

pub fn load_settings(path: Option<&Path>, no_dns: bool) -> anyhow::Result<Arc<EngineSettings>> {
    let mut config: ScanConfig = match path {
        Some(path) => ScanConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => ScanConfig::default(),
    };
    config.no_dns |= no_dns;
    debug!("Scan configuration: {config:?}");

    EngineSettings::new(config).context("invalid configuration")
}
