//! npulet CLI
//!
//! Diagnostic command-line interface for inspecting node snapshots and
//! simulating topology-aware allocations.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use npulet_core::{AllocationPolicy, NodeConfig};

/// npulet - topology-aware NPU allocation for node-level scheduling
#[derive(Parser, Debug)]
#[command(name = "npulet")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Node configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the allocatable devices of a node snapshot
    Devices {
        /// Node snapshot file (TOML or JSON)
        snapshot: PathBuf,
    },

    /// Show the topology hint matrix of a node snapshot
    Topology {
        /// Node snapshot file (TOML or JSON)
        snapshot: PathBuf,
    },

    /// Simulate an allocation against a node snapshot
    Allocate {
        /// Node snapshot file (TOML or JSON)
        snapshot: PathBuf,

        /// Number of devices to allocate
        #[arg(long)]
        count: usize,

        /// Device ID that must be part of the allocation (repeatable)
        #[arg(long = "require")]
        required: Vec<String>,

        /// Override the configured allocation policy
        #[arg(long)]
        policy: Option<PolicyArg>,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum PolicyArg {
    Optimal,
    BinPacking,
}

impl From<PolicyArg> for AllocationPolicy {
    fn from(policy: PolicyArg) -> Self {
        match policy {
            PolicyArg::Optimal => AllocationPolicy::Optimal,
            PolicyArg::BinPacking => AllocationPolicy::BinPacking,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    let config = match cli.config {
        Some(path) => NodeConfig::from_file(&path)?,
        None => NodeConfig::default(),
    };

    match cli.command {
        Commands::Devices { snapshot } => {
            commands::devices(&config, &snapshot)?;
        }
        Commands::Topology { snapshot } => {
            commands::topology(&config, &snapshot)?;
        }
        Commands::Allocate {
            snapshot,
            count,
            required,
            policy,
        } => {
            let policy = policy
                .map(AllocationPolicy::from)
                .unwrap_or(config.allocation_policy);
            commands::allocate(&config, &snapshot, count, &required, policy)?;
        }
    }

    Ok(())
}
