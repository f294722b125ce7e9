//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::campaign::ComponentKind;
use crate::config::{Config, StorageBackend};

#[derive(Debug, Parser)]
#[command(name = "campaignkit", version, about = "Serve, watch and manage remote campaigns")]
pub struct Cli {
    /// Path to config file (default: platform config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Campaign list endpoint, overrides [client].endpoint
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the campaign store HTTP service
    Serve {
        /// Bind address, overrides [store].bind_addr
        #[arg(long)]
        bind: Option<String>,
        /// Campaign data file, overrides [store].data_file
        #[arg(long)]
        data_file: Option<PathBuf>,
    },
    /// Poll the store and log what would render on the given screens
    Watch {
        /// App key passed to initialize
        #[arg(long, default_value = "cli")]
        key: String,
        /// Screen to evaluate on every update (repeatable)
        #[arg(long = "screen", default_value = "Home")]
        screens: Vec<String>,
        /// Poll interval in seconds, overrides [client].poll_interval_seconds
        #[arg(long)]
        interval: Option<u64>,
        /// Keep dismissals in memory only
        #[arg(long)]
        memory: bool,
    },
    /// List campaigns in the store
    List {
        /// Include inactive campaigns
        #[arg(long)]
        all: bool,
    },
    /// Show one campaign
    Get { id: String },
    /// Create a campaign from a JSON file ("-" for stdin)
    Create { file: PathBuf },
    /// Merge a JSON object into a stored campaign
    Update { id: String, patch: String },
    /// Delete a campaign
    Delete { id: String },
    /// Dismiss a campaign on this device
    Dismiss {
        id: String,
        /// Component kind reported with the dismissal (e.g. popup, inline_component)
        #[arg(long)]
        kind: ComponentKind,
        #[arg(long, default_value = "cli")]
        reason: String,
    },
    /// Forget every local dismissal
    ClearDismissals,
}

impl Cli {
    /// Apply command-line overrides on top of the file configuration.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(endpoint) = &self.endpoint {
            config.client.endpoint = endpoint.clone();
        }
        match &self.command {
            Command::Serve { bind, data_file } => {
                if let Some(bind) = bind {
                    config.store.bind_addr = bind.clone();
                }
                if let Some(data_file) = data_file {
                    config.store.data_file = data_file.clone();
                }
            }
            Command::Watch {
                interval, memory, ..
            } => {
                if let Some(interval) = interval {
                    config.client.poll_interval_seconds = *interval;
                }
                if *memory {
                    config.storage.backend = StorageBackend::Memory;
                }
            }
            _ => {}
        }
    }
}
