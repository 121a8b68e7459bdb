//! CLI subcommand implementations for the travelers-map binary.

pub mod config_cmd;
pub mod locate_cmd;
pub mod mount_cmd;
pub mod output;
pub mod route_cmd;

use crate::bootstrap::InitGuard;
use crate::config::{parse_readiness, MapConfig};
use crate::geo::LatLng;
use crate::journal::Journal;
use crate::sdk::{ScriptedLoader, ScriptedSdk, SdkLoader};
use crate::session::{ControllerOptions, MapSessionController};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(
    name = "travelers-map",
    version,
    about = "Map sessions, driving routes and place search for The Travelers"
)]
pub struct Cli {
    /// Emit machine-readable JSON on stdout.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress progress output.
    #[arg(long, short, global = true)]
    pub quiet: bool,

    #[arg(long, global = true)]
    pub no_color: bool,

    /// Config file (default: ~/.travelers/config.json).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Use the built-in gazetteer instead of the maps web services.
    #[arg(long, global = true)]
    pub offline: bool,

    #[arg(long, global = true, env = "TRAVELERS_MAPS_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// How waiting views learn the SDK is ready.
    #[arg(long, global = true, value_name = "notify|poll[:MS]")]
    pub readiness: Option<String>,

    /// Append session events to this JSONL file.
    #[arg(long, global = true, value_name = "PATH")]
    pub journal: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute a driving route between two places.
    Route {
        /// Place name or "lat,lng".
        origin: String,
        /// Place name or "lat,lng".
        destination: String,
        /// Fail when no route is found instead of reporting nothing.
        #[arg(long)]
        strict: bool,
    },
    /// Search for a place, or mark the device location.
    Locate {
        #[arg(required_unless_present = "device")]
        query: Option<String>,
        #[arg(long, value_name = "LAT,LNG", conflicts_with = "query")]
        device: Option<LatLng>,
    },
    /// Mount several views that share one SDK bootstrap.
    Mount {
        #[arg(long, default_value_t = 3)]
        views: usize,
        /// Unmount the first view after this many milliseconds.
        #[arg(long, value_name = "MS")]
        unmount_after: Option<u64>,
    },
    /// Inspect or create the config file.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, Clone, Copy)]
pub enum ConfigAction {
    /// Print the effective configuration.
    Show,
    /// Print the config file location.
    Path,
    /// Write a config file with default values.
    Init {
        #[arg(long)]
        force: bool,
    },
}

/// Everything a command needs to mount map sessions.
pub struct AppContext {
    pub config: MapConfig,
    pub loader: Arc<dyn SdkLoader>,
    pub guard: Arc<InitGuard>,
    pub journal: Option<Journal>,
}

impl AppContext {
    pub fn new(config: MapConfig, offline: bool) -> Result<Self> {
        let loader: Arc<dyn SdkLoader> = if offline {
            Arc::new(ScriptedLoader::new(Arc::new(ScriptedSdk::with_gazetteer())))
        } else {
            Arc::new(config.http_loader())
        };
        let journal = config.journal_path.as_deref().map(Journal::open).transpose()?;
        Ok(Self {
            config,
            loader,
            guard: InitGuard::shared(),
            journal,
        })
    }

    /// A controller on the shared guard, journaled when a journal is open.
    pub fn controller(&self, options: ControllerOptions) -> MapSessionController {
        let controller = MapSessionController::new(Arc::clone(&self.guard), Arc::clone(&self.loader), options);
        match &self.journal {
            Some(journal) => controller.with_journal(journal.clone()),
            None => controller,
        }
    }
}

/// Resolve the effective config: file and environment, then global flags.
pub fn resolve_config(cli: &Cli) -> Result<MapConfig> {
    let mut config = MapConfig::load(cli.config.as_deref())?;
    if let Some(key) = &cli.api_key {
        config.api_key = Some(key.clone());
    }
    if let Some(readiness) = &cli.readiness {
        config.readiness = parse_readiness(readiness).context("invalid --readiness")?;
    }
    if let Some(path) = &cli.journal {
        config.journal_path = Some(path.clone());
    }
    Ok(config)
}

pub async fn run(cli: Cli) -> Result<()> {
    let config = resolve_config(&cli)?;

    match cli.command {
        Commands::Config { action } => config_cmd::run(action, &config, cli.config.as_deref()),
        Commands::Route {
            origin,
            destination,
            strict,
        } => {
            let ctx = AppContext::new(config, cli.offline)?;
            route_cmd::run(&ctx, &origin, &destination, strict).await
        }
        Commands::Locate { query, device } => {
            let ctx = AppContext::new(config, cli.offline)?;
            locate_cmd::run(&ctx, query.as_deref(), device).await
        }
        Commands::Mount {
            views,
            unmount_after,
        } => {
            let ctx = AppContext::new(config, cli.offline)?;
            mount_cmd::run(&ctx, views, unmount_after).await
        }
    }
}
