//! Parcel CLI
//!
//! Browse the dataset catalog and mount datasets into a Kubernetes cluster

mod commands;
mod config;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::{Config, Settings};
use output::OutputFormat;
use parcel_core::{CatalogClient, VolumeManager};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,

    /// Trace catalog requests and responses
    #[arg(long, global = true)]
    trace: bool,

    /// Shorten dataset descriptions
    #[arg(long, global = true)]
    short: bool,

    /// Catalog service URL
    #[arg(long, global = true)]
    svcurl: Option<String>,

    /// Namespace for persistent volume claims
    #[arg(short, long, global = true)]
    namespace: Option<String>,

    /// Path to a kubeconfig file
    #[arg(long, global = true)]
    kubeconfig: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all datasets in the catalog
    List,
    /// Search datasets by keyword
    #[command(visible_alias = "find")]
    Search {
        /// Keywords (at least 4 characters each)
        #[arg(required = true)]
        keywords: Vec<String>,
    },
    /// Mount datasets into the cluster
    #[command(visible_alias = "mount")]
    Order {
        /// Dataset IDs
        #[arg(required = true)]
        ids: Vec<String>,
        /// Mount datasets that already have a mount
        #[arg(long)]
        allow_duplicate: bool,
    },
    /// List dataset mounts
    Mounts,
    /// Show a dataset mount
    Show {
        /// Volume name
        volume: String,
    },
    /// Remove a dataset mount
    #[command(visible_alias = "unmount")]
    Return {
        /// Volume name
        volume: String,
    },
    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Generate shell completions
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Write the configuration file, including any command-line overrides
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut config, config_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };

    let _guard = config
        .logging(cli.verbose)
        .init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    if let Some(e) = config_error {
        tracing::warn!("Ignoring configuration file: {:#}", e);
    }

    let format = cli.output;
    let settings = config.resolve(cli.svcurl.clone(), cli.namespace.clone(), cli.kubeconfig.clone());
    tracing::debug!(?settings, "Resolved settings");

    match cli.command {
        Commands::List => {
            let catalog = CatalogClient::new(&settings.catalog_service_url, cli.trace);
            commands::datasets::handle_list(&catalog, format, cli.short).await?
        }
        Commands::Search { keywords } => {
            let catalog = CatalogClient::new(&settings.catalog_service_url, cli.trace);
            commands::datasets::handle_search(&catalog, &keywords, format, cli.short).await?
        }
        Commands::Order {
            ids,
            allow_duplicate,
        } => {
            let catalog = CatalogClient::new(&settings.catalog_service_url, cli.trace);
            let manager = connect(&settings).await?;
            commands::mounts::handle_order(&catalog, &manager, &ids, allow_duplicate, format)
                .await?
        }
        Commands::Mounts => {
            let manager = connect(&settings).await?;
            commands::mounts::handle_list(&manager, format).await?
        }
        Commands::Show { volume } => {
            let manager = connect(&settings).await?;
            commands::mounts::handle_show(&manager, &volume, format).await?
        }
        Commands::Return { volume } => {
            let manager = connect(&settings).await?;
            commands::mounts::handle_return(&manager, &volume).await?
        }
        Commands::Config { command } => {
            if let Some(url) = cli.svcurl {
                config.catalog_service_url = url;
            }
            if let Some(namespace) = cli.namespace {
                config.namespace = namespace;
            }
            if let Some(path) = cli.kubeconfig {
                config.kubernetes_config_path = Some(path);
            }
            commands::config::handle_config_command(command, &config, format)?
        }
        Commands::Completions { shell } => {
            generate_completions(shell);
        }
    }

    Ok(())
}

async fn connect(settings: &Settings) -> Result<VolumeManager> {
    VolumeManager::connect(settings.kubeconfig.as_deref(), &settings.namespace)
        .await
        .context("Failed to connect to the Kubernetes cluster")
}

fn generate_completions(shell: clap_complete::Shell) {
    use clap::CommandFactory;
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();

    generate(shell, &mut cmd, name, &mut io::stdout());
}
