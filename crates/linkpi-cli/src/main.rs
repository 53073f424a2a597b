//! LinkPi CLI - poll LinkPi HDMI encoders from the command line

mod commands;
mod config;
mod output;
mod readings;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use linkpi_client::LinkPiClient;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::commands::get::Endpoint;
use crate::config::{ArgOverrides, Config};
use crate::output::{OutputContext, OutputFormat};

#[derive(Parser)]
#[command(name = "linkpi")]
#[command(author, version, about = "LinkPi HDMI encoder poller")]
#[command(propagate_version = true)]
struct Cli {
    /// Encoder address (host, host:port or http:// URL)
    #[arg(long, env = "LINKPI_HOST")]
    host: Option<String>,

    /// Login user name
    #[arg(short, long, env = "LINKPI_USERNAME")]
    username: Option<String>,

    /// Login password
    #[arg(short, long, env = "LINKPI_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Configuration file path
    #[arg(short, long, env = "LINKPI_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    output: OutputFormat,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Minimal output (for scripting)
    #[arg(short, long)]
    quiet: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the encoder accepts the credentials
    Login,

    /// Show system, network and video input state once
    Status,

    /// Print the raw payload of one status endpoint
    Get {
        /// Endpoint to query
        #[arg(value_enum)]
        endpoint: Endpoint,
    },

    /// Poll the encoder periodically until Ctrl+C
    Monitor {
        /// Seconds between polls (10-3600)
        #[arg(long)]
        interval: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    // Load config file
    let config = if let Some(config_path) = &cli.config {
        Config::load_from(config_path)?
    } else {
        Config::load().unwrap_or_default()
    };

    let interval = match &cli.command {
        Commands::Monitor { interval } => *interval,
        _ => None,
    };
    let merged = config.merge_with_args(&ArgOverrides {
        host: cli.host.as_deref(),
        username: cli.username.as_deref(),
        password: cli.password.as_deref(),
        scan_interval: interval,
        timeout: cli.timeout,
        no_color: cli.no_color,
    })?;

    let ctx = OutputContext::new(cli.output, merged.no_color, cli.quiet);

    let mut client = LinkPiClient::new(merged.client).context("Failed to create LinkPi client")?;

    let result = match &cli.command {
        Commands::Login => commands::login(&mut client, &ctx).await,
        Commands::Status => commands::status(&mut client, &ctx).await,
        Commands::Get { endpoint } => commands::get(&mut client, *endpoint, &ctx).await,
        Commands::Monitor { .. } => {
            commands::monitor(&mut client, merged.scan_interval, &ctx).await
        }
    };

    // Release the session on every path, including failed logins
    client.close().await;
    result
}
