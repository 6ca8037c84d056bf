mod config;
mod error;
mod hosts;
mod ip;
mod provider;
mod reconcile;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use log::{info, warn};

use crate::config::Config;
use crate::error::Error;
use crate::ip::IpDiscovery;
use crate::provider::glesys::GlesysClient;
use crate::reconcile::Reconciler;

#[derive(Parser, Debug)]
#[command(name = "glesys-ddns")]
#[command(about = "Update GleSYS A/AAAA records with this machine's public IP addresses")]
struct Args {
    /// Hostnames to update, e.g. home.example.com
    hosts: Vec<String>,

    /// GleSYS user ID to operate as
    #[arg(long, env = "GLESYS_API_USER")]
    api_user: Option<String>,

    /// GleSYS API key for authorization
    #[arg(long, env = "GLESYS_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Path to an optional configuration file
    #[arg(short, long, env = "GLESYS_DDNS_CONFIG")]
    config: Option<PathBuf>,

    /// Look everything up but do not change any record
    #[arg(long)]
    dry_run: bool,
}

/// Same code clap uses for bad arguments.
const USAGE_ERROR: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => match e.downcast_ref::<Error>() {
            Some(err) if err.is_usage() => {
                eprintln!("error: {}", err);
                ExitCode::from(USAGE_ERROR)
            }
            _ => {
                eprintln!("error: {:#}", e);
                ExitCode::FAILURE
            }
        },
    }
}

async fn run(args: Args) -> Result<()> {
    // Load configuration first (before logger init)
    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    // Initialize logger with config log level (env var takes precedence)
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(&config.log_level)
    ).init();

    if let Some(path) = &args.config {
        info!("Loaded configuration from: {}", path.display());
    }

    let credentials = config.credentials(args.api_user, args.api_key)?;
    let hosts = config.hosts(args.hosts);
    if hosts.is_empty() {
        warn!("No hostnames given, nothing to do");
        return Ok(());
    }

    let directory = GlesysClient::with_base_url(
        &config.glesys.api_url,
        credentials.api_user,
        credentials.api_key,
    );
    let discovery = IpDiscovery::new(&config.ip.echo_url)?;

    let submitted = Reconciler::new(&directory, &discovery)
        .dry_run(args.dry_run)
        .run(&hosts)
        .await?;

    if args.dry_run {
        info!("Dry run finished, {} record(s) would be updated", submitted);
    } else {
        info!("Updated {} record(s)", submitted);
    }

    Ok(())
}
