use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use hakstore::client::ApiClient;
use hakstore::config::Config;

mod cli;
mod commands;

use commands::Commands;

#[derive(Parser)]
#[command(name = "hakstore")]
#[command(about = "Bug bounty recon asset store - server and client")]
#[command(version)]
struct Cli {
    /// Path to the config file (defaults to ~/.hakstore/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print JSON instead of plain text
    #[arg(long, global = true)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    let config_path = cli.config.clone().unwrap_or_else(Config::global_config_path);

    match cli.command {
        Commands::Init { force } => {
            cli::init::init_command(&config_path, force)?;
        }
        Commands::Serve {
            host,
            port,
            workers,
            database,
        } => {
            let config = Config::load(Some(&config_path))?;
            let overrides = cli::serve::ServeOverrides {
                host,
                port,
                workers,
                database,
            };
            cli::serve::serve_command(config, overrides).await?;
        }
        command => {
            let config = Config::load(Some(&config_path))?;
            let ctx = cli::Ctx {
                client: ApiClient::from_settings(&config.client),
                json: cli.json,
            };
            cli::run_client_command(&ctx, command)?;
        }
    }

    Ok(())
}
