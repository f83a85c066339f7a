//! Pactum command-line entry point
//!
//! `pactum serve` runs the HTTP API; `pactum config` prints the effective
//! settings after defaults, config file and environment are merged.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use pactum_core::{telemetry, Settings};

#[derive(Parser, Debug)]
#[command(name = "pactum", version, about = "Two-party escrow custody service")]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the API server
    Serve {
        /// Override server.host
        #[arg(long)]
        host: Option<String>,

        /// Override server.port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Print the effective configuration as JSON
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref()).context("failed to load settings")?;

    let filter = telemetry::verbosity_filter(cli.verbose).unwrap_or(settings.log.filter.as_str());
    telemetry::init(filter).context("failed to initialise logging")?;

    match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                settings.server.host = host;
            }
            if let Some(port) = port {
                settings.server.port = port;
            }
            settings.validate().context("invalid settings")?;

            tracing::info!(mode = ?settings.registry.mode, "starting pactum");
            pactum_api::serve(settings).await.context("server stopped")?;
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
    }

    Ok(())
}
