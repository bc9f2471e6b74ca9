use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use common::cli::{CommonArgs, CommonCommands, utils};
use tracing::{error, info};
use translator::HttpMonitoringClient;

#[derive(Parser)]
#[command(name = "stackdriver-read-adapter")]
#[command(about = "Prometheus remote_read adapter for Google Cloud Monitoring")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Option<AdapterCommands>,

    #[arg(
        long = "web.listen-address",
        help = "Address to listen on for web endpoints"
    )]
    listen_address: Option<String>,

    #[arg(long = "project-id", help = "GCP project ID to query")]
    project_id: Option<String>,
}

#[derive(Subcommand)]
enum AdapterCommands {
    #[command(flatten)]
    Common(CommonCommands),
}

impl Default for AdapterCommands {
    fn default() -> Self {
        Self::Common(CommonCommands::Start)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    utils::init_logging(&cli.common);

    let mut config = utils::load_config(cli.common.config.as_ref())?;
    // flags win over file and environment
    if let Some(addr) = cli.listen_address {
        config.server.listen_addr = addr;
    }
    if let Some(project_id) = cli.project_id {
        config.backend.project_id = project_id;
    }

    let command = cli.command.unwrap_or_default();
    let AdapterCommands::Common(ref common_cmd) = command;
    if utils::handle_common_command(common_cmd, &config).await? {
        return Ok(());
    }

    utils::validate_config(&config)?;

    info!("Starting {}", utils::version_info());

    let client = HttpMonitoringClient::new(&config.backend)
        .context("Error creating Cloud Monitoring client")?;

    match adapter::serve(&config, Arc::new(client)).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!(error = %e, "Adapter failed");
            Err(e)
        }
    }
}
