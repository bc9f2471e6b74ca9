use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Common CLI arguments shared by the adapter binary
#[derive(Parser, Debug, Clone)]
pub struct CommonArgs {
    #[arg(long, help = "Configuration file path")]
    pub config: Option<PathBuf>,

    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(short, long, help = "Enable quiet mode (minimal output)")]
    pub quiet: bool,
}

/// Common subcommands
#[derive(Subcommand, Debug, Clone, Default)]
pub enum CommonCommands {
    /// Start the service (default behavior)
    #[default]
    Start,
    /// Show current configuration and exit
    Config {
        #[arg(long, help = "Show configuration in JSON format")]
        json: bool,
    },
    /// Validate configuration and exit
    Validate,
    /// Show version information and exit
    Version,
}

/// Utility functions for CLI operations
pub mod utils {
    use super::*;
    use crate::config::{Configuration, CredentialSource};
    use anyhow::{Context, Result};
    use tracing_subscriber::EnvFilter;

    /// Log level derived from the verbosity flags
    pub fn log_level(args: &CommonArgs) -> &'static str {
        if args.quiet {
            "warn"
        } else if args.verbose {
            "debug"
        } else {
            "info"
        }
    }

    /// Initialize logging based on CLI arguments. `RUST_LOG` takes precedence.
    pub fn init_logging(args: &CommonArgs) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(log_level(args)));

        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    /// Load configuration with optional override from CLI
    pub fn load_config(config_path: Option<&PathBuf>) -> Result<Configuration> {
        match config_path {
            Some(path) => {
                tracing::info!("Loading configuration from: {}", path.display());
                Configuration::load_from_path(path).context("Failed to load configuration")
            }
            None => Configuration::load().context("Failed to load configuration"),
        }
    }

    /// Display configuration in human-readable or JSON format
    pub fn display_config(config: &Configuration, json: bool) -> Result<()> {
        if json {
            let json = serde_json::to_string_pretty(config)
                .context("Failed to serialize configuration to JSON")?;
            println!("{json}");
        } else {
            println!("Stackdriver Read Adapter Configuration:");
            println!("=======================================");
            println!("Listen address: {}", config.server.listen_addr);
            println!("Project: {}", config.backend.project_resource());
            println!("Monitoring endpoint: {}", config.backend.endpoint);
            println!("Request timeout: {:?}", config.backend.request_timeout);
            match config.backend.page_size {
                Some(size) => println!("Page size: {size}"),
                None => println!("Page size: backend default"),
            }
            match (&config.backend.access_token, config.backend.credentials) {
                (Some(_), _) => println!("Auth: static access token"),
                (None, CredentialSource::ApplicationDefault) => {
                    println!("Auth: application default credentials")
                }
                (None, CredentialSource::Metadata) => {
                    println!("Auth: metadata server ({})", config.backend.metadata_token_url)
                }
            }
            println!("Query timeout: {:?}", config.query.timeout);
            println!("Empty result on error: {}", config.query.empty_on_error);
        }
        Ok(())
    }

    /// Validate configuration and report any issues
    pub fn validate_config(config: &Configuration) -> Result<()> {
        tracing::info!("Validating configuration...");

        if config.backend.project_id.is_empty() {
            anyhow::bail!("Backend project ID cannot be empty");
        }

        if config.backend.endpoint.is_empty() {
            anyhow::bail!("Backend endpoint cannot be empty");
        }

        if config.query.timeout.is_zero() {
            anyhow::bail!("Query timeout must be greater than zero");
        }

        config
            .server
            .socket_addr()
            .context("Server listen address is invalid")?;

        tracing::info!("Configuration validation passed");
        Ok(())
    }

    /// Handle common CLI commands that don't require starting the service
    pub async fn handle_common_command(
        command: &CommonCommands,
        config: &Configuration,
    ) -> Result<bool> {
        match command {
            CommonCommands::Config { json } => {
                display_config(config, *json)?;
                Ok(true)
            }
            CommonCommands::Validate => {
                validate_config(config)?;
                Ok(true)
            }
            CommonCommands::Version => {
                println!("{}", version_info());
                Ok(true)
            }
            CommonCommands::Start => Ok(false),
        }
    }

    /// Standard version information
    pub fn version_info() -> String {
        format!(
            "{} {} ({})",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            env!("CARGO_PKG_RUST_VERSION")
        )
    }
}
