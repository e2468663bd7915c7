//! offcache - Offline asset cache for static sites
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use offcache::cli::args::{ConfigAction, ConfigArgs};
use offcache::cli::{Cli, Commands, LogFormat};
use offcache::config::ConfigManager;
use offcache::error::{OffcacheError, OffcacheResult};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> OffcacheResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => {
            let creating = matches!(
                cli.command,
                Commands::Config(ConfigArgs {
                    action: Some(ConfigAction::Init { .. })
                })
            );
            if !path.exists() && !creating {
                return Err(OffcacheError::ConfigNotFound(path.clone()));
            }
            ConfigManager::with_path(path.clone())
        }
        None => ConfigManager::new(),
    };

    // Find local config unless --no-local is set
    let local_config_path = if cli.no_local {
        None
    } else {
        let cwd = std::env::current_dir()
            .map_err(|e| OffcacheError::io("getting current directory", e))?;
        ConfigManager::find_local_config(&cwd)
    };

    let config = config_manager
        .load_merged(local_config_path.as_deref())
        .await?;

    let log_format = cli.log_format.unwrap_or(match config.general.log_format.as_str() {
        "json" => LogFormat::Json,
        _ => LogFormat::Text,
    });
    init_logging(cli.verbose, log_format);

    if let Some(ref path) = local_config_path {
        debug!("Using local config: {}", path.display());
    }

    match cli.command {
        Commands::Install(args) => offcache::cli::commands::install(args, &config).await,
        Commands::Fetch(args) => offcache::cli::commands::fetch(args, &config).await,
        Commands::Activate => offcache::cli::commands::activate(&config).await,
        Commands::List(args) => offcache::cli::commands::list(args, &config).await,
        Commands::Name => offcache::cli::commands::name(&config).await,
        Commands::Stamp(args) => {
            let target = local_config_path
                .as_deref()
                .unwrap_or_else(|| config_manager.path());
            offcache::cli::commands::stamp(args, target).await
        }
        Commands::Config(args) => {
            offcache::cli::commands::config(
                args,
                &config_manager,
                local_config_path.as_deref(),
                &config,
            )
            .await
        }
    }
}

/// Initialize logging: 0 = warn, 1 = info, 2+ = debug. `OFFCACHE_LOG` wins.
fn init_logging(verbose: u8, format: LogFormat) {
    let filter = EnvFilter::try_from_env("OFFCACHE_LOG").unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("offcache=warn"),
        1 => EnvFilter::new("offcache=info"),
        _ => EnvFilter::new("offcache=debug"),
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.without_time().init(),
    }
}
