//! CLI argument definitions using clap derive

use crate::network::Method;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// offcache - Offline asset cache for static sites
///
/// Pre-caches a site's assets into a named bucket, serves requests
/// cache-first and purges buckets from earlier deployments.
#[derive(Parser, Debug)]
#[command(name = "offcache")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "OFFCACHE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Skip local .offcache.toml discovery
    #[arg(long, global = true)]
    pub no_local: bool,

    /// Log output format (overrides general.log_format)
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Pre-cache the manifest into the current bucket, then activate
    Install(InstallArgs),

    /// Fetch URLs through the cache
    Fetch(FetchArgs),

    /// Delete every bucket except the current one
    Activate,

    /// List cache buckets
    List(ListArgs),

    /// Print the current cache name
    Name,

    /// Generate a build stamp for the build naming policy
    Stamp(StampArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// Arguments for the install command
#[derive(Parser, Debug)]
pub struct InstallArgs {
    /// Install only; leave stale buckets in place
    #[arg(long)]
    pub no_activate: bool,
}

/// Arguments for the fetch command
#[derive(Parser, Debug)]
pub struct FetchArgs {
    /// URLs to fetch (absolute, or relative to site.origin)
    #[arg(required = true)]
    pub urls: Vec<String>,

    /// HTTP method; only GET goes through the cache
    #[arg(short = 'X', long, default_value = "GET")]
    pub method: Method,

    /// Write the response body to a file (single URL only)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the stamp command
#[derive(Parser, Debug)]
pub struct StampArgs {
    /// Store the stamp as cache.build_stamp in the active config file
    #[arg(short, long)]
    pub write: bool,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

/// Output format for list command
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}
