//! Command-line interface

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

/// SSRA credential-handoff client with a real-time lightsocket event stream
#[derive(Parser, Debug)]
#[command(name = "lightsock")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long, env = "LIGHTSOCK_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Target gateway display name (overrides config).
    /// The env fallback is the same nested key figment merges, so setting it
    /// reaches the config either way.
    #[arg(short, long, env = "LIGHTSOCK_GATEWAY__NAME")]
    pub gateway: Option<String>,

    /// How long to watch the event stream before exiting (e.g. "5s", "2m")
    #[arg(long, env = "LIGHTSOCK_WATCH", value_parser = humantime::parse_duration)]
    pub watch: Option<Duration>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        long,
        default_value = "info",
        env = "LIGHTSOCK_LOG_LEVEL",
        global = true
    )]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "LIGHTSOCK_LOG_FORMAT", global = true)]
    pub log_format: Option<String>,

    /// Subcommand (optional - defaults to connect mode)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect to the named gateway and watch its event stream (default)
    Connect,

    /// List the gateways visible to the authenticated user
    Gateways {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}
