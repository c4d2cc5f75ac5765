use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(name = "settings-relay", version, about = "Relay dconf change notifications to a collector")]
pub struct Cli {
    /// Print debugging information.
    #[arg(long, global = true)]
    pub debug: bool,

    /// Write logs as JSON lines on stderr.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Schema registry document (JSON).
    #[arg(long, global = true, default_value = "schemas.json")]
    pub schemas: PathBuf,

    /// Options for the default `run` command.
    #[command(flatten)]
    pub run: RunArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Relay notifications to the collector until the feed ends or a signal arrives (default).
    Run(RunArgs),

    /// Process a recorded feed and print the resulting events as JSON lines.
    Replay {
        /// Recorded feed (one JSON notification per line).
        #[arg(long)]
        feed: PathBuf,

        /// Configuration file (namespace and passthrough rules).
        #[arg(long, value_name = "CONFIGFILE")]
        configuration: Option<PathBuf>,

        /// Print engine counters and per-path state after the events.
        #[arg(long)]
        summary: bool,
    },

    /// Load the schema registry and print what was found.
    Catalog,
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Collector host (default: localhost).
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,

    /// Collector port (default: 8181).
    #[arg(long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Configuration file; its [logger] values override --host and --port.
    #[arg(long, value_name = "CONFIGFILE")]
    pub configuration: Option<PathBuf>,

    /// Full collector base URL, e.g. http://admin:8181/submit_change/ (overrides everything).
    #[arg(long, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Read notifications from this file instead of stdin.
    #[arg(long)]
    pub feed: Option<PathBuf>,
}
