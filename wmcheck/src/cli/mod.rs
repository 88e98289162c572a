//! CLI module for wmcheck
//!
//! Provides the command-line interface for the monitoring server.

pub mod serve;

use clap::{Parser, Subcommand};

/// wmcheck - Periodic HTTP checks with response body validation
#[derive(Parser, Debug)]
#[command(name = "wmcheck")]
#[command(version, about, long_about = None)]
#[command(after_help = r#"ENVIRONMENT VARIABLES:
    WMCHECK_CONFIG_PATH           Checks file (default: ./checks.json)
    WMCHECK_HOST                  Bind address (default: 0.0.0.0)
    WMCHECK_PORT                  Listen port (default: 8000)
    WMCHECK_LOG_LEVEL             Log level (default: info)
    WMCHECK_LOG_DIR               Directory for daily log files
    WMCHECK_CHECK_INTERVAL_SECS   Seconds between runs of a check (default: 30)
    WMCHECK_REQUEST_TIMEOUT_SECS  Per-request timeout (default: 15)
    WMCHECK_INSECURE_TLS          Skip TLS certificate verification (default: true)
    WMCHECK_RESULT_BUS_CAPACITY   Result channel capacity (default: 1)
    WMCHECK_TRANSITION_POLICY     count | set (default: count)
    WMCHECK_STATIC_DIR            Directory served for unknown paths (default: .)
    WMCHECK_SLACK_TOKEN           Slack bot token
    WMCHECK_SLACK_CHANNEL         Slack channel for status changes
"#)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Server options used when no subcommand is given
    #[command(flatten)]
    pub serve: serve::ServeArgs,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the monitor and the HTTP server
    Serve(serve::ServeArgs),
}

impl Cli {
    /// サブコマンド未指定時も含めた serve の引数
    pub fn into_serve_args(self) -> serve::ServeArgs {
        match self.command {
            Some(Commands::Serve(args)) => args,
            None => self.serve,
        }
    }
}
