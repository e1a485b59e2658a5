//! CLI module for whatsnew.

pub mod commands;
mod output;

pub use output::Output;

use clap::{Parser, Subcommand};

/// whatsnew - AWS service updates search
///
/// Answers questions about recent AWS service launches by letting a local chat
/// model search the AWS "What's New" feed.
#[derive(Parser, Debug)]
#[command(name = "whatsnew")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Ask a question and print the model's answer
    Ask {
        /// The question to ask (e.g., "What's new in Amazon S3?")
        question: String,

        /// Also offer tools from the configured MCP servers
        #[arg(long)]
        mcp: bool,
    },

    /// Print the latest feed updates for a service, without the model
    Updates {
        /// Service name to match against update titles (case-insensitive)
        service: String,
    },

    /// List the tools offered to the model
    Tools {
        /// Include tools from the configured MCP servers
        #[arg(long)]
        mcp: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Write the current configuration to the config file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Show configuration file path
    Path,
}
