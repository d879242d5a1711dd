//! Command-line interface for strictly_codegrid.

use crate::config::VerifierKind;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Strictly Codegrid - capture the grid by solving programming challenges
#[derive(Parser, Debug)]
#[command(name = "strictly_codegrid")]
#[command(about = "Territorial challenge grid game served over MCP", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every server mode
#[derive(Args, Debug, Clone)]
pub struct ServerOptions {
    /// Path to the server configuration file
    #[arg(short, long, default_value = "codegrid.toml")]
    pub config: PathBuf,

    /// Override the configured verifier
    #[arg(long, value_enum)]
    pub verifier: Option<VerifierKind>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the MCP game server (stdio mode)
    Server {
        /// Configuration and verifier options
        #[command(flatten)]
        options: ServerOptions,
    },

    /// Run the HTTP game server
    Http {
        /// Port to bind to
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Configuration and verifier options
        #[command(flatten)]
        options: ServerOptions,
    },
}
