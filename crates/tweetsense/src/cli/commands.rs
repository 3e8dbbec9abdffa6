//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Serve command arguments.
#[derive(Debug, Args)]
pub struct ServeCommand {
    /// Address to bind (overrides `server.host`)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (overrides `server.port`)
    #[arg(short, long)]
    pub port: Option<u16>,
}

/// Analyze command arguments.
#[derive(Debug, Args)]
pub struct AnalyzeCommand {
    /// The text to score
    pub text: String,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Account management commands.
#[derive(Debug, Subcommand)]
pub enum UserCommand {
    /// Register a new account
    Add {
        /// Login name for the account
        username: String,

        /// Password for the account
        #[arg(short, long)]
        password: String,

        /// Grant the admin role
        #[arg(long)]
        admin: bool,
    },

    /// Grant the admin role to an account
    Promote {
        /// Account to promote
        username: String,
    },

    /// Revoke the admin role from an account
    Demote {
        /// Account to demote
        username: String,
    },

    /// List all accounts
    List {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

/// History command arguments.
#[derive(Debug, Args)]
pub struct HistoryCommand {
    /// Account whose history to show
    pub username: String,

    /// Show only the most recent N entries
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}
