//! Command-line interface for tweetsense.
//!
//! This module provides the CLI structure and command handlers for the
//! `tweetsense` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    AnalyzeCommand, ConfigCommand, HistoryCommand, ServeCommand, StatusCommand, UserCommand,
};

/// tweetsense - Sentiment analysis for short texts
///
/// Scores tweets and other snippets as positive, negative, or neutral, and
/// keeps a per-account history of the results behind a small HTTP API.
#[derive(Debug, Parser)]
#[command(name = "tweetsense")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP API server
    Serve(ServeCommand),

    /// Score a piece of text
    Analyze(AnalyzeCommand),

    /// Manage accounts
    #[command(subcommand)]
    User(UserCommand),

    /// Show an account's analysis history
    History(HistoryCommand),

    /// Show database status
    Status(StatusCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}
