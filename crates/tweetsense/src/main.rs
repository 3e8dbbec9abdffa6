//! `tweetsense` - CLI for the tweetsense sentiment service
//!
//! This binary runs the HTTP API and offers local commands for scoring text,
//! managing accounts, and inspecting the database.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use anyhow::{bail, Context};
use clap::Parser;

use tweetsense::cli::{
    AnalyzeCommand, Cli, Command, ConfigCommand, HistoryCommand, ServeCommand, UserCommand,
};
use tweetsense::{init_logging, AccountRules, Config, SentimentAnalyzer, Storage};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone()).context("failed to load configuration")?;

    match cli.command {
        Command::Serve(cmd) => handle_serve(config, cmd),
        Command::Analyze(cmd) => handle_analyze(&config, &cmd),
        Command::User(cmd) => handle_user(&config, cmd),
        Command::History(cmd) => handle_history(&config, &cmd),
        Command::Status(cmd) => handle_status(&config, cmd.json),
        Command::Config(cmd) => handle_config(&config, cmd),
    }
}

fn open_storage(config: &Config) -> anyhow::Result<Storage> {
    let path = config.database_path();
    Storage::open(&path).with_context(|| format!("failed to open database {}", path.display()))
}

fn handle_serve(mut config: Config, cmd: ServeCommand) -> anyhow::Result<()> {
    if let Some(host) = cmd.host {
        config.server.host = host;
    }
    if let Some(port) = cmd.port {
        config.server.port = port;
    }
    config.validate()?;

    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    runtime.block_on(tweetsense::server::serve(config))?;
    Ok(())
}

fn handle_analyze(config: &Config, cmd: &AnalyzeCommand) -> anyhow::Result<()> {
    if cmd.text.trim().is_empty() {
        bail!("text must not be empty");
    }

    let analysis = config.analyzer()?.analyze(&cmd.text, &config.thresholds());

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
    } else {
        let scores = analysis.scores;
        println!("Sentiment:  {}", analysis.sentiment);
        println!("Compound:   {:.4}", scores.compound);
        println!(
            "Breakdown:  pos {:.3}  neu {:.3}  neg {:.3}",
            scores.pos, scores.neu, scores.neg
        );
    }
    Ok(())
}

fn handle_user(config: &Config, cmd: UserCommand) -> anyhow::Result<()> {
    let storage = open_storage(config)?;

    match cmd {
        UserCommand::Add {
            username,
            password,
            admin,
        } => {
            AccountRules::from_config(&config.auth)?.check(&username, &password)?;
            let Some(id) = storage.register_user(&username, &password)? else {
                bail!("username already exists: {username}");
            };
            if admin {
                storage.set_admin(&username, true)?;
            }
            println!(
                "Created account {id} ({username}){}",
                if admin { " with admin role" } else { "" }
            );
        }
        UserCommand::Promote { username } => {
            if !storage.set_admin(&username, true)? {
                bail!("no such account: {username}");
            }
            println!("Granted admin role to {username}");
        }
        UserCommand::Demote { username } => {
            if !storage.set_admin(&username, false)? {
                bail!("no such account: {username}");
            }
            println!("Revoked admin role from {username}");
        }
        UserCommand::List { json } => {
            let users = storage.list_users()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&users)?);
            } else if users.is_empty() {
                println!("No accounts registered.");
            } else {
                println!("{:>6}  {:<32}  ROLE", "ID", "USERNAME");
                for user in users {
                    let role = if user.is_admin { "admin" } else { "user" };
                    println!("{:>6}  {:<32}  {role}", user.id, user.username);
                }
            }
        }
    }
    Ok(())
}

fn handle_history(config: &Config, cmd: &HistoryCommand) -> anyhow::Result<()> {
    let storage = open_storage(config)?;

    let Some(account) = storage.find_account(&cmd.username)? else {
        bail!("no such account: {}", cmd.username);
    };
    let entries = storage.get_history(account.id, cmd.limit)?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No history for {}.", account.username);
        return Ok(());
    }

    for entry in entries {
        println!(
            "{}  {:<8}  {:>7.4}  {}",
            entry.created_at.format("%Y-%m-%d %H:%M:%S"),
            entry.sentiment,
            entry.compound,
            entry.text.replace('\n', " ")
        );
    }
    Ok(())
}

fn handle_status(config: &Config, json: bool) -> anyhow::Result<()> {
    let storage = open_storage(config)?;
    let stats = storage.stats()?;

    if json {
        let status = serde_json::json!({
            "database_path": storage.path(),
            "total_users": stats.total_users,
            "total_admins": stats.total_admins,
            "total_entries": stats.total_entries,
            "db_size_bytes": stats.db_size_bytes,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("tweetsense status");
        println!("-----------------");
        println!("Database:      {}", storage.path().display());
        println!("Accounts:      {}", stats.total_users);
        println!("Admins:        {}", stats.total_admins);
        println!("History:       {} entries", stats.total_entries);
        println!("Size:          {} bytes", stats.db_size_bytes);
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                let origins = if config.server.cors_origins.is_empty() {
                    "any".to_string()
                } else {
                    config.server.cors_origins.join(", ")
                };

                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Server]");
                println!("  Host:               {}", config.server.host);
                println!("  Port:               {}", config.server.port);
                println!("  CORS origins:       {origins}");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Sentiment]");
                println!(
                    "  Positive threshold: {}",
                    config.sentiment.positive_threshold
                );
                println!(
                    "  Negative threshold: {}",
                    config.sentiment.negative_threshold
                );
                println!("  Max text length:    {}", config.sentiment.max_text_length);
                println!(
                    "  Lexicon overrides:  {}",
                    config.sentiment.lexicon_overrides.len()
                );
                println!(
                    "  Lexicon file:       {}",
                    config
                        .sentiment
                        .lexicon_path
                        .as_ref()
                        .map_or_else(|| "built-in".to_string(), |p| p.display().to_string())
                );
                println!();
                println!("[Auth]");
                println!("  Username pattern:   {}", config.auth.username_pattern);
                println!(
                    "  Min password len:   {}",
                    config.auth.min_password_length
                );
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => bail!("configuration error: {e}"),
            }
        }
    }
    Ok(())
}
