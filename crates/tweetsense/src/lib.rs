//! `tweetsense` - A small sentiment analysis service with user accounts
//!
//! This library provides a lexicon-based sentiment analyzer, SQLite-backed
//! account and history storage, and an HTTP API that ties them together.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod account;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod sentiment;
pub mod server;
pub mod storage;

pub use account::{Account, AccountRules, HistoryEntry, UserSummary};
pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use sentiment::{Analysis, LexiconAnalyzer, Sentiment, SentimentAnalyzer};
pub use server::{build_router, AppState};
pub use storage::{Storage, StorageStats};
