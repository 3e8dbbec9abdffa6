//! Storage layer for tweetsense.
//!
//! This module provides `SQLite`-based persistent storage for accounts and
//! their sentiment analysis history.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, warn};

use crate::account::{Account, Credential, HistoryEntry, UserSummary};
use crate::error::{Error, Result};
use crate::sentiment::Sentiment;

/// Storage engine for accounts and history.
///
/// Provides persistent storage using `SQLite` with support for:
/// - Account registration and credential verification
/// - Admin flag management
/// - Per-account analysis history
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// Initializes the schema if this is a new database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        // WAL lets the CLI read while the server writes.
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Register a new account.
    ///
    /// Returns the new account ID, or `None` if the username is taken.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn register_user(&self, username: &str, password: &str) -> Result<Option<i64>> {
        let credential = Credential::new(password).encode();
        let created_at = Utc::now().to_rfc3339();

        let result = self.conn.execute(
            "INSERT INTO users (username, password, created_at) VALUES (?1, ?2, ?3)",
            params![username, credential, created_at],
        );

        match result.map_err(Error::from) {
            Ok(_) => {
                let id = self.conn.last_insert_rowid();
                debug!("Registered account {} with id {}", username, id);
                Ok(Some(id))
            }
            Err(e) if e.is_unique_violation() => {
                debug!("Username {} already exists", username);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Check a username and password.
    ///
    /// Returns the account ID if the credentials match, `None` otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails or the stored
    /// credential is corrupt.
    pub fn verify_user(&self, username: &str, password: &str) -> Result<Option<i64>> {
        let row: Option<(i64, String)> = self
            .conn
            .query_row(
                "SELECT id, password FROM users WHERE username = ?1",
                [username],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((id, stored)) = row else {
            return Ok(None);
        };

        let credential =
            Credential::parse(&stored).ok_or(Error::CorruptCredential { account_id: id })?;
        Ok(credential.verify(password).then_some(id))
    }

    /// Append an analyzed text to an account's history.
    ///
    /// Returns the new entry ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails, including when the
    /// account does not exist.
    pub fn save_history(
        &self,
        account_id: i64,
        text: &str,
        sentiment: Sentiment,
        compound: f64,
    ) -> Result<i64> {
        let created_at = Utc::now().to_rfc3339();
        self.conn.execute(
            r"
            INSERT INTO history (account_id, text, sentiment, compound, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
            params![account_id, text, sentiment.as_str(), compound, created_at],
        )?;

        let id = self.conn.last_insert_rowid();
        debug!("Saved history entry {} for account {}", id, account_id);
        Ok(id)
    }

    /// Get an account's history, oldest first.
    ///
    /// With a limit, only the most recent `limit` entries are returned (still
    /// oldest first).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_history(&self, account_id: i64, limit: Option<usize>) -> Result<Vec<HistoryEntry>> {
        let limit_i64 = limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));

        let mut stmt = self.conn.prepare(
            r"
            SELECT id, text, sentiment, compound, created_at FROM (
                SELECT id, text, sentiment, compound, created_at
                FROM history WHERE account_id = ?1
                ORDER BY id DESC LIMIT ?2
            ) ORDER BY id ASC
            ",
        )?;

        let entries = stmt
            .query_map(params![account_id, limit_i64], Self::row_to_history)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    /// Check whether an account has the admin flag.
    ///
    /// Unknown accounts are not admins.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn is_admin(&self, account_id: i64) -> Result<bool> {
        let flag: Option<bool> = self
            .conn
            .query_row(
                "SELECT is_admin FROM users WHERE id = ?1",
                [account_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(flag.unwrap_or(false))
    }

    /// List all accounts, ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_users(&self) -> Result<Vec<UserSummary>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, username, is_admin FROM users ORDER BY id ASC")?;

        let users = stmt
            .query_map([], |row| {
                Ok(UserSummary {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    is_admin: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(users)
    }

    /// Get an account by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_account(&self, account_id: i64) -> Result<Option<Account>> {
        let account = self
            .conn
            .query_row(
                "SELECT id, username, is_admin, created_at FROM users WHERE id = ?1",
                [account_id],
                Self::row_to_account,
            )
            .optional()?;
        Ok(account)
    }

    /// Get an account by username.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn find_account(&self, username: &str) -> Result<Option<Account>> {
        let account = self
            .conn
            .query_row(
                "SELECT id, username, is_admin, created_at FROM users WHERE username = ?1",
                [username],
                Self::row_to_account,
            )
            .optional()?;
        Ok(account)
    }

    /// Set or clear the admin flag on an account.
    ///
    /// Returns `false` if no account has that username.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn set_admin(&self, username: &str, is_admin: bool) -> Result<bool> {
        let affected = self.conn.execute(
            "UPDATE users SET is_admin = ?1 WHERE username = ?2",
            params![is_admin, username],
        )?;

        if affected > 0 {
            info!("Set admin={} for account {}", is_admin, username);
        }
        Ok(affected > 0)
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let (total_users, total_admins): (i64, i64) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(is_admin), 0) FROM users",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let total_entries: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM history", [], |row| row.get(0))?;

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            total_users,
            total_admins,
            total_entries,
            db_size_bytes,
        })
    }

    fn row_to_account(row: &rusqlite::Row) -> rusqlite::Result<Account> {
        let created_at: String = row.get(3)?;
        Ok(Account {
            id: row.get(0)?,
            username: row.get(1)?,
            is_admin: row.get(2)?,
            created_at: parse_timestamp(&created_at),
        })
    }

    fn row_to_history(row: &rusqlite::Row) -> rusqlite::Result<HistoryEntry> {
        let id: i64 = row.get(0)?;
        let sentiment_str: String = row.get(2)?;
        let created_at: String = row.get(4)?;

        let sentiment = sentiment_str.parse().unwrap_or_else(|_| {
            warn!(
                "Unknown sentiment label {} on history entry {}, treating as neutral",
                sentiment_str, id
            );
            Sentiment::Neutral
        });

        Ok(HistoryEntry {
            id,
            text: row.get(1)?,
            sentiment,
            compound: row.get(3)?,
            created_at: parse_timestamp(&created_at),
        })
    }
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}

/// Statistics about the storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageStats {
    /// Number of registered accounts.
    pub total_users: i64,
    /// Number of accounts with the admin flag.
    pub total_admins: i64,
    /// Number of history entries across all accounts.
    pub total_entries: i64,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}
