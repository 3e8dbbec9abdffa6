//! Account and history types for tweetsense.
//!
//! This module defines the records the storage layer hands out, along with
//! password credential handling and the rules new accounts must satisfy.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;
use crate::error::{Error, Result};
use crate::sentiment::Sentiment;

/// Context string for deriving password hashes.
const PASSWORD_HASH_CONTEXT: &str = "tweetsense 2026-10 account password v1";

/// Number of random salt bytes per credential.
const SALT_LEN: usize = 16;

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier (assigned by storage layer).
    pub id: i64,

    /// Unique login name.
    pub username: String,

    /// Whether this account may list all users.
    pub is_admin: bool,

    /// When the account was registered.
    pub created_at: DateTime<Utc>,
}

/// An entry in the admin user listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    /// Account identifier.
    pub id: i64,
    /// Login name.
    pub username: String,
    /// Whether the account is an admin.
    pub is_admin: bool,
}

impl From<Account> for UserSummary {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            username: account.username,
            is_admin: account.is_admin,
        }
    }
}

/// One analyzed snippet in an account's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Unique identifier (assigned by storage layer).
    pub id: i64,

    /// The analyzed text.
    pub text: String,

    /// The label assigned at analysis time.
    pub sentiment: Sentiment,

    /// The compound score at analysis time.
    pub compound: f64,

    /// When the text was analyzed.
    pub created_at: DateTime<Utc>,
}

/// A salted password hash in its stored `salt$hash` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    salt: String,
    hash: blake3::Hash,
}

impl Credential {
    /// Hash a password under a fresh random salt.
    #[must_use]
    pub fn new(password: &str) -> Self {
        let salt = hex::encode(rand::random::<[u8; SALT_LEN]>());
        let hash = Self::derive(&salt, password);
        Self { salt, hash }
    }

    /// Parse a stored `salt$hash` record.
    ///
    /// Returns `None` if the record is malformed.
    #[must_use]
    pub fn parse(stored: &str) -> Option<Self> {
        let (salt, hash) = stored.split_once('$')?;
        if salt.is_empty() {
            return None;
        }
        let hash = blake3::Hash::from_hex(hash).ok()?;
        Some(Self {
            salt: salt.to_string(),
            hash,
        })
    }

    /// Check a candidate password against this credential.
    ///
    /// The comparison runs in constant time.
    #[must_use]
    pub fn verify(&self, password: &str) -> bool {
        Self::derive(&self.salt, password) == self.hash
    }

    /// Encode for storage.
    #[must_use]
    pub fn encode(&self) -> String {
        format!("{}${}", self.salt, self.hash.to_hex())
    }

    fn derive(salt: &str, password: &str) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new_derive_key(PASSWORD_HASH_CONTEXT);
        hasher.update(salt.as_bytes());
        hasher.update(password.as_bytes());
        hasher.finalize()
    }
}

/// Username and password requirements for new accounts.
///
/// Shared by the `/register` route and `tweetsense user add`.
#[derive(Debug, Clone)]
pub struct AccountRules {
    pattern: String,
    username: Regex,
    min_password_length: usize,
}

impl AccountRules {
    /// Compile the rules from configuration.
    ///
    /// The username pattern is anchored at both ends, so it must match the
    /// whole username.
    ///
    /// # Errors
    ///
    /// Returns an error if the username pattern is not a valid regex.
    pub fn from_config(auth: &AuthConfig) -> Result<Self> {
        let username = Regex::new(&format!("^(?:{})$", auth.username_pattern)).map_err(|e| {
            Error::ConfigValidation {
                message: format!("invalid regex pattern: {e}"),
            }
        })?;

        Ok(Self {
            pattern: auth.username_pattern.clone(),
            username,
            min_password_length: auth.min_password_length.max(1),
        })
    }

    /// Check whether a username is acceptable.
    #[must_use]
    pub fn is_valid_username(&self, username: &str) -> bool {
        self.username.is_match(username)
    }

    /// Check a proposed username and password.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] naming the first rule broken.
    pub fn check(&self, username: &str, password: &str) -> Result<()> {
        if !self.is_valid_username(username) {
            return Err(Error::invalid_input(format!(
                "Invalid username: must match {}",
                self.pattern
            )));
        }
        if password.chars().count() < self.min_password_length {
            return Err(Error::invalid_input(format!(
                "Password must be at least {} characters",
                self.min_password_length
            )));
        }
        Ok(())
    }
}
