//! Per-process state shared by the HTTP handlers.
//!
//! Storage is synchronous, so handlers reach it through
//! [`AppState::with_storage`], which runs the call on the blocking pool.

use std::sync::{Arc, Mutex};

use crate::account::AccountRules;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::sentiment::{SentimentAnalyzer, Thresholds};
use crate::storage::Storage;

use super::ApiError;

/// Shared state handed to every request handler.
pub struct AppState {
    /// Loaded configuration.
    pub config: Config,
    /// The scorer used by `/analyze`.
    pub analyzer: Arc<dyn SentimentAnalyzer>,
    storage: Arc<Mutex<Storage>>,
    thresholds: Thresholds,
    account_rules: AccountRules,
}

impl AppState {
    /// Build state using the analyzer described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the lexicon file cannot be loaded or the
    /// configured username pattern does not compile.
    pub fn new(config: Config, storage: Storage) -> Result<Arc<Self>> {
        let analyzer = Arc::new(config.analyzer()?);
        Self::with_analyzer(config, storage, analyzer)
    }

    /// Build state around a specific analyzer.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured username pattern does not compile.
    pub fn with_analyzer(
        config: Config,
        storage: Storage,
        analyzer: Arc<dyn SentimentAnalyzer>,
    ) -> Result<Arc<Self>> {
        let account_rules = AccountRules::from_config(&config.auth)?;

        Ok(Arc::new(Self {
            thresholds: config.thresholds(),
            config,
            analyzer,
            storage: Arc::new(Mutex::new(storage)),
            account_rules,
        }))
    }

    /// Classification thresholds from the configuration.
    #[must_use]
    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Requirements for new accounts.
    #[must_use]
    pub fn account_rules(&self) -> &AccountRules {
        &self.account_rules
    }

    /// Run a storage operation on the blocking thread pool.
    ///
    /// # Errors
    ///
    /// Returns the operation's error, or an internal error if the storage
    /// lock is poisoned or the blocking task panics.
    pub async fn with_storage<T, F>(&self, op: F) -> std::result::Result<T, ApiError>
    where
        F: FnOnce(&Storage) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let storage = Arc::clone(&self.storage);
        let outcome = tokio::task::spawn_blocking(move || {
            let guard = storage
                .lock()
                .map_err(|_| Error::internal("storage lock poisoned"))?;
            op(&guard)
        })
        .await
        .map_err(|e| ApiError::Internal(Error::internal(format!("storage task failed: {e}"))))?;

        outcome.map_err(ApiError::from)
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("thresholds", &self.thresholds)
            .finish_non_exhaustive()
    }
}
