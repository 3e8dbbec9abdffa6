//! Configuration management for tweetsense.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::account::AccountRules;
use crate::error::{Error, Result};
use crate::sentiment::{Lexicon, LexiconAnalyzer, Thresholds};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "tweetsense";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "users.db";

/// Prefix for environment variable overrides.
const ENV_PREFIX: &str = "TWEETSENSE_";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `TWEETSENSE_`, nested with `__`)
/// 2. TOML config file at `~/.config/tweetsense/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration.
    pub server: ServerConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Sentiment analysis configuration.
    pub sentiment: SentimentConfig,
    /// Account rules.
    pub auth: AuthConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Origins allowed by CORS. Empty allows any origin.
    pub cors_origins: Vec<String>,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/tweetsense/users.db`
    pub database_path: Option<PathBuf>,
}

/// Sentiment-analysis configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentConfig {
    /// Compound scores at or above this are positive.
    pub positive_threshold: f64,
    /// Compound scores at or below this are negative.
    pub negative_threshold: f64,
    /// Maximum accepted text length in characters.
    pub max_text_length: usize,
    /// Lexicon file merged over the built-in word list, in VADER's
    /// `token<TAB>valence` layout (`vader_lexicon.txt` works as is).
    pub lexicon_path: Option<PathBuf>,
    /// Extra or replacement lexicon entries (word to valence in `[-4, 4]`).
    /// Applied after `lexicon_path`.
    pub lexicon_overrides: BTreeMap<String, f64>,
}

/// Account-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Regex that usernames must match in full. The pattern is anchored at
    /// both ends when compiled, so `[a-z]+` rejects `Bob`.
    pub username_pattern: String,
    /// Minimum password length in characters.
    pub min_password_length: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: Vec::new(),
        }
    }
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            positive_threshold: 0.05,
            negative_threshold: -0.05,
            max_text_length: 1000,
            lexicon_path: None,
            lexicon_overrides: BTreeMap::new(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            username_pattern: r"^[A-Za-z0-9_.-]{1,32}$".to_string(),
            min_password_length: 1,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        let s = &self.sentiment;

        if !(-1.0..=1.0).contains(&s.positive_threshold)
            || !(-1.0..=1.0).contains(&s.negative_threshold)
        {
            return Err(invalid(format!(
                "sentiment thresholds must lie in [-1, 1] (got {} and {})",
                s.negative_threshold, s.positive_threshold
            )));
        }

        if s.negative_threshold >= s.positive_threshold {
            return Err(invalid(format!(
                "negative_threshold ({}) must be less than positive_threshold ({})",
                s.negative_threshold, s.positive_threshold
            )));
        }

        if s.max_text_length == 0 {
            return Err(invalid("max_text_length must be greater than 0"));
        }

        for (word, valence) in &s.lexicon_overrides {
            if !(-4.0..=4.0).contains(valence) {
                return Err(invalid(format!(
                    "lexicon override for '{word}' has valence {valence} outside [-4, 4]"
                )));
            }
        }

        if let Some(path) = &s.lexicon_path {
            if !path.is_file() {
                return Err(invalid(format!(
                    "lexicon_path {} is not a readable file",
                    path.display()
                )));
            }
        }

        AccountRules::from_config(&self.auth)?;

        if self.server.port == 0 {
            return Err(invalid("port must be greater than 0"));
        }

        self.bind_address()?;

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the socket address the server binds.
    ///
    /// # Errors
    ///
    /// Returns an error if `server.host` is not an IPv4 or IPv6 address.
    /// IPv6 hosts may be written with or without brackets.
    pub fn bind_address(&self) -> Result<SocketAddr> {
        let host = self.server.host.trim();
        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);

        let ip: IpAddr = host
            .parse()
            .map_err(|_| invalid(format!("invalid server host: {}", self.server.host)))?;
        Ok(SocketAddr::new(ip, self.server.port))
    }

    /// Get the classification thresholds.
    #[must_use]
    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            positive: self.sentiment.positive_threshold,
            negative: self.sentiment.negative_threshold,
        }
    }

    /// Build the analyzer described by this configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `sentiment.lexicon_path` cannot be loaded.
    pub fn analyzer(&self) -> Result<LexiconAnalyzer> {
        let mut lexicon = Lexicon::builtin();
        if let Some(path) = &self.sentiment.lexicon_path {
            let count = lexicon.merge_file(path)?;
            debug!("Loaded {} lexicon entries from {}", count, path.display());
        }
        lexicon.merge(&self.sentiment.lexicon_overrides);
        Ok(LexiconAnalyzer::with_lexicon(lexicon))
    }
}

fn invalid(message: impl Into<String>) -> Error {
    Error::ConfigValidation {
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sentiment::SentimentAnalyzer;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8000);
        assert!(config.server.cors_origins.is_empty());
        assert!(config.storage.database_path.is_none());
        assert_eq!(config.sentiment.max_text_length, 1000);
        assert_eq!(config.auth.min_password_length, 1);
    }

    #[test]
    fn test_default_thresholds() {
        let config = Config::default();
        assert_eq!(config.thresholds(), Thresholds::default());
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_inverted_thresholds() {
        let mut config = Config::default();
        config.sentiment.positive_threshold = -0.1;
        config.sentiment.negative_threshold = 0.1;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("negative_threshold"));
    }

    #[test]
    fn test_validate_threshold_out_of_range() {
        let mut config = Config::default();
        config.sentiment.positive_threshold = 1.5;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("[-1, 1]"));
    }

    #[test]
    fn test_validate_zero_text_length() {
        let mut config = Config::default();
        config.sentiment.max_text_length = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("max_text_length"));
    }

    #[test]
    fn test_validate_override_out_of_range() {
        let mut config = Config::default();
        config
            .sentiment
            .lexicon_overrides
            .insert("meh".to_string(), -7.0);

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("meh"));
    }

    #[test]
    fn test_validate_invalid_regex() {
        let mut config = Config::default();
        config.auth.username_pattern = "[invalid".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("invalid regex"));
    }

    #[test]
    fn test_validate_zero_port() {
        let mut config = Config::default();
        config.server.port = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("port"));
    }

    #[test]
    fn test_validate_bad_host() {
        let mut config = Config::default();
        config.server.host = "not an ip".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("invalid server host"));
    }

    #[test]
    fn test_bind_address() {
        let mut config = Config::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = 9000;

        assert_eq!(
            config.bind_address().unwrap(),
            "127.0.0.1:9000".parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    fn test_bind_address_ipv6() {
        let mut config = Config::default();
        config.server.port = 8080;

        for host in ["::1", "[::1]", "::"] {
            config.server.host = host.to_string();
            assert!(config.validate().is_ok(), "{host} rejected");
            let address = config.bind_address().unwrap();
            assert!(address.is_ipv6());
            assert_eq!(address.port(), 8080);
        }
    }

    #[test]
    fn test_validate_unanchored_pattern_is_accepted() {
        let mut config = Config::default();
        config.auth.username_pattern = "[a-z]+".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_database_path_default() {
        let path = Config::default().database_path();
        assert!(path.to_string_lossy().contains("users.db"));
        assert!(path.to_string_lossy().contains("tweetsense"));
    }

    #[test]
    fn test_database_path_custom() {
        let mut config = Config::default();
        config.storage.database_path = Some(PathBuf::from("/custom/path/db.sqlite"));

        assert_eq!(
            config.database_path(),
            PathBuf::from("/custom/path/db.sqlite")
        );
    }

    #[test]
    fn test_analyzer_applies_overrides() {
        let mut config = Config::default();
        config
            .sentiment
            .lexicon_overrides
            .insert("shipit".to_string(), 3.0);

        let scores = config.analyzer().unwrap().polarity_scores("shipit");
        assert!(scores.compound > 0.5);
    }

    #[test]
    fn test_analyzer_loads_lexicon_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vader_lexicon.txt");
        std::fs::write(&path, "shipit\t-2.0\t0.5\t[-2, -2]\nyeet\t1.5\t0.5\t[1, 2]\n").unwrap();

        let mut config = Config::default();
        config.sentiment.lexicon_path = Some(path);
        config
            .sentiment
            .lexicon_overrides
            .insert("shipit".to_string(), 3.0);
        assert!(config.validate().is_ok());

        let analyzer = config.analyzer().unwrap();
        assert!(analyzer.polarity_scores("yeet").compound > 0.3);
        // Overrides apply after the file.
        assert!(analyzer.polarity_scores("shipit").compound > 0.5);
    }

    #[test]
    fn test_validate_missing_lexicon_file() {
        let mut config = Config::default();
        config.sentiment.lexicon_path = Some(PathBuf::from("/nonexistent/lexicon.txt"));

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("lexicon_path"));
        assert!(config.analyzer().is_err());
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("tweetsense"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        figment::Jail::expect_with(|_| {
            let config = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml")))
                .map_err(|e| figment::Error::from(e.to_string()))?;
            assert_eq!(config, Config::default());
            Ok(())
        });
    }

    #[test]
    fn test_load_from_toml_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
[server]
port = 9123

[sentiment]
positive_threshold = 0.2

[sentiment.lexicon_overrides]
shipit = 2.5
"#,
            )?;

            let config = Config::load_from(Some(PathBuf::from("config.toml")))
                .map_err(|e| figment::Error::from(e.to_string()))?;
            assert_eq!(config.server.port, 9123);
            assert!((config.sentiment.positive_threshold - 0.2).abs() < f64::EPSILON);
            assert_eq!(config.sentiment.lexicon_overrides.get("shipit"), Some(&2.5));
            assert_eq!(config.server.host, "0.0.0.0");
            Ok(())
        });
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[sentiment]\nmax_text_length = 0\n")?;

            assert!(Config::load_from(Some(PathBuf::from("config.toml"))).is_err());
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_nested_keys() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                "[server]\nport = 7000\n\n[sentiment]\nmax_text_length = 50\n",
            )?;
            jail.set_env("TWEETSENSE_SERVER__PORT", "9000");
            jail.set_env("TWEETSENSE_SENTIMENT__MAX_TEXT_LENGTH", "5");
            jail.set_env("TWEETSENSE_AUTH__MIN_PASSWORD_LENGTH", "8");

            let config = Config::load_from(Some(PathBuf::from("config.toml")))
                .map_err(|e| figment::Error::from(e.to_string()))?;

            assert_eq!(config.server.port, 9000);
            assert_eq!(config.sentiment.max_text_length, 5);
            assert_eq!(config.auth.min_password_length, 8);
            assert_eq!(config.server.host, "0.0.0.0");
            Ok(())
        });
    }

    #[test]
    fn test_env_override_is_validated() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("TWEETSENSE_SERVER__PORT", "0");

            let err = Config::load_from(Some(PathBuf::from("missing.toml"))).unwrap_err();
            assert!(err.to_string().contains("port"), "got {err}");
            Ok(())
        });
    }

    #[test]
    fn test_config_serialize_roundtrip_keys() {
        let json = serde_json::to_string(&Config::default()).unwrap();
        assert!(json.contains("positive_threshold"));
        assert!(json.contains("username_pattern"));
        assert!(json.contains("cors_origins"));
    }
}
