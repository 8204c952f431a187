//! Configuration file parser for ~/.config/tipsheet/config.toml.
//!
//! The config file is optional; a missing file yields `Config::default()`.
//! Unknown keys are accepted by serde but logged as warnings since they are
//! usually typos.
use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::related::{RelatedStrategy, DEFAULT_RELATED_LIMIT};
use crate::search::{DEFAULT_MAX_QUERY_LENGTH, DEFAULT_SEARCH_LIMIT};

/// Overrides `api_key` from the file when set.
pub const API_KEY_ENV: &str = "TIPSHEET_API_KEY";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Which content store the CLI talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Sqlite,
    Rest,
}

/// Top-level configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// The custom Debug impl masks `api_key`.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: Backend,

    /// SQLite database file. Defaults to the platform data directory.
    pub database_path: Option<PathBuf>,

    /// Hosted API project URL, required for the `rest` backend.
    pub rest_base_url: Option<String>,

    /// API key for the hosted backend ($TIPSHEET_API_KEY takes precedence).
    pub api_key: Option<String>,

    pub search_limit: usize,

    pub max_query_length: usize,

    pub related_limit: usize,

    pub related_strategy: RelatedStrategy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: Backend::Sqlite,
            database_path: None,
            rest_base_url: None,
            api_key: None,
            search_limit: DEFAULT_SEARCH_LIMIT,
            max_query_length: DEFAULT_MAX_QUERY_LENGTH,
            related_limit: DEFAULT_RELATED_LIMIT,
            related_strategy: RelatedStrategy::Smart,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("backend", &self.backend)
            .field("database_path", &self.database_path)
            .field("rest_base_url", &self.rest_base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("search_limit", &self.search_limit)
            .field("max_query_length", &self.max_query_length)
            .field("related_limit", &self.related_limit)
            .field("related_strategy", &self.related_strategy)
            .finish()
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 8] = [
        "backend",
        "database_path",
        "rest_base_url",
        "api_key",
        "search_limit",
        "max_query_length",
        "related_limit",
        "related_strategy",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing or empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    /// - Out-of-range values → `Err(ConfigError::Invalid)`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // Check size before reading so a huge file can't exhaust memory
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Race condition: file deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        let config = Self::parse(&content)?;
        tracing::info!(path = %path.display(), backend = ?config.backend, "Loaded configuration");
        Ok(config)
    }

    /// Parse and validate config text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.search_limit == 0 {
            return Err(ConfigError::Invalid("search_limit must be at least 1".into()));
        }
        if self.max_query_length == 0 {
            return Err(ConfigError::Invalid(
                "max_query_length must be at least 1".into(),
            ));
        }
        if self.related_limit == 0 {
            return Err(ConfigError::Invalid("related_limit must be at least 1".into()));
        }
        if self.backend == Backend::Rest && self.rest_base_url.is_none() {
            return Err(ConfigError::Invalid(
                "rest_base_url is required when backend = \"rest\"".into(),
            ));
        }
        Ok(())
    }

    /// The API key to use: the environment variable wins over the file.
    pub fn resolve_api_key(&self) -> Option<SecretString> {
        Self::pick_api_key(std::env::var(API_KEY_ENV).ok(), self.api_key.as_deref())
    }

    fn pick_api_key(env: Option<String>, file: Option<&str>) -> Option<SecretString> {
        if let Some(key) = env.filter(|k| !k.trim().is_empty()) {
            tracing::debug!("Using API key from environment");
            return Some(SecretString::from(key));
        }
        file.filter(|k| !k.trim().is_empty())
            .map(|k| SecretString::from(k.to_owned()))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn write_config(name: &str, content: &str) -> (PathBuf, PathBuf) {
        let dir = std::env::temp_dir().join(format!("tipsheet_config_test_{name}"));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.backend, Backend::Sqlite);
        assert!(config.database_path.is_none());
        assert_eq!(config.search_limit, 20);
        assert_eq!(config.max_query_length, 200);
        assert_eq!(config.related_limit, 4);
        assert_eq!(config.related_strategy, RelatedStrategy::Smart);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/tipsheet_test_nonexistent_config.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.backend, Backend::Sqlite);
    }

    #[test]
    fn test_whitespace_only_file_returns_default() {
        let (dir, path) = write_config("whitespace", "   \n  \n  ");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.search_limit, 20);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_partial_config_uses_defaults_for_missing() {
        let config = Config::parse("related_strategy = \"trending\"\n").unwrap();
        assert_eq!(config.related_strategy, RelatedStrategy::Trending);
        assert_eq!(config.related_limit, 4);
        assert_eq!(config.backend, Backend::Sqlite);
    }

    #[test]
    fn test_full_config() {
        let content = r#"
backend = "rest"
database_path = "/var/lib/tipsheet/content.db"
rest_base_url = "https://proj.example.co"
api_key = "test-key-123"
search_limit = 50
max_query_length = 80
related_limit = 6
related_strategy = "category"
"#;
        let (dir, path) = write_config("full", content);

        let config = Config::load(&path).unwrap();
        assert_eq!(config.backend, Backend::Rest);
        assert_eq!(
            config.database_path.as_deref(),
            Some(Path::new("/var/lib/tipsheet/content.db"))
        );
        assert_eq!(config.rest_base_url.as_deref(), Some("https://proj.example.co"));
        assert_eq!(config.api_key.as_deref(), Some("test-key-123"));
        assert_eq!(config.search_limit, 50);
        assert_eq!(config.max_query_length, 80);
        assert_eq!(config.related_limit, 6);
        assert_eq!(config.related_strategy, RelatedStrategy::Category);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_unknown_strategy_falls_back_to_smart() {
        let config = Config::parse("related_strategy = \"popular\"\n").unwrap();
        assert_eq!(config.related_strategy, RelatedStrategy::Smart);
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let err = Config::parse("this is not [valid toml").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("Invalid TOML"));
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let config = Config::parse("search_limit = 5\ntheme = \"dark\"\n").unwrap();
        assert_eq!(config.search_limit, 5);
    }

    #[test]
    fn test_wrong_type_returns_error() {
        assert!(Config::parse("search_limit = \"lots\"\n").is_err());
        assert!(Config::parse("backend = \"postgres\"\n").is_err());
    }

    #[test]
    fn test_zero_limits_rejected() {
        for content in [
            "search_limit = 0",
            "max_query_length = 0",
            "related_limit = 0",
        ] {
            let err = Config::parse(content).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "{content}");
        }
    }

    #[test]
    fn test_rest_backend_requires_base_url() {
        let err = Config::parse("backend = \"rest\"\n").unwrap_err();
        assert!(err.to_string().contains("rest_base_url"));
    }

    #[test]
    fn test_too_large_file_rejected() {
        let (dir, path) = write_config("too_large", &"a".repeat(1_048_577));

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));
        assert!(err.to_string().contains("too large"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_env_key_takes_precedence() {
        let key = Config::pick_api_key(Some("from-env".into()), Some("from-file")).unwrap();
        assert_eq!(key.expose_secret(), "from-env");

        let key = Config::pick_api_key(Some("  ".into()), Some("from-file")).unwrap();
        assert_eq!(key.expose_secret(), "from-file");

        assert!(Config::pick_api_key(None, Some("")).is_none());
        assert!(Config::pick_api_key(None, None).is_none());
    }

    #[test]
    fn test_debug_masks_api_key() {
        let config = Config {
            api_key: Some("super-secret-key-12345".to_string()),
            ..Config::default()
        };

        let debug_output = format!("{:?}", config);
        assert!(
            !debug_output.contains("super-secret-key-12345"),
            "Debug output should not contain the API key"
        );
        assert!(debug_output.contains("[REDACTED]"));
    }

    #[test]
    fn test_debug_shows_none_when_no_api_key() {
        let debug_output = format!("{:?}", Config::default());
        assert!(!debug_output.contains("[REDACTED]"));
    }
}
