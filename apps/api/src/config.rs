//! # API Configuration
//!
//! ## Load Order (later overrides earlier)
//! 1. Default values
//! 2. Config file (`api.toml` in the platform config dir, or an explicit path)
//! 3. Environment variables (`TALLY_*`)
//!
//! ## Example `api.toml`
//! ```toml
//! [server]
//! bind = "0.0.0.0"
//! port = 8080
//!
//! [database]
//! path = "/var/lib/tally/tally.db"
//! max_connections = 8
//! busy_timeout_ms = 5000
//!
//! [auth]
//! jwt_secret = "shared-with-the-identity-provider"
//!
//! [commit]
//! max_attempts = 3
//! history_limit = 50
//! ```

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use tally_checkout::DEFAULT_MAX_ATTEMPTS;
use tally_core::validation::MAX_LIST_LIMIT;
use tally_db::DbConfig;

/// Signing secret used when nothing else is configured. Only fit for local runs.
pub const DEV_JWT_SECRET: &str = "tally-dev-secret-change-in-production";

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: IpAddr,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub path: PathBuf,
    pub max_connections: u32,
    /// How long a writer waits for the SQLite lock before the commit is
    /// treated as conflicting.
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_database_path(),
            max_connections: 5,
            busy_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// HS256 secret shared with the identity provider.
    pub jwt_secret: String,
}

impl Default for AuthSettings {
    fn default() -> Self {
        AuthSettings {
            jwt_secret: DEV_JWT_SECRET.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommitSettings {
    pub max_attempts: u32,
    /// Default page size for history endpoints.
    pub history_limit: i64,
}

impl Default for CommitSettings {
    fn default() -> Self {
        CommitSettings {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            history_limit: 50,
        }
    }
}

// =============================================================================
// ApiConfig
// =============================================================================

/// Complete server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub auth: AuthSettings,

    #[serde(default)]
    pub commit: CommitSettings,
}

impl ApiConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// A missing file is not an error; an unreadable or malformed one is.
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading API config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = Self::from_toml(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;

        if config.auth.jwt_secret == DEV_JWT_SECRET {
            warn!("Using the development JWT secret; set TALLY_JWT_SECRET in production");
        }

        Ok(config)
    }

    pub fn from_toml(contents: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Applies `TALLY_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind) = lookup("TALLY_BIND") {
            self.server.bind = parse_value("TALLY_BIND", &bind)?;
        }
        if let Some(port) = lookup("TALLY_PORT") {
            self.server.port = parse_value("TALLY_PORT", &port)?;
        }
        if let Some(path) = lookup("TALLY_DATABASE_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }
        if let Some(max) = lookup("TALLY_DB_MAX_CONNECTIONS") {
            self.database.max_connections = parse_value("TALLY_DB_MAX_CONNECTIONS", &max)?;
        }
        if let Some(ms) = lookup("TALLY_DB_BUSY_TIMEOUT_MS") {
            self.database.busy_timeout_ms = parse_value("TALLY_DB_BUSY_TIMEOUT_MS", &ms)?;
        }
        if let Some(secret) = lookup("TALLY_JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Some(attempts) = lookup("TALLY_COMMIT_MAX_ATTEMPTS") {
            self.commit.max_attempts = parse_value("TALLY_COMMIT_MAX_ATTEMPTS", &attempts)?;
        }
        if let Some(limit) = lookup("TALLY_HISTORY_LIMIT") {
            self.commit.history_limit = parse_value("TALLY_HISTORY_LIMIT", &limit)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(ConfigError::Invalid("auth.jwt_secret must not be empty".into()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }
        if self.commit.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "commit.max_attempts must be greater than 0".into(),
            ));
        }
        if !(1..=MAX_LIST_LIMIT).contains(&self.commit.history_limit) {
            return Err(ConfigError::Invalid(format!(
                "commit.history_limit must be between 1 and {}",
                MAX_LIST_LIMIT
            )));
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.server.bind, self.server.port)
    }

    /// Pool settings for [`tally_db::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database.path)
            .max_connections(self.database.max_connections)
            .busy_timeout(Duration::from_millis(self.database.busy_timeout_ms))
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "tally", "pos")
            .map(|dirs| dirs.config_dir().join("api.toml"))
    }
}

fn default_database_path() -> PathBuf {
    directories::ProjectDirs::from("com", "tally", "pos")
        .map(|dirs| dirs.data_dir().join("tally.db"))
        .unwrap_or_else(|| PathBuf::from("./tally.db"))
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> ConfigResult<T> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = ApiConfig::default();
        config.validate().unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.commit.max_attempts, 3);
        assert_eq!(config.commit.history_limit, 50);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ApiConfig::from_toml(
            r#"
            [server]
            port = 9000

            [commit]
            max_attempts = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.commit.max_attempts, 5);
        assert_eq!(config.commit.history_limit, 50);
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config = ApiConfig::from_toml("[auth]\njwt_secret = \"from-file\"\n").unwrap();
        config
            .apply_overrides(env(&[
                ("TALLY_JWT_SECRET", "from-env"),
                ("TALLY_PORT", "3000"),
                ("TALLY_BIND", "127.0.0.1"),
                ("TALLY_DATABASE_PATH", "/tmp/pos.db"),
            ]))
            .unwrap();

        assert_eq!(config.auth.jwt_secret, "from-env");
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3000");
        assert_eq!(config.database.path, PathBuf::from("/tmp/pos.db"));
    }

    #[test]
    fn test_unparsable_override_is_rejected() {
        let mut config = ApiConfig::default();
        let err = config
            .apply_overrides(env(&[("TALLY_COMMIT_MAX_ATTEMPTS", "many")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_validation() {
        let mut config = ApiConfig::default();
        config.commit.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = ApiConfig::default();
        config.auth.jwt_secret = "  ".into();
        assert!(config.validate().is_err());

        let mut config = ApiConfig::default();
        config.commit.history_limit = MAX_LIST_LIMIT + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_toml() {
        assert!(matches!(
            ApiConfig::from_toml("[server]\nport = \"eighty\""),
            Err(ConfigError::Parse(_))
        ));
    }
}
