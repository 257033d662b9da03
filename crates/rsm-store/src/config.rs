//! Connection settings for the Redis-backed store.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::StoreError;

/// How to reach the Redis server holding session state.
///
/// The host supplies this at startup. Nothing is checked until the
/// first command runs; see [`StoreConfig::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Server hostname or IP address.
    pub host: String,

    /// Server TCP port.
    pub port: u16,

    /// Logical database index (`SELECT n`).
    pub database: i64,

    /// Password for `AUTH`, if the server requires one.
    pub password: Option<String>,

    /// Connection timeout in milliseconds. Also bounds how long a
    /// caller waits for a pooled connection.
    pub timeout_ms: u64,

    /// Maximum number of pooled connections.
    pub pool_size: usize,

    /// Prepended to every session id to form the Redis key,
    /// e.g. `"session:"`. Empty means the id is the key.
    pub key_prefix: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6379,
            database: 0,
            password: None,
            timeout_ms: 2000,
            pool_size: 16,
            key_prefix: String::new(),
        }
    }
}

impl StoreConfig {
    /// Checks the settings for values no server would accept.
    ///
    /// # Errors
    /// Returns [`StoreError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.host.trim().is_empty() {
            return Err(StoreError::InvalidConfig("host is empty".into()));
        }
        if self.port == 0 {
            return Err(StoreError::InvalidConfig("port must be non-zero".into()));
        }
        if self.database < 0 {
            return Err(StoreError::InvalidConfig(format!(
                "database index {} is negative",
                self.database
            )));
        }
        if self.timeout_ms == 0 {
            return Err(StoreError::InvalidConfig(
                "timeout_ms must be greater than 0".into(),
            ));
        }
        if self.pool_size == 0 {
            return Err(StoreError::InvalidConfig(
                "pool_size must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// The connection timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Builds the Redis key for a session id.
    pub fn key_for(&self, id: &str) -> String {
        format!("{}{id}", self.key_prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_local_redis() {
        let config = StoreConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 6379);
        assert_eq!(config.database, 0);
        assert_eq!(config.password, None);
        assert_eq!(config.timeout(), Duration::from_secs(2));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_host_returns_invalid_config() {
        let config = StoreConfig {
            host: "  ".into(),
            ..StoreConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(StoreError::InvalidConfig(msg)) if msg.contains("host")
        ));
    }

    #[test]
    fn test_validate_zero_pool_returns_invalid_config() {
        let config = StoreConfig {
            pool_size: 0,
            ..StoreConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(StoreError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validate_negative_database_returns_invalid_config() {
        let config = StoreConfig {
            database: -1,
            ..StoreConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_key_for_applies_prefix() {
        let bare = StoreConfig::default();
        assert_eq!(bare.key_for("abc"), "abc");

        let prefixed = StoreConfig {
            key_prefix: "tomcat:session:".into(),
            ..StoreConfig::default()
        };
        assert_eq!(prefixed.key_for("abc"), "tomcat:session:abc");
    }
}
