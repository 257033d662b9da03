//! Session settings.

use serde::{Deserialize, Serialize};

use crate::SessionError;

/// Configuration for session behavior.
///
/// `max_inactive_interval` is both the in-memory notion of the session's
/// timeout and the TTL written to the store. Values are checked on first
/// use, not at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Seconds a session may sit idle before the store drops it.
    ///
    /// Default: 1800 (30 minutes). Must be greater than 0.
    pub max_inactive_interval: u64,

    /// Random bytes in a generated session id. The id is their
    /// lowercase hex form, so the default of 16 yields 32 characters.
    pub session_id_length: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_inactive_interval: 1800,
            session_id_length: 16,
        }
    }
}

impl SessionConfig {
    /// # Errors
    /// Returns [`SessionError::InvalidConfig`] for a zero interval or a
    /// zero id length.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.max_inactive_interval == 0 {
            return Err(SessionError::InvalidConfig(
                "max_inactive_interval must be greater than 0".into(),
            ));
        }
        if self.session_id_length == 0 {
            return Err(SessionError::InvalidConfig(
                "session_id_length must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_thirty_minutes() {
        let config = SessionConfig::default();
        assert_eq!(config.max_inactive_interval, 1800);
        assert_eq!(config.session_id_length, 16);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_interval_returns_invalid_config() {
        let config = SessionConfig {
            max_inactive_interval: 0,
            ..SessionConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SessionError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validate_zero_id_length_returns_invalid_config() {
        let config = SessionConfig {
            session_id_length: 0,
            ..SessionConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
