//! Engine configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::pool::DbConfig;
use salon_core::DEFAULT_TENANT_ID;

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Pool size
    pub max_connections: u32,

    /// How long a writer waits on another writer's lock, in milliseconds
    pub busy_timeout_ms: u64,

    /// Tenant stamped on new rows
    pub tenant_id: String,
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable                   | Default        |
    /// |----------------------------|----------------|
    /// | `SALON_DB_PATH`            | `./salon.db`   |
    /// | `SALON_DB_MAX_CONNECTIONS` | `5`            |
    /// | `SALON_DB_BUSY_TIMEOUT_MS` | `5000`         |
    /// | `SALON_TENANT_ID`          | default tenant |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`EngineConfig::from_env`] over an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = EngineConfig {
            database_path: lookup("SALON_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./salon.db")),

            max_connections: lookup("SALON_DB_MAX_CONNECTIONS")
                .unwrap_or_else(|| "5".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("SALON_DB_MAX_CONNECTIONS".to_string()))?,

            busy_timeout_ms: lookup("SALON_DB_BUSY_TIMEOUT_MS")
                .unwrap_or_else(|| "5000".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("SALON_DB_BUSY_TIMEOUT_MS".to_string()))?,

            tenant_id: lookup("SALON_TENANT_ID")
                .unwrap_or_else(|| DEFAULT_TENANT_ID.to_string()),
        };

        if config.max_connections == 0 {
            return Err(ConfigError::InvalidValue(
                "SALON_DB_MAX_CONNECTIONS".to_string(),
            ));
        }
        if config.tenant_id.trim().is_empty() {
            return Err(ConfigError::MissingRequired("SALON_TENANT_ID".to_string()));
        }

        Ok(config)
    }

    /// Pool configuration for [`crate::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database_path.clone())
            .max_connections(self.max_connections)
            .busy_timeout(Duration::from_millis(self.busy_timeout_ms))
            .tenant_id(self.tenant_id.clone())
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.database_path, PathBuf::from("./salon.db"));
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.busy_timeout_ms, 5000);
        assert_eq!(config.tenant_id, DEFAULT_TENANT_ID);
    }

    #[test]
    fn test_overrides_flow_into_db_config() {
        let config = EngineConfig::from_lookup(lookup_from(&[
            ("SALON_DB_PATH", "/var/lib/salon/ledger.db"),
            ("SALON_DB_MAX_CONNECTIONS", "8"),
            ("SALON_DB_BUSY_TIMEOUT_MS", "750"),
            ("SALON_TENANT_ID", "tenant-42"),
        ]))
        .unwrap();

        let db = config.db_config();
        assert_eq!(db.database_path, PathBuf::from("/var/lib/salon/ledger.db"));
        assert_eq!(db.max_connections, 8);
        assert_eq!(db.busy_timeout, Duration::from_millis(750));
        assert_eq!(db.tenant_id, "tenant-42");
    }

    #[test]
    fn test_invalid_number_names_the_variable() {
        let err = EngineConfig::from_lookup(lookup_from(&[("SALON_DB_BUSY_TIMEOUT_MS", "soon")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref v) if v == "SALON_DB_BUSY_TIMEOUT_MS"));
    }

    #[test]
    fn test_zero_connections_rejected() {
        let err = EngineConfig::from_lookup(lookup_from(&[("SALON_DB_MAX_CONNECTIONS", "0")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }
}
