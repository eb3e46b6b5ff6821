//! Room coordinator configuration.
//!
//! Configuration is loaded from environment variables. The database
//! connection string is held as a `SecretString` and redacted in Debug
//! output.

use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use thiserror::Error;

/// Default client WebSocket bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:4480";

/// Default health/metrics endpoint bind address.
pub const DEFAULT_HEALTH_BIND_ADDRESS: &str = "0.0.0.0:8081";

/// Default identity service base URL.
pub const DEFAULT_IDENTITY_SERVICE_URL: &str = "http://localhost:8090";

/// Default bounded chat history per room (messages replayed to late joiners).
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// Default per-connection outbound event buffer.
pub const DEFAULT_CLIENT_BUFFER: usize = 64;

/// Default node id prefix.
pub const DEFAULT_NODE_ID_PREFIX: &str = "parley";

/// Room coordinator configuration.
///
/// Loaded from environment variables with sensible defaults.
#[derive(Clone)]
pub struct Config {
    /// Postgres connection URL for the durable participation store.
    /// Protected by `SecretString` to prevent accidental logging.
    pub database_url: SecretString,

    /// Client WebSocket bind address (default: "0.0.0.0:4480").
    pub bind_address: String,

    /// Health/metrics endpoint bind address (default: "0.0.0.0:8081").
    pub health_bind_address: String,

    /// Base URL of the identity lookup service.
    pub identity_service_url: String,

    /// Bounded chat history capacity per room.
    pub history_capacity: usize,

    /// Per-connection outbound event buffer; slow consumers beyond this
    /// depth have events dropped rather than stalling room fan-out.
    pub client_buffer: usize,

    /// Unique identifier for this coordinator instance (log field).
    pub node_id: String,
}

/// Custom Debug implementation that redacts the connection string.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"[REDACTED]")
            .field("bind_address", &self.bind_address)
            .field("health_bind_address", &self.health_bind_address)
            .field("identity_service_url", &self.identity_service_url)
            .field("history_capacity", &self.history_capacity)
            .field("client_buffer", &self.client_buffer)
            .field("node_id", &self.node_id)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let database_url = SecretString::from(
            vars.get("DATABASE_URL")
                .ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))?
                .clone(),
        );

        let bind_address = vars
            .get("PARLEY_BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let health_bind_address = vars
            .get("PARLEY_HEALTH_BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_HEALTH_BIND_ADDRESS.to_string());

        let identity_service_url = vars
            .get("IDENTITY_SERVICE_URL")
            .cloned()
            .unwrap_or_else(|| DEFAULT_IDENTITY_SERVICE_URL.to_string());

        let history_capacity = match vars.get("PARLEY_HISTORY_CAPACITY") {
            Some(raw) => raw.parse().map_err(|_| {
                ConfigError::InvalidValue(format!("PARLEY_HISTORY_CAPACITY: {raw}"))
            })?,
            None => DEFAULT_HISTORY_CAPACITY,
        };

        let client_buffer = match vars.get("PARLEY_CLIENT_BUFFER") {
            Some(raw) => {
                let parsed: usize = raw.parse().map_err(|_| {
                    ConfigError::InvalidValue(format!("PARLEY_CLIENT_BUFFER: {raw}"))
                })?;
                if parsed == 0 {
                    return Err(ConfigError::InvalidValue(
                        "PARLEY_CLIENT_BUFFER must be > 0".to_string(),
                    ));
                }
                parsed
            }
            None => DEFAULT_CLIENT_BUFFER,
        };

        // Generate node instance id
        let node_id = vars.get("PARLEY_NODE_ID").cloned().unwrap_or_else(|| {
            let hostname = std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string());
            let uuid_suffix = uuid::Uuid::new_v4().to_string();
            let short_suffix = uuid_suffix.get(..8).unwrap_or("00000000");
            format!("{DEFAULT_NODE_ID_PREFIX}-{hostname}-{short_suffix}")
        });

        Ok(Config {
            database_url,
            bind_address,
            health_bind_address,
            identity_service_url,
            history_capacity,
            client_buffer,
            node_id,
        })
    }
}
