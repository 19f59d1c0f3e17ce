//! Configuration of the connection to the external Bitcoin node.

use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    default::{POLL_INTERVAL_SECS, RPC_TIMEOUT_SECS, RPC_URL},
    errors::ConfigError,
};

/// Connection settings for a bitcoin-core compatible JSON-RPC endpoint.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    /// The URL of the RPC server.
    pub url: String,

    /// The user for Basic auth.
    pub username: String,

    /// The password for Basic auth.
    pub password: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// Interval between two confirmation polls in seconds.
    pub poll_interval_secs: u64,
}

impl std::fmt::Debug for RpcConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .field("timeout_secs", &self.timeout_secs)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .finish()
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: RPC_URL.to_string(),
            username: String::new(),
            password: String::new(),
            timeout_secs: RPC_TIMEOUT_SECS,
            poll_interval_secs: POLL_INTERVAL_SECS,
        }
    }
}

impl RpcConfig {
    /// Loads the RPC configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;

        Ok(toml::from_str(&raw)?)
    }

    /// The request timeout.
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// The polling interval.
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_hides_password() {
        let config = RpcConfig {
            password: "hunter2".to_string(),
            ..Default::default()
        };

        assert!(!format!("{config:?}").contains("hunter2"));
    }

    #[test]
    fn deserializes_from_toml() {
        let config: RpcConfig = toml::from_str(
            r#"
            url = "http://localhost:18443"
            username = "user"
            password = "pass"
        "#,
        )
        .expect("must parse");

        assert_eq!(config.url, "http://localhost:18443");
        assert_eq!(config.timeout(), Duration::from_secs(RPC_TIMEOUT_SECS));
    }
}
