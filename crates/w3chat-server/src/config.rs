//! Server configuration loaded from environment variables.
//!
//! All settings have defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

use w3chat_shared::constants::{DEFAULT_HTTP_PORT, DEFAULT_PAGE_SIZE};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// SQLite database file.
    /// Env: `DATABASE_PATH`
    /// Default: `None`, i.e. `w3chat.db` in the platform data directory.
    pub database_path: Option<PathBuf>,

    /// Human-readable name for this instance.
    /// Env: `INSTANCE_NAME`
    /// Default: `"w3chat node"`
    pub instance_name: String,

    /// Network label written into the deployment record.
    /// Env: `NETWORK`
    /// Default: `"localhost"`
    pub network: String,

    /// Where the deployment record is written on startup.
    /// Env: `DEPLOYMENT_RECORD_PATH` (empty disables the record)
    /// Default: `./deployments.json`
    pub deployment_record_path: Option<PathBuf>,

    /// Page size used when a listing request omits `limit`.
    /// Env: `DEFAULT_PAGE_SIZE`
    /// Default: `50`
    pub default_page_size: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            database_path: None,
            instance_name: "w3chat node".to_string(),
            network: "localhost".to_string(),
            deployment_record_path: Some(PathBuf::from("./deployments.json")),
            default_page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Some(path) = lookup("DATABASE_PATH") {
            if !path.is_empty() {
                config.database_path = Some(PathBuf::from(path));
            }
        }

        if let Some(name) = lookup("INSTANCE_NAME") {
            config.instance_name = name;
        }

        if let Some(network) = lookup("NETWORK") {
            if !network.is_empty() {
                config.network = network;
            }
        }

        if let Some(path) = lookup("DEPLOYMENT_RECORD_PATH") {
            config.deployment_record_path = if path.is_empty() {
                None
            } else {
                Some(PathBuf::from(path))
            };
        }

        if let Some(val) = lookup("DEFAULT_PAGE_SIZE") {
            match val.parse::<u64>() {
                Ok(n) if n > 0 => config.default_page_size = n,
                _ => {
                    tracing::warn!(value = %val, "Invalid DEFAULT_PAGE_SIZE, using default");
                }
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter.

        config
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> ServerConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 8080).into());
        assert_eq!(config.default_page_size, 50);
        assert_eq!(config.network, "localhost");
        assert!(config.database_path.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = from_pairs(&[
            ("HTTP_ADDR", "127.0.0.1:9000"),
            ("DATABASE_PATH", "/tmp/chat.db"),
            ("NETWORK", "sepolia"),
            ("DEFAULT_PAGE_SIZE", "20"),
        ]);
        assert_eq!(config.http_addr, ([127, 0, 0, 1], 9000).into());
        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/chat.db")));
        assert_eq!(config.network, "sepolia");
        assert_eq!(config.default_page_size, 20);
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let config = from_pairs(&[("HTTP_ADDR", "not-an-addr"), ("DEFAULT_PAGE_SIZE", "0")]);
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 8080).into());
        assert_eq!(config.default_page_size, 50);
    }

    #[test]
    fn test_empty_record_path_disables_record() {
        let config = from_pairs(&[("DEPLOYMENT_RECORD_PATH", "")]);
        assert!(config.deployment_record_path.is_none());
    }
}
