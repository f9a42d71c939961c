//! Deployment record written on startup for downstream consumers
//! (front ends, scripts) that need to locate the running instance.

use std::net::SocketAddr;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ServerConfig;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    pub network: String,
    pub instance: String,
    pub version: String,
    pub http_addr: SocketAddr,
    pub database: Option<String>,
    pub deployed_at: DateTime<Utc>,
}

impl DeploymentRecord {
    pub fn new(config: &ServerConfig, database: Option<&Path>) -> Self {
        Self {
            network: config.network.clone(),
            instance: config.instance_name.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            http_addr: config.http_addr,
            database: database.map(|p| p.display().to_string()),
            deployed_at: Utc::now(),
        }
    }

    /// Write the record as pretty-printed JSON, creating parent directories.
    pub async fn write(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(self)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }
}
