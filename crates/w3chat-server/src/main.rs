//! # w3chat-server
//!
//! HTTP front end for the w3chat registry and messaging ledger.
//!
//! This binary provides:
//! - **REST API** (axum) exposing user registration, private threads and
//!   group chats, with the caller taken from the `x-caller-address` header
//! - **SQLite persistence** through `w3chat-store`
//! - **Deployment record** describing the running instance as JSON
//! - **Event log** of every committed ledger notification

mod api;
mod auth;
mod config;
mod deployment;
mod error;
mod events;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;
use w3chat_store::{Database, Ledger};

use crate::api::AppState;
use crate::config::ServerConfig;
use crate::deployment::DeploymentRecord;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,w3chat_server=debug,w3chat_store=debug")),
        )
        .init();

    info!("Starting w3chat server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Open the ledger
    // -----------------------------------------------------------------------
    let db = match &config.database_path {
        Some(path) => Database::open_at(path)?,
        None => Database::new()?,
    };
    let db_path = db.path();
    info!(path = ?db_path, "Database opened");

    let ledger = Arc::new(Ledger::new(db)?);
    info!(
        users = ledger.get_total_users()?,
        groups = ledger.get_group_count()?,
        "Ledger ready"
    );

    let _event_log = events::spawn_event_logger(ledger.subscribe());

    // -----------------------------------------------------------------------
    // 4. Publish the deployment record
    // -----------------------------------------------------------------------
    if let Some(path) = &config.deployment_record_path {
        let record = DeploymentRecord::new(&config, db_path.as_deref());
        record.write(path).await?;
        info!(path = %path.display(), "Deployment record written");
    }

    // -----------------------------------------------------------------------
    // 5. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    let http_addr = config.http_addr;
    let app_state = AppState {
        ledger,
        config: Arc::new(config),
    };

    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
