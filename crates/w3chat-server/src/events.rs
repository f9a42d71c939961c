use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use w3chat_shared::LedgerEvent;

/// Log every committed ledger notification until the ledger goes away.
pub fn spawn_event_logger(mut rx: broadcast::Receiver<LedgerEvent>) -> JoinHandle<u64> {
    tokio::spawn(async move {
        let mut seen = 0u64;
        loop {
            match rx.recv().await {
                Ok(event) => {
                    seen += 1;
                    let payload = serde_json::to_string(&event).unwrap_or_default();
                    info!(event = event.name(), group = ?event.group_id(), %payload, "Ledger event");
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event logger lagged behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
        seen
    })
}
