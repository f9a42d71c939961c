use thiserror::Error;
use w3chat_shared::ChatError;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The operation violated a ledger rule; nothing was written.
    #[error("{0}")]
    Rejected(#[from] ChatError),

    /// SQLite / SQLCipher error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),

    /// A stored row could not be decoded back into a model.
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// A thread panicked while holding the ledger lock.
    #[error("Ledger lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    /// The rule violation behind this error, if it is one.
    pub fn rejection(&self) -> Option<&ChatError> {
        match self {
            StoreError::Rejected(e) => Some(e),
            _ => None,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
