//! # w3chat-shared
//!
//! Types shared by the ledger store and the HTTP host: principal addresses,
//! group and thread identifiers, first-name rules, the rejection enum and the
//! notification events.

pub mod constants;
pub mod error;
pub mod identity;
pub mod protocol;
pub mod types;

pub use error::{AddressError, ChatError};
pub use identity::FirstName;
pub use protocol::LedgerEvent;
pub use types::{Address, GroupId, Page, ThreadKey};
