//! # w3chat-store
//!
//! Persistent ledger for the w3chat registry: users, private threads, groups
//! and group messages, backed by SQLite.
//!
//! [`Database`] exposes typed, transactional operations per table and
//! enforces the registry rules. [`Ledger`] wraps it behind one lock so that
//! every operation is applied atomically and in sequence, stamps writes with
//! a monotonic clock and publishes notifications.

pub mod batch;
pub mod clock;
pub mod database;
pub mod groups;
pub mod ledger;
pub mod migrations;
pub mod models;
pub mod private;
pub mod users;

mod error;
mod meta;

pub use batch::{CallResult, ReadCall, ReadValue};
pub use clock::{Clock, SystemClock};
pub use database::Database;
pub use error::{Result, StoreError};
pub use ledger::Ledger;
pub use models::*;
