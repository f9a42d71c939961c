//! Domain model structs persisted in the ledger database.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! directly to the API layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use w3chat_shared::{Address, GroupId};

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A registered identity. `User::default()` is the record reported for an
/// address that never registered.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Owner principal.
    pub address: Address,
    /// Full display name as registered.
    pub name: String,
    /// Leading token of `name`; unique ignoring ASCII case.
    pub first_name: String,
    /// Opaque content reference of the avatar (e.g. an IPFS CID).
    pub image_ref: String,
    /// `true` for every stored record.
    pub is_registered: bool,
    /// When the registration committed.
    pub registered_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// One entry of a private thread.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PrivateMessage {
    pub sender: Address,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// One entry of a group's message log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GroupMessage {
    pub group_id: GroupId,
    pub sender: Address,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Groups
// ---------------------------------------------------------------------------

/// A group chat. `members[0]` is always the admin.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub admin: Address,
    pub members: Vec<Address>,
    pub created_at: DateTime<Utc>,
}

/// Public view of a group returned by `get_group_info`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupInfo {
    pub name: String,
    pub admin: Address,
    pub members: Vec<Address>,
}

impl From<Group> for GroupInfo {
    fn from(g: Group) -> Self {
        Self {
            name: g.name,
            admin: g.admin,
            members: g.members,
        }
    }
}
