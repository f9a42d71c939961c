//! Batched reads.
//!
//! A client that renders a chat screen needs several lookups at once
//! (profiles, thread windows, counts). [`ReadCall`] names one read-only
//! ledger query; [`crate::Ledger::batch_read`] answers a list of them from a
//! single snapshot.

use serde::{Deserialize, Serialize};
use w3chat_shared::constants::DEFAULT_PAGE_SIZE;
use w3chat_shared::{Address, FirstName, GroupId, Page};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{GroupInfo, GroupMessage, PrivateMessage, User};

fn default_limit() -> u64 {
    DEFAULT_PAGE_SIZE
}

/// One read-only query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ReadCall {
    UserProfile {
        address: Address,
    },
    IsRegistered {
        address: Address,
    },
    FirstNameAvailable {
        first_name: String,
        #[serde(default)]
        caller: Option<Address>,
    },
    ResolveFirstName {
        first_name: String,
    },
    TotalUsers,
    PrivateMessages {
        user_a: Address,
        user_b: Address,
        #[serde(default)]
        offset: u64,
        #[serde(default = "default_limit")]
        limit: u64,
    },
    PrivateMessageCount {
        user_a: Address,
        user_b: Address,
    },
    GroupInfo {
        group_id: GroupId,
    },
    GroupMessages {
        group_id: GroupId,
        #[serde(default)]
        offset: u64,
        #[serde(default = "default_limit")]
        limit: u64,
    },
    GroupMessageCount {
        group_id: GroupId,
    },
    GroupCount,
    UserGroups {
        address: Address,
    },
}

/// Answer to one [`ReadCall`].
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ReadValue {
    Profile(User),
    Flag(bool),
    Owner(Option<Address>),
    Count(u64),
    PrivateMessages(Vec<PrivateMessage>),
    Group(GroupInfo),
    GroupMessages(Vec<GroupMessage>),
    Groups(Vec<GroupId>),
}

/// Outcome of one call inside a batch.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CallResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<ReadValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Database {
    pub fn read_call(&self, call: &ReadCall) -> Result<ReadValue> {
        Ok(match call {
            ReadCall::UserProfile { address } => ReadValue::Profile(self.user_profile(address)?),
            ReadCall::IsRegistered { address } => ReadValue::Flag(self.is_registered(address)?),
            ReadCall::FirstNameAvailable { first_name, caller } => {
                ReadValue::Flag(self.first_name_available(first_name, caller.as_ref())?)
            }
            ReadCall::ResolveFirstName { first_name } => {
                ReadValue::Owner(self.first_name_owner(&FirstName::candidate(first_name))?)
            }
            ReadCall::TotalUsers => ReadValue::Count(self.total_users()?),
            ReadCall::PrivateMessages {
                user_a,
                user_b,
                offset,
                limit,
            } => ReadValue::PrivateMessages(self.get_private_messages(
                user_a,
                user_b,
                Page::new(*offset, *limit),
            )?),
            ReadCall::PrivateMessageCount { user_a, user_b } => {
                ReadValue::Count(self.private_message_count(user_a, user_b)?)
            }
            ReadCall::GroupInfo { group_id } => {
                ReadValue::Group(GroupInfo::from(self.get_group(*group_id)?))
            }
            ReadCall::GroupMessages {
                group_id,
                offset,
                limit,
            } => ReadValue::GroupMessages(
                self.get_group_messages(*group_id, Page::new(*offset, *limit))?,
            ),
            ReadCall::GroupMessageCount { group_id } => {
                ReadValue::Count(self.group_message_count(*group_id)?)
            }
            ReadCall::GroupCount => ReadValue::Count(self.group_count()?),
            ReadCall::UserGroups { address } => ReadValue::Groups(self.groups_for_member(address)?),
        })
    }

    /// Like [`Database::read_call`], but a rejection becomes a failed
    /// result instead of an error.
    pub(crate) fn try_read_call(&self, call: &ReadCall) -> Result<CallResult> {
        match self.read_call(call) {
            Ok(value) => Ok(CallResult {
                success: true,
                value: Some(value),
                error: None,
            }),
            Err(StoreError::Rejected(reason)) => Ok(CallResult {
                success: false,
                value: None,
                error: Some(reason.to_string()),
            }),
            Err(e) => Err(e),
        }
    }
}
