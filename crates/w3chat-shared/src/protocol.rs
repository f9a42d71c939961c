use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Address, GroupId};

/// Notifications emitted after a state transition commits.
///
/// Events are never emitted for rejected operations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "data")]
pub enum LedgerEvent {
    /// A new user record was created
    UserRegistered {
        address: Address,
        name: String,
        timestamp: DateTime<Utc>,
    },

    /// A user replaced their profile image reference
    ProfileImageUpdated {
        address: Address,
        image_ref: String,
    },

    /// A private message was appended to a thread
    PrivateMessageSent {
        from: Address,
        to: Address,
        timestamp: DateTime<Utc>,
    },

    /// A group was created
    GroupCreated {
        group_id: GroupId,
        name: String,
        admin: Address,
        member_count: usize,
    },

    /// A message was appended to a group
    GroupMessageSent {
        group_id: GroupId,
        sender: Address,
        timestamp: DateTime<Utc>,
    },

    /// The admin added a member to a group
    GroupMemberAdded { group_id: GroupId, member: Address },
}

impl LedgerEvent {
    /// Short event name, used as a log field.
    pub fn name(&self) -> &'static str {
        match self {
            Self::UserRegistered { .. } => "user_registered",
            Self::ProfileImageUpdated { .. } => "profile_image_updated",
            Self::PrivateMessageSent { .. } => "private_message_sent",
            Self::GroupCreated { .. } => "group_created",
            Self::GroupMessageSent { .. } => "group_message_sent",
            Self::GroupMemberAdded { .. } => "group_member_added",
        }
    }

    /// Returns the group this event is scoped to, if any.
    pub fn group_id(&self) -> Option<GroupId> {
        match self {
            Self::GroupCreated { group_id, .. }
            | Self::GroupMessageSent { group_id, .. }
            | Self::GroupMemberAdded { group_id, .. } => Some(*group_id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_shape() {
        let event = LedgerEvent::GroupMemberAdded {
            group_id: GroupId(3),
            member: Address([0x11; 20]),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "GroupMemberAdded");
        assert_eq!(json["data"]["group_id"], 3);
        assert_eq!(
            json["data"]["member"],
            "0x1111111111111111111111111111111111111111"
        );
        assert_eq!(event.group_id(), Some(GroupId(3)));
        assert_eq!(event.name(), "group_member_added");
    }
}
