//! Group lifecycle, membership and group message logs.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use w3chat_shared::identity::validate_content;
use w3chat_shared::{Address, ChatError, GroupId, Page};

use crate::database::{decode_address, decode_ts, encode_ts, to_count, Database};
use crate::error::Result;
use crate::meta;
use crate::models::{Group, GroupMessage};
use crate::users::user_exists;

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Create a group administered by `caller`. The member list becomes
    /// `[caller] ++ initial_members`, order preserved.
    pub fn create_group(
        &mut self,
        caller: &Address,
        name: &str,
        initial_members: &[Address],
        now: DateTime<Utc>,
    ) -> Result<Group> {
        let tx = self.conn_mut().transaction()?;

        if !user_exists(&tx, caller)? {
            return Err(ChatError::NotRegistered.into());
        }
        if name.is_empty() {
            return Err(ChatError::EmptyGroupName.into());
        }
        if initial_members.is_empty() {
            return Err(ChatError::NoMembers.into());
        }

        let mut seen = HashSet::with_capacity(initial_members.len());
        for member in initial_members {
            if member == caller {
                return Err(ChatError::SelfInMembers.into());
            }
            if !seen.insert(*member) {
                return Err(ChatError::DuplicateMember(*member).into());
            }
            if !user_exists(&tx, member)? {
                return Err(ChatError::MemberNotRegistered(*member).into());
            }
        }

        let id = GroupId(meta::bump(&tx, meta::GROUP_COUNT)?);
        tx.execute(
            "INSERT INTO chat_groups (id, name, admin, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![group_key(id), name, caller.to_hex(), encode_ts(&now)],
        )?;

        let mut members = Vec::with_capacity(initial_members.len() + 1);
        members.push(*caller);
        members.extend_from_slice(initial_members);
        {
            let mut stmt = tx.prepare(
                "INSERT INTO group_members (group_id, member, position) VALUES (?1, ?2, ?3)",
            )?;
            for (position, member) in members.iter().enumerate() {
                stmt.execute(params![group_key(id), member.to_hex(), position as i64])?;
            }
        }
        tx.commit()?;

        Ok(Group {
            id,
            name: name.to_string(),
            admin: *caller,
            members,
            created_at: now,
        })
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Append a message to the group's log. Only members may post.
    pub fn send_group_message(
        &mut self,
        caller: &Address,
        group_id: GroupId,
        content: &str,
        now: DateTime<Utc>,
    ) -> Result<GroupMessage> {
        let tx = self.conn_mut().transaction()?;

        require_group(&tx, group_id)?;
        if !is_member(&tx, group_id, caller)? {
            return Err(ChatError::NotMember.into());
        }
        validate_content(content)?;

        tx.execute(
            "INSERT INTO group_messages (group_id, sender, content, timestamp)
             VALUES (?1, ?2, ?3, ?4)",
            params![group_key(group_id), caller.to_hex(), content, encode_ts(&now)],
        )?;
        tx.commit()?;

        Ok(GroupMessage {
            group_id,
            sender: *caller,
            content: content.to_string(),
            timestamp: now,
        })
    }

    /// Append `new_member` to the group. Only the admin may do this.
    pub fn add_group_member(
        &mut self,
        caller: &Address,
        group_id: GroupId,
        new_member: &Address,
    ) -> Result<()> {
        let tx = self.conn_mut().transaction()?;

        let admin = require_group(&tx, group_id)?;
        if admin != *caller {
            return Err(ChatError::OnlyAdmin.into());
        }
        if is_member(&tx, group_id, new_member)? {
            return Err(ChatError::AlreadyMember(*new_member).into());
        }
        if !user_exists(&tx, new_member)? {
            return Err(ChatError::MemberNotRegistered(*new_member).into());
        }

        tx.execute(
            "INSERT INTO group_members (group_id, member, position)
             SELECT ?1, ?2, COALESCE(MAX(position), -1) + 1
             FROM group_members WHERE group_id = ?1",
            params![group_key(group_id), new_member.to_hex()],
        )?;
        tx.commit()?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn get_group(&self, group_id: GroupId) -> Result<Group> {
        let conn = self.conn();
        let (name, admin_str, created_str): (String, String, String) = conn
            .query_row(
                "SELECT name, admin, created_at FROM chat_groups WHERE id = ?1",
                params![group_key(group_id)],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?
            .ok_or(ChatError::GroupNotFound(group_id))?;

        let mut stmt = conn.prepare(
            "SELECT member FROM group_members WHERE group_id = ?1 ORDER BY position ASC",
        )?;
        let rows = stmt.query_map(params![group_key(group_id)], |row| {
            let member: String = row.get(0)?;
            decode_address(0, &member)
        })?;

        let mut members = Vec::new();
        for row in rows {
            members.push(row?);
        }

        Ok(Group {
            id: group_id,
            name,
            admin: decode_address(1, &admin_str)?,
            members,
            created_at: decode_ts(2, &created_str)?,
        })
    }

    /// A window of the group's log, oldest first.
    pub fn get_group_messages(&self, group_id: GroupId, page: Page) -> Result<Vec<GroupMessage>> {
        require_group(self.conn(), group_id)?;

        let (limit, offset) = page.sql_bounds();
        let mut stmt = self.conn().prepare(
            "SELECT group_id, sender, content, timestamp
             FROM group_messages
             WHERE group_id = ?1
             ORDER BY seq ASC
             LIMIT ?2 OFFSET ?3",
        )?;

        let rows = stmt.query_map(
            params![group_key(group_id), limit, offset],
            row_to_group_message,
        )?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }

    pub fn group_message_count(&self, group_id: GroupId) -> Result<u64> {
        require_group(self.conn(), group_id)?;
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM group_messages WHERE group_id = ?1",
            params![group_key(group_id)],
            |row| row.get(0),
        )?;
        Ok(to_count(count))
    }

    pub fn group_count(&self) -> Result<u64> {
        Ok(meta::counter(self.conn(), meta::GROUP_COUNT)?)
    }

    /// Ids of every group `address` belongs to, ascending.
    pub fn groups_for_member(&self, address: &Address) -> Result<Vec<GroupId>> {
        let mut stmt = self.conn().prepare(
            "SELECT group_id FROM group_members WHERE member = ?1 ORDER BY group_id ASC",
        )?;
        let rows = stmt.query_map(params![address.to_hex()], |row| row.get::<_, i64>(0))?;

        let mut ids = Vec::new();
        for row in rows {
            ids.push(GroupId(to_count(row?)));
        }
        Ok(ids)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// SQLite key for a group id. Ids beyond `i64::MAX` cannot exist, so they map
/// to a key no row has.
fn group_key(id: GroupId) -> i64 {
    i64::try_from(id.0).unwrap_or(i64::MAX)
}

/// Returns the group's admin, or `GroupNotFound`.
fn require_group(conn: &Connection, group_id: GroupId) -> Result<Address> {
    let admin: Option<String> = conn
        .query_row(
            "SELECT admin FROM chat_groups WHERE id = ?1",
            params![group_key(group_id)],
            |row| row.get(0),
        )
        .optional()?;
    let admin = admin.ok_or(ChatError::GroupNotFound(group_id))?;
    Ok(decode_address(0, &admin)?)
}

fn is_member(conn: &Connection, group_id: GroupId, address: &Address) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM group_members WHERE group_id = ?1 AND member = ?2)",
        params![group_key(group_id), address.to_hex()],
        |row| row.get(0),
    )
}

fn row_to_group_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<GroupMessage> {
    let group_id: i64 = row.get(0)?;
    let sender_str: String = row.get(1)?;
    let ts_str: String = row.get(3)?;

    Ok(GroupMessage {
        group_id: GroupId(to_count(group_id)),
        sender: decode_address(1, &sender_str)?,
        content: row.get(2)?,
        timestamp: decode_ts(3, &ts_str)?,
    })
}
