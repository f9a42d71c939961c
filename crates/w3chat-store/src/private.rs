//! Private threads between two users.

use chrono::{DateTime, Utc};
use rusqlite::params;
use w3chat_shared::identity::validate_content;
use w3chat_shared::{Address, ChatError, Page, ThreadKey};

use crate::database::{decode_address, decode_ts, encode_ts, to_count, Database};
use crate::error::Result;
use crate::models::PrivateMessage;
use crate::users::user_exists;

impl Database {
    /// Append a message to the thread shared by `caller` and `recipient`.
    pub fn send_private_message(
        &mut self,
        caller: &Address,
        recipient: &Address,
        content: &str,
        now: DateTime<Utc>,
    ) -> Result<PrivateMessage> {
        let tx = self.conn_mut().transaction()?;

        if !user_exists(&tx, caller)? {
            return Err(ChatError::NotRegistered.into());
        }
        if !user_exists(&tx, recipient)? {
            return Err(ChatError::RecipientNotRegistered.into());
        }
        if caller == recipient {
            return Err(ChatError::SelfMessage.into());
        }
        validate_content(content)?;

        tx.execute(
            "INSERT INTO private_messages (thread_key, sender, recipient, content, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                ThreadKey::new(caller, recipient).as_str(),
                caller.to_hex(),
                recipient.to_hex(),
                content,
                encode_ts(&now),
            ],
        )?;
        tx.commit()?;

        Ok(PrivateMessage {
            sender: *caller,
            content: content.to_string(),
            timestamp: now,
        })
    }

    /// A window of the thread between `a` and `b`, oldest first. The order of
    /// `a` and `b` does not matter.
    pub fn get_private_messages(
        &self,
        a: &Address,
        b: &Address,
        page: Page,
    ) -> Result<Vec<PrivateMessage>> {
        let (limit, offset) = page.sql_bounds();
        let mut stmt = self.conn().prepare(
            "SELECT sender, content, timestamp
             FROM private_messages
             WHERE thread_key = ?1
             ORDER BY seq ASC
             LIMIT ?2 OFFSET ?3",
        )?;

        let rows = stmt.query_map(
            params![ThreadKey::new(a, b).as_str(), limit, offset],
            row_to_private_message,
        )?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }

    pub fn private_message_count(&self, a: &Address, b: &Address) -> Result<u64> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM private_messages WHERE thread_key = ?1",
            params![ThreadKey::new(a, b).as_str()],
            |row| row.get(0),
        )?;
        Ok(to_count(count))
    }
}

fn row_to_private_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<PrivateMessage> {
    let sender_str: String = row.get(0)?;
    let ts_str: String = row.get(2)?;

    Ok(PrivateMessage {
        sender: decode_address(0, &sender_str)?,
        content: row.get(1)?,
        timestamp: decode_ts(2, &ts_str)?,
    })
}
