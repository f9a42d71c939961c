//! Identity registry: user records and the first-name index.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use w3chat_shared::identity::{self, FirstName};
use w3chat_shared::{Address, ChatError};

use crate::database::{decode_address, decode_ts, encode_ts, Database};
use crate::error::Result;
use crate::meta;
use crate::models::User;

impl Database {
    // ------------------------------------------------------------------
    // Create / update
    // ------------------------------------------------------------------

    /// Create the caller's user record and claim its first name.
    pub fn register_user(
        &mut self,
        caller: &Address,
        name: &str,
        image_ref: &str,
        now: DateTime<Utc>,
    ) -> Result<User> {
        let tx = self.conn_mut().transaction()?;

        if user_exists(&tx, caller)? {
            return Err(ChatError::AlreadyRegistered.into());
        }
        let first_name = identity::validate_profile(name, image_ref)?;
        let name_key = first_name.key();
        if query_first_name_owner(&tx, &name_key)?.is_some() {
            return Err(ChatError::NameTaken.into());
        }

        let caller_hex = caller.to_hex();
        tx.execute(
            "INSERT INTO users (address, name, first_name, image_ref, registered_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![caller_hex, name, first_name.as_str(), image_ref, encode_ts(&now)],
        )?;
        tx.execute(
            "INSERT INTO first_name_index (name_key, address) VALUES (?1, ?2)",
            params![name_key, caller_hex],
        )?;
        meta::bump(&tx, meta::TOTAL_USERS)?;
        tx.commit()?;

        Ok(User {
            address: *caller,
            name: name.to_string(),
            first_name: first_name.as_str().to_string(),
            image_ref: image_ref.to_string(),
            is_registered: true,
            registered_at: Some(now),
        })
    }

    /// Replace the caller's image reference. No other field changes.
    pub fn update_profile_image(&mut self, caller: &Address, image_ref: &str) -> Result<()> {
        let tx = self.conn_mut().transaction()?;

        if !user_exists(&tx, caller)? {
            return Err(ChatError::NotRegistered.into());
        }
        identity::validate_image_ref(image_ref)?;

        tx.execute(
            "UPDATE users SET image_ref = ?1 WHERE address = ?2",
            params![image_ref, caller.to_hex()],
        )?;
        tx.commit()?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn get_user(&self, address: &Address) -> Result<Option<User>> {
        let user = self
            .conn()
            .query_row(
                "SELECT address, name, first_name, image_ref, registered_at
                 FROM users WHERE address = ?1",
                params![address.to_hex()],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// The stored record, or `User::default()` when `address` never
    /// registered.
    pub fn user_profile(&self, address: &Address) -> Result<User> {
        Ok(self.get_user(address)?.unwrap_or_default())
    }

    pub fn is_registered(&self, address: &Address) -> Result<bool> {
        Ok(user_exists(self.conn(), address)?)
    }

    /// Who holds `first_name`, compared ignoring ASCII case.
    pub fn first_name_owner(&self, first_name: &FirstName) -> Result<Option<Address>> {
        Ok(query_first_name_owner(self.conn(), &first_name.key())?)
    }

    /// Whether `candidate` could be taken as a first name. A name held by
    /// `caller` itself counts as available.
    pub fn first_name_available(&self, candidate: &str, caller: Option<&Address>) -> Result<bool> {
        let owner = self.first_name_owner(&FirstName::candidate(candidate))?;
        Ok(match owner {
            None => true,
            Some(owner) => caller == Some(&owner),
        })
    }

    pub fn total_users(&self) -> Result<u64> {
        Ok(meta::counter(self.conn(), meta::TOTAL_USERS)?)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub(crate) fn user_exists(conn: &Connection, address: &Address) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE address = ?1)",
        params![address.to_hex()],
        |row| row.get(0),
    )
}

fn query_first_name_owner(conn: &Connection, name_key: &str) -> rusqlite::Result<Option<Address>> {
    let owner: Option<String> = conn
        .query_row(
            "SELECT address FROM first_name_index WHERE name_key = ?1",
            params![name_key],
            |row| row.get(0),
        )
        .optional()?;
    owner.map(|s| decode_address(0, &s)).transpose()
}

/// Map a `rusqlite::Row` to a [`User`].
fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let address_str: String = row.get(0)?;
    let registered_str: String = row.get(4)?;

    Ok(User {
        address: decode_address(0, &address_str)?,
        name: row.get(1)?,
        first_name: row.get(2)?,
        image_ref: row.get(3)?,
        is_registered: true,
        registered_at: Some(decode_ts(4, &registered_str)?),
    })
}
