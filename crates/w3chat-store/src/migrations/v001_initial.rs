//! v001 -- Initial schema creation.
//!
//! Creates the user registry with its first-name index, the private and
//! group message logs, groups with their ordered member lists, and the
//! ledger counters.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    address       TEXT PRIMARY KEY NOT NULL,  -- 0x-prefixed lowercase hex
    name          TEXT NOT NULL,
    first_name    TEXT NOT NULL,              -- as typed, before normalization
    image_ref     TEXT NOT NULL,              -- opaque content reference
    registered_at TEXT NOT NULL               -- RFC-3339, microseconds
);

-- Case-insensitive first-name uniqueness (ASCII lower-cased key)
CREATE TABLE IF NOT EXISTS first_name_index (
    name_key TEXT PRIMARY KEY NOT NULL,
    address  TEXT NOT NULL UNIQUE,

    FOREIGN KEY (address) REFERENCES users(address)
);

-- ----------------------------------------------------------------
-- Private threads
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS private_messages (
    seq        INTEGER PRIMARY KEY AUTOINCREMENT,
    thread_key TEXT NOT NULL,                 -- unordered participant pair
    sender     TEXT NOT NULL,
    recipient  TEXT NOT NULL,
    content    TEXT NOT NULL,
    timestamp  TEXT NOT NULL,

    FOREIGN KEY (sender) REFERENCES users(address),
    FOREIGN KEY (recipient) REFERENCES users(address)
);

CREATE INDEX IF NOT EXISTS idx_private_messages_thread
    ON private_messages(thread_key, seq);

-- ----------------------------------------------------------------
-- Groups
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS chat_groups (
    id         INTEGER PRIMARY KEY NOT NULL,  -- sequential, from 1
    name       TEXT NOT NULL,
    admin      TEXT NOT NULL,
    created_at TEXT NOT NULL,

    FOREIGN KEY (admin) REFERENCES users(address)
);

CREATE TABLE IF NOT EXISTS group_members (
    group_id INTEGER NOT NULL,
    member   TEXT NOT NULL,
    position INTEGER NOT NULL,                -- 0 = admin

    PRIMARY KEY (group_id, member),
    UNIQUE (group_id, position),
    FOREIGN KEY (group_id) REFERENCES chat_groups(id),
    FOREIGN KEY (member) REFERENCES users(address)
);

CREATE INDEX IF NOT EXISTS idx_group_members_member ON group_members(member);

CREATE TABLE IF NOT EXISTS group_messages (
    seq       INTEGER PRIMARY KEY AUTOINCREMENT,
    group_id  INTEGER NOT NULL,
    sender    TEXT NOT NULL,
    content   TEXT NOT NULL,
    timestamp TEXT NOT NULL,

    FOREIGN KEY (group_id) REFERENCES chat_groups(id),
    FOREIGN KEY (sender) REFERENCES users(address)
);

CREATE INDEX IF NOT EXISTS idx_group_messages_group
    ON group_messages(group_id, seq);

-- ----------------------------------------------------------------
-- Counters
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS ledger_meta (
    key   TEXT PRIMARY KEY NOT NULL,
    value INTEGER NOT NULL
);

INSERT OR IGNORE INTO ledger_meta (key, value) VALUES ('total_users', 0);
INSERT OR IGNORE INTO ledger_meta (key, value) VALUES ('group_count', 0);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
