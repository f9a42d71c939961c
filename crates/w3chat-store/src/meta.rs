//! Named ledger counters kept in `ledger_meta`.
//!
//! Counters are only bumped inside the transaction that inserts the row they
//! count.

use rusqlite::{params, Connection};

use crate::database::to_count;

pub(crate) const TOTAL_USERS: &str = "total_users";
pub(crate) const GROUP_COUNT: &str = "group_count";

pub(crate) fn counter(conn: &Connection, key: &str) -> rusqlite::Result<u64> {
    conn.query_row(
        "SELECT value FROM ledger_meta WHERE key = ?1",
        params![key],
        |row| row.get::<_, i64>(0),
    )
    .map(to_count)
}

/// Increment a counter and return its new value.
pub(crate) fn bump(conn: &Connection, key: &str) -> rusqlite::Result<u64> {
    conn.query_row(
        "UPDATE ledger_meta SET value = value + 1 WHERE key = ?1 RETURNING value",
        params![key],
        |row| row.get::<_, i64>(0),
    )
    .map(to_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    #[test]
    fn counters_start_at_zero_and_bump() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(counter(db.conn(), TOTAL_USERS).unwrap(), 0);
        assert_eq!(bump(db.conn(), TOTAL_USERS).unwrap(), 1);
        assert_eq!(bump(db.conn(), TOTAL_USERS).unwrap(), 2);
        assert_eq!(counter(db.conn(), GROUP_COUNT).unwrap(), 0);
    }
}
