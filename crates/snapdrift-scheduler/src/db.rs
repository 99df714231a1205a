use rusqlite::Connection;

use crate::error::Result;

/// Initialise the schedule schema in `conn`.
///
/// A single-row table holds the one recurring job's next fire time. The row
/// is created up front so every later write is a plain UPDATE.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS schedule (
            id         INTEGER PRIMARY KEY CHECK (id = 1),
            next_fire  TEXT,               -- ISO-8601 or NULL when not armed
            updated_at TEXT NOT NULL
        ) STRICT;

        INSERT OR IGNORE INTO schedule (id, next_fire, updated_at)
        VALUES (1, NULL, strftime('%Y-%m-%dT%H:%M:%SZ', 'now'));
        ",
    )?;
    Ok(())
}
