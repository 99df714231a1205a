use rusqlite::Connection;

use crate::error::Result;

/// Initialise the images schema in `conn`.
///
/// Safe to call on every startup — uses `IF NOT EXISTS` throughout. The
/// dashboard's upload pipeline writes these rows; the scheduler only updates
/// `is_sent`, `send_count` and `last_sent`.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS images (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            filename    TEXT    NOT NULL UNIQUE,
            file_hash   TEXT    NOT NULL UNIQUE,   -- SHA-256, hex
            file_size   INTEGER NOT NULL CHECK (file_size > 0),
            mime_type   TEXT    NOT NULL,
            description TEXT    NOT NULL,
            created_at  TEXT    NOT NULL,          -- ISO-8601
            last_sent   TEXT,                      -- ISO-8601 or NULL
            send_count  INTEGER NOT NULL DEFAULT 0,
            is_active   INTEGER NOT NULL DEFAULT 1,
            is_sent     INTEGER NOT NULL DEFAULT 0
        ) STRICT;

        -- Eligibility query: WHERE is_active = 1 AND is_sent = 0
        CREATE INDEX IF NOT EXISTS idx_images_eligible ON images (is_active, is_sent);
        CREATE INDEX IF NOT EXISTS idx_images_last_sent ON images (last_sent);
        ",
    )?;
    Ok(())
}
