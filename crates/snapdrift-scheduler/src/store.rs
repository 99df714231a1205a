//! Durable storage for the single "next fire" timestamp.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::{debug, warn};

use crate::error::Result;

/// SQLite-backed schedule state. One row, three operations.
///
/// This is what lets a restarted process resume the pending schedule: the
/// engine reads the stored timestamp at construction and re-arms for exactly
/// that instant instead of drawing a fresh interval.
pub struct ScheduleStore {
    db: Mutex<Connection>,
}

impl ScheduleStore {
    /// Wrap an already-open (and `init_db`-initialised) connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Mutex::new(conn),
        }
    }

    /// Persist the next fire time, replacing any previous one.
    pub fn set_next_fire(&self, at: DateTime<Utc>) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "UPDATE schedule SET next_fire = ?1, updated_at = ?2 WHERE id = 1",
            rusqlite::params![at.to_rfc3339(), Utc::now().to_rfc3339()],
        )?;
        debug!(next_fire = %at, "next fire persisted");
        Ok(())
    }

    /// The stored next fire time, if armed.
    ///
    /// An unparseable stored value counts as "not scheduled" — the engine
    /// stays Stopped rather than refusing to boot over a stale row.
    pub fn get_next_fire(&self) -> Result<Option<DateTime<Utc>>> {
        let db = self.db.lock().unwrap();
        let raw: Option<String> = db.query_row(
            "SELECT next_fire FROM schedule WHERE id = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(raw.and_then(|s| match DateTime::parse_from_rfc3339(&s) {
            Ok(dt) => Some(dt.with_timezone(&Utc)),
            Err(e) => {
                warn!(stored = %s, "ignoring unparseable next_fire: {e}");
                None
            }
        }))
    }

    /// Drop the pending trigger. Idempotent.
    pub fn cancel(&self) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "UPDATE schedule SET next_fire = NULL, updated_at = ?1 WHERE id = 1",
            rusqlite::params![Utc::now().to_rfc3339()],
        )?;
        debug!("pending fire cancelled");
        Ok(())
    }
}
