use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::debug;

use crate::error::{ImageStoreError, Result};
use crate::types::Image;

/// Capability interface the scheduler uses to reach the image library.
///
/// Kept deliberately narrow so tests can substitute an in-memory fake and a
/// real delivery can never be triggered from a unit test.
pub trait ImageStore: Send + Sync {
    /// All images with `is_active = 1` and `is_sent = 0`, in id order.
    fn list_eligible(&self) -> Result<Vec<Image>>;

    /// Fetch a single image by id.
    fn get(&self, id: i64) -> Result<Option<Image>>;

    /// Record a confirmed delivery: set `is_sent`, bump `send_count` and set
    /// `last_sent` in one atomic write. Returns the updated row.
    fn mark_sent(&self, id: i64, sent_at: DateTime<Utc>) -> Result<Image>;

    /// Start a new cycle: clear the sent flag on every active image.
    /// Returns the number of rows updated.
    fn reset_all_sent_flags(&self) -> Result<usize>;
}

const IMAGE_COLUMNS: &str = "id, filename, file_hash, file_size, mime_type, description,
     created_at, last_sent, send_count, is_active, is_sent";

/// SQLite-backed [`ImageStore`].
///
/// Wraps a single connection in a `Mutex`, same pattern as the schedule
/// store — the dashboard runs in its own process with its own connection,
/// and SQLite (WAL mode) arbitrates between them.
pub struct SqliteImageStore {
    db: Mutex<Connection>,
}

impl SqliteImageStore {
    /// Wrap an already-open (and `init_db`-initialised) connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Mutex::new(conn),
        }
    }
}

impl ImageStore for SqliteImageStore {
    fn list_eligible(&self) -> Result<Vec<Image>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare_cached(&format!(
            "SELECT {IMAGE_COLUMNS} FROM images
             WHERE is_active = 1 AND is_sent = 0 ORDER BY id",
        ))?;
        let raws: Vec<RawImage> = stmt
            .query_map([], read_row)?
            .collect::<rusqlite::Result<_>>()?;
        raws.into_iter().map(RawImage::into_image).collect()
    }

    fn get(&self, id: i64) -> Result<Option<Image>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare_cached(&format!(
            "SELECT {IMAGE_COLUMNS} FROM images WHERE id = ?1",
        ))?;
        match stmt.query_row([id], read_row) {
            Ok(raw) => Ok(Some(raw.into_image()?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn mark_sent(&self, id: i64, sent_at: DateTime<Utc>) -> Result<Image> {
        let db = self.db.lock().unwrap();
        // Single UPDATE so a concurrent dashboard edit cannot produce a lost
        // update on send_count.
        let n = db.execute(
            "UPDATE images
             SET is_sent = 1, send_count = send_count + 1, last_sent = ?1
             WHERE id = ?2",
            rusqlite::params![sent_at.to_rfc3339(), id],
        )?;
        if n == 0 {
            return Err(ImageStoreError::NotFound { id });
        }
        debug!(image_id = id, "image marked sent");

        let mut stmt = db.prepare_cached(&format!(
            "SELECT {IMAGE_COLUMNS} FROM images WHERE id = ?1",
        ))?;
        stmt.query_row([id], read_row)?.into_image()
    }

    fn reset_all_sent_flags(&self) -> Result<usize> {
        let db = self.db.lock().unwrap();
        let n = db.execute(
            "UPDATE images SET is_sent = 0 WHERE is_sent = 1 AND is_active = 1",
            [],
        )?;
        debug!(count = n, "sent flags reset for new cycle");
        Ok(n)
    }
}

// --- row mapping -----------------------------------------------------------

struct RawImage {
    id: i64,
    filename: String,
    file_hash: String,
    file_size: i64,
    mime_type: String,
    description: String,
    created_at: String,
    last_sent: Option<String>,
    send_count: u32,
    is_active: bool,
    is_sent: bool,
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawImage> {
    Ok(RawImage {
        id: row.get(0)?,
        filename: row.get(1)?,
        file_hash: row.get(2)?,
        file_size: row.get(3)?,
        mime_type: row.get(4)?,
        description: row.get(5)?,
        created_at: row.get(6)?,
        last_sent: row.get(7)?,
        send_count: row.get(8)?,
        is_active: row.get(9)?,
        is_sent: row.get(10)?,
    })
}

impl RawImage {
    fn into_image(self) -> Result<Image> {
        let id = self.id;
        let parse = |s: &str| -> Result<DateTime<Utc>> {
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| ImageStoreError::Corrupt {
                    id,
                    detail: format!("bad timestamp {s:?}: {e}"),
                })
        };
        Ok(Image {
            id,
            filename: self.filename,
            file_hash: self.file_hash,
            file_size: self.file_size,
            mime_type: self.mime_type,
            description: self.description,
            created_at: parse(&self.created_at)?,
            last_sent: self.last_sent.as_deref().map(parse).transpose()?,
            send_count: self.send_count,
            is_active: self.is_active,
            is_sent: self.is_sent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;

    fn store_with_images(specs: &[(&str, bool, bool)]) -> SqliteImageStore {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();
        for (i, (name, active, sent)) in specs.iter().enumerate() {
            conn.execute(
                "INSERT INTO images
                 (filename, file_hash, file_size, mime_type, description,
                  created_at, is_active, is_sent)
                 VALUES (?1, ?2, 1024, 'image/jpeg', ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    name,
                    format!("hash-{i}"),
                    format!("description of {name}"),
                    Utc::now().to_rfc3339(),
                    *active,
                    *sent
                ],
            )
            .unwrap();
        }
        SqliteImageStore::new(conn)
    }

    #[test]
    fn list_eligible_excludes_inactive_and_sent() {
        let store = store_with_images(&[
            ("a.jpg", true, false),
            ("b.jpg", true, true),
            ("c.jpg", false, false),
        ]);
        let eligible = store.list_eligible().unwrap();
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].filename, "a.jpg");
    }

    #[test]
    fn mark_sent_updates_all_tracking_fields() {
        let store = store_with_images(&[("a.jpg", true, false)]);
        let before = store.get(1).unwrap().unwrap();
        assert_eq!(before.send_count, 0);
        assert!(before.last_sent.is_none());

        let sent_at = Utc::now();
        let after = store.mark_sent(1, sent_at).unwrap();
        assert!(after.is_sent);
        assert_eq!(after.send_count, 1);
        assert_eq!(after.last_sent.unwrap().timestamp(), sent_at.timestamp());
    }

    #[test]
    fn mark_sent_increments_by_exactly_one_per_call() {
        let store = store_with_images(&[("a.jpg", true, false)]);
        store.mark_sent(1, Utc::now()).unwrap();
        let after = store.mark_sent(1, Utc::now()).unwrap();
        assert_eq!(after.send_count, 2);
    }

    #[test]
    fn mark_sent_unknown_id_is_not_found() {
        let store = store_with_images(&[]);
        match store.mark_sent(42, Utc::now()) {
            Err(ImageStoreError::NotFound { id: 42 }) => {}
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn reset_clears_only_active_sent_flags() {
        let store = store_with_images(&[
            ("a.jpg", true, true),
            ("b.jpg", true, true),
            ("c.jpg", false, true),
            ("d.jpg", true, false),
        ]);
        let n = store.reset_all_sent_flags().unwrap();
        assert_eq!(n, 2);
        // Inactive image keeps its sent flag; it is invisible to selection
        // either way.
        assert!(store.get(3).unwrap().unwrap().is_sent);
        assert_eq!(store.list_eligible().unwrap().len(), 3);
    }

    #[test]
    fn get_missing_returns_none() {
        let store = store_with_images(&[]);
        assert!(store.get(7).unwrap().is_none());
    }
}
