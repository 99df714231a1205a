use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One sendable asset in the library.
///
/// The file itself lives in external storage; `filename` is the opaque
/// content reference the delivery layer turns into a public media URL.
/// `file_hash`, `file_size` and `mime_type` are written by the upload
/// pipeline and never modified here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Image {
    pub id: i64,
    pub filename: String,
    /// SHA-256 of the file contents, hex-encoded.
    pub file_hash: String,
    pub file_size: i64,
    pub mime_type: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    /// Set iff `send_count > 0`.
    pub last_sent: Option<DateTime<Utc>>,
    pub send_count: u32,
    /// Eligible for sending at all (dashboard toggle).
    pub is_active: bool,
    /// Already sent in the current cycle.
    pub is_sent: bool,
}

impl Image {
    /// True when the scheduler may pick this image for the next send.
    pub fn is_eligible(&self) -> bool {
        self.is_active && !self.is_sent
    }
}
