use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageStoreError {
    /// Underlying SQLite / rusqlite error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// No image with the given ID exists in the store.
    #[error("Image not found: {id}")]
    NotFound { id: i64 },

    /// A stored value could not be interpreted (bad timestamp, etc.).
    #[error("Corrupt image row {id}: {detail}")]
    Corrupt { id: i64, detail: String },
}

pub type Result<T> = std::result::Result<T, ImageStoreError>;
