use thiserror::Error;

/// Errors that can occur within the scheduling core.
///
/// Only `Config` is surfaced synchronously (from `start`); everything else
/// is caught at the top of the fire handler, logged, and the engine re-arms.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Bad interval bounds — fatal to `start`, never crashes a running process.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The pool has no active, unsent image. Recoverable: skip this cycle.
    #[error("No eligible image to send")]
    NoEligibleImage,

    /// Transport/provider failure. Recoverable: the image stays unsent and
    /// remains eligible for the next fire.
    #[error("Delivery failed: {0}")]
    Delivery(#[from] snapdrift_delivery::DeliveryError),

    /// The message went out but the post-delivery bookkeeping write failed.
    /// The send must not be repeated; the row needs manual reconciliation.
    #[error("Data consistency: image {image_id} was delivered but not marked sent: {detail}")]
    DataConsistency { image_id: i64, detail: String },

    /// Image repository failure.
    #[error(transparent)]
    Images(#[from] snapdrift_images::ImageStoreError),

    /// Schedule store / SQLite failure.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The engine task is gone (shutdown in progress).
    #[error("Scheduler engine is not running")]
    EngineGone,
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
