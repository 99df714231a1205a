//! `snapdrift-images` — image library metadata store.
//!
//! The scheduler only ever touches images through the [`ImageStore`] trait:
//! list eligible candidates, fetch one by id, mark one sent, reset all sent
//! flags. Rows are created and deleted by the dashboard/CLI, never here.

pub mod db;
pub mod error;
pub mod store;
pub mod types;

pub use error::{ImageStoreError, Result};
pub use store::{ImageStore, SqliteImageStore};
pub use types::Image;
