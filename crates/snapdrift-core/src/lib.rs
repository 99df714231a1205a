//! `snapdrift-core` — configuration and shared error type.
//!
//! Everything here is consumed by the other workspace crates; no business
//! logic lives in this crate.

pub mod config;
pub mod error;

pub use config::SnapdriftConfig;
pub use error::{Result, SnapdriftError};
