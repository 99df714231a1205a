//! `snapdrift-scheduler` — the scheduling and delivery core.
//!
//! # Overview
//!
//! One recurring task: wait a cryptographically random interval, pick a
//! random unsent image, deliver it, re-arm. The persisted state is a single
//! next-fire timestamp in SQLite, so a restarted process resumes the exact
//! pending schedule instead of redrawing (which would bias real intervals
//! shorter under frequent restarts).
//!
//! # State machine
//!
//! | State      | Meaning                                             |
//! |------------|-----------------------------------------------------|
//! | `Stopped`  | No pending fire; waits for an explicit start        |
//! | `Armed`    | A future fire time is registered and persisted      |
//! | `Firing`   | A send cycle is executing                           |
//! | `Disabled` | Interval configuration rejected at start            |
//!
//! The engine runs as a single tokio task that owns the state; commands
//! (start / stop / status / trigger-now) arrive over an mpsc channel, so a
//! fire can never overlap another fire or a command.

pub mod db;
pub mod engine;
pub mod error;
pub mod interval;
pub mod selector;
pub mod store;

#[cfg(test)]
mod testutil;

pub use engine::{Engine, EngineHandle, EngineState, FireReport, Status};
pub use error::{Result, SchedulerError};
pub use store::ScheduleStore;
