//! `snapdrift-delivery` — outbound message transport.
//!
//! The scheduler talks to a [`DeliveryClient`]; two implementations exist:
//!
//! | Provider     | Mechanism                                             |
//! |--------------|-------------------------------------------------------|
//! | `Twilio`     | MMS via the Messages REST API, media as a public URL  |
//! | `Pushbullet` | Link push carrying the media URL and description      |
//!
//! Both are selected by `[delivery].provider` in the config. Tests always use
//! an in-memory fake — nothing in this workspace sends a real message from a
//! test.

pub mod client;
pub mod error;
pub mod pushbullet;
pub mod twilio;

pub use client::{build_client, DeliveryClient, DeliveryReceipt, MediaRef};
pub use error::{DeliveryError, Result};
pub use pushbullet::PushbulletClient;
pub use twilio::TwilioClient;
