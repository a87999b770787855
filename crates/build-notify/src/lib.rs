//! build-notify library crate.
//!
//! Decides, for every pipeline build status change, whether and to whom a user
//! notification is sent, renders it from the configured templates and hands it
//! to the channel senders without blocking the build.

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod lookup;
pub mod notification;
pub mod store;

pub use config::DispatcherConfig;
pub use error::{Error, Result};
