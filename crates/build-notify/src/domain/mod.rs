//! Domain types shared by the notification engine.

pub mod build;
pub mod user;

pub use build::{BuildEvent, BuildStatus, EntityRef, SettingsScope, StatusTransition, TriggerInfo};
pub use user::{Permission, User};
