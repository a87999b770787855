//! Users as seen by notification recipients.

use serde::{Deserialize, Serialize};

/// A user known to the permission system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct User {
    /// Chat handle.
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub fullname: String,
}

impl User {
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            fullname: String::new(),
        }
    }
}

/// Permission level queried when expanding group recipients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Permission {
    Read = 4,
    ReadExecute = 5,
    ReadWriteExecute = 7,
}
