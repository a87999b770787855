//! Fully resolved notifications handed to channel senders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::settings::ChannelKind;
use crate::domain::BuildStatus;

/// A rendered message with its resolved destinations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub channel: ChannelKind,
    pub title: String,
    pub body: String,
    /// Destination identifiers, unique and in resolution order.
    pub recipients: Vec<String>,
    pub timestamp: DateTime<Utc>,
    /// Build status that triggered the notification.
    pub status: BuildStatus,
}

impl Notification {
    /// One-line summary used in logs.
    pub fn summary(&self) -> String {
        format!(
            "[{}] {} -> {}",
            self.channel,
            self.title,
            self.recipients.join(",")
        )
    }
}
