//! Crate-wide error types.

use thiserror::Error;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Crate-wide error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Unsupported notification channel: {0}")]
    UnsupportedChannel(String),

    #[error("Malformed {channel} notification settings: {reason}")]
    MalformedSettings { channel: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Lookup error: {0}")]
    Lookup(String),

    #[error("Send error: {0}")]
    Send(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn not_found(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }

    pub fn malformed(channel: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::MalformedSettings {
            channel: channel.into(),
            reason: reason.to_string(),
        }
    }

    pub fn lookup(msg: impl Into<String>) -> Self {
        Self::Lookup(msg.into())
    }

    pub fn send(msg: impl Into<String>) -> Self {
        Self::Send(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Whether this error comes from a settings record that must not be stored or used.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedChannel(_) | Self::MalformedSettings { .. } | Self::Configuration(_)
        )
    }
}
