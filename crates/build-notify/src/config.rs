//! Dispatcher configuration.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Environment variable toggling dispatch.
pub const ENV_ENABLED: &str = "BUILD_NOTIFY_ENABLED";
/// Environment variable holding the UI base URL.
pub const ENV_BASE_URL: &str = "BUILD_NOTIFY_BASE_URL";
/// Environment variable holding the build-event broadcast capacity.
pub const ENV_EVENT_BUFFER: &str = "BUILD_NOTIFY_EVENT_BUFFER";

/// Configuration for the notification dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Whether user notifications are dispatched at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Base URL of the UI, used to build links to build details.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Capacity of the build-event broadcast channel.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_enabled() -> bool {
    true
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_event_buffer() -> usize {
    256
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            base_url: default_base_url(),
            event_buffer: default_event_buffer(),
        }
    }
}

impl DispatcherConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Build a configuration from `BUILD_NOTIFY_*` environment variables,
    /// falling back to defaults for unset ones.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_ENABLED) {
            config.enabled = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                other => {
                    return Err(Error::config(format!("{ENV_ENABLED}: invalid boolean {other:?}")));
                }
            };
        }
        if let Some(raw) = lookup(ENV_BASE_URL) {
            config.base_url = raw;
        }
        if let Some(raw) = lookup(ENV_EVENT_BUFFER) {
            config.event_buffer = raw
                .trim()
                .parse()
                .map_err(|e| Error::config(format!("{ENV_EVENT_BUFFER}: {e}")))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the base URL parses and the broadcast buffer is usable.
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.base_url)
            .map_err(|e| Error::config(format!("invalid base_url {:?}: {}", self.base_url, e)))?;
        if self.event_buffer == 0 {
            return Err(Error::config("event_buffer must be greater than zero"));
        }
        Ok(())
    }

    /// Base URL without trailing slashes.
    pub fn normalized_base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}
