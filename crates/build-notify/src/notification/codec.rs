//! Wire codec for notification settings.
//!
//! The persisted form is a JSON object keyed by channel name. Each value is
//! either `null` (channel disabled) or the channel's settings payload. Any key
//! outside the known channel set is rejected: a misspelled channel must never
//! be silently ignored.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use super::settings::{ChannelKind, ChannelSettings, NotificationSettings};
use crate::domain::EntityRef;
use crate::{Error, Result};

/// Parse a persisted settings document.
pub fn parse_settings(bytes: &[u8]) -> Result<NotificationSettings> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| Error::malformed("notification", e))?;
    settings_from_value(value)
}

/// Serialize settings to their persisted form.
pub fn serialize_settings(settings: &NotificationSettings) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(settings)?)
}

/// Decode settings from an already-parsed JSON value.
pub fn settings_from_value(value: Value) -> Result<NotificationSettings> {
    let entries: Map<String, Value> = match value {
        Value::Object(map) => map,
        Value::Null => return Ok(NotificationSettings::new()),
        other => {
            return Err(Error::malformed(
                "notification",
                format!("expected an object keyed by channel, got {}", json_type(&other)),
            ));
        }
    };

    let mut settings = NotificationSettings::new();
    for (name, payload) in entries {
        let Some(kind) = ChannelKind::parse(&name) else {
            warn!(channel = %name, "Unsupported notification channel in settings");
            return Err(Error::UnsupportedChannel(name));
        };
        if payload.is_null() {
            continue;
        }
        settings.insert(decode_channel(kind, payload)?);
    }

    Ok(settings)
}

fn decode_channel(kind: ChannelKind, payload: Value) -> Result<ChannelSettings> {
    let malformed = |e: serde_json::Error| {
        warn!(channel = %kind, error = %e, "Unable to parse channel settings");
        Error::malformed(kind.as_str(), e)
    };

    let settings = match kind {
        ChannelKind::Email => {
            ChannelSettings::Email(serde_json::from_value(payload).map_err(malformed)?)
        }
        ChannelKind::Jabber => {
            ChannelSettings::Jabber(serde_json::from_value(payload).map_err(malformed)?)
        }
        ChannelKind::Tat => {
            ChannelSettings::Tat(serde_json::from_value(payload).map_err(malformed)?)
        }
    };
    Ok(settings)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Settings record as exchanged with the settings API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserNotification {
    pub application_pipeline_id: i64,
    pub environment: EntityRef,
    pub pipeline: EntityRef,
    pub notifications: NotificationSettings,
}

#[derive(Deserialize)]
struct UserNotificationInput {
    #[serde(default)]
    notifications: Value,
    #[serde(default)]
    application_pipeline_id: i64,
    #[serde(default)]
    environment: EntityRef,
    #[serde(default)]
    pipeline: EntityRef,
}

/// Parse a settings API request body, applying the same channel strictness as
/// [`parse_settings`].
pub fn parse_user_notification(bytes: &[u8]) -> Result<UserNotification> {
    let input: UserNotificationInput =
        serde_json::from_slice(bytes).map_err(|e| Error::malformed("notification", e))?;

    Ok(UserNotification {
        application_pipeline_id: input.application_pipeline_id,
        environment: input.environment,
        pipeline: input.pipeline,
        notifications: settings_from_value(input.notifications)?,
    })
}
