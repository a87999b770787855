//! Per-channel notification settings.
//!
//! A [`NotificationSettings`] record holds at most one [`ChannelSettings`] per
//! [`ChannelKind`] and applies to a single (application, pipeline, environment)
//! scope. The set of channel kinds is closed.

use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Channel kinds understood by the engine.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ChannelKind {
    /// Mail: recipients are email addresses.
    Email,
    /// XMPP chat: recipients are user handles.
    Jabber,
    /// Topic-based message board: recipients are topic names.
    Tat,
}

impl ChannelKind {
    pub const ALL: [ChannelKind; 3] = [Self::Email, Self::Jabber, Self::Tat];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Jabber => "jabber",
            Self::Tat => "tat",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "email" => Some(Self::Email),
            "jabber" => Some(Self::Jabber),
            "tat" => Some(Self::Tat),
            _ => None,
        }
    }

    /// Mail channels address users by email rather than by handle.
    pub fn is_mail(&self) -> bool {
        matches!(self, Self::Email)
    }
}

/// When to notify for one event category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
pub enum EventPolicy {
    #[serde(alias = "always")]
    Always,
    #[serde(alias = "never")]
    Never,
    /// Notify on the first build and whenever the status differs from the previous one.
    #[serde(alias = "change", alias = "on_change")]
    OnChange,
}

fn default_start_policy() -> EventPolicy {
    EventPolicy::Never
}

fn default_outcome_policy() -> EventPolicy {
    EventPolicy::OnChange
}

/// Policies for the start, success and failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPolicies {
    #[serde(default = "default_start_policy")]
    pub start: EventPolicy,
    #[serde(default = "default_outcome_policy")]
    pub success: EventPolicy,
    #[serde(default = "default_outcome_policy")]
    pub failure: EventPolicy,
}

impl Default for EventPolicies {
    fn default() -> Self {
        Self {
            start: default_start_policy(),
            success: default_outcome_policy(),
            failure: default_outcome_policy(),
        }
    }
}

/// Title and body templates, see [`crate::notification::template`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MessageTemplate {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
}

impl MessageTemplate {
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
        }
    }
}

/// Settings for channels that address individual users (mail, chat).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectedMessageSettings {
    #[serde(default)]
    pub recipients: Vec<String>,
    /// Add every user with read permission on the scope.
    #[serde(default)]
    pub send_to_groups: bool,
    /// Add the build author.
    #[serde(default)]
    pub send_to_author: bool,
    #[serde(default)]
    pub template: MessageTemplate,
    #[serde(flatten)]
    pub policies: EventPolicies,
}

/// Settings for topic-based channels.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TopicMessageSettings {
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub template: MessageTemplate,
    #[serde(flatten)]
    pub policies: EventPolicies,
}

/// Settings for one channel, tagged by kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelSettings {
    Email(DirectedMessageSettings),
    Jabber(DirectedMessageSettings),
    Tat(TopicMessageSettings),
}

impl ChannelSettings {
    pub fn kind(&self) -> ChannelKind {
        match self {
            Self::Email(_) => ChannelKind::Email,
            Self::Jabber(_) => ChannelKind::Jabber,
            Self::Tat(_) => ChannelKind::Tat,
        }
    }

    pub fn policies(&self) -> &EventPolicies {
        match self {
            Self::Email(s) | Self::Jabber(s) => &s.policies,
            Self::Tat(s) => &s.policies,
        }
    }

    pub fn template(&self) -> &MessageTemplate {
        match self {
            Self::Email(s) | Self::Jabber(s) => &s.template,
            Self::Tat(s) => &s.template,
        }
    }
}

/// Notification configuration of one (application, pipeline, environment).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NotificationSettings {
    channels: BTreeMap<ChannelKind, ChannelSettings>,
}

impl NotificationSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the settings for a channel kind.
    pub fn insert(&mut self, settings: ChannelSettings) -> Option<ChannelSettings> {
        self.channels.insert(settings.kind(), settings)
    }

    pub fn with_channel(mut self, settings: ChannelSettings) -> Self {
        self.insert(settings);
        self
    }

    pub fn remove(&mut self, kind: ChannelKind) -> Option<ChannelSettings> {
        self.channels.remove(&kind)
    }

    pub fn get(&self, kind: ChannelKind) -> Option<&ChannelSettings> {
        self.channels.get(&kind)
    }

    pub fn channels(&self) -> impl Iterator<Item = &ChannelSettings> {
        self.channels.values()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

impl Serialize for NotificationSettings {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.channels.len()))?;
        for (kind, settings) in &self.channels {
            match settings {
                ChannelSettings::Email(s) | ChannelSettings::Jabber(s) => {
                    map.serialize_entry(kind.as_str(), s)?
                }
                ChannelSettings::Tat(s) => map.serialize_entry(kind.as_str(), s)?,
            }
        }
        map.end()
    }
}
