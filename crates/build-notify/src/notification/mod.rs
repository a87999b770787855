//! User notifications for pipeline builds.
//!
//! Per-scope settings pick channels (email, jabber, tat), a trigger policy for
//! each event category and the message templates. On every build status
//! change the [`Dispatcher`] gates each channel on its policy, resolves the
//! recipients, renders the templates and sends through the registered
//! [`ChannelSender`] on a detached task.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use build_notify::DispatcherConfig;
//! use build_notify::lookup::StaticDirectory;
//! use build_notify::notification::{ChannelKind, ChannelSenders, Dispatcher, LogSender};
//!
//! let directory = Arc::new(StaticDirectory::new());
//! let dispatcher = Dispatcher::new(
//!     DispatcherConfig::default(),
//!     directory.clone(),
//!     directory,
//!     ChannelSenders::new().with(ChannelKind::Jabber, Arc::new(LogSender::new())),
//! );
//! let handle = dispatcher.dispatch(&event, transition, &settings);
//! ```

pub mod channels;
pub mod codec;
pub mod dispatcher;
pub mod message;
pub mod policy;
pub mod recipients;
pub mod settings;
pub mod template;

pub use channels::{ChannelSender, ChannelSenders, LogSender};
pub use codec::{UserNotification, parse_settings, parse_user_notification, serialize_settings};
pub use dispatcher::{ChannelOutcome, DispatchHandle, DispatchStats, Dispatcher};
pub use message::Notification;
pub use policy::should_notify;
pub use recipients::RecipientResolver;
pub use settings::{
    ChannelKind, ChannelSettings, DirectedMessageSettings, EventPolicies, EventPolicy,
    MessageTemplate, NotificationSettings, TopicMessageSettings,
};
pub use template::{RenderedMessage, render};
