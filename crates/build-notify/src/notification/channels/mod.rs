//! Channel senders.
//!
//! The engine never talks to a transport directly. Each channel kind is
//! backed by a [`ChannelSender`] registered in [`ChannelSenders`]:
//! - [`LogSender`] writes notifications to the tracing log
//!
//! Concrete transports (mail, chat, topics) are provided by the embedding
//! application.

mod log;

pub use log::LogSender;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use super::message::Notification;
use super::settings::ChannelKind;
use crate::Result;

/// Delivers a notification over one transport.
#[async_trait]
pub trait ChannelSender: Send + Sync {
    /// Sender name for logs.
    fn name(&self) -> &'static str;

    /// Deliver the notification. Errors are logged by the caller and dropped.
    async fn send(&self, notification: &Notification) -> Result<()>;
}

/// Senders keyed by channel kind.
#[derive(Clone, Default)]
pub struct ChannelSenders {
    senders: HashMap<ChannelKind, Arc<dyn ChannelSender>>,
}

impl ChannelSenders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the sender for a channel kind, replacing any previous one.
    pub fn register(&mut self, kind: ChannelKind, sender: Arc<dyn ChannelSender>) {
        self.senders.insert(kind, sender);
    }

    pub fn with(mut self, kind: ChannelKind, sender: Arc<dyn ChannelSender>) -> Self {
        self.register(kind, sender);
        self
    }

    pub fn get(&self, kind: ChannelKind) -> Option<Arc<dyn ChannelSender>> {
        self.senders.get(&kind).cloned()
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_replace() {
        let mut senders = ChannelSenders::new();
        assert!(senders.is_empty());

        senders.register(ChannelKind::Jabber, Arc::new(LogSender::new()));
        senders.register(ChannelKind::Jabber, Arc::new(LogSender::new()));
        assert_eq!(senders.len(), 1);
        assert!(senders.get(ChannelKind::Jabber).is_some());
        assert!(senders.get(ChannelKind::Email).is_none());
    }
}
