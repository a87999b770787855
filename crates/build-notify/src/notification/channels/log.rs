//! Sender that only writes notifications to the log.

use async_trait::async_trait;
use tracing::info;

use super::ChannelSender;
use crate::Result;
use crate::notification::message::Notification;

/// Logs every notification at info level.
#[derive(Debug, Default)]
pub struct LogSender;

impl LogSender {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ChannelSender for LogSender {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn send(&self, notification: &Notification) -> Result<()> {
        info!(
            channel = %notification.channel,
            status = %notification.status,
            recipients = notification.recipients.len(),
            "Notification: {}",
            notification.summary()
        );
        Ok(())
    }
}
