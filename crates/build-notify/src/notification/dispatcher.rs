//! Build notification dispatcher.
//!
//! The dispatcher is responsible for:
//! - Publishing every build event to in-process subscribers
//! - Gating each configured channel on its trigger policy
//! - Resolving recipients and rendering the channel template
//! - Handing the result to the channel sender on a detached task
//!
//! Dispatch never returns an error to the caller; failures are logged and
//! counted in [`DispatchStats`].

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::channels::{ChannelSender, ChannelSenders};
use super::message::Notification;
use super::policy::should_notify;
use super::recipients::{RecipientResolver, topic_recipients};
use super::settings::{ChannelKind, ChannelSettings, NotificationSettings};
use super::template::{self, keys};
use crate::config::DispatcherConfig;
use crate::domain::{BuildEvent, BuildStatus, StatusTransition};
use crate::lookup::{PermissionLookup, UserLookup};
use crate::store::SettingsStore;

/// What happened to one channel's notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelOutcome {
    /// The sender accepted the notification.
    Sent(Notification),
    /// No recipient was resolved; nothing was sent.
    NoRecipients,
    /// Recipients could not be resolved.
    ResolutionFailed(String),
    /// The sender returned an error.
    SendFailed(String),
    /// The task panicked.
    Aborted(String),
}

/// Handle on the per-channel tasks spawned by one dispatch.
///
/// Dropping the handle detaches the tasks; they still run to completion.
#[derive(Debug, Default)]
pub struct DispatchHandle {
    tasks: Vec<(ChannelKind, JoinHandle<ChannelOutcome>)>,
}

impl DispatchHandle {
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn channels(&self) -> Vec<ChannelKind> {
        self.tasks.iter().map(|(kind, _)| *kind).collect()
    }

    /// Wait for every channel task and collect the outcomes.
    pub async fn join(self) -> Vec<(ChannelKind, ChannelOutcome)> {
        let mut outcomes = Vec::with_capacity(self.tasks.len());
        for (kind, task) in self.tasks {
            let outcome = match task.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(channel = %kind, "Notification task failed: {}", e);
                    ChannelOutcome::Aborted(e.to_string())
                }
            };
            outcomes.push((kind, outcome));
        }
        outcomes
    }
}

#[derive(Debug, Default)]
struct DispatchCounters {
    sent: AtomicU64,
    skipped: AtomicU64,
    resolution_failures: AtomicU64,
    send_failures: AtomicU64,
}

/// Running dispatch counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DispatchStats {
    /// Notifications accepted by a sender.
    pub sent: u64,
    /// Channels not notified: policy, missing sender or no recipients.
    pub skipped: u64,
    /// Channels dropped because recipients could not be resolved.
    pub resolution_failures: u64,
    /// Notifications rejected by a sender.
    pub send_failures: u64,
}

/// The build notification dispatcher.
pub struct Dispatcher {
    config: DispatcherConfig,
    permissions: Arc<dyn PermissionLookup>,
    users: Arc<dyn UserLookup>,
    senders: ChannelSenders,
    counters: Arc<DispatchCounters>,
    event_tx: broadcast::Sender<BuildEvent>,
}

impl Dispatcher {
    pub fn new(
        config: DispatcherConfig,
        permissions: Arc<dyn PermissionLookup>,
        users: Arc<dyn UserLookup>,
        senders: ChannelSenders,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(config.event_buffer.max(1));

        info!(
            enabled = config.enabled,
            senders = senders.len(),
            "Notification dispatcher initialized"
        );

        Self {
            config,
            permissions,
            users,
            senders,
            counters: Arc::new(DispatchCounters::default()),
            event_tx,
        }
    }

    /// Subscribe to every build event seen by the dispatcher.
    pub fn subscribe(&self) -> broadcast::Receiver<BuildEvent> {
        self.event_tx.subscribe()
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            sent: self.counters.sent.load(Ordering::Relaxed),
            skipped: self.counters.skipped.load(Ordering::Relaxed),
            resolution_failures: self.counters.resolution_failures.load(Ordering::Relaxed),
            send_failures: self.counters.send_failures.load(Ordering::Relaxed),
        }
    }

    /// Link to the build detail page in the UI.
    pub fn build_url(&self, event: &BuildEvent) -> String {
        format!(
            "{}/#/project/{}/application/{}/pipeline/{}/build/{}?env={}&tab=detail",
            self.config.normalized_base_url(),
            event.project_key,
            event.application.name,
            event.pipeline.name,
            event.build_number,
            event.environment.name
        )
    }

    /// Template parameters: build parameters plus the synthesized `cds.*` keys.
    pub fn template_params(&self, event: &BuildEvent) -> BTreeMap<String, String> {
        let mut params = event.parameters.clone();
        params.insert(keys::STATUS.to_string(), event.status.to_string());
        params.insert(keys::BUILD_URL.to_string(), self.build_url(event));
        if let Some(author) = event.author() {
            params.insert(keys::AUTHOR.to_string(), author.to_string());
        }
        params
    }

    /// Load the settings for the event's scope and dispatch.
    ///
    /// A missing record means notifications are not configured. Store errors
    /// are logged and end the dispatch.
    pub async fn notify_build(
        &self,
        event: &BuildEvent,
        previous: Option<BuildStatus>,
        store: &dyn SettingsStore,
    ) -> DispatchHandle {
        debug!(
            project = %event.project_key,
            build = event.build_number,
            status = %event.status,
            "Build notification requested"
        );
        self.publish(event);

        if !self.config.enabled {
            return DispatchHandle::default();
        }

        let scope = event.scope();
        let settings = match store.load(&scope).await {
            Ok(Some(settings)) => settings,
            Ok(None) => {
                debug!(%scope, "No user notification configured");
                return DispatchHandle::default();
            }
            Err(e) => {
                error!(%scope, "Error while loading user notification settings: {}", e);
                return DispatchHandle::default();
            }
        };

        self.dispatch_channels(event, StatusTransition::new(previous, event.status), &settings)
    }

    /// Dispatch one build event against already loaded settings.
    ///
    /// Must be called from within a Tokio runtime: each notified channel runs
    /// on its own spawned task.
    pub fn dispatch(
        &self,
        event: &BuildEvent,
        transition: StatusTransition,
        settings: &NotificationSettings,
    ) -> DispatchHandle {
        self.publish(event);

        if !self.config.enabled {
            debug!("Notification dispatch disabled");
            return DispatchHandle::default();
        }

        self.dispatch_channels(event, transition, settings)
    }

    fn publish(&self, event: &BuildEvent) {
        // No subscribers is fine.
        let _ = self.event_tx.send(event.clone());
    }

    fn dispatch_channels(
        &self,
        event: &BuildEvent,
        transition: StatusTransition,
        settings: &NotificationSettings,
    ) -> DispatchHandle {
        let transition = if transition.current == event.status {
            transition
        } else {
            warn!(
                transition = %transition.current,
                event = %event.status,
                "Transition does not match build status, using build status"
            );
            StatusTransition::new(transition.previous, event.status)
        };

        let mut handle = DispatchHandle::default();
        let mut shared: Option<(Arc<BuildEvent>, Arc<BTreeMap<String, String>>)> = None;

        for channel in settings.channels() {
            let kind = channel.kind();

            if !should_notify(channel.policies(), transition) {
                debug!(channel = %kind, status = %event.status, "Notification not required");
                self.counters.skipped.fetch_add(1, Ordering::Relaxed);
                continue;
            }

            let Some(sender) = self.senders.get(kind) else {
                warn!(channel = %kind, "No sender registered for channel, skipping");
                self.counters.skipped.fetch_add(1, Ordering::Relaxed);
                continue;
            };

            let (snapshot, params) = shared
                .get_or_insert_with(|| {
                    (Arc::new(event.clone()), Arc::new(self.template_params(event)))
                })
                .clone();

            let task = ChannelTask {
                channel: channel.clone(),
                event: snapshot,
                params,
                sender,
                permissions: Arc::clone(&self.permissions),
                users: Arc::clone(&self.users),
                counters: Arc::clone(&self.counters),
            };
            handle.tasks.push((kind, tokio::spawn(task.run())));
        }

        handle
    }
}

/// Everything one channel needs, owned so it can move onto a task.
struct ChannelTask {
    channel: ChannelSettings,
    event: Arc<BuildEvent>,
    params: Arc<BTreeMap<String, String>>,
    sender: Arc<dyn ChannelSender>,
    permissions: Arc<dyn PermissionLookup>,
    users: Arc<dyn UserLookup>,
    counters: Arc<DispatchCounters>,
}

impl ChannelTask {
    async fn run(self) -> ChannelOutcome {
        let kind = self.channel.kind();

        let recipients = match &self.channel {
            ChannelSettings::Email(s) | ChannelSettings::Jabber(s) => {
                RecipientResolver::new(self.permissions.as_ref(), self.users.as_ref())
                    .resolve(kind, s, &self.event)
                    .await
            }
            ChannelSettings::Tat(s) => Ok(topic_recipients(s)),
        };

        let recipients = match recipients {
            Ok(r) => r,
            Err(e) => {
                warn!(channel = %kind, "Skipping notification, cannot resolve recipients: {}", e);
                self.counters.resolution_failures.fetch_add(1, Ordering::Relaxed);
                return ChannelOutcome::ResolutionFailed(e.to_string());
            }
        };

        if recipients.is_empty() {
            debug!(channel = %kind, "No recipients resolved, skipping");
            self.counters.skipped.fetch_add(1, Ordering::Relaxed);
            return ChannelOutcome::NoRecipients;
        }

        let message = template::render(self.channel.template(), &self.params);
        let notification = Notification {
            channel: kind,
            title: message.title,
            body: message.body,
            recipients,
            timestamp: Utc::now(),
            status: self.event.status,
        };

        info!(
            channel = %kind,
            sender = self.sender.name(),
            recipients = notification.recipients.len(),
            "Send notification '{}'",
            notification.title
        );

        match self.sender.send(&notification).await {
            Ok(()) => {
                self.counters.sent.fetch_add(1, Ordering::Relaxed);
                ChannelOutcome::Sent(notification)
            }
            Err(e) => {
                warn!(channel = %kind, "Failed to send notification: {}", e);
                self.counters.send_failures.fetch_add(1, Ordering::Relaxed);
                ChannelOutcome::SendFailed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Result;
    use crate::domain::{EntityRef, User};
    use crate::lookup::StaticDirectory;
    use crate::notification::settings::{
        DirectedMessageSettings, EventPolicies, EventPolicy, MessageTemplate,
    };
    use async_trait::async_trait;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingSender {
        sent: Mutex<Vec<Notification>>,
    }

    #[async_trait]
    impl ChannelSender for RecordingSender {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn send(&self, notification: &Notification) -> Result<()> {
            self.sent.lock().push(notification.clone());
            Ok(())
        }
    }

    fn event(status: BuildStatus) -> BuildEvent {
        BuildEvent::new(
            "PRJ",
            EntityRef::new(1, "api"),
            EntityRef::new(2, "deploy"),
            EntityRef::new(3, "prod"),
            12,
            status,
        )
        .with_parameter("git.branch", "main")
    }

    fn dispatcher(sender: Arc<RecordingSender>) -> Dispatcher {
        let dir = Arc::new(StaticDirectory::new());
        Dispatcher::new(
            DispatcherConfig::default().with_base_url("https://ui.example.com/"),
            dir.clone(),
            dir,
            ChannelSenders::new()
                .with(ChannelKind::Jabber, sender.clone())
                .with(ChannelKind::Email, sender),
        )
    }

    fn jabber(policies: EventPolicies) -> NotificationSettings {
        NotificationSettings::new().with_channel(ChannelSettings::Jabber(DirectedMessageSettings {
            recipients: vec!["alice".to_string()],
            template: MessageTemplate::new("{{.cds.status}} on {{.git.branch}}", "{{.cds.buildURL}}"),
            policies,
            ..Default::default()
        }))
    }

    #[test]
    fn test_build_url() {
        let d = dispatcher(Arc::new(RecordingSender::default()));
        assert_eq!(
            d.build_url(&event(BuildStatus::Fail)),
            "https://ui.example.com/#/project/PRJ/application/api/pipeline/deploy/build/12?env=prod&tab=detail"
        );
    }

    #[test]
    fn test_template_params_override_build_parameters() {
        let d = dispatcher(Arc::new(RecordingSender::default()));
        let e = event(BuildStatus::Success)
            .with_parameter("cds.status", "spoofed")
            .triggered_by(User::new("alice", "alice@example.com"));
        let params = d.template_params(&e);
        assert_eq!(params["cds.status"], "Success");
        assert_eq!(params["cds.author"], "alice");
        assert_eq!(params["git.branch"], "main");
    }

    #[tokio::test]
    async fn test_dispatch_renders_and_sends() {
        let sender = Arc::new(RecordingSender::default());
        let d = dispatcher(sender.clone());

        let outcomes = d
            .dispatch(
                &event(BuildStatus::Success),
                StatusTransition::new(Some(BuildStatus::Building), BuildStatus::Success),
                &jabber(EventPolicies::default()),
            )
            .join()
            .await;

        assert_eq!(outcomes.len(), 1);
        let sent = sender.sent.lock().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].title, "Success on main");
        assert!(sent[0].body.starts_with("https://ui.example.com/#/project/PRJ"));
        assert_eq!(sent[0].recipients, vec!["alice"]);
        assert_eq!(d.stats().sent, 1);
    }

    #[tokio::test]
    async fn test_policy_never_spawns_nothing() {
        let sender = Arc::new(RecordingSender::default());
        let d = dispatcher(sender.clone());
        let policies = EventPolicies {
            success: EventPolicy::Never,
            ..Default::default()
        };

        let handle = d.dispatch(
            &event(BuildStatus::Success),
            StatusTransition::new(Some(BuildStatus::Building), BuildStatus::Success),
            &jabber(policies),
        );
        assert!(handle.is_empty());
        assert!(sender.sent.lock().is_empty());
        assert_eq!(d.stats().skipped, 1);
    }

    #[tokio::test]
    async fn test_disabled_dispatcher_only_publishes() {
        let sender = Arc::new(RecordingSender::default());
        let dir = Arc::new(StaticDirectory::new());
        let d = Dispatcher::new(
            DispatcherConfig {
                enabled: false,
                ..Default::default()
            },
            dir.clone(),
            dir,
            ChannelSenders::new().with(ChannelKind::Jabber, sender.clone()),
        );
        let mut rx = d.subscribe();

        let handle = d.dispatch(
            &event(BuildStatus::Fail),
            StatusTransition::first(BuildStatus::Fail),
            &jabber(EventPolicies::default()),
        );
        assert!(handle.is_empty());
        assert_eq!(rx.recv().await.unwrap().status, BuildStatus::Fail);
    }

    #[tokio::test]
    async fn test_mismatched_transition_uses_event_status() {
        let sender = Arc::new(RecordingSender::default());
        let d = dispatcher(sender.clone());
        let policies = EventPolicies {
            success: EventPolicy::Never,
            failure: EventPolicy::Always,
            ..Default::default()
        };

        let outcomes = d
            .dispatch(
                &event(BuildStatus::Fail),
                StatusTransition::first(BuildStatus::Success),
                &jabber(policies),
            )
            .join()
            .await;
        assert_eq!(outcomes.len(), 1);
        assert_eq!(sender.sent.lock()[0].status, BuildStatus::Fail);
    }
}
