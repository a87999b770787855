//! Settings storage.
//!
//! Records are keyed by (application, pipeline, environment); there is at most
//! one record per key. Records are kept in their persisted JSON form and go
//! through the codec on every read and write, so a record that fails to parse
//! can neither be written nor used.

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use crate::Result;
use crate::domain::SettingsScope;
use crate::notification::codec::{parse_settings, serialize_settings};
use crate::notification::settings::NotificationSettings;

/// Settings repository trait.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Load the record for a scope. `None` means notifications are not configured.
    async fn load(&self, scope: &SettingsScope) -> Result<Option<NotificationSettings>>;

    /// Insert or replace the record for a scope.
    async fn save(&self, scope: &SettingsScope, settings: &NotificationSettings) -> Result<()>;

    /// Delete the record for a scope. Deleting a missing record is not an error.
    async fn delete(&self, scope: &SettingsScope) -> Result<()>;

    /// All records of an application, ordered by pipeline then environment.
    async fn list_for_application(
        &self,
        application_id: i64,
    ) -> Result<Vec<(SettingsScope, NotificationSettings)>>;

    /// Parse a raw settings document and store it. Nothing is written when
    /// parsing fails.
    async fn save_raw(&self, scope: &SettingsScope, bytes: &[u8]) -> Result<NotificationSettings> {
        let settings = parse_settings(bytes)?;
        self.save(scope, &settings).await?;
        Ok(settings)
    }
}

/// In-memory settings store.
#[derive(Default)]
pub struct MemorySettingsStore {
    records: DashMap<SettingsScope, Vec<u8>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn load(&self, scope: &SettingsScope) -> Result<Option<NotificationSettings>> {
        let Some(raw) = self.records.get(scope).map(|r| r.value().clone()) else {
            return Ok(None);
        };
        parse_settings(&raw).map(Some)
    }

    async fn save(&self, scope: &SettingsScope, settings: &NotificationSettings) -> Result<()> {
        let raw = serialize_settings(settings)?;
        debug!(%scope, channels = settings.len(), "Saving notification settings");
        self.records.insert(*scope, raw);
        Ok(())
    }

    async fn delete(&self, scope: &SettingsScope) -> Result<()> {
        self.records.remove(scope);
        Ok(())
    }

    async fn list_for_application(
        &self,
        application_id: i64,
    ) -> Result<Vec<(SettingsScope, NotificationSettings)>> {
        let mut raw: Vec<(SettingsScope, Vec<u8>)> = self
            .records
            .iter()
            .filter(|r| r.key().application_id == application_id)
            .map(|r| (*r.key(), r.value().clone()))
            .collect();
        raw.sort_by_key(|(scope, _)| *scope);

        raw.into_iter()
            .map(|(scope, bytes)| Ok((scope, parse_settings(&bytes)?)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::notification::settings::{ChannelKind, ChannelSettings, DirectedMessageSettings};

    fn jabber() -> NotificationSettings {
        NotificationSettings::new().with_channel(ChannelSettings::Jabber(DirectedMessageSettings {
            recipients: vec!["alice".to_string()],
            ..Default::default()
        }))
    }

    #[tokio::test]
    async fn test_missing_record_is_none() {
        let store = MemorySettingsStore::new();
        assert!(store.load(&SettingsScope::new(1, 2, 3)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_replaces_existing_record() {
        let store = MemorySettingsStore::new();
        let scope = SettingsScope::new(1, 2, 3);

        store.save(&scope, &jabber()).await.unwrap();
        store.save(&scope, &NotificationSettings::new()).await.unwrap();

        assert_eq!(store.len(), 1);
        assert!(store.load(&scope).await.unwrap().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_raw_rejects_unsupported_channel() {
        let store = MemorySettingsStore::new();
        let scope = SettingsScope::new(1, 2, 3);
        store.save(&scope, &jabber()).await.unwrap();

        let err = store
            .save_raw(&scope, br#"{"pager": {"recipients": ["x"]}}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedChannel(_)));

        // The previous record is untouched.
        let kept = store.load(&scope).await.unwrap().unwrap();
        assert!(kept.get(ChannelKind::Jabber).is_some());
    }

    #[tokio::test]
    async fn test_save_raw_stores_parsed_settings() {
        let store = MemorySettingsStore::new();
        let scope = SettingsScope::new(1, 2, 3);
        let parsed = store
            .save_raw(&scope, br#"{"email": {"recipients": ["ops@example.com"]}, "jabber": null}"#)
            .await
            .unwrap();
        assert_eq!(store.load(&scope).await.unwrap(), Some(parsed));
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let store = MemorySettingsStore::new();
        store.save(&SettingsScope::new(1, 5, 1), &jabber()).await.unwrap();
        store.save(&SettingsScope::new(1, 2, 9), &jabber()).await.unwrap();
        store.save(&SettingsScope::new(2, 1, 1), &jabber()).await.unwrap();

        let listed = store.list_for_application(1).await.unwrap();
        let scopes: Vec<_> = listed.iter().map(|(s, _)| *s).collect();
        assert_eq!(scopes, vec![SettingsScope::new(1, 2, 9), SettingsScope::new(1, 5, 1)]);

        store.delete(&SettingsScope::new(1, 2, 9)).await.unwrap();
        store.delete(&SettingsScope::new(7, 7, 7)).await.unwrap();
        assert_eq!(store.list_for_application(1).await.unwrap().len(), 1);
    }
}
