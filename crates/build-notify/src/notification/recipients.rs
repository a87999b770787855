//! Recipient resolution.
//!
//! Recipients of a directed channel are merged from three sources, in order:
//! users with read access to the scope, the build author, and the explicit
//! list from settings. The merged list is deduplicated keeping the first
//! occurrence of each identifier.

use std::collections::HashSet;

use tracing::debug;

use super::settings::{ChannelKind, DirectedMessageSettings, TopicMessageSettings};
use crate::domain::{BuildEvent, Permission, User};
use crate::lookup::{PermissionLookup, UserLookup};
use crate::{Error, Result};

/// Drop repeated identifiers, keeping the first occurrence in place.
pub fn dedup_preserving_order<I>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

/// Resolves destinations for directed channels.
pub struct RecipientResolver<'a> {
    permissions: &'a dyn PermissionLookup,
    users: &'a dyn UserLookup,
}

impl<'a> RecipientResolver<'a> {
    pub fn new(permissions: &'a dyn PermissionLookup, users: &'a dyn UserLookup) -> Self {
        Self { permissions, users }
    }

    /// Resolve the ordered, duplicate-free destination list for one channel.
    ///
    /// Errors are local to the channel: a failed group lookup, or an author
    /// that cannot be mapped to an email address on a mail channel.
    pub async fn resolve(
        &self,
        kind: ChannelKind,
        settings: &DirectedMessageSettings,
        event: &BuildEvent,
    ) -> Result<Vec<String>> {
        let mut recipients = Vec::new();

        if settings.send_to_groups {
            let scope = event.scope();
            let members = self
                .permissions
                .users_with_permission(&scope, Permission::Read)
                .await
                .map_err(|e| Error::lookup(format!("group members of {scope}: {e}")))?;
            debug!(channel = %kind, count = members.len(), "Resolved group recipients");
            recipients.extend(members.iter().map(|user| identifier(kind, user)));
        }

        if settings.send_to_author {
            if let Some(author) = event.author() {
                recipients.push(self.author_identifier(kind, author).await?);
            }
        }

        recipients.extend(settings.recipients.iter().cloned());

        Ok(dedup_preserving_order(
            recipients.into_iter().filter(|r| !r.is_empty()),
        ))
    }

    async fn author_identifier(&self, kind: ChannelKind, author: &str) -> Result<String> {
        if !kind.is_mail() {
            return Ok(author.to_string());
        }

        let user = self
            .users
            .find_user(author)
            .await
            .map_err(|e| Error::lookup(format!("cannot load author {author}: {e}")))?;
        Ok(user.email)
    }
}

/// Topic channels address their configured topics only.
pub fn topic_recipients(settings: &TopicMessageSettings) -> Vec<String> {
    dedup_preserving_order(
        settings
            .topics
            .iter()
            .filter(|t| !t.is_empty())
            .cloned(),
    )
}

fn identifier(kind: ChannelKind, user: &User) -> String {
    if kind.is_mail() {
        user.email.clone()
    } else {
        user.username.clone()
    }
}
