//! User and permission lookups consumed by recipient resolution.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::domain::{Permission, SettingsScope, User};
use crate::{Error, Result};

/// Users holding a permission on an (application, pipeline, environment) scope.
#[async_trait]
pub trait PermissionLookup: Send + Sync {
    async fn users_with_permission(
        &self,
        scope: &SettingsScope,
        permission: Permission,
    ) -> Result<Vec<User>>;
}

/// Resolve a user handle to a full user record.
#[async_trait]
pub trait UserLookup: Send + Sync {
    /// Returns [`Error::NotFound`] for unknown handles.
    async fn find_user(&self, username: &str) -> Result<User>;
}

/// In-memory directory of users and per-scope grants.
#[derive(Default)]
pub struct StaticDirectory {
    users: RwLock<HashMap<String, User>>,
    grants: RwLock<HashMap<SettingsScope, Vec<(String, Permission)>>>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, user: User) {
        self.users.write().insert(user.username.clone(), user);
    }

    /// Grant `permission` on `scope` to an already added user.
    pub fn grant(&self, scope: SettingsScope, username: &str, permission: Permission) {
        self.grants
            .write()
            .entry(scope)
            .or_default()
            .push((username.to_string(), permission));
    }
}

#[async_trait]
impl PermissionLookup for StaticDirectory {
    async fn users_with_permission(
        &self,
        scope: &SettingsScope,
        permission: Permission,
    ) -> Result<Vec<User>> {
        let users = self.users.read();
        let grants = self.grants.read();
        let Some(granted) = grants.get(scope) else {
            return Ok(Vec::new());
        };

        Ok(granted
            .iter()
            .filter(|(_, level)| *level >= permission)
            .filter_map(|(name, _)| users.get(name).cloned())
            .collect())
    }
}

#[async_trait]
impl UserLookup for StaticDirectory {
    async fn find_user(&self, username: &str) -> Result<User> {
        self.users
            .read()
            .get(username)
            .cloned()
            .ok_or_else(|| Error::not_found("User", username))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_grants_filter_by_level_and_keep_order() {
        let dir = StaticDirectory::new();
        let scope = SettingsScope::new(1, 2, 3);
        dir.add_user(User::new("zed", "zed@example.com"));
        dir.add_user(User::new("amy", "amy@example.com"));
        dir.grant(scope, "zed", Permission::ReadWriteExecute);
        dir.grant(scope, "amy", Permission::Read);

        let readers = dir.users_with_permission(&scope, Permission::Read).await.unwrap();
        let names: Vec<_> = readers.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["zed", "amy"]);

        let writers = dir
            .users_with_permission(&scope, Permission::ReadWriteExecute)
            .await
            .unwrap();
        assert_eq!(writers.len(), 1);

        let other = SettingsScope::new(9, 9, 9);
        assert!(dir.users_with_permission(&other, Permission::Read).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_find_user() {
        let dir = StaticDirectory::new();
        dir.add_user(User::new("amy", "amy@example.com"));
        assert_eq!(dir.find_user("amy").await.unwrap().email, "amy@example.com");
        assert!(matches!(dir.find_user("bob").await, Err(Error::NotFound { .. })));
    }
}
