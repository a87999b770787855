//! Pipeline build snapshots and status transitions.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::user::User;

/// Status of a pipeline build.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
pub enum BuildStatus {
    /// Queued, not started yet.
    Waiting,
    /// The build is running.
    Building,
    /// The build finished successfully.
    Success,
    /// The build finished with an error.
    Fail,
    /// The pipeline is disabled for this application.
    Disabled,
    /// The build was skipped by a trigger condition.
    Skipped,
}

/// A (previous, current) status pair.
///
/// A missing previous status means this is the first observed build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTransition {
    pub previous: Option<BuildStatus>,
    pub current: BuildStatus,
}

impl StatusTransition {
    pub fn new(previous: Option<BuildStatus>, current: BuildStatus) -> Self {
        Self { previous, current }
    }

    /// First observation of a build on this pipeline.
    pub fn first(current: BuildStatus) -> Self {
        Self::new(None, current)
    }

    pub fn is_change(&self) -> bool {
        self.previous != Some(self.current)
    }
}

/// An id/name pair identifying an application, pipeline or environment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct EntityRef {
    pub id: i64,
    pub name: String,
}

impl EntityRef {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// The (application, pipeline, environment) triple a settings record applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SettingsScope {
    pub application_id: i64,
    pub pipeline_id: i64,
    pub environment_id: i64,
}

impl SettingsScope {
    pub fn new(application_id: i64, pipeline_id: i64, environment_id: i64) -> Self {
        Self {
            application_id,
            pipeline_id,
            environment_id,
        }
    }
}

impl std::fmt::Display for SettingsScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "app={} pipeline={} env={}",
            self.application_id, self.pipeline_id, self.environment_id
        )
    }
}

/// What started a build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerInfo {
    /// User who manually started the build, if any.
    #[serde(default)]
    pub triggered_by: Option<User>,
    /// Raw author string of the version-control change that started the build.
    #[serde(default)]
    pub vcs_changes_author: String,
}

impl TriggerInfo {
    /// Handle of the build author: the triggering user, else the VCS author.
    pub fn author(&self) -> Option<&str> {
        if let Some(user) = &self.triggered_by {
            return Some(user.username.as_str());
        }
        if !self.vcs_changes_author.is_empty() {
            return Some(self.vcs_changes_author.as_str());
        }
        None
    }
}

/// Immutable snapshot of a pipeline build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildEvent {
    pub project_key: String,
    pub application: EntityRef,
    pub pipeline: EntityRef,
    pub environment: EntityRef,
    pub build_number: u64,
    pub status: BuildStatus,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
    #[serde(default)]
    pub trigger: TriggerInfo,
    pub timestamp: DateTime<Utc>,
}

impl BuildEvent {
    pub fn new(
        project_key: impl Into<String>,
        application: EntityRef,
        pipeline: EntityRef,
        environment: EntityRef,
        build_number: u64,
        status: BuildStatus,
    ) -> Self {
        Self {
            project_key: project_key.into(),
            application,
            pipeline,
            environment,
            build_number,
            status,
            parameters: BTreeMap::new(),
            trigger: TriggerInfo::default(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn triggered_by(mut self, user: User) -> Self {
        self.trigger.triggered_by = Some(user);
        self
    }

    pub fn with_vcs_author(mut self, author: impl Into<String>) -> Self {
        self.trigger.vcs_changes_author = author.into();
        self
    }

    pub fn scope(&self) -> SettingsScope {
        SettingsScope::new(self.application.id, self.pipeline.id, self.environment.id)
    }

    /// Author handle, see [`TriggerInfo::author`].
    pub fn author(&self) -> Option<&str> {
        self.trigger.author()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn event() -> BuildEvent {
        BuildEvent::new(
            "PRJ",
            EntityRef::new(1, "app"),
            EntityRef::new(2, "build"),
            EntityRef::new(3, "prod"),
            42,
            BuildStatus::Success,
        )
    }

    #[test]
    fn test_status_round_trips_through_strings() {
        assert_eq!(BuildStatus::Fail.to_string(), "Fail");
        assert_eq!(BuildStatus::from_str("Building").ok(), Some(BuildStatus::Building));
        assert!(BuildStatus::from_str("Unknown").is_err());
    }

    #[test]
    fn test_transition_change_detection() {
        assert!(StatusTransition::first(BuildStatus::Success).is_change());
        assert!(StatusTransition::new(Some(BuildStatus::Fail), BuildStatus::Success).is_change());
        assert!(!StatusTransition::new(Some(BuildStatus::Fail), BuildStatus::Fail).is_change());
    }

    #[test]
    fn test_author_prefers_triggering_user() {
        let e = event()
            .with_vcs_author("committer")
            .triggered_by(User::new("alice", "alice@example.com"));
        assert_eq!(e.author(), Some("alice"));
    }

    #[test]
    fn test_author_falls_back_to_vcs_author() {
        assert_eq!(event().with_vcs_author("bob").author(), Some("bob"));
        assert_eq!(event().author(), None);
    }

    #[test]
    fn test_scope() {
        assert_eq!(event().scope(), SettingsScope::new(1, 2, 3));
    }
}
