//! Transition-sensitive trigger policy.

use serde::{Deserialize, Serialize};

use super::settings::{EventPolicies, EventPolicy};
use crate::domain::{BuildStatus, StatusTransition};

/// Event category derived from a build status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Category {
    Start,
    Success,
    Failure,
}

impl Category {
    /// Category of a status, `None` for statuses that never notify.
    pub fn from_status(status: BuildStatus) -> Option<Self> {
        match status {
            BuildStatus::Building => Some(Self::Start),
            BuildStatus::Success => Some(Self::Success),
            BuildStatus::Fail => Some(Self::Failure),
            BuildStatus::Waiting | BuildStatus::Disabled | BuildStatus::Skipped => None,
        }
    }
}

/// Evaluate one policy against a transition.
pub fn decide(policy: EventPolicy, transition: StatusTransition) -> bool {
    match policy {
        EventPolicy::Always => true,
        EventPolicy::Never => false,
        EventPolicy::OnChange => transition.is_change(),
    }
}

/// Whether a channel with these policies notifies for the transition.
///
/// The start category has no change semantics: `OnChange` there means enabled.
pub fn should_notify(policies: &EventPolicies, transition: StatusTransition) -> bool {
    match Category::from_status(transition.current) {
        Some(Category::Start) => policies.start != EventPolicy::Never,
        Some(Category::Success) => decide(policies.success, transition),
        Some(Category::Failure) => decide(policies.failure, transition),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use BuildStatus::*;

    const STATUSES: [BuildStatus; 6] = [Waiting, Building, Success, Fail, Disabled, Skipped];

    #[test]
    fn test_always_and_never_ignore_transition() {
        for current in STATUSES {
            for previous in std::iter::once(None).chain(STATUSES.map(Some)) {
                let t = StatusTransition::new(previous, current);
                assert!(decide(EventPolicy::Always, t));
                assert!(!decide(EventPolicy::Never, t));
            }
        }
    }

    #[test]
    fn test_on_change() {
        for current in STATUSES {
            assert!(decide(EventPolicy::OnChange, StatusTransition::first(current)));
            assert!(!decide(
                EventPolicy::OnChange,
                StatusTransition::new(Some(current), current)
            ));
            for previous in STATUSES.into_iter().filter(|s| *s != current) {
                assert!(decide(
                    EventPolicy::OnChange,
                    StatusTransition::new(Some(previous), current)
                ));
            }
        }
    }

    #[test]
    fn test_building_to_success() {
        let t = StatusTransition::new(Some(Building), Success);
        let mut policies = EventPolicies {
            success: EventPolicy::OnChange,
            ..Default::default()
        };
        assert!(should_notify(&policies, t));

        policies.success = EventPolicy::Never;
        assert!(!should_notify(&policies, t));
    }

    #[test]
    fn test_repeated_failure_with_on_change() {
        let policies = EventPolicies::default();
        assert!(!should_notify(&policies, StatusTransition::new(Some(Fail), Fail)));
        assert!(should_notify(&policies, StatusTransition::new(Some(Success), Fail)));
    }

    #[test]
    fn test_start_category_has_no_change_semantics() {
        let repeat = StatusTransition::new(Some(Building), Building);
        for (policy, expected) in [
            (EventPolicy::Always, true),
            (EventPolicy::OnChange, true),
            (EventPolicy::Never, false),
        ] {
            let policies = EventPolicies {
                start: policy,
                ..Default::default()
            };
            assert_eq!(should_notify(&policies, repeat), expected, "{policy}");
        }
    }

    #[test]
    fn test_uncategorized_statuses_are_inert() {
        let policies = EventPolicies {
            start: EventPolicy::Always,
            success: EventPolicy::Always,
            failure: EventPolicy::Always,
        };
        for status in [Waiting, Disabled, Skipped] {
            assert_eq!(Category::from_status(status), None);
            assert!(!should_notify(&policies, StatusTransition::first(status)));
        }
    }
}
