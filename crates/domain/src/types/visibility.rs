//! Named visibility rules attached to local events

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::local_event::LocalEventId;
use super::viewer::{GroupId, StateId};

pub type VisibilityFilterId = i64;
pub type WebHookId = i64;

/// Restricts who may see a local event.
///
/// An empty `groups` (or `states`) set places no restriction on that axis.
/// Inactive filters restrict nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityFilter {
    pub id: VisibilityFilterId,
    pub name: String,
    pub webhook_id: Option<WebHookId>,
    /// Suppress notifications for events that already started.
    pub ignore_past: bool,
    pub is_active: bool,
    pub groups: BTreeSet<GroupId>,
    pub states: BTreeSet<StateId>,
}

impl VisibilityFilter {
    /// Active, unrestricted filter with no notification target.
    pub fn open(id: VisibilityFilterId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            webhook_id: None,
            ignore_past: true,
            is_active: true,
            groups: BTreeSet::new(),
            states: BTreeSet::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebHook {
    pub id: WebHookId,
    pub name: String,
    pub url: String,
    pub enabled: bool,
}

/// Payload handed to the notification sender when a new event matches a
/// filter with a notification target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventNotification {
    pub webhook_id: WebHookId,
    pub filter_name: String,
    pub event_id: LocalEventId,
    pub title: String,
    pub start: DateTime<Utc>,
}
