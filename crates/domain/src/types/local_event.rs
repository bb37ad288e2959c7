//! Manually created calendar events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::owner::{CharacterId, UserId};
use super::visibility::{VisibilityFilter, VisibilityFilterId};
use crate::constants::MAX_EVENT_TITLE_LENGTH;
use crate::{OpCalError, Result};

pub type LocalEventId = i64;

/// Display category of a local event (operation type).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCategory {
    pub name: String,
    pub ticker: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalEvent {
    pub id: LocalEventId,
    pub category: Option<EventCategory>,
    pub title: String,
    pub host: String,
    pub doctrine: String,
    pub formup_system: String,
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub fc: String,
    /// `None` means visible to everyone.
    pub visibility: Option<VisibilityFilter>,
    pub external: bool,
    pub created_by: UserId,
    pub created_character: Option<CharacterId>,
    pub created_at: DateTime<Utc>,
}

/// User-supplied fields of a local event, used for create and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDraft {
    pub category: Option<EventCategory>,
    pub title: String,
    pub host: String,
    pub doctrine: String,
    pub formup_system: String,
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub fc: String,
    pub visibility_id: Option<VisibilityFilterId>,
    pub external: bool,
}

impl EventDraft {
    /// Checks field-level constraints. Referential checks (does the filter
    /// exist, is `(title, start)` free) belong to the service.
    pub fn validate(&self) -> Result<()> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(OpCalError::InvalidInput("event title must not be empty".into()));
        }
        if title.chars().count() > MAX_EVENT_TITLE_LENGTH {
            return Err(OpCalError::InvalidInput(format!(
                "event title exceeds {MAX_EVENT_TITLE_LENGTH} characters"
            )));
        }
        if self.end < self.start {
            return Err(OpCalError::InvalidInput("event ends before it starts".into()));
        }
        Ok(())
    }
}

/// A validated draft plus creator bookkeeping, ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLocalEvent {
    pub draft: EventDraft,
    pub created_by: UserId,
    pub created_character: Option<CharacterId>,
    pub created_at: DateTime<Utc>,
}

/// Sign-up of a user to a local event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMember {
    pub event_id: LocalEventId,
    pub user_id: UserId,
    pub character_id: Option<CharacterId>,
    pub joined_at: DateTime<Utc>,
}
